//! Pool bookkeeping and routing

pub mod instance;
pub mod pool;

#[cfg(test)]
mod tests;

pub use instance::ContainerInstance;
pub use pool::{ContainerPool, PoolConfig, RouteOutcome};
