//! Service implementations
//!
//! Real implementations of the pool's service traits.

pub mod channel_store;
pub mod docker;
pub mod instance_client;

#[cfg(test)]
mod tests;

pub use channel_store::InMemoryChannelStore;
pub use docker::DockerRuntime;
pub use instance_client::HttpInstanceClient;
