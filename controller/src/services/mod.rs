//! Service implementations
//!
//! Real implementations of the controller's service traits.

pub mod launcher;
pub mod output;

#[cfg(test)]
mod tests;

pub use launcher::RealProcessLauncher;
