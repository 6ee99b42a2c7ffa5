//! Pool library for voice relay containers
//!
//! Tracks the running instance containers, sends each voice channel to an
//! idle instance (running a new container when none is idle) and exposes the
//! routing over HTTP.

pub mod core;
pub mod error;
pub mod services;
pub mod state;
pub mod traits;
pub mod types;
pub mod web;

// Re-export commonly used types
pub use core::{ContainerInstance, ContainerPool, PoolConfig, RouteOutcome};
pub use error::{PoolError, PoolResult};
pub use state::PoolContext;
pub use traits::{ChannelStore, ContainerRuntime, InstanceClient};
pub use types::{ChannelRecord, RunningContainer};
