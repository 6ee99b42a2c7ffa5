//! Controller library for one voice relay instance
//!
//! Supervises the bot and relay children of a single instance: talks to each
//! over a pair of named pipes, restarts whichever stops answering pings and
//! exposes the pair to the pool over a small HTTP control surface.

pub mod core;
pub mod error;
pub mod pipe;
pub mod services;
pub mod state;
pub mod traits;
pub mod web;

// Re-export commonly used types
pub use core::{ChildSpec, ControlChannel, ProcessStatus, ProcessSupervisor, SupervisorConfig};
pub use error::{ControllerError, ControllerResult};
pub use state::ControllerContext;
pub use traits::{LaunchRequest, LaunchedProcess, ProcessLauncher};
