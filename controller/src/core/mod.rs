//! Core supervision logic

pub mod control_channel;
pub mod status;
pub mod supervisor;

#[cfg(test)]
mod tests;

pub use control_channel::{relay_speaking, ControlChannel, SpeakingRelay, DEFAULT_LEAVE_TIMEOUT};
pub use status::ProcessStatus;
pub use supervisor::{ChildSpec, ProcessSupervisor, SupervisorConfig, DEFAULT_CHECK_PERIOD};
