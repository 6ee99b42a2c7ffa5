//! Shared types for the voice relay control plane
//!
//! Contains the pipe wire protocol spoken between a controller and its child
//! processes, the HTTP control-surface bodies exchanged between the pool and
//! each controller, and the logging helpers every process uses.

pub mod errors;
pub mod logging;
pub mod messages;
pub mod types;

pub use errors::*;
pub use types::*;

pub use messages::{
    // Controller ↔ child pipe protocol
    commands, Command, Message, NOBODY_SPEAKING,

    // Pool ↔ controller HTTP bodies
    left_key, told_key, ChildFlags, InfoReport, JoinRequest,
};
