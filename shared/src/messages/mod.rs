//! Message types for the voice relay control plane
//!
//! - `pipe`: controller ↔ child frames carried over the named pipes
//! - `control`: pool ↔ controller HTTP request and response bodies

pub mod control;
pub mod pipe;

pub use control::{left_key, told_key, ChildFlags, InfoReport, JoinRequest};
pub use pipe::{commands, Command, Message, NOBODY_SPEAKING};
