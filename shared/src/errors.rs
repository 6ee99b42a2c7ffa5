//! Shared error types for the voice relay control plane

use thiserror::Error;

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum SharedError {
    #[error("Malformed frame: {reason}")]
    MalformedFrame { reason: String },

    #[error("Invalid channel identity: {input}")]
    InvalidIdentity { input: String },

    #[error("Invalid command name: {command:?}")]
    InvalidCommand { command: String },
}

impl SharedError {
    pub fn malformed(reason: impl Into<String>) -> Self {
        Self::MalformedFrame { reason: reason.into() }
    }
}

pub type SharedResult<T> = Result<T, SharedError>;
