//! Controller-specific error types

use thiserror::Error;

#[derive(Error, Debug)]
pub enum ControllerError {
    #[error("Failed to spawn {child}: {message}")]
    SpawnFailed { child: String, message: String },

    #[error("Pipe endpoint {path} unavailable: {source}")]
    PipeUnavailable {
        path: String,
        #[source]
        source: std::io::Error,
    },

    #[error("Configuration error: {field}")]
    ConfigurationError { field: String },

    #[error("I/O error: {0}")]
    IoError(#[from] std::io::Error),
}

impl ControllerError {
    pub fn spawn(child: impl Into<String>, message: impl Into<String>) -> Self {
        Self::SpawnFailed {
            child: child.into(),
            message: message.into(),
        }
    }

    pub fn config(field: impl Into<String>) -> Self {
        Self::ConfigurationError { field: field.into() }
    }
}

pub type ControllerResult<T> = Result<T, ControllerError>;
