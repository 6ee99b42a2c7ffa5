//! Pool-specific error types

use thiserror::Error;

#[derive(Error, Debug)]
pub enum PoolError {
    #[error("Could not get an idle bot container or run a new one")]
    NoInstanceAvailable,

    #[error("Failed to run a container on host port {host_port}: {message}")]
    SpawnFailed { host_port: u16, message: String },

    #[error("Container runtime command `{command}` failed: {message}")]
    Runtime { command: String, message: String },

    #[error("{call} on {instance} failed: {message}")]
    Downstream {
        instance: String,
        call: String,
        /// HTTP status, when the instance answered at all
        status: Option<u16>,
        message: String,
    },

    #[error("Channel {id} is not in the channel store")]
    ChannelNotFound { id: String },

    #[error("Configuration error: {field}")]
    ConfigurationError { field: String },

    #[error("I/O error: {0}")]
    IoError(#[from] std::io::Error),
}

impl PoolError {
    pub fn downstream(
        instance: impl Into<String>,
        call: impl Into<String>,
        status: Option<u16>,
        message: impl Into<String>,
    ) -> Self {
        Self::Downstream {
            instance: instance.into(),
            call: call.into(),
            status,
            message: message.into(),
        }
    }

    pub fn runtime(command: impl Into<String>, message: impl Into<String>) -> Self {
        Self::Runtime {
            command: command.into(),
            message: message.into(),
        }
    }

    pub fn config(field: impl Into<String>) -> Self {
        Self::ConfigurationError { field: field.into() }
    }
}

pub type PoolResult<T> = Result<T, PoolError>;
