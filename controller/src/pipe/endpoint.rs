//! Pipe endpoint naming and listener setup

use std::path::{Path, PathBuf};
use tokio::net::UnixListener;

use crate::error::{ControllerError, ControllerResult};

/// The pair of pipe paths shared with exactly one child
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct PipeEndpoint {
    prefix: String,
}

impl PipeEndpoint {
    pub fn new(prefix: impl Into<String>) -> Self {
        Self { prefix: prefix.into() }
    }

    /// Endpoint for `name` inside `dir`
    pub fn in_dir(dir: &Path, name: &str) -> Self {
        Self::new(dir.join(name).to_string_lossy().into_owned())
    }

    /// Prefix handed to the child on its command line
    pub fn prefix(&self) -> &str {
        &self.prefix
    }

    /// Short name for log lines
    pub fn label(&self) -> &str {
        Path::new(&self.prefix)
            .file_name()
            .and_then(|name| name.to_str())
            .unwrap_or(&self.prefix)
    }

    /// Child → controller
    pub fn inbound_path(&self) -> PathBuf {
        PathBuf::from(format!("{}_server", self.prefix))
    }

    /// Controller → child
    pub fn outbound_path(&self) -> PathBuf {
        PathBuf::from(format!("{}_client", self.prefix))
    }

    /// Bind a listener at `path`, replacing a stale socket file
    pub(crate) fn bind(path: &Path) -> ControllerResult<UnixListener> {
        let unavailable = |source| ControllerError::PipeUnavailable {
            path: path.display().to_string(),
            source,
        };

        if path.exists() {
            std::fs::remove_file(path).map_err(unavailable)?;
        }
        UnixListener::bind(path).map_err(unavailable)
    }

    /// Remove both socket files, ignoring ones already gone
    pub(crate) fn remove_files(&self) {
        for path in [self.inbound_path(), self.outbound_path()] {
            let _ = std::fs::remove_file(path);
        }
    }
}
