//! Liveness status of one supervised child

use serde::Serialize;
use std::fmt;

/// Ordered liveness status; a higher value means healthier
///
/// The gap at 3 is part of the ordering contract: everything below
/// [`ProcessStatus::Starting`] triggers a restart.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum ProcessStatus {
    /// Not running
    Stopped = 0,
    /// Being killed
    Stopping = 1,
    /// Did not answer the last check
    Failing = 2,
    /// Spawned, not yet confirmed alive
    Starting = 4,
    /// Alive and answered the last check
    Active = 5,
}

impl ProcessStatus {
    /// Move up to `target`, never down
    pub fn raise(self, target: ProcessStatus) -> ProcessStatus {
        self.max(target)
    }

    /// Move down to `target`, never up
    pub fn lower(self, target: ProcessStatus) -> ProcessStatus {
        self.min(target)
    }

    /// Statuses below `Starting` need a restart
    pub fn needs_restart(self) -> bool {
        self < ProcessStatus::Starting
    }

    pub fn as_str(self) -> &'static str {
        match self {
            ProcessStatus::Stopped => "stopped",
            ProcessStatus::Stopping => "stopping",
            ProcessStatus::Failing => "failing",
            ProcessStatus::Starting => "starting",
            ProcessStatus::Active => "active",
        }
    }
}

impl Default for ProcessStatus {
    fn default() -> Self {
        ProcessStatus::Stopped
    }
}

impl fmt::Display for ProcessStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}
