//! Trait definitions with mockall annotations for testing
//!
//! The supervisor only talks to the operating system through these traits, so
//! the restart state machine can be driven by mocks.

use tokio::sync::oneshot;

use crate::error::ControllerResult;

/// What to start for one supervised child
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LaunchRequest {
    /// Child name, used for log lines and error context
    pub child: String,
    pub program: String,
    pub args: Vec<String>,
}

/// Exit code reported when a process ends; `None` if it was killed by a signal
pub type ExitCode = Option<i32>;

/// Handle to a started process
///
/// The launcher keeps the matching [`ProcessHooks`] and answers kill requests
/// and exit notifications through them.
#[derive(Debug)]
pub struct LaunchedProcess {
    pub pid: Option<u32>,
    kill_tx: Option<oneshot::Sender<()>>,
    exit_rx: Option<oneshot::Receiver<ExitCode>>,
}

/// Launcher side of a [`LaunchedProcess`]
#[derive(Debug)]
pub struct ProcessHooks {
    pub kill_rx: oneshot::Receiver<()>,
    pub exit_tx: oneshot::Sender<ExitCode>,
}

impl LaunchedProcess {
    pub fn new(pid: Option<u32>) -> (Self, ProcessHooks) {
        let (kill_tx, kill_rx) = oneshot::channel();
        let (exit_tx, exit_rx) = oneshot::channel();
        let process = Self {
            pid,
            kill_tx: Some(kill_tx),
            exit_rx: Some(exit_rx),
        };
        (process, ProcessHooks { kill_rx, exit_tx })
    }

    /// Request a forceful kill; `false` if already requested or already gone
    pub fn kill(&mut self) -> bool {
        match self.kill_tx.take() {
            Some(tx) => tx.send(()).is_ok(),
            None => false,
        }
    }

    /// Exit notification, available once
    pub fn take_exit(&mut self) -> Option<oneshot::Receiver<ExitCode>> {
        self.exit_rx.take()
    }
}

/// Process launching abstraction for the supervisor
#[mockall::automock]
#[async_trait::async_trait]
pub trait ProcessLauncher: Send + Sync {
    /// Start a process and forward its output to the log
    ///
    /// # Returns
    /// A handle that can kill the process and reports its exit code
    async fn launch(&self, request: LaunchRequest) -> ControllerResult<LaunchedProcess>;
}
