//! Real process launcher
//!
//! Starts children with tokio, forwards their output and reports their exit.

use async_trait::async_trait;
use tokio::process::{Child, Command};

use shared::{process_debug, process_info, process_warn, ProcessId};

use super::output;
use crate::error::{ControllerError, ControllerResult};
use crate::traits::{LaunchRequest, LaunchedProcess, ProcessHooks, ProcessLauncher};

/// Launches children as OS processes
#[derive(Debug, Default, Clone)]
pub struct RealProcessLauncher;

impl RealProcessLauncher {
    pub fn new() -> Self {
        Self
    }
}

#[async_trait]
impl ProcessLauncher for RealProcessLauncher {
    async fn launch(&self, request: LaunchRequest) -> ControllerResult<LaunchedProcess> {
        process_info!(
            ProcessId::current(),
            "Spawning {} ({} {})",
            request.child,
            request.program,
            request.args.join(" ")
        );

        let mut cmd = Command::new(&request.program);
        cmd.args(&request.args).kill_on_drop(true);
        output::configure_child_stdio(&mut cmd);

        let mut child = cmd
            .spawn()
            .map_err(|e| ControllerError::spawn(&request.child, e.to_string()))?;
        output::spawn_output_forwarders(&mut child, &request.child);

        let (process, hooks) = LaunchedProcess::new(child.id());
        tokio::spawn(monitor(child, request.child, hooks));
        Ok(process)
    }
}

/// Wait for the child to exit, killing it first if asked to
async fn monitor(mut child: Child, child_name: String, hooks: ProcessHooks) {
    let ProcessHooks { mut kill_rx, exit_tx } = hooks;

    let status = tokio::select! {
        status = child.wait() => status,
        Ok(()) = &mut kill_rx => {
            process_debug!(ProcessId::current(), "Killing {}", child_name);
            if let Err(e) = child.start_kill() {
                process_warn!(ProcessId::current(), "Kill of {} failed: {}", child_name, e);
            }
            child.wait().await
        }
    };

    let code = match status {
        Ok(status) => status.code(),
        Err(e) => {
            process_warn!(ProcessId::current(), "Waiting for {} failed: {}", child_name, e);
            None
        }
    };

    // The supervisor may have dropped the handle already
    let _ = exit_tx.send(code);
}
