//! Process Health Supervisor
//!
//! Keeps every supervised child alive. Each check pings all children
//! concurrently; a child that answers is raised toward `Active`, one that does
//! not is lowered toward `Failing` and, once below `Starting`, killed and
//! spawned again.

use futures_util::future::join_all;
use std::collections::BTreeMap;
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::{oneshot, Mutex, Notify};

use shared::{logging, process_debug, process_info, process_warn, ChildFlags, ProcessId};

use super::control_channel::ControlChannel;
use super::status::ProcessStatus;
use crate::pipe::DEFAULT_PING_TIMEOUT;
use crate::traits::{ExitCode, LaunchRequest, LaunchedProcess, ProcessLauncher};

pub const DEFAULT_CHECK_PERIOD: Duration = Duration::from_millis(8000);

/// Supervisor tuning
#[derive(Debug, Clone)]
pub struct SupervisorConfig {
    /// Pause between the end of one check and the start of the next
    pub period: Duration,
    pub ping_timeout: Duration,
    /// Consecutive failed checks before a child's status is lowered
    pub failure_threshold: u32,
    /// When off, children are expected to be started by someone else
    pub spawn_enabled: bool,
}

impl Default for SupervisorConfig {
    fn default() -> Self {
        Self {
            period: DEFAULT_CHECK_PERIOD,
            ping_timeout: DEFAULT_PING_TIMEOUT,
            failure_threshold: 1,
            spawn_enabled: true,
        }
    }
}

impl SupervisorConfig {
    pub fn with_period(mut self, period: Duration) -> Self {
        self.period = period;
        self
    }

    pub fn with_ping_timeout(mut self, ping_timeout: Duration) -> Self {
        self.ping_timeout = ping_timeout;
        self
    }

    pub fn with_failure_threshold(mut self, failure_threshold: u32) -> Self {
        self.failure_threshold = failure_threshold.max(1);
        self
    }

    pub fn with_spawn_enabled(mut self, spawn_enabled: bool) -> Self {
        self.spawn_enabled = spawn_enabled;
        self
    }
}

/// How to start one child
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ChildSpec {
    pub name: String,
    pub program: String,
    /// Passed after the pipe prefix and before any target channel
    pub extra_args: Vec<String>,
}

impl ChildSpec {
    pub fn new(name: impl Into<String>, program: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            program: program.into(),
            extra_args: Vec::new(),
        }
    }

    pub fn with_extra_args(mut self, extra_args: Vec<String>) -> Self {
        self.extra_args = extra_args;
        self
    }
}

#[derive(Debug, Default)]
struct SlotState {
    status: ProcessStatus,
    process: Option<LaunchedProcess>,
    /// Bumped on every spawn, so the exit of a replaced process is ignored
    generation: u64,
    consecutive_failures: u32,
}

struct Slot {
    spec: ChildSpec,
    channel: Arc<ControlChannel>,
    state: Arc<Mutex<SlotState>>,
}

/// Keeps a fixed set of children alive
pub struct ProcessSupervisor {
    slots: Vec<Slot>,
    launcher: Arc<dyn ProcessLauncher>,
    config: SupervisorConfig,
    running: AtomicBool,
    /// Identifies the current loop, so a loop outliving `stop` cannot continue
    epoch: AtomicU64,
    stop_signal: Notify,
}

impl ProcessSupervisor {
    pub fn new(launcher: Arc<dyn ProcessLauncher>, config: SupervisorConfig) -> Self {
        Self {
            slots: Vec::new(),
            launcher,
            config,
            running: AtomicBool::new(false),
            epoch: AtomicU64::new(0),
            stop_signal: Notify::new(),
        }
    }

    /// Supervise the child described by `spec`, talking to it over `channel`
    pub fn with_child(mut self, spec: ChildSpec, channel: Arc<ControlChannel>) -> Self {
        self.slots.push(Slot {
            spec,
            channel,
            state: Arc::new(Mutex::new(SlotState::default())),
        });
        self
    }

    pub fn config(&self) -> &SupervisorConfig {
        &self.config
    }

    pub fn channels(&self) -> Vec<Arc<ControlChannel>> {
        self.slots.iter().map(|slot| slot.channel.clone()).collect()
    }

    pub fn is_running(&self) -> bool {
        self.running.load(Ordering::SeqCst)
    }

    /// Start the check loop; the first check runs immediately
    ///
    /// Calling `start` while the loop runs does nothing.
    pub fn start(self: &Arc<Self>) {
        if self.running.swap(true, Ordering::SeqCst) {
            return;
        }
        let epoch = self.epoch.fetch_add(1, Ordering::SeqCst) + 1;
        process_info!(ProcessId::current(), "Keeping {} children alive", self.slots.len());
        tokio::spawn(self.clone().run(epoch));
    }

    /// Prevent further checks; a check in progress still completes
    pub fn stop(&self) {
        if self.running.swap(false, Ordering::SeqCst) {
            process_info!(ProcessId::current(), "Stopping keep alive");
        }
        self.stop_signal.notify_waiters();
    }

    /// Stop the loop and forcefully kill every child
    pub async fn kill_all(&self) {
        self.stop();
        for slot in &self.slots {
            let mut state = slot.state.lock().await;
            if let Some(mut process) = state.process.take() {
                state.status = ProcessStatus::Stopping;
                process.kill();
                process_info!(ProcessId::current(), "Killed {}", slot.spec.name);
            }
        }
    }

    fn is_current(&self, epoch: u64) -> bool {
        self.running.load(Ordering::SeqCst) && self.epoch.load(Ordering::SeqCst) == epoch
    }

    async fn run(self: Arc<Self>, epoch: u64) {
        while self.is_current(epoch) {
            self.check_once().await;
            if !self.is_current(epoch) {
                break;
            }
            tokio::select! {
                _ = tokio::time::sleep(self.config.period) => {}
                _ = self.stop_signal.notified() => {}
            }
        }
        process_debug!(ProcessId::current(), "Keep alive loop {} ended", epoch);
    }

    /// One check of every child, concurrently
    pub async fn check_once(&self) {
        join_all(self.slots.iter().map(|slot| self.check_slot(slot))).await;
    }

    async fn check_slot(&self, slot: &Slot) {
        let healthy = slot.channel.ping_with_timeout(self.config.ping_timeout).await;
        let mut state = slot.state.lock().await;

        if healthy {
            state.consecutive_failures = 0;
            let previous = state.status;
            state.status = previous.raise(ProcessStatus::Active);
            if previous != state.status {
                process_info!(ProcessId::current(), "{} is {}", slot.spec.name, state.status);
            }
            return;
        }

        state.consecutive_failures += 1;
        if state.consecutive_failures < self.config.failure_threshold {
            process_warn!(
                ProcessId::current(),
                "{} missed a check ({}/{})",
                slot.spec.name,
                state.consecutive_failures,
                self.config.failure_threshold
            );
            return;
        }

        state.status = state.status.lower(ProcessStatus::Failing);
        process_warn!(
            ProcessId::current(),
            "{} failed to respond -> {}",
            slot.spec.name,
            state.status
        );

        if state.status.needs_restart() {
            self.restart(slot, &mut state).await;
        }
    }

    async fn restart(&self, slot: &Slot, state: &mut SlotState) {
        if !self.config.spawn_enabled {
            process_debug!(ProcessId::current(), "Spawning disabled, not restarting {}", slot.spec.name);
            return;
        }

        if let Some(mut process) = state.process.take() {
            state.status = ProcessStatus::Stopping;
            process.kill();
        }
        self.spawn(slot, state).await;
    }

    async fn spawn(&self, slot: &Slot, state: &mut SlotState) {
        let request = LaunchRequest {
            child: slot.spec.name.clone(),
            program: slot.spec.program.clone(),
            args: spawn_args(slot).await,
        };

        state.generation += 1;
        state.status = ProcessStatus::Starting;
        state.consecutive_failures = 0;

        match self.launcher.launch(request).await {
            Ok(mut process) => {
                if let Some(exit) = process.take_exit() {
                    tokio::spawn(watch_exit(
                        slot.spec.name.clone(),
                        slot.state.clone(),
                        state.generation,
                        exit,
                    ));
                }
                state.process = Some(process);
            }
            Err(e) => {
                logging::log_error(ProcessId::current(), &format!("Spawning {}", slot.spec.name), &e);
                state.status = ProcessStatus::Stopped;
            }
        }
    }

    /// Current status of every child, by name
    pub async fn statuses(&self) -> BTreeMap<String, ProcessStatus> {
        let mut statuses = BTreeMap::new();
        for slot in &self.slots {
            statuses.insert(slot.spec.name.clone(), slot.state.lock().await.status);
        }
        statuses
    }

    pub async fn status_of(&self, name: &str) -> Option<ProcessStatus> {
        let slot = self.slots.iter().find(|slot| slot.spec.name == name)?;
        let status = slot.state.lock().await.status;
        Some(status)
    }

    /// Ping every child concurrently without touching its status
    pub async fn ping_all(&self) -> ChildFlags {
        let results = join_all(
            self.slots
                .iter()
                .map(|slot| slot.channel.ping_with_timeout(self.config.ping_timeout)),
        )
        .await;

        self.slots
            .iter()
            .zip(results)
            .map(|(slot, healthy)| (slot.spec.name.clone(), healthy))
            .collect()
    }
}

/// Pipe prefix, extra arguments, then the target channel if there is one
async fn spawn_args(slot: &Slot) -> Vec<String> {
    let mut args = vec![slot.channel.endpoint().prefix().to_string()];
    args.extend(slot.spec.extra_args.iter().cloned());
    if let Some(target) = slot.channel.target().await {
        args.push(target.guild_id);
        args.push(target.channel_id);
    }
    args
}

async fn watch_exit(
    name: String,
    state: Arc<Mutex<SlotState>>,
    generation: u64,
    exit: oneshot::Receiver<ExitCode>,
) {
    // Sender dropped: the launcher lost track of the process
    let Ok(code) = exit.await else {
        return;
    };

    let code = code.map_or_else(|| "none".to_string(), |code| code.to_string());
    let mut state = state.lock().await;
    if state.generation == generation {
        state.status = ProcessStatus::Stopped;
        state.process = None;
        process_info!(ProcessId::current(), "{} process exited with code {}", name, code);
    } else {
        process_debug!(ProcessId::current(), "Replaced {} process exited with code {}", name, code);
    }
}
