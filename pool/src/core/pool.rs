//! Container Pool Orchestrator
//!
//! Tracks the running instances and routes channel joins to them. Selecting
//! an instance and reserving it for a channel happen under one routing lock,
//! so concurrent joins never share an idle instance and joins for the same
//! channel land on the same one. The downstream HTTP call runs outside the
//! lock; a failed call releases the reservation.

use futures_util::future::join_all;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::{watch, Mutex, RwLock};

use shared::{logging, process_debug, process_error, process_info, process_warn, JoinRequest, ProcessId};

use super::instance::ContainerInstance;
use crate::error::{PoolError, PoolResult};
use crate::traits::{ContainerRuntime, InstanceClient};

/// Longest a leave waits for an in-flight join of the same channel
pub const JOIN_SETTLE_TIMEOUT: Duration = Duration::from_secs(15);

pub const DEFAULT_IMAGE: &str = "bot-container";
pub const DEFAULT_FIRST_PORT: u16 = 5500;
pub const DEFAULT_INTERNAL_PORT: u16 = 8000;

/// Where containers come from and how they are reached
#[derive(Debug, Clone)]
pub struct PoolConfig {
    /// Image every instance is started from
    pub image: String,
    /// Lowest host port handed to a spawned instance
    pub first_port: u16,
    /// Control port inside the container
    pub internal_port: u16,
    /// Host address spawned instances are reached on
    pub spawn_address: String,
}

impl Default for PoolConfig {
    fn default() -> Self {
        Self {
            image: DEFAULT_IMAGE.to_string(),
            first_port: DEFAULT_FIRST_PORT,
            internal_port: DEFAULT_INTERNAL_PORT,
            spawn_address: "127.0.0.1".to_string(),
        }
    }
}

impl PoolConfig {
    pub fn with_image(mut self, image: impl Into<String>) -> Self {
        self.image = image.into();
        self
    }

    pub fn with_first_port(mut self, first_port: u16) -> Self {
        self.first_port = first_port;
        self
    }

    pub fn with_internal_port(mut self, internal_port: u16) -> Self {
        self.internal_port = internal_port;
        self
    }

    pub fn with_spawn_address(mut self, spawn_address: impl Into<String>) -> Self {
        self.spawn_address = spawn_address.into();
        self
    }
}

/// Result of routing a join
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RouteOutcome {
    /// The instance was told to join
    Joined(ContainerInstance),
    /// An instance already serves (or is joining) the channel
    AlreadyAssigned(ContainerInstance),
}

impl RouteOutcome {
    pub fn instance(&self) -> &ContainerInstance {
        match self {
            RouteOutcome::Joined(instance) | RouteOutcome::AlreadyAssigned(instance) => instance,
        }
    }
}

pub struct ContainerPool {
    runtime: Arc<dyn ContainerRuntime>,
    client: Arc<dyn InstanceClient>,
    config: PoolConfig,
    instances: RwLock<Vec<ContainerInstance>>,
    /// Held for selection, spawning and reservation; never across a join call
    routing: Mutex<()>,
    next_port: Mutex<u16>,
    /// Bumped whenever an in-flight join settles
    joins_settled: watch::Sender<u64>,
}

impl ContainerPool {
    pub fn new(runtime: Arc<dyn ContainerRuntime>, client: Arc<dyn InstanceClient>, config: PoolConfig) -> Self {
        let next_port = Mutex::new(config.first_port);
        let (joins_settled, _) = watch::channel(0);
        Self {
            runtime,
            client,
            config,
            instances: RwLock::new(Vec::new()),
            routing: Mutex::new(()),
            next_port,
            joins_settled,
        }
    }

    pub fn config(&self) -> &PoolConfig {
        &self.config
    }

    /// Track already running containers, then ask each where it is
    pub async fn bootstrap(&self) -> PoolResult<usize> {
        let discovered = self.discover().await?;
        self.refresh_statuses().await;
        Ok(discovered)
    }

    /// Track running containers of the configured image not tracked yet
    ///
    /// # Returns
    /// How many instances were added
    pub async fn discover(&self) -> PoolResult<usize> {
        let running = self.runtime.list_running(&self.config.image).await?;
        let mut instances = self.instances.write().await;
        let mut added = 0;

        for container in running {
            if instances.iter().any(|i| i.controller_port == container.host_port) {
                continue;
            }
            process_info!(
                ProcessId::current(),
                "Found running container {} at {}:{}",
                container.id,
                container.address,
                container.host_port
            );
            instances.push(
                ContainerInstance::new(container.host_port, container.address).with_container_id(container.id),
            );
            added += 1;
        }

        Ok(added)
    }

    /// Ask every instance where it is; unreachable instances keep their state
    pub async fn refresh_statuses(&self) {
        let snapshot = self.instances().await;
        let reports = join_all(snapshot.iter().map(|instance| self.client.info(instance))).await;

        let mut instances = self.instances.write().await;
        for (queried, report) in snapshot.iter().zip(reports) {
            let Some(instance) = instances
                .iter_mut()
                .find(|i| i.controller_port == queried.controller_port)
            else {
                continue;
            };

            match report {
                Ok(report) => instance.apply_reported_channel(&report.channel),
                Err(e) => {
                    process_warn!(ProcessId::current(), "No status from {}: {}", queried.label(), e);
                }
            }
        }
    }

    /// Any idle instance, or a freshly spawned one
    pub async fn get_idle_or_spawn(&self) -> Option<ContainerInstance> {
        let _routing = self.routing.lock().await;
        self.idle_or_spawn_locked().await
    }

    async fn idle_or_spawn_locked(&self) -> Option<ContainerInstance> {
        if let Some(idle) = self.instances.read().await.iter().find(|i| i.idle) {
            return Some(idle.clone());
        }

        let count = self.count().await;
        process_info!(
            ProcessId::current(),
            "Pool of {} has no idle containers, running a new one",
            count
        );
        match self.spawn().await {
            Ok(instance) => Some(instance),
            Err(e) => {
                logging::log_error(ProcessId::current(), "Running a container", &e);
                None
            }
        }
    }

    async fn spawn(&self) -> PoolResult<ContainerInstance> {
        let host_port = self.allocate_port().await;
        let id = self
            .runtime
            .run(&self.config.image, host_port, self.config.internal_port)
            .await?;

        let instance = ContainerInstance::new(host_port, self.config.spawn_address.clone()).with_container_id(id);
        process_info!(ProcessId::current(), "Started container at {}", instance.controller_url());
        self.instances.write().await.push(instance.clone());
        Ok(instance)
    }

    /// Next host port not used by a tracked instance
    async fn allocate_port(&self) -> u16 {
        let instances = self.instances.read().await;
        let mut next = self.next_port.lock().await;
        while instances.iter().any(|i| i.controller_port == *next) {
            *next = next.wrapping_add(1);
        }
        let port = *next;
        *next = next.wrapping_add(1);
        port
    }

    /// Send the channel to an instance, reusing the one already serving it
    pub async fn route_join(&self, guild_id: &str, channel_id: &str) -> PoolResult<RouteOutcome> {
        let reserved = {
            let _routing = self.routing.lock().await;

            if let Some(existing) = self.instance_for_channel(channel_id).await {
                process_debug!(
                    ProcessId::current(),
                    "{} already serves channel {}",
                    existing.label(),
                    channel_id
                );
                return Ok(RouteOutcome::AlreadyAssigned(existing));
            }

            let selected = self
                .idle_or_spawn_locked()
                .await
                .ok_or(PoolError::NoInstanceAvailable)?;
            self.update(selected.controller_port, |i| {
                i.assign(channel_id);
                i.joining = true;
            })
            .await
            .ok_or(PoolError::NoInstanceAvailable)?
        };

        let request = JoinRequest {
            guild: guild_id.to_string(),
            channel: channel_id.to_string(),
        };
        let result = self.client.join(&reserved, &request).await;
        let outcome = match result {
            Ok(_) => {
                process_info!(ProcessId::current(), "{} joined channel {}", reserved.label(), channel_id);
                let joined = self
                    .update(reserved.controller_port, |i| i.joining = false)
                    .await
                    .unwrap_or(reserved);
                Ok(RouteOutcome::Joined(joined))
            }
            Err(e) => {
                process_error!(
                    ProcessId::current(),
                    "{} could not join channel {}: {}",
                    reserved.label(),
                    channel_id,
                    e
                );
                self.update(reserved.controller_port, ContainerInstance::release).await;
                Err(e)
            }
        };
        self.joins_settled.send_modify(|settled| *settled = settled.wrapping_add(1));
        outcome
    }

    /// Tell the instance serving `channel_id` to leave and release it
    ///
    /// # Returns
    /// The released instance, or `None` when no instance served the channel
    pub async fn route_leave(&self, channel_id: &str) -> PoolResult<Option<ContainerInstance>> {
        let instance = loop {
            // Subscribe before looking, so a join settling in between is not missed
            let mut settled = self.joins_settled.subscribe();
            match self.instance_for_channel(channel_id).await {
                None => return Ok(None),
                Some(instance) if instance.joining => {
                    process_debug!(
                        ProcessId::current(),
                        "{} is still joining channel {}, waiting before leave",
                        instance.label(),
                        channel_id
                    );
                    match tokio::time::timeout(JOIN_SETTLE_TIMEOUT, settled.changed()).await {
                        Ok(Ok(())) => continue,
                        Ok(Err(_)) => return Ok(None),
                        // The join was abandoned without settling
                        Err(_) => break instance,
                    }
                }
                Some(instance) => break instance,
            }
        };

        self.client.leave(&instance).await?;
        let released = self
            .update(instance.controller_port, ContainerInstance::release)
            .await;
        process_info!(ProcessId::current(), "{} left channel {}", instance.label(), channel_id);
        Ok(released)
    }

    /// Kill every tracked container and stop tracking it
    pub async fn kill_all(&self) -> PoolResult<usize> {
        let _routing = self.routing.lock().await;
        let ids: Vec<String> = self
            .instances
            .read()
            .await
            .iter()
            .filter_map(|i| i.container_id.clone())
            .collect();

        let killed = ids.len();
        self.runtime.kill(ids).await?;
        self.instances.write().await.clear();
        process_info!(ProcessId::current(), "Killed {} containers", killed);
        Ok(killed)
    }

    /// Apply `change` to the instance on `port` and return its new state
    async fn update<F>(&self, port: u16, change: F) -> Option<ContainerInstance>
    where
        F: FnOnce(&mut ContainerInstance),
    {
        let mut instances = self.instances.write().await;
        let instance = instances.iter_mut().find(|i| i.controller_port == port)?;
        change(instance);
        Some(instance.clone())
    }

    pub async fn instances(&self) -> Vec<ContainerInstance> {
        self.instances.read().await.clone()
    }

    pub async fn instance_for_channel(&self, channel_id: &str) -> Option<ContainerInstance> {
        self.instances
            .read()
            .await
            .iter()
            .find(|i| i.is_assigned_to(channel_id))
            .cloned()
    }

    pub async fn count(&self) -> usize {
        self.instances.read().await.len()
    }

    pub async fn idle_count(&self) -> usize {
        self.instances.read().await.iter().filter(|i| i.idle).count()
    }

    pub async fn busy_count(&self) -> usize {
        self.instances.read().await.iter().filter(|i| !i.idle).count()
    }
}
