//! Trait definitions with mockall annotations for testing
//!
//! The pool reaches containers, their controllers and the channel store only
//! through these traits.

use shared::{ChildFlags, InfoReport, JoinRequest};

use crate::core::ContainerInstance;
use crate::error::PoolResult;
use crate::types::{ChannelRecord, RunningContainer};

/// Container runtime abstraction
#[mockall::automock]
#[async_trait::async_trait]
pub trait ContainerRuntime: Send + Sync {
    /// Running containers started from `image`
    async fn list_running(&self, image: &str) -> PoolResult<Vec<RunningContainer>>;

    /// Start `image` detached with `host_port` published to `internal_port`
    ///
    /// # Returns
    /// The new container's id
    async fn run(&self, image: &str, host_port: u16, internal_port: u16) -> PoolResult<String>;

    /// Forcefully stop the given containers
    async fn kill(&self, ids: Vec<String>) -> PoolResult<()>;
}

/// HTTP client for one instance's control surface
#[mockall::automock]
#[async_trait::async_trait]
pub trait InstanceClient: Send + Sync {
    /// `POST /join`; an error unless both children were told
    async fn join(&self, instance: &ContainerInstance, request: &JoinRequest) -> PoolResult<ChildFlags>;

    /// `POST /leave`; an error unless both children confirmed
    async fn leave(&self, instance: &ContainerInstance) -> PoolResult<ChildFlags>;

    /// `GET /info`, including reports where the children disagree
    async fn info(&self, instance: &ContainerInstance) -> PoolResult<InfoReport>;
}

/// Channel membership store
#[mockall::automock]
#[async_trait::async_trait]
pub trait ChannelStore: Send + Sync {
    async fn get(&self, id: &str) -> PoolResult<Option<ChannelRecord>>;

    /// Insert or replace a channel
    async fn put(&self, id: &str, guild: &str, users: Vec<String>) -> PoolResult<()>;

    async fn add_user(&self, id: &str, user: &str) -> PoolResult<()>;

    async fn remove_user(&self, id: &str, user: &str) -> PoolResult<()>;

    /// `true` if the channel was created
    async fn create_if_missing(&self, id: &str, guild: &str) -> PoolResult<bool>;
}
