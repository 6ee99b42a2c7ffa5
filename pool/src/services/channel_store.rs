//! In-memory channel store

use async_trait::async_trait;
use std::collections::HashMap;
use tokio::sync::RwLock;

use crate::error::{PoolError, PoolResult};
use crate::traits::ChannelStore;
use crate::types::ChannelRecord;

/// Channel records kept for the life of the process
#[derive(Debug, Default)]
pub struct InMemoryChannelStore {
    channels: RwLock<HashMap<String, ChannelRecord>>,
}

impl InMemoryChannelStore {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl ChannelStore for InMemoryChannelStore {
    async fn get(&self, id: &str) -> PoolResult<Option<ChannelRecord>> {
        Ok(self.channels.read().await.get(id).cloned())
    }

    async fn put(&self, id: &str, guild: &str, users: Vec<String>) -> PoolResult<()> {
        let record = ChannelRecord {
            id: id.to_string(),
            guild: guild.to_string(),
            users_in_channel: users,
        };
        self.channels.write().await.insert(id.to_string(), record);
        Ok(())
    }

    async fn add_user(&self, id: &str, user: &str) -> PoolResult<()> {
        let mut channels = self.channels.write().await;
        let record = channels
            .get_mut(id)
            .ok_or_else(|| PoolError::ChannelNotFound { id: id.to_string() })?;
        if !record.users_in_channel.iter().any(|u| u == user) {
            record.users_in_channel.push(user.to_string());
        }
        Ok(())
    }

    async fn remove_user(&self, id: &str, user: &str) -> PoolResult<()> {
        let mut channels = self.channels.write().await;
        let record = channels
            .get_mut(id)
            .ok_or_else(|| PoolError::ChannelNotFound { id: id.to_string() })?;
        record.users_in_channel.retain(|u| u != user);
        Ok(())
    }

    async fn create_if_missing(&self, id: &str, guild: &str) -> PoolResult<bool> {
        let mut channels = self.channels.write().await;
        if channels.contains_key(id) {
            return Ok(false);
        }
        channels.insert(id.to_string(), ChannelRecord::new(id, guild));
        Ok(true)
    }
}
