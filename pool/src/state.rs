//! Pool state shared with the HTTP handlers

use std::sync::Arc;

use crate::core::ContainerPool;
use crate::traits::ChannelStore;

pub struct PoolContext {
    pub pool: Arc<ContainerPool>,
    pub store: Arc<dyn ChannelStore>,
    /// Seed missing channels and fake users on `/channel_joined`
    pub debug: bool,
}

impl PoolContext {
    pub fn new(pool: Arc<ContainerPool>, store: Arc<dyn ChannelStore>) -> Self {
        Self {
            pool,
            store,
            debug: false,
        }
    }

    pub fn with_debug(mut self, debug: bool) -> Self {
        self.debug = debug;
        self
    }
}
