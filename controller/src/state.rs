//! Controller state shared with the HTTP handlers

use std::sync::Arc;

use crate::core::{ControlChannel, ProcessSupervisor};

/// Everything a request handler may touch
pub struct ControllerContext {
    pub supervisor: Arc<ProcessSupervisor>,
    /// Supervised channels in configuration order
    pub channels: Vec<Arc<ControlChannel>>,
}

impl ControllerContext {
    pub fn new(supervisor: Arc<ProcessSupervisor>) -> Self {
        let channels = supervisor.channels();
        Self { supervisor, channels }
    }

    pub fn channel(&self, name: &str) -> Option<&Arc<ControlChannel>> {
        self.channels.iter().find(|channel| channel.name() == name)
    }
}
