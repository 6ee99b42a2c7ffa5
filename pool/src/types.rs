//! Records exchanged with the container runtime and the channel store

use serde::{Deserialize, Serialize};

/// One running container as reported by the runtime
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RunningContainer {
    pub id: String,
    pub image: String,
    /// Host address the control port is published on
    pub address: String,
    pub host_port: u16,
}

/// A voice channel someone asked the relay to join
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ChannelRecord {
    pub id: String,
    pub guild: String,
    #[serde(default)]
    pub users_in_channel: Vec<String>,
}

impl ChannelRecord {
    pub fn new(id: impl Into<String>, guild: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            guild: guild.into(),
            users_in_channel: Vec::new(),
        }
    }
}
