//! HTTP bodies of a controller's control surface
//!
//! Field names of per-child results are derived from the child names
//! (`told_dbot`, `vrelay_left`, ...), so they travel as ordered maps.

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

use crate::types::ChannelIdentity;

/// Per-child boolean results keyed by derived field name
pub type ChildFlags = BTreeMap<String, bool>;

/// Body of `POST /join`
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct JoinRequest {
    pub guild: String,
    pub channel: String,
}

impl JoinRequest {
    pub fn identity(&self) -> ChannelIdentity {
        ChannelIdentity::new(self.guild.clone(), self.channel.clone())
    }
}

impl From<&ChannelIdentity> for JoinRequest {
    fn from(identity: &ChannelIdentity) -> Self {
        Self {
            guild: identity.guild_id.clone(),
            channel: identity.channel_id.clone(),
        }
    }
}

/// Body of `GET /info`
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct InfoReport {
    pub error: bool,
    pub guild: String,
    pub channel: String,

    /// Explanation when the children disagree
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub text: Option<String>,

    /// Raw `info` payload reported by each child, keyed by child name
    #[serde(flatten)]
    pub children: BTreeMap<String, String>,
}

impl InfoReport {
    pub fn identity(&self) -> ChannelIdentity {
        ChannelIdentity::new(self.guild.clone(), self.channel.clone())
    }
}

/// `POST /join` result field for a child
pub fn told_key(child: &str) -> String {
    format!("told_{child}")
}

/// `POST /leave` result field for a child
pub fn left_key(child: &str) -> String {
    format!("{child}_left")
}
