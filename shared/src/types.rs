//! Core shared types and identifiers

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use std::sync::OnceLock;

use crate::errors::SharedError;

/// Global process ID singleton - set once at startup
static PROCESS_ID: OnceLock<ProcessId> = OnceLock::new();

/// Reported before any `init_*` call, e.g. from library unit tests
static UNSET_PROCESS_ID: ProcessId = ProcessId::Unset;

/// Process identifier for any component in the system
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ProcessId {
    /// Per-container controller supervising the bot and relay children
    Controller,
    /// Container pool manager
    Pool,
    /// Protocol stand-in for a real child process
    StubChild,
    /// No process identity initialised yet
    Unset,
}

impl ProcessId {
    /// Initialize the global process ID for a controller
    pub fn init_controller() -> &'static ProcessId {
        PROCESS_ID.get_or_init(|| ProcessId::Controller)
    }

    /// Initialize the global process ID for the pool manager
    pub fn init_pool() -> &'static ProcessId {
        PROCESS_ID.get_or_init(|| ProcessId::Pool)
    }

    /// Initialize the global process ID for a stub child
    pub fn init_stub_child() -> &'static ProcessId {
        PROCESS_ID.get_or_init(|| ProcessId::StubChild)
    }

    /// Get the global process ID, `Unset` when no `init_*` ran
    pub fn current() -> &'static ProcessId {
        PROCESS_ID.get().unwrap_or(&UNSET_PROCESS_ID)
    }
}

impl fmt::Display for ProcessId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ProcessId::Controller => write!(f, "controller"),
            ProcessId::Pool => write!(f, "pool"),
            ProcessId::StubChild => write!(f, "stub_child"),
            ProcessId::Unset => write!(f, "unset"),
        }
    }
}

/// Sentinel id meaning "not joined"
pub const UNSET_ID: &str = "-1";

/// The `(guild, channel)` pair naming a destination voice channel
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct ChannelIdentity {
    pub guild_id: String,
    pub channel_id: String,
}

impl ChannelIdentity {
    pub fn new(guild_id: impl Into<String>, channel_id: impl Into<String>) -> Self {
        Self {
            guild_id: guild_id.into(),
            channel_id: channel_id.into(),
        }
    }

    /// The `("-1", "-1")` identity of a child that is not in any channel
    pub fn sentinel() -> Self {
        Self::new(UNSET_ID, UNSET_ID)
    }

    pub fn is_sentinel(&self) -> bool {
        self.guild_id == UNSET_ID && self.channel_id == UNSET_ID
    }
}

impl Default for ChannelIdentity {
    fn default() -> Self {
        Self::sentinel()
    }
}

impl fmt::Display for ChannelIdentity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{},{}", self.guild_id, self.channel_id)
    }
}

impl FromStr for ChannelIdentity {
    type Err = SharedError;

    /// Parses the `"<guildId>,<channelId>"` payload form
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let invalid = || SharedError::InvalidIdentity { input: s.to_string() };

        let (guild, channel) = s.split_once(',').ok_or_else(invalid)?;
        let (guild, channel) = (guild.trim(), channel.trim());
        if guild.is_empty() || channel.is_empty() || channel.contains(',') {
            return Err(invalid());
        }

        Ok(Self::new(guild, channel))
    }
}
