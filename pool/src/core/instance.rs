//! One tracked container and its controller address

use serde::Serialize;

use shared::UNSET_ID;

/// A container running one controller and its two children
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ContainerInstance {
    /// Host port published to the controller's control surface
    pub controller_port: u16,
    pub address: String,
    pub idle: bool,
    /// Channel the instance serves or is reserved for
    pub assigned_channel: Option<String>,
    /// A `/join` for the assigned channel is still in flight
    pub joining: bool,
    pub container_id: Option<String>,
}

impl ContainerInstance {
    pub fn new(controller_port: u16, address: impl Into<String>) -> Self {
        Self {
            controller_port,
            address: address.into(),
            idle: true,
            assigned_channel: None,
            joining: false,
            container_id: None,
        }
    }

    pub fn with_container_id(mut self, container_id: impl Into<String>) -> Self {
        self.container_id = Some(container_id.into());
        self
    }

    pub fn controller_url(&self) -> String {
        format!("http://{}:{}", self.address, self.controller_port)
    }

    /// Short name used in error context, e.g. `controller:5501`
    pub fn label(&self) -> String {
        format!("controller:{}", self.controller_port)
    }

    pub fn is_assigned_to(&self, channel_id: &str) -> bool {
        self.assigned_channel.as_deref() == Some(channel_id)
    }

    /// Mark busy for `channel_id`
    pub fn assign(&mut self, channel_id: &str) {
        self.idle = false;
        self.assigned_channel = Some(channel_id.to_string());
    }

    /// Back to idle with no channel
    pub fn release(&mut self) {
        self.idle = true;
        self.assigned_channel = None;
        self.joining = false;
    }

    /// Apply the channel an instance reports; the unset id means idle
    pub fn apply_reported_channel(&mut self, channel_id: &str) {
        if channel_id == UNSET_ID || channel_id.is_empty() {
            self.release();
        } else {
            self.assign(channel_id);
        }
    }
}
