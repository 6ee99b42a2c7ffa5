//! Control Channel
//!
//! A pipe transport plus the channel identity its child is believed to be in.
//! The identity is updated optimistically on `join` and reset whenever the
//! child reports `left`.

use std::sync::Arc;
use std::time::Duration;
use tokio::sync::{broadcast, RwLock};
use tokio::task::JoinHandle;

use shared::{commands, process_debug, process_info, process_warn, ChannelIdentity, Command, Message, ProcessId};

use crate::error::ControllerResult;
use crate::pipe::{wait, PipeEndpoint, PipeTransport, TransportEvent, DEFAULT_PING_TIMEOUT, DEFAULT_REPLY_TIMEOUT};

pub const DEFAULT_LEAVE_TIMEOUT: Duration = Duration::from_millis(3000);

/// Command channel to one named child
pub struct ControlChannel {
    name: String,
    transport: PipeTransport,
    identity: Arc<RwLock<ChannelIdentity>>,
    watcher: JoinHandle<()>,
}

impl ControlChannel {
    /// Listen on `endpoint` for the child called `name`
    pub async fn open(name: impl Into<String>, endpoint: PipeEndpoint) -> ControllerResult<Self> {
        let transport = PipeTransport::listen(endpoint).await?;
        Ok(Self::new(name, transport))
    }

    pub fn new(name: impl Into<String>, transport: PipeTransport) -> Self {
        let name = name.into();
        let identity = Arc::new(RwLock::new(ChannelIdentity::sentinel()));
        let watcher = tokio::spawn(watch_replies(
            name.clone(),
            transport.subscribe(),
            identity.clone(),
        ));

        Self {
            name,
            transport,
            identity,
            watcher,
        }
    }

    /// Start out targeting `identity`, so the first spawn joins it directly
    pub fn with_identity(self, identity: ChannelIdentity) -> Self {
        if let Ok(mut current) = self.identity.try_write() {
            *current = identity;
        }
        self
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn endpoint(&self) -> &PipeEndpoint {
        self.transport.endpoint()
    }

    pub async fn identity(&self) -> ChannelIdentity {
        self.identity.read().await.clone()
    }

    /// Channel to pass to a freshly spawned child, if any
    pub async fn target(&self) -> Option<ChannelIdentity> {
        let identity = self.identity.read().await;
        (!identity.is_sentinel()).then(|| identity.clone())
    }

    /// Ask the child to join; `true` means the request was delivered
    pub async fn join(&self, guild_id: &str, channel_id: &str) -> bool {
        let identity = ChannelIdentity::new(guild_id, channel_id);
        *self.identity.write().await = identity.clone();
        process_info!(ProcessId::current(), "Telling {} to join {}", self.name, identity);
        self.transport.send(&Message::join(&identity)).await
    }

    pub async fn leave(&self) -> bool {
        self.leave_with_timeout(DEFAULT_LEAVE_TIMEOUT).await
    }

    /// `true` once the child confirms with `left`; `false` on `error`, a send
    /// failure, a connection error or the timeout
    pub async fn leave_with_timeout(&self, timeout: Duration) -> bool {
        let events = self.transport.subscribe();
        if !self.transport.send(&Message::leave()).await {
            return false;
        }

        let left = wait::race_commands(events, timeout, commands::LEFT, Some(commands::ERROR)).await;
        if left {
            *self.identity.write().await = ChannelIdentity::sentinel();
        } else {
            process_warn!(ProcessId::current(), "{} did not confirm leaving", self.name);
        }
        left
    }

    /// The child's own report of the channel it is in
    pub async fn info(&self) -> Option<Message> {
        self.info_with_timeout(DEFAULT_REPLY_TIMEOUT).await
    }

    pub async fn info_with_timeout(&self, timeout: Duration) -> Option<Message> {
        self.transport
            .send_for_reply(&Message::info_request(), commands::INFO, timeout)
            .await
    }

    pub async fn ping(&self) -> bool {
        self.ping_with_timeout(DEFAULT_PING_TIMEOUT).await
    }

    pub async fn ping_with_timeout(&self, timeout: Duration) -> bool {
        self.transport.ping(timeout).await
    }

    pub async fn send(&self, message: &Message) -> bool {
        self.transport.send(message).await
    }

    pub fn subscribe(&self) -> broadcast::Receiver<TransportEvent> {
        self.transport.subscribe()
    }

    pub fn is_connected(&self) -> bool {
        self.transport.is_connected()
    }

    pub async fn wait_for_peer(&self, timeout: Duration) -> bool {
        self.transport.wait_for_peer(timeout).await
    }

    pub fn shutdown(&self) {
        self.watcher.abort();
        self.transport.shutdown();
    }
}

impl Drop for ControlChannel {
    fn drop(&mut self) {
        self.watcher.abort();
    }
}

/// Keep the identity in step with what the child reports
async fn watch_replies(
    name: String,
    mut events: broadcast::Receiver<TransportEvent>,
    identity: Arc<RwLock<ChannelIdentity>>,
) {
    loop {
        let message = match events.recv().await {
            Ok(TransportEvent::Message(message)) => message,
            Ok(TransportEvent::ConnectionError(_)) => continue,
            Err(broadcast::error::RecvError::Lagged(skipped)) => {
                process_warn!(ProcessId::current(), "{} watcher skipped {} events", name, skipped);
                continue;
            }
            Err(broadcast::error::RecvError::Closed) => break,
        };

        match message.parse() {
            Command::Left => {
                process_info!(ProcessId::current(), "{} left its channel", name);
                *identity.write().await = ChannelIdentity::sentinel();
            }
            Command::Joined(joined) => {
                process_info!(ProcessId::current(), "{} joined {}", name, joined);
            }
            Command::Unknown(unknown) => {
                process_debug!(ProcessId::current(), "Unhandled message from {}: {}", name, unknown);
            }
            _ => {}
        }
    }
}

/// Forwards `speaking` between sibling channels until dropped
pub struct SpeakingRelay {
    tasks: Vec<JoinHandle<()>>,
}

impl Drop for SpeakingRelay {
    fn drop(&mut self) {
        for task in &self.tasks {
            task.abort();
        }
    }
}

/// Forward every `speaking` message from one channel to all of its siblings
pub fn relay_speaking(channels: &[Arc<ControlChannel>]) -> SpeakingRelay {
    let tasks = channels
        .iter()
        .enumerate()
        .map(|(index, source)| {
            let siblings: Vec<Arc<ControlChannel>> = channels
                .iter()
                .enumerate()
                .filter(|(other, _)| *other != index)
                .map(|(_, channel)| channel.clone())
                .collect();
            tokio::spawn(forward_speaking(source.name().to_string(), source.subscribe(), siblings))
        })
        .collect();

    SpeakingRelay { tasks }
}

async fn forward_speaking(
    source: String,
    mut events: broadcast::Receiver<TransportEvent>,
    siblings: Vec<Arc<ControlChannel>>,
) {
    loop {
        let message = match events.recv().await {
            Ok(TransportEvent::Message(message)) if message.is(commands::SPEAKING) => message,
            Ok(_) => continue,
            Err(broadcast::error::RecvError::Lagged(skipped)) => {
                process_warn!(ProcessId::current(), "Speaking relay from {} skipped {} events", source, skipped);
                continue;
            }
            Err(broadcast::error::RecvError::Closed) => break,
        };

        for sibling in &siblings {
            sibling.send(&message).await;
        }
    }
}
