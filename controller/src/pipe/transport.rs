//! Controller side of a pipe endpoint
//!
//! Owns both listeners, the single outbound writer and the reader for the
//! current inbound peer. Decoded frames are published as [`TransportEvent`]s.

use std::sync::Arc;
use std::time::Duration;
use tokio::io::{AsyncReadExt, AsyncWriteExt, BufReader};
use tokio::net::unix::{OwnedReadHalf, OwnedWriteHalf};
use tokio::net::{UnixListener, UnixStream};
use tokio::sync::{broadcast, watch, Mutex};
use tokio::task::JoinHandle;

use shared::{commands, process_debug, process_error, process_info, process_warn, Message, ProcessId};

use super::endpoint::PipeEndpoint;
use super::framing::{read_frame, FrameRead};
use super::wait;
use crate::error::ControllerResult;

pub const DEFAULT_PING_TIMEOUT: Duration = Duration::from_millis(1500);
pub const DEFAULT_REPLY_TIMEOUT: Duration = Duration::from_millis(2000);

const EVENT_CAPACITY: usize = 256;

/// Something observed on the pipe
#[derive(Debug, Clone)]
pub enum TransportEvent {
    /// A decoded frame, in arrival order
    Message(Message),
    /// The peer went away or a read/write failed
    ConnectionError(String),
}

/// Aborts a helper task together with the task that owns it
struct AbortOnDrop(JoinHandle<()>);

impl Drop for AbortOnDrop {
    fn drop(&mut self) {
        self.0.abort();
    }
}

/// Writer for the current outbound peer
struct Outbound {
    label: String,
    /// Generation of the accepted stream, so a stale watcher cannot clear a newer peer
    stream: Mutex<Option<(u64, OwnedWriteHalf)>>,
    connected: watch::Sender<bool>,
    events: broadcast::Sender<TransportEvent>,
}

impl Outbound {
    async fn write(&self, message: &Message) -> bool {
        let mut current = self.stream.lock().await;
        let Some((_, stream)) = current.as_mut() else {
            process_warn!(
                ProcessId::current(),
                "Cannot send {} on {}: no client",
                message.command(),
                self.label
            );
            return false;
        };

        match stream.write_all(&message.encode()).await {
            Ok(()) => true,
            Err(e) => {
                process_error!(ProcessId::current(), "Write to {} failed: {}", self.label, e);
                *current = None;
                self.connected.send_replace(false);
                let _ = self.events.send(TransportEvent::ConnectionError(e.to_string()));
                false
            }
        }
    }

    async fn replace(&self, generation: u64, stream: OwnedWriteHalf) {
        let mut current = self.stream.lock().await;
        if current.replace((generation, stream)).is_some() {
            process_warn!(
                ProcessId::current(),
                "Client reconnected to {}_client, replacing the previous stream",
                self.label
            );
        }
        self.connected.send_replace(true);
    }

    async fn disconnect(&self, generation: u64) {
        let mut current = self.stream.lock().await;
        if matches!(current.as_ref(), Some((g, _)) if *g == generation) {
            *current = None;
            self.connected.send_replace(false);
            process_warn!(ProcessId::current(), "Client disconnected from {}_client", self.label);
            let _ = self
                .events
                .send(TransportEvent::ConnectionError("peer disconnected".to_string()));
        }
    }
}

/// Duplex message channel to one child process
pub struct PipeTransport {
    endpoint: PipeEndpoint,
    outbound: Arc<Outbound>,
    events: broadcast::Sender<TransportEvent>,
    tasks: Vec<JoinHandle<()>>,
}

impl PipeTransport {
    /// Bind both pipe paths and start accepting the child
    pub async fn listen(endpoint: PipeEndpoint) -> ControllerResult<Self> {
        let inbound = PipeEndpoint::bind(&endpoint.inbound_path())?;
        let outbound_listener = PipeEndpoint::bind(&endpoint.outbound_path())?;

        let (events, _) = broadcast::channel(EVENT_CAPACITY);
        let (connected, _) = watch::channel(false);
        let outbound = Arc::new(Outbound {
            label: endpoint.label().to_string(),
            stream: Mutex::new(None),
            connected,
            events: events.clone(),
        });

        let tasks = vec![
            tokio::spawn(accept_outbound(outbound_listener, outbound.clone())),
            tokio::spawn(accept_inbound(inbound, outbound.clone(), events.clone())),
        ];

        process_debug!(ProcessId::current(), "Waiting for client on {}", endpoint.prefix());

        Ok(Self {
            endpoint,
            outbound,
            events,
            tasks,
        })
    }

    pub fn endpoint(&self) -> &PipeEndpoint {
        &self.endpoint
    }

    /// Receive every event from now on
    pub fn subscribe(&self) -> broadcast::Receiver<TransportEvent> {
        self.events.subscribe()
    }

    /// Write one frame; `false` when no client is connected or the write fails
    pub async fn send(&self, message: &Message) -> bool {
        self.outbound.write(message).await
    }

    /// `true` if a `pong` arrives before a connection error or the timeout
    pub async fn ping(&self, timeout: Duration) -> bool {
        let events = self.subscribe();
        // With no client the wait still runs to the deadline.
        self.send(&Message::ping()).await;
        wait::race_commands(events, timeout, commands::PONG, None).await
    }

    /// Send and wait for the first frame whose command is `reply_command`
    ///
    /// Overlapping requests for the same reply command on one transport would
    /// each see the first reply, so callers issue them one at a time.
    pub async fn send_for_reply(
        &self,
        message: &Message,
        reply_command: &str,
        timeout: Duration,
    ) -> Option<Message> {
        let events = self.subscribe();
        if !self.send(message).await {
            return None;
        }

        let reply = wait::first_event(events, timeout, |event| match event {
            TransportEvent::Message(reply) if reply.is(reply_command) => Some(reply.clone()),
            _ => None,
        })
        .await;

        if reply.is_none() {
            process_debug!(
                ProcessId::current(),
                "Timed out waiting for {} to reply with '{}'",
                self.endpoint.label(),
                reply_command
            );
        }
        reply
    }

    pub fn is_connected(&self) -> bool {
        *self.outbound.connected.borrow()
    }

    /// Wait until a client is connected for writing
    pub async fn wait_for_peer(&self, timeout: Duration) -> bool {
        let mut connected = self.outbound.connected.subscribe();
        let wait = async { connected.wait_for(|c| *c).await.is_ok() };
        tokio::time::timeout(timeout, wait).await.unwrap_or(false)
    }

    /// Stop accepting and reading, and remove the socket files
    pub fn shutdown(&self) {
        for task in &self.tasks {
            task.abort();
        }
        self.endpoint.remove_files();
    }
}

impl Drop for PipeTransport {
    fn drop(&mut self) {
        self.shutdown();
    }
}

async fn accept_outbound(listener: UnixListener, outbound: Arc<Outbound>) {
    let mut generation = 0u64;
    let mut _watcher: Option<AbortOnDrop> = None;
    loop {
        match listener.accept().await {
            Ok((stream, _)) => {
                generation += 1;
                process_info!(ProcessId::current(), "Client connected to {}_client", outbound.label);

                let (read_half, write_half) = stream.into_split();
                outbound.replace(generation, write_half).await;
                _watcher = Some(AbortOnDrop(tokio::spawn(watch_outbound(
                    read_half,
                    outbound.clone(),
                    generation,
                ))));
            }
            Err(e) => {
                process_error!(ProcessId::current(), "Accept on {}_client failed: {}", outbound.label, e);
                tokio::time::sleep(Duration::from_millis(100)).await;
            }
        }
    }
}

/// The child never writes on its read pipe, so EOF here means it went away
async fn watch_outbound(mut read_half: OwnedReadHalf, outbound: Arc<Outbound>, generation: u64) {
    let mut scratch = [0u8; 64];
    loop {
        match read_half.read(&mut scratch).await {
            Ok(0) | Err(_) => break,
            Ok(_) => continue,
        }
    }
    outbound.disconnect(generation).await;
}

async fn accept_inbound(
    listener: UnixListener,
    outbound: Arc<Outbound>,
    events: broadcast::Sender<TransportEvent>,
) {
    let mut reader: Option<AbortOnDrop> = None;
    loop {
        match listener.accept().await {
            Ok((stream, _)) => {
                process_info!(ProcessId::current(), "Client connected to {}_server", outbound.label);
                if let Some(previous) = reader.take() {
                    if !previous.0.is_finished() {
                        process_warn!(
                            ProcessId::current(),
                            "Client reconnected to {}_server, dropping the previous stream",
                            outbound.label
                        );
                    }
                }
                reader = Some(AbortOnDrop(tokio::spawn(read_frames(
                    stream,
                    outbound.clone(),
                    events.clone(),
                ))));
            }
            Err(e) => {
                process_error!(ProcessId::current(), "Accept on {}_server failed: {}", outbound.label, e);
                tokio::time::sleep(Duration::from_millis(100)).await;
            }
        }
    }
}

async fn read_frames(stream: UnixStream, outbound: Arc<Outbound>, events: broadcast::Sender<TransportEvent>) {
    let mut reader = BufReader::new(stream);
    let mut frame = Vec::new();

    loop {
        match read_frame(&mut reader, &mut frame).await {
            Ok(FrameRead::Eof) => {
                process_debug!(ProcessId::current(), "Client closed {}_server", outbound.label);
                break;
            }
            Ok(FrameRead::Oversized(len)) => {
                process_warn!(ProcessId::current(), "Dropping {} byte frame from {}", len, outbound.label);
                continue;
            }
            Ok(FrameRead::Frame) => {}
            Err(e) => {
                process_warn!(ProcessId::current(), "Read from {}_server failed: {}", outbound.label, e);
                let _ = events.send(TransportEvent::ConnectionError(e.to_string()));
                break;
            }
        }

        if frame.iter().all(u8::is_ascii_whitespace) {
            continue;
        }

        let message = match Message::decode(&frame) {
            Ok(message) => message,
            Err(e) => {
                process_warn!(ProcessId::current(), "Dropping frame from {}: {}", outbound.label, e);
                continue;
            }
        };

        match message.command() {
            commands::PING => {
                outbound.write(&Message::pong()).await;
            }
            commands::ERROR => {
                process_error!(ProcessId::current(), "Error from {}: {}", outbound.label, message.payload());
            }
            _ => {}
        }

        // No subscribers is fine
        let _ = events.send(TransportEvent::Message(message));
    }
}
