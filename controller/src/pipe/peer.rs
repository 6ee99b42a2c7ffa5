//! Child side of a pipe endpoint
//!
//! A supervised process connects to both paths its controller listens on,
//! answers `ping` by itself and handles everything else in order.

use std::sync::Arc;
use std::time::Duration;
use tokio::io::{AsyncWriteExt, BufReader};
use tokio::net::UnixStream;
use tokio::sync::{mpsc, Mutex};
use tokio::task::JoinHandle;

use shared::{commands, process_debug, process_warn, Message, ProcessId};

use super::endpoint::PipeEndpoint;
use super::framing::{read_frame, FrameRead};

/// Connection from a child process to its controller
pub struct PipePeer {
    writer: Arc<Mutex<UnixStream>>,
    incoming: mpsc::UnboundedReceiver<Message>,
    reader: JoinHandle<()>,
}

impl PipePeer {
    /// Connect to a controller that is already listening on `endpoint`
    pub async fn connect(endpoint: &PipeEndpoint) -> std::io::Result<Self> {
        let read_stream = UnixStream::connect(endpoint.outbound_path()).await?;
        let write_stream = UnixStream::connect(endpoint.inbound_path()).await?;

        let writer = Arc::new(Mutex::new(write_stream));
        let (tx, incoming) = mpsc::unbounded_channel();
        let reader = tokio::spawn(read_frames(read_stream, writer.clone(), tx));

        Ok(Self {
            writer,
            incoming,
            reader,
        })
    }

    /// Retry [`PipePeer::connect`] until the controller is listening
    pub async fn connect_with_retry(endpoint: &PipeEndpoint, interval: Duration, attempts: u32) -> std::io::Result<Self> {
        let mut attempt = 1;
        loop {
            match Self::connect(endpoint).await {
                Ok(peer) => return Ok(peer),
                Err(e) if attempt >= attempts => return Err(e),
                Err(e) => {
                    process_debug!(
                        ProcessId::current(),
                        "Controller not ready on {} ({}), retrying",
                        endpoint.prefix(),
                        e
                    );
                    attempt += 1;
                    tokio::time::sleep(interval).await;
                }
            }
        }
    }

    pub async fn send(&self, message: &Message) -> bool {
        send_on(&self.writer, message).await
    }

    /// Next frame from the controller; `None` once the controller is gone
    pub async fn recv(&mut self) -> Option<Message> {
        self.incoming.recv().await
    }

    /// [`PipePeer::recv`] bounded by `timeout`
    pub async fn recv_timeout(&mut self, timeout: Duration) -> Option<Message> {
        tokio::time::timeout(timeout, self.incoming.recv()).await.ok().flatten()
    }
}

impl Drop for PipePeer {
    fn drop(&mut self) {
        self.reader.abort();
    }
}

async fn send_on(writer: &Mutex<UnixStream>, message: &Message) -> bool {
    let mut stream = writer.lock().await;
    match stream.write_all(&message.encode()).await {
        Ok(()) => true,
        Err(e) => {
            process_warn!(ProcessId::current(), "Write to controller failed: {}", e);
            false
        }
    }
}

async fn read_frames(stream: UnixStream, writer: Arc<Mutex<UnixStream>>, tx: mpsc::UnboundedSender<Message>) {
    let mut reader = BufReader::new(stream);
    let mut frame = Vec::new();

    loop {
        match read_frame(&mut reader, &mut frame).await {
            Ok(FrameRead::Eof) => break,
            Ok(FrameRead::Oversized(len)) => {
                process_warn!(ProcessId::current(), "Dropping {} byte frame from controller", len);
                continue;
            }
            Ok(FrameRead::Frame) => {}
            Err(e) => {
                process_warn!(ProcessId::current(), "Read from controller failed: {}", e);
                break;
            }
        }

        if frame.iter().all(u8::is_ascii_whitespace) {
            continue;
        }

        match Message::decode(&frame) {
            Ok(message) if message.is(commands::PING) => {
                send_on(&writer, &Message::pong()).await;
            }
            Ok(message) => {
                if tx.send(message).is_err() {
                    break;
                }
            }
            Err(e) => {
                process_warn!(ProcessId::current(), "Dropping frame from controller: {}", e);
            }
        }
    }
}
