//! Pipe transport tests
//!
//! Every test binds its endpoint inside its own temporary directory.

mod transport;

use std::time::Duration;
use tempfile::TempDir;

use super::{PipeEndpoint, PipePeer, PipeTransport};

/// Standard timeout for waits that should succeed
pub const CONNECT_TIMEOUT: Duration = Duration::from_secs(2);

/// Listen on a fresh endpoint named `name`
pub async fn listening(name: &str) -> (TempDir, PipeTransport) {
    let dir = tempfile::tempdir().expect("temp dir");
    let endpoint = PipeEndpoint::in_dir(dir.path(), name);
    let transport = PipeTransport::listen(endpoint).await.expect("listen");
    (dir, transport)
}

/// Listen and connect a child-side peer
pub async fn connected(name: &str) -> (TempDir, PipeTransport, PipePeer) {
    let (dir, transport) = listening(name).await;
    let peer = PipePeer::connect(transport.endpoint()).await.expect("connect");
    assert!(transport.wait_for_peer(CONNECT_TIMEOUT).await, "peer never connected");
    (dir, transport, peer)
}
