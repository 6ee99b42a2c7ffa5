//! Core logic tests
//!
//! Channels run over real pipe transports in temporary directories; child
//! processes are played by [`PipePeer`]s and launches go to mocks.


use std::sync::Arc;
use std::time::Duration;
use tempfile::TempDir;

use crate::core::ControlChannel;
use crate::pipe::{PipeEndpoint, PipePeer};

pub const WAIT: Duration = Duration::from_secs(2);

/// A fresh channel for `name` in `dir`
pub async fn channel_in(dir: &TempDir, name: &str) -> Arc<ControlChannel> {
    let endpoint = PipeEndpoint::in_dir(dir.path(), name);
    Arc::new(ControlChannel::open(name, endpoint).await.expect("open channel"))
}

/// Connect a stand-in child to `channel`
pub async fn attach(channel: &ControlChannel) -> PipePeer {
    let peer = PipePeer::connect(channel.endpoint()).await.expect("connect");
    assert!(channel.wait_for_peer(WAIT).await, "{} never connected", channel.name());
    peer
}

/// Poll `check` until it holds or `WAIT` passes
pub async fn eventually<F, Fut>(mut check: F) -> bool
where
    F: FnMut() -> Fut,
    Fut: std::future::Future<Output = bool>,
{
    let deadline = tokio::time::Instant::now() + WAIT;
    while tokio::time::Instant::now() < deadline {
        if check().await {
            return true;
        }
        tokio::time::sleep(Duration::from_millis(20)).await;
    }
    false
}
