//! Harness and helpers for controller integration tests

use axum::{body::Body, http::Response, Router};
use http_body_util::BodyExt;
use serde_json::Value;
use std::sync::Arc;
use std::time::Duration;
use tempfile::TempDir;
use tokio::task::JoinHandle;

use controller::{
    pipe::{PipeEndpoint, PipePeer},
    traits::MockProcessLauncher,
    web, ChildSpec, ControlChannel, ControllerContext, ProcessSupervisor, SupervisorConfig,
};
use shared::{ChannelIdentity, Command, Message};

pub const WAIT: Duration = Duration::from_secs(2);

/// A controller for `dbot` and `vrelay` that never launches anything
pub struct ControllerHarness {
    pub dir: TempDir,
    pub dbot: Arc<ControlChannel>,
    pub vrelay: Arc<ControlChannel>,
    pub supervisor: Arc<ProcessSupervisor>,
}

impl ControllerHarness {
    pub async fn new() -> Self {
        let dir = tempfile::tempdir().expect("temp dir");
        let dbot = open(&dir, "dbot").await;
        let vrelay = open(&dir, "vrelay").await;

        let mut launcher = MockProcessLauncher::new();
        launcher.expect_launch().never();
        let config = SupervisorConfig::default()
            .with_ping_timeout(Duration::from_millis(200))
            .with_spawn_enabled(false);
        let supervisor = Arc::new(
            ProcessSupervisor::new(Arc::new(launcher), config)
                .with_child(ChildSpec::new("dbot", "/bin/dbot"), dbot.clone())
                .with_child(ChildSpec::new("vrelay", "/bin/vrelay"), vrelay.clone()),
        );

        Self {
            dir,
            dbot,
            vrelay,
            supervisor,
        }
    }

    pub fn router(&self) -> Router {
        web::router(Arc::new(ControllerContext::new(self.supervisor.clone())))
    }

    /// Attach a well-behaved child that starts out in `start`
    pub async fn attach(&self, channel: &ControlChannel, start: ChannelIdentity) -> JoinHandle<()> {
        let peer = PipePeer::connect(channel.endpoint()).await.expect("connect");
        assert!(channel.wait_for_peer(WAIT).await, "{} never connected", channel.name());
        tokio::spawn(responder(peer, start))
    }
}

async fn open(dir: &TempDir, name: &str) -> Arc<ControlChannel> {
    let endpoint = PipeEndpoint::in_dir(dir.path(), name);
    Arc::new(ControlChannel::open(name, endpoint).await.expect("open channel"))
}

/// Answer join, leave and info like a real child
pub async fn responder(mut peer: PipePeer, mut identity: ChannelIdentity) {
    while let Some(message) = peer.recv().await {
        match message.parse() {
            Command::Join(target) => {
                identity = target;
                peer.send(&Command::Joined(identity.clone()).into()).await;
            }
            Command::Leave => {
                identity = ChannelIdentity::sentinel();
                peer.send(&Message::left()).await;
            }
            Command::InfoRequest => {
                peer.send(&Command::Info(identity.clone()).into()).await;
            }
            _ => {}
        }
    }
}

pub async fn body_json(response: Response<Body>) -> Value {
    let bytes = response.into_body().collect().await.expect("body").to_bytes();
    serde_json::from_slice(&bytes).expect("json body")
}
