//! Pool logic tests
//!
//! Instances are seeded through `discover` with a mocked runtime.


use async_trait::async_trait;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use shared::{ChildFlags, InfoReport, JoinRequest};

use crate::core::{ContainerInstance, ContainerPool, PoolConfig};
use crate::error::PoolResult;
use crate::traits::{InstanceClient, MockContainerRuntime, MockInstanceClient};
use crate::types::RunningContainer;

pub fn container(port: u16) -> RunningContainer {
    RunningContainer {
        id: format!("id{port}"),
        image: "bot-container".to_string(),
        address: "127.0.0.1".to_string(),
        host_port: port,
    }
}

/// Runtime reporting `ports` as running
pub fn runtime_with(ports: &[u16]) -> MockContainerRuntime {
    let running: Vec<RunningContainer> = ports.iter().copied().map(container).collect();
    let mut runtime = MockContainerRuntime::new();
    runtime
        .expect_list_running()
        .returning(move |_| Ok(running.clone()));
    runtime
}

pub async fn pool_with(runtime: MockContainerRuntime, client: impl InstanceClient + 'static) -> ContainerPool {
    let pool = ContainerPool::new(Arc::new(runtime), Arc::new(client), PoolConfig::default());
    pool.discover().await.expect("discover");
    pool
}

pub fn accepting_client() -> MockInstanceClient {
    let mut client = MockInstanceClient::new();
    client.expect_join().returning(|_, _| Ok(ChildFlags::new()));
    client
}

/// Client whose joins take a while, for interleaving routing calls
#[derive(Default)]
pub struct SlowClient {
    pub joins: AtomicUsize,
    /// Calls in the order they reached the instance
    pub calls: Mutex<Vec<&'static str>>,
}

impl SlowClient {
    fn record(&self, call: &'static str) {
        self.calls.lock().unwrap().push(call);
    }

    pub fn calls(&self) -> Vec<&'static str> {
        self.calls.lock().unwrap().clone()
    }
}

#[async_trait]
impl InstanceClient for SlowClient {
    async fn join(&self, _instance: &ContainerInstance, _request: &JoinRequest) -> PoolResult<ChildFlags> {
        self.joins.fetch_add(1, Ordering::SeqCst);
        self.record("join sent");
        tokio::time::sleep(Duration::from_millis(100)).await;
        self.record("join done");
        Ok(ChildFlags::new())
    }

    async fn leave(&self, _instance: &ContainerInstance) -> PoolResult<ChildFlags> {
        self.record("leave");
        Ok(ChildFlags::new())
    }

    async fn info(&self, _instance: &ContainerInstance) -> PoolResult<InfoReport> {
        unreachable!("not queried in routing tests")
    }
}
