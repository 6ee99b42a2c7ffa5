//! Harness and helpers for pool integration tests

use axum::{
    body::Body,
    http::{Request, Response},
    Router,
};
use http_body_util::BodyExt;
use serde_json::{json, Value};
use std::sync::Arc;
use wiremock::matchers::{method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

use pool::{
    services::{HttpInstanceClient, InMemoryChannelStore},
    traits::MockContainerRuntime,
    web, ChannelStore, ContainerPool, PoolConfig, PoolContext, PoolError, RunningContainer,
};

/// A pool tracking one instance per given controller
pub struct PoolHarness {
    pub pool: Arc<ContainerPool>,
    pub store: Arc<InMemoryChannelStore>,
    pub debug: bool,
}

impl PoolHarness {
    /// Running a new container always fails
    pub async fn new(controllers: &[&MockServer]) -> Self {
        let running: Vec<RunningContainer> = controllers
            .iter()
            .enumerate()
            .map(|(n, server)| RunningContainer {
                id: format!("container{n}"),
                image: "bot-container".to_string(),
                address: server.address().ip().to_string(),
                host_port: server.address().port(),
            })
            .collect();

        let mut runtime = MockContainerRuntime::new();
        runtime
            .expect_list_running()
            .returning(move |_| Ok(running.clone()));
        runtime
            .expect_run()
            .returning(|_, _, _| Err(PoolError::runtime("docker run", "no docker in tests")));

        let pool = Arc::new(ContainerPool::new(
            Arc::new(runtime),
            Arc::new(HttpInstanceClient::new()),
            PoolConfig::default(),
        ));
        pool.discover().await.expect("discover");

        Self {
            pool,
            store: Arc::new(InMemoryChannelStore::new()),
            debug: false,
        }
    }

    pub fn with_debug(mut self) -> Self {
        self.debug = true;
        self
    }

    pub fn router(&self) -> Router {
        let context = PoolContext::new(self.pool.clone(), self.store.clone()).with_debug(self.debug);
        web::router(Arc::new(context))
    }

    /// Put a channel with one user in the store
    pub async fn channel(&self, id: &str, guild: &str) {
        self.store
            .put(id, guild, vec!["ann".to_string()])
            .await
            .expect("put channel");
    }
}

/// A controller answering `/join` and `/leave` with the given statuses
pub async fn controller(join_status: u16, leave_status: u16) -> MockServer {
    let server = MockServer::start().await;
    let told = join_status == 200;
    Mock::given(method("POST"))
        .and(path("/join"))
        .respond_with(
            ResponseTemplate::new(join_status).set_body_json(json!({"told_dbot": true, "told_vrelay": told})),
        )
        .mount(&server)
        .await;
    let left = leave_status == 200;
    Mock::given(method("POST"))
        .and(path("/leave"))
        .respond_with(
            ResponseTemplate::new(leave_status).set_body_json(json!({"dbot_left": left, "vrelay_left": true})),
        )
        .mount(&server)
        .await;
    server
}

pub fn get(uri: &str) -> Request<Body> {
    Request::builder().uri(uri).body(Body::empty()).unwrap()
}

pub async fn body_json(response: Response<Body>) -> Value {
    let bytes = response.into_body().collect().await.unwrap().to_bytes();
    serde_json::from_slice(&bytes).expect("json body")
}
