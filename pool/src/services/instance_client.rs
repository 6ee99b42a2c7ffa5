//! HTTP client for instance control surfaces

use async_trait::async_trait;
use reqwest::{Client, Response};
use serde::de::DeserializeOwned;
use std::time::Duration;

use shared::{ChildFlags, InfoReport, JoinRequest};

use crate::core::ContainerInstance;
use crate::error::{PoolError, PoolResult};
use crate::traits::InstanceClient;

/// Long enough for a controller to wait out a `leave` confirmation
pub const DEFAULT_REQUEST_TIMEOUT: Duration = Duration::from_secs(10);

pub struct HttpInstanceClient {
    client: Client,
}

impl Default for HttpInstanceClient {
    fn default() -> Self {
        Self::new()
    }
}

impl HttpInstanceClient {
    pub fn new() -> Self {
        Self::with_timeout(DEFAULT_REQUEST_TIMEOUT)
    }

    pub fn with_timeout(timeout: Duration) -> Self {
        let client = Client::builder()
            .timeout(timeout)
            .build()
            .unwrap_or_else(|_| Client::new());
        Self { client }
    }
}

fn unreachable_instance(instance: &ContainerInstance, call: &str, e: reqwest::Error) -> PoolError {
    PoolError::downstream(instance.label(), call, None, e.to_string())
}

/// Decode a success body, or turn the response into a downstream error
async fn decode<T: DeserializeOwned>(instance: &ContainerInstance, call: &str, response: Response) -> PoolResult<T> {
    let status = response.status();
    let body = response
        .text()
        .await
        .map_err(|e| unreachable_instance(instance, call, e))?;

    if !status.is_success() {
        return Err(PoolError::downstream(instance.label(), call, Some(status.as_u16()), body));
    }
    serde_json::from_str(&body).map_err(|e| {
        PoolError::downstream(instance.label(), call, Some(status.as_u16()), format!("bad body: {e}"))
    })
}

#[async_trait]
impl InstanceClient for HttpInstanceClient {
    async fn join(&self, instance: &ContainerInstance, request: &JoinRequest) -> PoolResult<ChildFlags> {
        let response = self
            .client
            .post(format!("{}/join", instance.controller_url()))
            .json(request)
            .send()
            .await
            .map_err(|e| unreachable_instance(instance, "/join", e))?;
        decode(instance, "/join", response).await
    }

    async fn leave(&self, instance: &ContainerInstance) -> PoolResult<ChildFlags> {
        let response = self
            .client
            .post(format!("{}/leave", instance.controller_url()))
            .send()
            .await
            .map_err(|e| unreachable_instance(instance, "/leave", e))?;
        decode(instance, "/leave", response).await
    }

    async fn info(&self, instance: &ContainerInstance) -> PoolResult<InfoReport> {
        let response = self
            .client
            .get(format!("{}/info", instance.controller_url()))
            .send()
            .await
            .map_err(|e| unreachable_instance(instance, "/info", e))?;

        // A 501 still says where each child is
        let status = response.status();
        let body = response
            .text()
            .await
            .map_err(|e| unreachable_instance(instance, "/info", e))?;
        serde_json::from_str(&body)
            .map_err(|_| PoolError::downstream(instance.label(), "/info", Some(status.as_u16()), body))
    }
}
