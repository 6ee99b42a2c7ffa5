//! Pool HTTP handlers
//!
//! Failures answer `{error: true, error_in, text}` where `error_in` names the
//! component at fault: the pool itself, the channel store or one controller.

use axum::{
    extract::{Path, State},
    http::StatusCode,
    response::{IntoResponse, Json, Response},
};
use rand::{seq::SliceRandom, Rng};
use serde_json::{json, Value};
use std::sync::Arc;

use shared::{logging, process_info, ProcessId};

use crate::core::{ContainerInstance, RouteOutcome};
use crate::error::PoolError;
use crate::state::PoolContext;
use crate::types::ChannelRecord;

const RELAY_MANAGER: &str = "relay manager";
const CHANNEL_STORE: &str = "channel store";

const FIRST_NAMES: &[&str] = &["Ada", "Brook", "Casey", "Dana", "Emery", "Finley", "Gale", "Harper"];
const LAST_NAMES: &[&str] = &["Stone", "Rivers", "Marsh", "Hale", "Woods", "Frost", "Lane", "Reyes"];

fn error_response(status: StatusCode, error_in: &str, text: impl Into<Value>) -> Response {
    let body = json!({
        "error": true,
        "error_in": error_in,
        "text": text.into(),
    });
    (status, Json(body)).into_response()
}

/// Map a routing failure to the component that caused it
fn routing_error(channel_id: &str, error: &PoolError) -> Response {
    let body = match error {
        PoolError::Downstream {
            instance,
            status,
            message,
            ..
        } => {
            // A controller's JSON body is passed through as is
            let text = serde_json::from_str::<Value>(message).unwrap_or_else(|_| Value::from(message.as_str()));
            let mut body = json!({
                "error": true,
                "channel": channel_id,
                "error_in": instance,
                "text": text,
            });
            if let Some(status) = status {
                body["status"] = json!(status);
            }
            body
        }
        other => json!({
            "error": true,
            "channel": channel_id,
            "error_in": RELAY_MANAGER,
            "text": other.to_string(),
        }),
    };
    (StatusCode::INTERNAL_SERVER_ERROR, Json(body)).into_response()
}

fn route_response(channel_id: &str, outcome: RouteOutcome) -> Response {
    let body = match outcome {
        RouteOutcome::Joined(container) => json!({
            "error": false,
            "channel": channel_id,
            "container": container,
        }),
        RouteOutcome::AlreadyAssigned(container) => json!({
            "error": false,
            "channel": channel_id,
            "text": "A running container is already in that channel",
            "container": container,
        }),
    };
    (StatusCode::OK, Json(body)).into_response()
}

fn random_guild() -> String {
    rand::thread_rng().gen_range(100_000u64..90_100_000).to_string()
}

fn random_user() -> String {
    let mut rng = rand::thread_rng();
    let first = FIRST_NAMES.choose(&mut rng).copied().unwrap_or("Ada");
    let last = LAST_NAMES.choose(&mut rng).copied().unwrap_or("Stone");
    format!("{first} {last}")
}

/// Fetch a channel record, answering 404 or 500 when there is none
async fn channel_record(context: &PoolContext, id: &str) -> Result<ChannelRecord, Response> {
    match context.store.get(id).await {
        Ok(Some(record)) => Ok(record),
        Ok(None) => Err(error_response(
            StatusCode::NOT_FOUND,
            "request",
            format!("channel with id {id} is not in the channel store"),
        )),
        Err(e) => {
            logging::log_error(ProcessId::current(), "Channel lookup", &e);
            Err(error_response(StatusCode::INTERNAL_SERVER_ERROR, CHANNEL_STORE, e.to_string()))
        }
    }
}

/// Create the channel if needed and put a made-up user in it
async fn seed_channel(context: &PoolContext, id: &str) -> Result<(), PoolError> {
    let (guild, user) = (random_guild(), random_user());
    if context.store.create_if_missing(id, &guild).await? {
        process_info!(ProcessId::current(), "Created channel {} in guild {}", id, guild);
    }
    context.store.add_user(id, &user).await
}

pub async fn identify() -> &'static str {
    "I am the manager of all bot containers"
}

pub async fn health(State(context): State<Arc<PoolContext>>) -> Json<Value> {
    let instances = context.pool.instances().await;
    let total = instances.len();
    let idle = instances.iter().filter(|i| i.idle).count();

    Json(json!({
        "idle": idle,
        "busy": total - idle,
        "total": total,
        "text": format!("{idle} of {total} running bot containers are idle"),
    }))
}

pub async fn info(State(context): State<Arc<PoolContext>>) -> Json<Vec<ContainerInstance>> {
    Json(context.pool.instances().await)
}

/// Someone joined a voice channel: make sure an instance serves it
pub async fn channel_joined(State(context): State<Arc<PoolContext>>, Path(id): Path<String>) -> Response {
    process_info!(ProcessId::current(), "Channel joined: {}", id);

    if context.debug {
        if let Err(e) = seed_channel(&context, &id).await {
            logging::log_error(ProcessId::current(), "Seeding channel", &e);
            return error_response(StatusCode::INTERNAL_SERVER_ERROR, CHANNEL_STORE, e.to_string());
        }
    }

    let record = match channel_record(&context, &id).await {
        Ok(record) => record,
        Err(response) => return response,
    };

    match context.pool.route_join(&record.guild, &record.id).await {
        Ok(outcome) => route_response(&record.id, outcome),
        Err(e) => routing_error(&record.id, &e),
    }
}

/// Someone left a voice channel: tell its instance to leave
pub async fn channel_left(State(context): State<Arc<PoolContext>>, Path(id): Path<String>) -> Response {
    process_info!(ProcessId::current(), "Channel left: {}", id);

    let record = match channel_record(&context, &id).await {
        Ok(record) => record,
        Err(response) => return response,
    };

    match context.pool.route_leave(&record.id).await {
        Ok(Some(_)) => (StatusCode::OK, Json(json!({ "text": "OK" }))).into_response(),
        Ok(None) => {
            let text = format!("There is no container running for channel {}, ignored", record.id);
            (StatusCode::OK, Json(json!({ "text": text }))).into_response()
        }
        Err(e) => {
            logging::log_error(ProcessId::current(), "Leaving channel", &e);
            let container = context.pool.instance_for_channel(&record.id).await;
            let error_in = container
                .as_ref()
                .map(|c| format!("container:{}", c.controller_url()))
                .unwrap_or_else(|| RELAY_MANAGER.to_string());
            let body = json!({
                "error": true,
                "text": "The container responded with an error to /leave",
                "error_in": error_in,
                "container": container,
                "containerResponse": e.to_string(),
            });
            (StatusCode::NOT_IMPLEMENTED, Json(body)).into_response()
        }
    }
}

/// Join a channel directly, bypassing the channel store
pub async fn join(State(context): State<Arc<PoolContext>>, Path((guild, channel)): Path<(String, String)>) -> Response {
    process_info!(ProcessId::current(), "Direct join: {},{}", guild, channel);

    match context.pool.route_join(&guild, &channel).await {
        Ok(outcome) => route_response(&channel, outcome),
        Err(e) => routing_error(&channel, &e),
    }
}
