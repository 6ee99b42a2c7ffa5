//! Control surface handlers
//!
//! Result fields are derived from child names, so a controller supervising
//! `dbot` and `vrelay` answers `/join` with `told_dbot` and `told_vrelay`.

use axum::{
    extract::State,
    http::StatusCode,
    response::{IntoResponse, Json, Response},
};
use futures_util::future::join_all;
use serde_json::json;
use std::collections::BTreeMap;
use std::sync::Arc;

use shared::{left_key, process_info, process_warn, told_key, ChildFlags, InfoReport, JoinRequest, ProcessId};

use crate::state::ControllerContext;

fn status_for(ok: bool) -> StatusCode {
    if ok {
        StatusCode::OK
    } else {
        StatusCode::NOT_IMPLEMENTED
    }
}

fn child_names(context: &ControllerContext) -> String {
    context
        .channels
        .iter()
        .map(|channel| channel.name())
        .collect::<Vec<_>>()
        .join(" and ")
}

pub async fn identify() -> &'static str {
    "I am a bot controller"
}

/// `{<child>: bool}` from one ping per child
pub async fn health(State(context): State<Arc<ControllerContext>>) -> Json<ChildFlags> {
    Json(context.supervisor.ping_all().await)
}

pub async fn join(
    State(context): State<Arc<ControllerContext>>,
    Json(request): Json<JoinRequest>,
) -> (StatusCode, Json<ChildFlags>) {
    process_info!(ProcessId::current(), "Join request: {}", request.identity());

    let mut told = ChildFlags::new();
    for channel in &context.channels {
        let delivered = channel.join(&request.guild, &request.channel).await;
        told.insert(told_key(channel.name()), delivered);
    }

    let ok = told.values().all(|delivered| *delivered);
    (status_for(ok), Json(told))
}

pub async fn leave(State(context): State<Arc<ControllerContext>>) -> (StatusCode, Json<ChildFlags>) {
    process_info!(ProcessId::current(), "Leave request");

    let results = join_all(context.channels.iter().map(|channel| channel.leave())).await;
    let left: ChildFlags = context
        .channels
        .iter()
        .zip(results)
        .map(|(channel, left)| (left_key(channel.name()), left))
        .collect();

    let ok = left.values().all(|left| *left);
    (status_for(ok), Json(left))
}

/// Where every child says it is; 501 when they disagree, 500 when one is silent
pub async fn info(State(context): State<Arc<ControllerContext>>) -> Response {
    let replies = join_all(context.channels.iter().map(|channel| channel.info())).await;

    let mut children = BTreeMap::new();
    for (channel, reply) in context.channels.iter().zip(replies) {
        match reply {
            Some(reply) => {
                children.insert(channel.name().to_string(), reply.payload().to_string());
            }
            None => {
                process_warn!(ProcessId::current(), "{} did not answer info", channel.name());
                let body = json!({
                    "error": true,
                    "text": format!("{} did not reply to info", channel.name()),
                });
                return (StatusCode::INTERNAL_SERVER_ERROR, Json(body)).into_response();
            }
        }
    }

    let first = children.values().next().cloned().unwrap_or_default();
    let agree = children.values().all(|payload| *payload == first);
    let (guild, channel) = first
        .split_once(',')
        .map(|(guild, channel)| (guild.to_string(), channel.to_string()))
        .unwrap_or((first.clone(), String::new()));

    let report = InfoReport {
        error: !agree,
        guild,
        channel,
        text: (!agree).then(|| format!("{} are not in the same channel", child_names(&context))),
        children,
    };
    (status_for(agree), Json(report)).into_response()
}

pub async fn kill(State(context): State<Arc<ControllerContext>>) -> StatusCode {
    process_info!(ProcessId::current(), "Kill request");
    context.supervisor.kill_all().await;
    StatusCode::OK
}
