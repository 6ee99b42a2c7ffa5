//! Per-instance HTTP control surface

pub mod handlers;

use axum::{
    routing::{get, post},
    Router,
};
use std::sync::Arc;
use tower::ServiceBuilder;
use tower_http::cors::CorsLayer;

use crate::state::ControllerContext;

pub fn router(context: Arc<ControllerContext>) -> Router {
    Router::new()
        .route("/", get(handlers::identify))
        .route("/health", get(handlers::health))
        .route("/join", post(handlers::join))
        .route("/leave", post(handlers::leave))
        .route("/info", get(handlers::info))
        .route("/kill", get(handlers::kill))
        .layer(
            ServiceBuilder::new()
                .layer(CorsLayer::permissive())
                .into_inner(),
        )
        .with_state(context)
}
