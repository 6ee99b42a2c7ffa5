//! Pool HTTP surface

pub mod handlers;

use axum::{routing::get, Router};
use std::sync::Arc;
use tower::ServiceBuilder;
use tower_http::cors::CorsLayer;

use crate::state::PoolContext;

pub fn router(context: Arc<PoolContext>) -> Router {
    Router::new()
        .route("/", get(handlers::identify))
        .route("/health", get(handlers::health))
        .route("/info", get(handlers::info))
        .route("/channel_joined/:id", get(handlers::channel_joined))
        .route("/channel_left/:id", get(handlers::channel_left))
        .route("/join/:guild/:channel", get(handlers::join))
        .layer(
            ServiceBuilder::new()
                .layer(CorsLayer::permissive())
                .into_inner(),
        )
        .with_state(context)
}
