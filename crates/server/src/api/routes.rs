use axum::{
    routing::{get, post},
    Router,
};
use std::sync::Arc;
use tower_http::{cors::CorsLayer, trace::TraceLayer};

use super::{handlers, ws};
use crate::state::AppState;

pub fn create_router(state: Arc<AppState>) -> Router {
    let api_routes = Router::new()
        .route("/health", get(handlers::health))
        .route("/scan", post(handlers::scan))
        .route("/convert", post(handlers::convert))
        .route("/cancel", post(handlers::cancel))
        .route("/status", get(handlers::status))
        .route("/reorganize", post(handlers::reorganize))
        .route("/ws", get(ws::ws_handler));

    Router::new()
        .nest("/api", api_routes)
        .route("/metrics", get(handlers::metrics))
        .layer(CorsLayer::permissive())
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}
