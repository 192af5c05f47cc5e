use axum::{
    middleware,
    routing::{get, post},
    Router,
};
use std::sync::Arc;
use tower_http::trace::TraceLayer;

use super::{handlers, middleware::metrics_middleware, tracks, ws};
use crate::state::AppState;

pub fn create_router(state: Arc<AppState>) -> Router {
    // API routes
    let api_routes = Router::new()
        // Health and config
        .route("/health", get(handlers::health))
        .route("/config", get(handlers::get_config))
        // Intake and progress
        .route("/tracks", post(tracks::enqueue_tracks))
        .route("/tracks/{number}", get(tracks::get_track))
        .route("/batches/{id}", get(tracks::get_batch_progress))
        .route("/batches/{id}/wait", get(tracks::get_batch_wait))
        .route("/queue/status", get(tracks::get_queue_status))
        // Live progress
        .route("/ws", get(ws::ws_handler))
        .with_state(Arc::clone(&state));

    Router::new()
        .nest("/api/v1", api_routes)
        .route("/metrics", get(handlers::get_metrics))
        .layer(middleware::from_fn(metrics_middleware))
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}
