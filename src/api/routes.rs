//! API Routes
//!
//! Configures the Axum router with all cache coordinator endpoints.

use axum::{
    routing::{get, post},
    Router,
};
use tower_http::{
    cors::{Any, CorsLayer},
    trace::TraceLayer,
};

use super::handlers::{
    fetch_handler, health_handler, ingest_handler, insert_handler, lookup_handler,
    metrics_handler, notify_handler, recent_keys_handler, AppState,
};

/// Creates the main router with all endpoints configured.
///
/// # Endpoints
/// - `GET /cache?event_id=` - Look up a cached event
/// - `POST /cache` - Admit an event into the cache
/// - `GET /cache/metrics` - Metrics snapshot
/// - `POST /events-cache` - Usage notification
/// - `GET /events-cache/keys` - Recently touched keys
/// - `POST /events` - Ingest events into the durable store
/// - `GET /events/:id` - Read-through lookup
/// - `GET /health` - Health check endpoint
///
/// # Middleware
/// - CORS: Allows any origin
/// - Tracing: Logs all requests
pub fn create_router(state: AppState) -> Router {
    // Configure CORS middleware
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods(Any)
        .allow_headers(Any);

    Router::new()
        .route("/cache", get(lookup_handler).post(insert_handler))
        .route("/cache/metrics", get(metrics_handler))
        .route("/events-cache", post(notify_handler))
        .route("/events-cache/keys", get(recent_keys_handler))
        .route("/events", post(ingest_handler))
        .route("/events/:id", get(fetch_handler))
        .route("/health", get(health_handler))
        .layer(cors)
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}
