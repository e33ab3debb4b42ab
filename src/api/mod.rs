//! API Module
//!
//! HTTP handlers and routing for the cache coordinator REST API.
//!
//! # Endpoints
//! - `GET /cache?event_id=` - Look up a cached event
//! - `POST /cache` - Admit an event
//! - `GET /cache/metrics` - Metrics snapshot
//! - `POST /events-cache` - Usage notification
//! - `GET /events-cache/keys` - Recently touched keys
//! - `POST /events` - Durable-store ingest
//! - `GET /events/:id` - Read-through lookup
//! - `GET /health` - Health check endpoint

pub mod handlers;
pub mod routes;

pub use handlers::*;
pub use routes::create_router;
