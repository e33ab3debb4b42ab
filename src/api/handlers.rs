//! API Handlers
//!
//! HTTP request handlers for each cache coordinator endpoint.

use std::sync::Arc;

use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    Json,
};
use serde_json::Value;
use tracing::info;

use crate::cache::CacheService;
use crate::config::Config;
use crate::error::{CacheError, Result};
use crate::models::{
    EventResponse, HealthResponse, IngestResponse, InsertRequest, InsertResponse, KeysResponse,
    LookupQuery, MetricsResponse, NotifyRequest,
};
use crate::store::{MemoryEventStore, MemoryStore};

/// Application state shared across all handlers.
#[derive(Clone)]
pub struct AppState {
    pub service: Arc<CacheService>,
}

impl AppState {
    /// Creates a new AppState around an existing service.
    pub fn new(service: CacheService) -> Self {
        Self {
            service: Arc::new(service),
        }
    }

    /// Creates a new AppState from configuration, backed by in-memory stores.
    pub fn from_config(config: &Config) -> Self {
        let service = CacheService::new(
            config,
            Arc::new(MemoryStore::new()),
            Arc::new(MemoryEventStore::new()),
        );
        Self::new(service)
    }
}

/// Handler for GET /cache?event_id=
///
/// Returns the cached event, or 404 with a null event on a miss.
pub async fn lookup_handler(
    State(state): State<AppState>,
    Query(query): Query<LookupQuery>,
) -> Result<(StatusCode, Json<EventResponse>)> {
    let id = query.id().map_err(CacheError::MalformedRequest)?;

    match state.service.lookup(id).await? {
        Some(event) => Ok((StatusCode::OK, Json(EventResponse::found(event)))),
        None => Ok((StatusCode::NOT_FOUND, Json(EventResponse::missing()))),
    }
}

/// Handler for POST /cache
///
/// Admits an event, evicting under the requested policy if the cache is full.
pub async fn insert_handler(
    State(state): State<AppState>,
    Json(req): Json<InsertRequest>,
) -> Result<Json<InsertResponse>> {
    // Validate request
    if let Some(error_msg) = req.validate() {
        return Err(CacheError::MalformedRequest(error_msg));
    }
    let event = req
        .event
        .ok_or_else(|| CacheError::MalformedRequest("event is required".to_string()))?;

    let (key, admission) = state
        .service
        .insert(&event, req.ttl, req.policy.as_deref())
        .await?;

    Ok(Json(InsertResponse::new(key, &admission)))
}

/// Handler for GET /cache/metrics
pub async fn metrics_handler(State(state): State<AppState>) -> Json<MetricsResponse> {
    let service = &state.service;
    let resident_keys = service.controller().resident_count().await.ok();

    Json(MetricsResponse {
        snapshot: service.metrics().snapshot(),
        capacity: service.controller().capacity(),
        resident_keys,
        store: service.store_info().await,
    })
}

/// Handler for POST /events-cache
///
/// Records a usage notification and returns the recency buffer.
pub async fn notify_handler(
    State(state): State<AppState>,
    Json(req): Json<NotifyRequest>,
) -> Result<Json<KeysResponse>> {
    if let Some(error_msg) = req.validate() {
        return Err(CacheError::MalformedRequest(error_msg));
    }
    let event = req
        .event
        .ok_or_else(|| CacheError::MalformedRequest("event is required".to_string()))?;

    let (keys, policy) = state.service.notify(&event, req.policy.as_deref()).await?;
    Ok(Json(KeysResponse {
        keys,
        policy: Some(policy),
    }))
}

/// Handler for GET /events-cache/keys
pub async fn recent_keys_handler(State(state): State<AppState>) -> Json<KeysResponse> {
    Json(KeysResponse {
        keys: state.service.reporter().recent_keys().await,
        policy: None,
    })
}

/// Handler for POST /events
///
/// Ingests a batch of events into the durable store.
pub async fn ingest_handler(
    State(state): State<AppState>,
    Json(events): Json<Vec<Value>>,
) -> Json<IngestResponse> {
    let total = events.len();
    let inserted = state.service.ingest(events).await;
    info!("Ingested {} of {} events", inserted, total);

    Json(IngestResponse { inserted })
}

/// Handler for GET /events/:id
///
/// Read-through: cache first, then the durable store.
pub async fn fetch_handler(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> Result<Json<EventResponse>> {
    match state.service.fetch(&id).await? {
        Some(event) => Ok(Json(EventResponse::found(event))),
        None => Err(CacheError::NotFound(format!("event {}", id))),
    }
}

/// Handler for GET /health
pub async fn health_handler() -> Json<HealthResponse> {
    Json(HealthResponse::healthy())
}
