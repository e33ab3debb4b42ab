//! Response DTOs for the cache server API
//!
//! Defines the structure of outgoing HTTP response bodies.

use serde::Serialize;
use serde_json::Value;

use crate::cache::{Admission, EvictionPolicy, MetricsSnapshot};
use crate::store::StoreInfo;

/// Response body for GET /cache and GET /events/:id
///
/// `event` is null on a miss.
#[derive(Debug, Clone, Serialize)]
pub struct EventResponse {
    pub event: Option<Value>,
}

impl EventResponse {
    pub fn found(event: Value) -> Self {
        Self { event: Some(event) }
    }

    pub fn missing() -> Self {
        Self { event: None }
    }
}

/// Response body for POST /cache
#[derive(Debug, Clone, Serialize)]
pub struct InsertResponse {
    pub ok: bool,
    /// The cache key the event was stored under
    pub key: String,
    /// `inserted`, `refreshed` or `evicted`
    pub outcome: &'static str,
    /// Keys evicted to make room
    pub evicted: Vec<String>,
}

impl InsertResponse {
    /// Creates a new InsertResponse from an admission result
    pub fn new(key: impl Into<String>, admission: &Admission) -> Self {
        Self {
            ok: true,
            key: key.into(),
            outcome: admission.label(),
            evicted: admission.victims().to_vec(),
        }
    }
}

/// Response body for GET /cache/metrics
#[derive(Debug, Clone, Serialize)]
pub struct MetricsResponse {
    #[serde(flatten)]
    pub snapshot: MetricsSnapshot,
    pub capacity: usize,
    /// Resident cache keys, absent if the store did not answer
    pub resident_keys: Option<usize>,
    pub store: Option<StoreInfo>,
}

/// Response body for POST /events-cache and GET /events-cache/keys
#[derive(Debug, Clone, Serialize)]
pub struct KeysResponse {
    pub keys: Vec<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub policy: Option<EvictionPolicy>,
}

/// Response body for POST /events
#[derive(Debug, Clone, Serialize)]
pub struct IngestResponse {
    pub inserted: usize,
}

/// Response body for the health endpoint (GET /health)
#[derive(Debug, Clone, Serialize)]
pub struct HealthResponse {
    /// Health status (e.g., "healthy")
    pub status: String,
    /// Current timestamp in ISO 8601 format
    pub timestamp: String,
}

impl HealthResponse {
    /// Creates a new HealthResponse with current timestamp
    pub fn healthy() -> Self {
        Self {
            status: "healthy".to_string(),
            timestamp: chrono::Utc::now().to_rfc3339(),
        }
    }
}

/// Error response body for all error conditions
#[derive(Debug, Clone, Serialize)]
pub struct ErrorResponse {
    /// Error message describing what went wrong
    pub error: String,
}

impl ErrorResponse {
    /// Creates a new ErrorResponse
    pub fn new(error: impl Into<String>) -> Self {
        Self {
            error: error.into(),
        }
    }
}
