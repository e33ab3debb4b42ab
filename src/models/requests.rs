//! Request DTOs for the cache server API
//!
//! Defines the structure of incoming HTTP request bodies and query strings.

use serde::Deserialize;
use serde_json::Value;

use crate::store::event_id;

/// Query string for GET /cache
#[derive(Debug, Clone, Default, Deserialize)]
pub struct LookupQuery {
    pub event_id: Option<String>,
}

impl LookupQuery {
    /// Returns the requested id, or an error message if it is missing or blank.
    pub fn id(&self) -> std::result::Result<&str, String> {
        match self.event_id.as_deref().map(str::trim) {
            Some(id) if !id.is_empty() => Ok(id),
            _ => Err("event_id query parameter is required".to_string()),
        }
    }
}

/// Request body for POST /cache
///
/// # Fields
/// - `event`: The event to cache; must carry an `id`
/// - `ttl`: Optional TTL in seconds (uses default if not specified)
/// - `policy`: Optional eviction policy for this admission
#[derive(Debug, Clone, Deserialize)]
pub struct InsertRequest {
    #[serde(default)]
    pub event: Option<Value>,
    #[serde(default)]
    pub ttl: Option<u64>,
    #[serde(default)]
    pub policy: Option<String>,
}

impl InsertRequest {
    /// Validates the request data
    ///
    /// Returns an error message if validation fails, None if valid.
    pub fn validate(&self) -> Option<String> {
        validate_event(self.event.as_ref())
    }
}

/// Request body for POST /events-cache
#[derive(Debug, Clone, Deserialize)]
pub struct NotifyRequest {
    #[serde(default)]
    pub event: Option<Value>,
    #[serde(default)]
    pub policy: Option<String>,
}

impl NotifyRequest {
    pub fn validate(&self) -> Option<String> {
        validate_event(self.event.as_ref())
    }
}

fn validate_event(event: Option<&Value>) -> Option<String> {
    match event {
        None | Some(Value::Null) => Some("event is required".to_string()),
        Some(event) if !event.is_object() => Some("event must be an object".to_string()),
        Some(event) if event_id(event).is_none() => Some("event.id is required".to_string()),
        Some(_) => None,
    }
}
