//! Durable Event Store
//!
//! The system of record behind the cache: one read path by id and one write
//! path. The cache coordinator only ever reaches it through [`EventStore`].

use std::collections::HashMap;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use tokio::sync::RwLock;

use crate::error::{CacheError, Result};

/// A traffic event as persisted by the durable store.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Event {
    pub id: String,
    pub timestamp: Option<i64>,
    pub latitude: Option<f64>,
    pub longitude: Option<f64>,
    #[serde(rename = "type")]
    pub kind: Option<String>,
    pub subtype: Option<String>,
    pub street: Option<String>,
    pub city: Option<String>,
    pub country: Option<String>,
    pub reliability: Option<f64>,
    #[serde(rename = "reportRating")]
    pub report_rating: Option<f64>,
    pub confidence: Option<f64>,
    #[serde(rename = "speedKMH")]
    pub speed_kmh: Option<f64>,
    pub length: Option<f64>,
    pub delay: Option<f64>,
}

impl Event {
    /// Builds an event from loosely-typed JSON, coercing a numeric id to a string.
    ///
    /// Unknown fields are ignored.
    pub fn from_value(mut value: Value) -> Result<Self> {
        let id = event_id(&value)
            .ok_or_else(|| CacheError::MalformedRequest("event id is required".to_string()))?;
        if let Some(fields) = value.as_object_mut() {
            fields.insert("id".to_string(), Value::String(id));
        }
        serde_json::from_value(value).map_err(|e| CacheError::MalformedRequest(e.to_string()))
    }
}

/// Extracts an event id from JSON; accepts non-empty strings and numbers.
pub fn event_id(event: &Value) -> Option<String> {
    match event.get("id")? {
        Value::String(id) if !id.trim().is_empty() => Some(id.clone()),
        Value::Number(id) => Some(id.to_string()),
        _ => None,
    }
}

/// Durable store of events keyed by id.
#[async_trait]
pub trait EventStore: Send + Sync {
    async fn get(&self, id: &str) -> Result<Option<Event>>;

    /// Inserts or replaces the event with the same id.
    async fn insert(&self, event: Event) -> Result<()>;
}

/// [`EventStore`] kept in process memory.
#[derive(Debug, Default)]
pub struct MemoryEventStore {
    events: RwLock<HashMap<String, Event>>,
}

impl MemoryEventStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub async fn len(&self) -> usize {
        self.events.read().await.len()
    }
}

#[async_trait]
impl EventStore for MemoryEventStore {
    async fn get(&self, id: &str) -> Result<Option<Event>> {
        Ok(self.events.read().await.get(id).cloned())
    }

    async fn insert(&self, event: Event) -> Result<()> {
        self.events.write().await.insert(event.id.clone(), event);
        Ok(())
    }
}
