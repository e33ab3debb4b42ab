//! Store Module
//!
//! Collaborator interfaces the cache coordinator sits between: the
//! TTL-capable key-value store and the durable event store, each with an
//! in-memory implementation.

mod entry;
mod events;
mod kv;
mod memory;

pub use entry::CacheEntry;
pub use events::{event_id, Event, EventStore, MemoryEventStore};
pub use kv::{pattern_matches, with_timeout, KeyTtl, KvStore, StoreInfo};
pub use memory::MemoryStore;

/// Prefix shared by every cached event key.
pub const KEY_PREFIX: &str = "event:";

/// KEYS pattern matching every cached event.
pub const KEY_PATTERN: &str = "event:*";

/// Builds the cache key for an event id.
pub fn event_key(event_id: &str) -> String {
    format!("{}{}", KEY_PREFIX, event_id)
}
