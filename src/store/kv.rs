//! Key-Value Store Interface
//!
//! The narrow set of primitives the capacity controller needs from the
//! backing store: GET, SETEX, EXPIRE, EXISTS, KEYS, DEL, TTL and INFO.

use std::future::Future;
use std::time::Duration;

use async_trait::async_trait;
use serde::Serialize;

use crate::error::{CacheError, Result};

/// Remaining lifetime of a key as reported by the store.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum KeyTtl {
    /// Key is not resident
    Missing,
    /// Key is resident and never expires
    Persistent,
    /// Key is resident and expires after the given duration
    Expires(Duration),
}

/// Store-side counters reported by INFO.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct StoreInfo {
    /// Keys currently resident
    pub keys: usize,
    /// Keys removed because their TTL ran out
    pub expired_keys: u64,
    /// Approximate bytes held by keys and values
    pub used_memory: usize,
}

/// Backing key-value store.
///
/// Implementations must be safe to share across request handlers. Transport
/// failures surface as [`CacheError::StoreUnavailable`].
#[async_trait]
pub trait KvStore: Send + Sync {
    /// Returns the value for `key`, or None if absent or expired.
    async fn get(&self, key: &str) -> Result<Option<String>>;

    /// Writes `value` under `key`, expiring after `ttl`.
    async fn set_ex(&self, key: &str, ttl: Duration, value: String) -> Result<()>;

    /// Restarts the countdown of a resident key. Returns false if absent.
    async fn expire(&self, key: &str, ttl: Duration) -> Result<bool>;

    async fn exists(&self, key: &str) -> Result<bool>;

    /// Lists resident keys matching `pattern` (exact name or trailing `*` glob).
    async fn keys(&self, pattern: &str) -> Result<Vec<String>>;

    /// Removes `key`. Returns false if it was already gone.
    async fn del(&self, key: &str) -> Result<bool>;

    async fn ttl(&self, key: &str) -> Result<KeyTtl>;

    async fn info(&self) -> Result<StoreInfo>;
}

/// Matches a key against a KEYS pattern.
///
/// Only exact names and a single trailing `*` are supported.
pub fn pattern_matches(pattern: &str, key: &str) -> bool {
    match pattern.strip_suffix('*') {
        Some(prefix) => key.starts_with(prefix),
        None => key == pattern,
    }
}

/// Runs a store call under a deadline, mapping expiry to `StoreUnavailable`.
pub async fn with_timeout<T, F>(limit: Duration, op: &str, call: F) -> Result<T>
where
    F: Future<Output = Result<T>>,
{
    match tokio::time::timeout(limit, call).await {
        Ok(result) => result,
        Err(_) => Err(CacheError::StoreUnavailable(format!(
            "{} timed out after {}ms",
            op,
            limit.as_millis()
        ))),
    }
}
