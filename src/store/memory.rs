//! In-Memory Key-Value Store
//!
//! HashMap-backed implementation of [`KvStore`] with TTL expiration. Expired
//! entries vanish lazily on access and in bulk via [`MemoryStore::purge_expired`].

use std::collections::HashMap;
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::Duration;

use async_trait::async_trait;
use tokio::sync::RwLock;
use tokio::time::Instant;

use crate::error::Result;
use crate::store::entry::CacheEntry;
use crate::store::kv::{pattern_matches, KeyTtl, KvStore, StoreInfo};

// == Memory Store ==
/// Key-value store kept in process memory.
#[derive(Debug, Default)]
pub struct MemoryStore {
    /// Key-value storage
    entries: RwLock<HashMap<String, CacheEntry>>,
    /// Keys dropped because their TTL ran out
    expired: AtomicU64,
}

impl MemoryStore {
    // == Constructor ==
    pub fn new() -> Self {
        Self::default()
    }

    /// Writes a key that never expires.
    pub async fn set_persistent(&self, key: &str, value: String) {
        self.entries
            .write()
            .await
            .insert(key.to_string(), CacheEntry::new(value, None));
    }

    // == Purge Expired ==
    /// Removes all expired entries.
    ///
    /// Returns the number of entries removed.
    pub async fn purge_expired(&self) -> usize {
        let now = Instant::now();
        let mut entries = self.entries.write().await;
        let before = entries.len();
        entries.retain(|_, entry| !entry.is_expired_at(now));
        let removed = before - entries.len();

        self.expired.fetch_add(removed as u64, Ordering::Relaxed);
        removed
    }

    /// Number of entries held, including expired ones not yet purged.
    pub async fn len(&self) -> usize {
        self.entries.read().await.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.entries.read().await.is_empty()
    }

    /// Drops `key` if it has expired; returns true if it is still live.
    async fn live(&self, key: &str) -> bool {
        let now = Instant::now();
        {
            let entries = self.entries.read().await;
            match entries.get(key) {
                None => return false,
                Some(entry) if !entry.is_expired_at(now) => return true,
                Some(_) => {}
            }
        }

        let mut entries = self.entries.write().await;
        if entries.get(key).is_some_and(|entry| entry.is_expired_at(now)) {
            entries.remove(key);
            self.expired.fetch_add(1, Ordering::Relaxed);
        }
        false
    }
}

#[async_trait]
impl KvStore for MemoryStore {
    async fn get(&self, key: &str) -> Result<Option<String>> {
        if !self.live(key).await {
            return Ok(None);
        }
        Ok(self
            .entries
            .read()
            .await
            .get(key)
            .map(|entry| entry.value.clone()))
    }

    async fn set_ex(&self, key: &str, ttl: Duration, value: String) -> Result<()> {
        self.entries
            .write()
            .await
            .insert(key.to_string(), CacheEntry::new(value, Some(ttl)));
        Ok(())
    }

    async fn expire(&self, key: &str, ttl: Duration) -> Result<bool> {
        if !self.live(key).await {
            return Ok(false);
        }
        match self.entries.write().await.get_mut(key) {
            Some(entry) => {
                entry.refresh(ttl);
                Ok(true)
            }
            None => Ok(false),
        }
    }

    async fn exists(&self, key: &str) -> Result<bool> {
        Ok(self.live(key).await)
    }

    async fn keys(&self, pattern: &str) -> Result<Vec<String>> {
        let now = Instant::now();
        let mut keys: Vec<String> = self
            .entries
            .read()
            .await
            .iter()
            .filter(|(key, entry)| !entry.is_expired_at(now) && pattern_matches(pattern, key))
            .map(|(key, _)| key.clone())
            .collect();
        keys.sort();
        Ok(keys)
    }

    async fn del(&self, key: &str) -> Result<bool> {
        if !self.live(key).await {
            return Ok(false);
        }
        Ok(self.entries.write().await.remove(key).is_some())
    }

    async fn ttl(&self, key: &str) -> Result<KeyTtl> {
        let now = Instant::now();
        let entries = self.entries.read().await;
        Ok(match entries.get(key) {
            None => KeyTtl::Missing,
            Some(entry) if entry.is_expired_at(now) => KeyTtl::Missing,
            Some(entry) => match entry.ttl_remaining_at(now) {
                Some(remaining) => KeyTtl::Expires(remaining),
                None => KeyTtl::Persistent,
            },
        })
    }

    async fn info(&self) -> Result<StoreInfo> {
        let now = Instant::now();
        let entries = self.entries.read().await;
        let live = entries.iter().filter(|(_, entry)| !entry.is_expired_at(now));

        let (keys, used_memory) = live.fold((0, 0), |(count, bytes), (key, entry)| {
            (count + 1, bytes + key.len() + entry.size_bytes())
        });

        Ok(StoreInfo {
            keys,
            expired_keys: self.expired.load(Ordering::Relaxed),
            used_memory,
        })
    }
}
