//! Store Entry Module
//!
//! Defines the record held by the in-memory key-value store.

use std::time::Duration;

use tokio::time::Instant;

// == Cache Entry ==
/// A single value held by the key-value store, with its expiry deadline.
#[derive(Debug, Clone)]
pub struct CacheEntry {
    /// The stored payload
    pub value: String,
    /// When the entry was written
    pub created_at: Instant,
    /// Expiration deadline, None = persistent
    pub expires_at: Option<Instant>,
}

impl CacheEntry {
    // == Constructor ==
    /// Creates a new entry expiring `ttl` from now, or never if `ttl` is None.
    pub fn new(value: String, ttl: Option<Duration>) -> Self {
        let now = Instant::now();
        Self {
            value,
            created_at: now,
            expires_at: ttl.map(|ttl| now + ttl),
        }
    }

    // == Is Expired ==
    /// An entry is expired once `now` has reached its deadline.
    pub fn is_expired_at(&self, now: Instant) -> bool {
        match self.expires_at {
            Some(deadline) => now >= deadline,
            None => false,
        }
    }

    // == Time To Live ==
    /// Remaining TTL at `now`; zero once expired, None if persistent.
    pub fn ttl_remaining_at(&self, now: Instant) -> Option<Duration> {
        self.expires_at
            .map(|deadline| deadline.saturating_duration_since(now))
    }

    // == Refresh ==
    /// Restarts the countdown so the entry expires `ttl` from now.
    pub fn refresh(&mut self, ttl: Duration) {
        self.expires_at = Some(Instant::now() + ttl);
    }

    /// Approximate footprint of the payload in bytes.
    pub fn size_bytes(&self) -> usize {
        self.value.len()
    }
}
