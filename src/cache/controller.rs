//! Capacity Controller Module
//!
//! Owns the eviction decision. Admissions are serialized through the
//! insertion-order lock, so the capacity check and the write that follows it
//! cannot interleave with another admission.

use std::collections::{HashMap, HashSet};
use std::future::Future;
use std::sync::Arc;
use std::time::Duration;

use tokio::sync::Mutex;
use tracing::{debug, info, warn};

use crate::cache::{select_victim, CacheMetrics, Candidate, EvictionPolicy, KeyOrder};
use crate::error::{CacheError, Result};
use crate::store::{with_timeout, KeyTtl, KvStore, KEY_PATTERN};

/// Result of admitting a key.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Admission {
    /// Key was already resident; its value and TTL were renewed
    Refreshed,
    /// Key was written without evicting anything
    Inserted,
    /// Key was written after evicting the listed keys
    Evicted(Vec<String>),
}

impl Admission {
    pub fn label(&self) -> &'static str {
        match self {
            Admission::Refreshed => "refreshed",
            Admission::Inserted => "inserted",
            Admission::Evicted(_) => "evicted",
        }
    }

    pub fn victims(&self) -> &[String] {
        match self {
            Admission::Evicted(victims) => victims,
            _ => &[],
        }
    }
}

/// Keys this controller admitted that are still believed resident.
#[derive(Debug, Default)]
struct Admitted {
    /// Admission order, oldest first
    order: KeyOrder,
    /// TTL each key was admitted with
    ttls: HashMap<String, Duration>,
}

impl Admitted {
    fn insert(&mut self, key: &str, ttl: Duration) {
        self.order.touch(key);
        self.ttls.insert(key.to_string(), ttl);
    }

    fn remove(&mut self, key: &str) {
        self.order.remove(key);
        self.ttls.remove(key);
    }

    /// Drops every key not in `resident`.
    fn prune(&mut self, resident: &HashSet<&str>) {
        self.order.retain(|key| resident.contains(key.as_str()));
        self.ttls.retain(|key, _| resident.contains(key.as_str()));
    }
}

// == Capacity Controller ==
pub struct CapacityController {
    store: Arc<dyn KvStore>,
    metrics: Arc<CacheMetrics>,
    admitted: Mutex<Admitted>,
    capacity: usize,
    default_ttl: Duration,
    default_policy: EvictionPolicy,
    timeout: Duration,
}

impl CapacityController {
    /// Creates a controller enforcing `capacity` (at least one) resident keys.
    pub fn new(
        store: Arc<dyn KvStore>,
        metrics: Arc<CacheMetrics>,
        capacity: usize,
        default_ttl: Duration,
        default_policy: EvictionPolicy,
        timeout: Duration,
    ) -> Self {
        Self {
            store,
            metrics,
            admitted: Mutex::new(Admitted::default()),
            capacity: capacity.max(1),
            default_ttl,
            default_policy,
            timeout,
        }
    }

    pub fn capacity(&self) -> usize {
        self.capacity
    }

    pub fn default_policy(&self) -> EvictionPolicy {
        self.default_policy
    }

    /// TTL `key` was admitted with, or the default for keys admitted
    /// by other writers.
    pub async fn admitted_ttl(&self, key: &str) -> Duration {
        self.admitted
            .lock()
            .await
            .ttls
            .get(key)
            .copied()
            .unwrap_or(self.default_ttl)
    }

    // == Admit ==
    /// Writes `key`, evicting under `policy` first if the cache is full.
    ///
    /// Fails with `StoreUnavailable` if any store call fails or times out;
    /// the key must then be treated as not admitted.
    pub async fn admit(
        &self,
        key: &str,
        value: String,
        ttl: Option<Duration>,
        policy: EvictionPolicy,
    ) -> Result<Admission> {
        let ttl = ttl.unwrap_or(self.default_ttl);
        let mut admitted = self.admitted.lock().await;

        if self.call("EXISTS", self.store.exists(key)).await? {
            self.call("SETEX", self.store.set_ex(key, ttl, value)).await?;
            // Refreshes keep their place in the admission order
            admitted.ttls.insert(key.to_string(), ttl);
            debug!("Refreshed resident key {}", key);
            return Ok(Admission::Refreshed);
        }

        let victims = self.make_room(&mut admitted, policy, 1).await?;
        self.call("SETEX", self.store.set_ex(key, ttl, value)).await?;
        admitted.insert(key, ttl);

        if victims.is_empty() {
            Ok(Admission::Inserted)
        } else {
            Ok(Admission::Evicted(victims))
        }
    }

    // == Absorb ==
    /// Applies a batch of usage signals from the reporter.
    ///
    /// Each resident key gets the TTL it was admitted with again, then
    /// capacity is re-checked. Signals are idempotent: repeating a batch
    /// only refreshes TTLs again.
    pub async fn absorb(
        &self,
        keys: &[String],
        policy: Option<EvictionPolicy>,
    ) -> Result<Vec<String>> {
        let policy = policy.unwrap_or(self.default_policy);
        let mut seen = HashSet::new();
        let mut admitted = self.admitted.lock().await;

        for key in keys.iter().filter(|key| seen.insert(key.as_str())) {
            let ttl = admitted.ttls.get(key).copied().unwrap_or(self.default_ttl);
            if self.call("EXPIRE", self.store.expire(key, ttl)).await? {
                debug!("Usage signal refreshed {}", key);
            }
        }

        self.make_room(&mut admitted, policy, 0).await
    }

    /// Number of resident cache keys.
    pub async fn resident_count(&self) -> Result<usize> {
        Ok(self.call("KEYS", self.store.keys(KEY_PATTERN)).await?.len())
    }

    /// Evicts until `incoming` more keys fit within capacity.
    ///
    /// Keys that left the store since the last call are forgotten first,
    /// so bookkeeping stays bounded by what is resident.
    async fn make_room(
        &self,
        admitted: &mut Admitted,
        policy: EvictionPolicy,
        incoming: usize,
    ) -> Result<Vec<String>> {
        let limit = self.capacity.saturating_sub(incoming);
        let mut victims = Vec::new();
        let mut rounds_left: Option<usize> = None;

        loop {
            let keys = self.call("KEYS", self.store.keys(KEY_PATTERN)).await?;
            admitted.prune(&keys.iter().map(String::as_str).collect());
            if keys.len() <= limit {
                return Ok(victims);
            }

            // Every round removes a key or learns one is gone, so the
            // initial overflow bounds the number of rounds.
            let remaining = rounds_left.get_or_insert(keys.len() + 1);
            if *remaining == 0 {
                return Err(CacheError::CacheFull(format!(
                    "{} keys resident, capacity {}",
                    keys.len(),
                    self.capacity
                )));
            }
            *remaining -= 1;

            let candidates = self.candidates(keys).await?;
            admitted.prune(
                &candidates
                    .iter()
                    .filter(|c| c.ttl != KeyTtl::Missing)
                    .map(|c| c.key.as_str())
                    .collect(),
            );

            let Some(victim) = select_victim(policy, &candidates, &admitted.order) else {
                return Err(CacheError::CacheFull(format!(
                    "no eviction candidate under {} policy",
                    policy
                )));
            };

            match self.evict(&victim, admitted).await {
                Ok(()) => {
                    info!("Evicted {} under {} policy", victim, policy);
                    self.metrics.record_eviction(policy);
                    victims.push(victim);
                }
                Err(CacheError::EvictionRaceLost(key)) => {
                    debug!("Victim {} expired before eviction, reselecting", key);
                }
                Err(err) => return Err(err),
            }
        }
    }

    async fn candidates(&self, keys: Vec<String>) -> Result<Vec<Candidate>> {
        let mut candidates = Vec::with_capacity(keys.len());
        for key in keys {
            let ttl = self.call("TTL", self.store.ttl(&key)).await?;
            candidates.push(Candidate::new(key, ttl));
        }
        Ok(candidates)
    }

    async fn evict(&self, victim: &str, admitted: &mut Admitted) -> Result<()> {
        let deleted = self.call("DEL", self.store.del(victim)).await?;
        admitted.remove(victim);
        if deleted {
            Ok(())
        } else {
            Err(CacheError::EvictionRaceLost(victim.to_string()))
        }
    }

    async fn call<T, F>(&self, op: &str, call: F) -> Result<T>
    where
        F: Future<Output = Result<T>>,
    {
        with_timeout(self.timeout, op, call).await.inspect_err(|err| {
            warn!("Store {} failed: {}", op, err);
        })
    }
}
