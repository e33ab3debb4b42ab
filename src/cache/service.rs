//! Cache Service Module
//!
//! The cache-facing API: lookups, admissions, read-through fetches and
//! usage notifications, wired to the reporter, controller and metrics.

use std::sync::Arc;
use std::time::Duration;

use serde_json::Value;
use tokio::time::Instant;
use tracing::warn;

use crate::cache::{
    Admission, CacheMetrics, CapacityController, EvictionPolicy, Outcome, UsageReporter,
};
use crate::config::Config;
use crate::error::{CacheError, Result};
use crate::store::{event_id, event_key, with_timeout, Event, EventStore, KeyTtl, KvStore, StoreInfo};

// == Cache Service ==
pub struct CacheService {
    store: Arc<dyn KvStore>,
    events: Arc<dyn EventStore>,
    controller: Arc<CapacityController>,
    reporter: Arc<UsageReporter>,
    metrics: Arc<CacheMetrics>,
    timeout: Duration,
}

impl CacheService {
    /// Builds the service and its components from configuration.
    ///
    /// An unknown `eviction_policy` falls back to ttl and is counted.
    pub fn new(config: &Config, store: Arc<dyn KvStore>, events: Arc<dyn EventStore>) -> Self {
        let metrics = Arc::new(CacheMetrics::new(EvictionPolicy::Ttl));
        let policy = EvictionPolicy::resolve(&config.eviction_policy, &metrics);
        metrics.set_policy(policy);

        let controller = Arc::new(CapacityController::new(
            store.clone(),
            metrics.clone(),
            config.capacity,
            config.default_ttl(),
            policy,
            config.store_timeout(),
        ));
        let reporter = Arc::new(UsageReporter::new(
            controller.clone(),
            metrics.clone(),
            config.recency_threshold,
            config.recency_flush,
            config.report_mode,
        ));

        Self {
            store,
            events,
            controller,
            reporter,
            metrics,
            timeout: config.store_timeout(),
        }
    }

    pub fn metrics(&self) -> &Arc<CacheMetrics> {
        &self.metrics
    }

    pub fn reporter(&self) -> &Arc<UsageReporter> {
        &self.reporter
    }

    pub fn controller(&self) -> &Arc<CapacityController> {
        &self.controller
    }

    /// Resolves an optional per-request policy against the deployment default.
    pub fn resolve_policy(&self, raw: Option<&str>) -> EvictionPolicy {
        match raw {
            Some(raw) => EvictionPolicy::resolve(raw, &self.metrics),
            None => self.controller.default_policy(),
        }
    }

    // == Lookup ==
    /// Returns the cached event, refreshing it to its admitted TTL on a hit.
    ///
    /// A store failure is returned as-is and counts as neither hit nor miss.
    pub async fn lookup(&self, id: &str) -> Result<Option<Value>> {
        let key = event_key(id);
        let started = Instant::now();

        let Some(raw) = with_timeout(self.timeout, "GET", self.store.get(&key)).await? else {
            self.reporter.report(&key, Outcome::Miss, started.elapsed()).await;
            return Ok(None);
        };

        let configured = self.controller.admitted_ttl(&key).await;
        match with_timeout(self.timeout, "TTL", self.store.ttl(&key)).await {
            Ok(KeyTtl::Expires(remaining)) => {
                self.metrics.record_ttl_consumed(configured.saturating_sub(remaining));
            }
            Ok(_) => {}
            Err(err) => warn!("Could not read TTL of {}: {}", key, err),
        }
        if let Err(err) = with_timeout(self.timeout, "EXPIRE", self.store.expire(&key, configured)).await {
            warn!("Could not refresh {}: {}", key, err);
        }

        let event = serde_json::from_str(&raw)
            .map_err(|e| CacheError::Internal(format!("corrupt entry {}: {}", key, e)))?;
        self.reporter.report(&key, Outcome::Hit, started.elapsed()).await;
        Ok(Some(event))
    }

    // == Insert ==
    /// Admits an event into the cache. The event must carry an id.
    pub async fn insert(
        &self,
        event: &Value,
        ttl: Option<u64>,
        policy: Option<&str>,
    ) -> Result<(String, Admission)> {
        let id = event_id(event)
            .ok_or_else(|| CacheError::MalformedRequest("event.id is required".to_string()))?;
        let policy = self.resolve_policy(policy);
        let key = event_key(&id);
        let started = Instant::now();

        let admission = self
            .controller
            .admit(&key, event.to_string(), ttl.map(Duration::from_secs), policy)
            .await?;

        self.reporter.report(&key, Outcome::Insert, started.elapsed()).await;
        Ok((key, admission))
    }

    // == Fetch ==
    /// Read-through: serve from cache, else load from the durable store and
    /// admit it. A failed admission is logged and the event still returned.
    pub async fn fetch(&self, id: &str) -> Result<Option<Value>> {
        if let Some(event) = self.lookup(id).await? {
            return Ok(Some(event));
        }

        let Some(event) = with_timeout(self.timeout, "SELECT", self.events.get(id)).await? else {
            return Ok(None);
        };
        let event = serde_json::to_value(event).map_err(|e| CacheError::Internal(e.to_string()))?;

        if let Err(err) = self.insert(&event, None, None).await {
            warn!("Read-through fill of {} failed: {}", id, err);
        }
        Ok(Some(event))
    }

    // == Notify ==
    /// Records a usage notification for `event` and returns the recency
    /// buffer together with the accepted policy.
    pub async fn notify(&self, event: &Value, policy: Option<&str>) -> Result<(Vec<String>, EvictionPolicy)> {
        let id = event_id(event)
            .ok_or_else(|| CacheError::MalformedRequest("event.id is required".to_string()))?;
        let policy = self.resolve_policy(policy);
        let keys = self.reporter.touch(&event_key(&id), Some(policy)).await;
        Ok((keys, policy))
    }

    // == Ingest ==
    /// Writes events to the durable store, skipping entries without an id.
    ///
    /// Returns how many were inserted.
    pub async fn ingest(&self, events: Vec<Value>) -> usize {
        let mut inserted = 0;
        for value in events {
            let event = match Event::from_value(value) {
                Ok(event) => event,
                Err(err) => {
                    warn!("Skipping event: {}", err);
                    continue;
                }
            };
            let id = event.id.clone();
            match with_timeout(self.timeout, "INSERT", self.events.insert(event)).await {
                Ok(()) => inserted += 1,
                Err(err) => warn!("Error inserting {}: {}", id, err),
            }
        }
        inserted
    }

    /// Store-side INFO, or None if the store does not answer in time.
    pub async fn store_info(&self) -> Option<StoreInfo> {
        match with_timeout(self.timeout, "INFO", self.store.info()).await {
            Ok(info) => Some(info),
            Err(err) => {
                warn!("INFO failed: {}", err);
                None
            }
        }
    }
}
