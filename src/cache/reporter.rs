//! Key-Usage Reporter Module
//!
//! Records every cache access, folds hits and inserts into the recency log,
//! and delivers flushed batches to the capacity controller either inline
//! (push) or through an outbox drained by the poll task (pull).

use std::collections::VecDeque;
use std::str::FromStr;
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tokio::sync::Mutex;
use tracing::{debug, warn};

use crate::cache::{
    CacheMetrics, CapacityController, EvictionPolicy, FlushMode, Outcome, RecencyLog, UsageBatch,
    UsageSource,
};
use crate::error::Result;

/// Most keys held in the pull-mode outbox; older keys are dropped first.
pub const OUTBOX_LIMIT: usize = 10;

/// How flushed recency batches reach the capacity controller.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ReportMode {
    /// Deliver inline as part of the request that triggered the flush
    #[default]
    Push,
    /// Park batches for the poll task
    Pull,
}

impl FromStr for ReportMode {
    type Err = String;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        match s {
            "push" => Ok(ReportMode::Push),
            "pull" => Ok(ReportMode::Pull),
            other => Err(format!("unknown report mode: {}", other)),
        }
    }
}

/// One cache access.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct UsageRecord {
    pub key: String,
    pub outcome: Outcome,
    pub timestamp: DateTime<Utc>,
    pub latency_ms: f64,
}

/// Pull-mode batches waiting for the poll task, with the newest policy
/// they were reported under.
#[derive(Debug, Default)]
struct Outbox {
    keys: VecDeque<String>,
    policy: Option<EvictionPolicy>,
}

impl Outbox {
    /// Parks `keys` as newest, dropping the oldest beyond [`OUTBOX_LIMIT`].
    fn park(&mut self, keys: Vec<String>) {
        for key in keys {
            self.keys.retain(|k| k != &key);
            self.keys.push_back(key);
        }
        self.bound();
    }

    /// Puts `keys` back ahead of anything parked since they were taken.
    fn unpark(&mut self, keys: Vec<String>) {
        for key in keys.into_iter().rev() {
            if !self.keys.contains(&key) {
                self.keys.push_front(key);
            }
        }
        self.bound();
    }

    fn bound(&mut self) {
        while self.keys.len() > OUTBOX_LIMIT {
            self.keys.pop_front();
        }
    }
}

// == Usage Reporter ==
pub struct UsageReporter {
    log: Mutex<RecencyLog>,
    outbox: Mutex<Outbox>,
    mode: ReportMode,
    controller: Arc<CapacityController>,
    metrics: Arc<CacheMetrics>,
}

impl UsageReporter {
    pub fn new(
        controller: Arc<CapacityController>,
        metrics: Arc<CacheMetrics>,
        threshold: usize,
        flush: FlushMode,
        mode: ReportMode,
    ) -> Self {
        Self {
            log: Mutex::new(RecencyLog::new(threshold, flush)),
            outbox: Mutex::new(Outbox::default()),
            mode,
            controller,
            metrics,
        }
    }

    // == Report ==
    /// Records one access. Never fails: delivery problems are logged.
    pub async fn report(&self, key: &str, outcome: Outcome, latency: Duration) -> UsageRecord {
        self.metrics.record(outcome, latency);

        let record = UsageRecord {
            key: key.to_string(),
            outcome,
            timestamp: Utc::now(),
            latency_ms: latency.as_secs_f64() * 1000.0,
        };
        debug!(
            "Usage {:?} for {} in {:.3}ms",
            record.outcome, record.key, record.latency_ms
        );

        if outcome != Outcome::Miss {
            self.touch(key, None).await;
        }
        record
    }

    // == Touch ==
    /// Appends `key` to the recency log, delivering a batch if it flushes.
    ///
    /// Returns the log contents after the append.
    pub async fn touch(&self, key: &str, policy: Option<EvictionPolicy>) -> Vec<String> {
        let (flushed, contents) = {
            let mut log = self.log.lock().await;
            let flushed = log.append(key);
            (flushed, log.snapshot())
        };

        if let Some(batch) = flushed {
            self.deliver(batch, policy).await;
        }
        contents
    }

    async fn deliver(&self, batch: Vec<String>, policy: Option<EvictionPolicy>) {
        match self.mode {
            ReportMode::Push => {
                if let Err(err) = self.controller.absorb(&batch, policy).await {
                    warn!("Failed to deliver {} usage signals: {}", batch.len(), err);
                }
            }
            ReportMode::Pull => {
                let mut outbox = self.outbox.lock().await;
                outbox.park(batch);
                if policy.is_some() {
                    outbox.policy = policy;
                }
            }
        }
    }

    // == Recent Keys ==
    /// Undelivered outbox keys followed by the live log, newest last,
    /// capped at [`OUTBOX_LIMIT`].
    pub async fn recent_keys(&self) -> Vec<String> {
        let mut keys: Vec<String> = self.outbox.lock().await.keys.iter().cloned().collect();
        merge_newest(&mut keys, self.log.lock().await.snapshot());
        let overflow = keys.len().saturating_sub(OUTBOX_LIMIT);
        keys.drain(..overflow);
        keys
    }
}

/// Appends `newer` to `keys`, moving repeated keys to their newer position.
fn merge_newest(keys: &mut Vec<String>, newer: Vec<String>) {
    for key in newer {
        keys.retain(|k| k != &key);
        keys.push(key);
    }
}

#[async_trait]
impl UsageSource for UsageReporter {
    fn name(&self) -> &str {
        "local reporter"
    }

    /// Drains the outbox and samples the live log.
    async fn pull(&self) -> Result<UsageBatch> {
        let (mut keys, policy) = {
            let mut outbox = self.outbox.lock().await;
            let keys: Vec<String> = outbox.keys.drain(..).collect();
            (keys, outbox.policy.take())
        };
        merge_newest(&mut keys, self.log.lock().await.snapshot());
        Ok(UsageBatch { keys, policy })
    }

    /// Re-parks a batch the controller could not apply. A policy reported
    /// since the pull wins over the restored one.
    async fn restore(&self, batch: UsageBatch) {
        let mut outbox = self.outbox.lock().await;
        outbox.unpark(batch.keys);
        if outbox.policy.is_none() {
            outbox.policy = batch.policy;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::store::{KeyTtl, KvStore, MemoryStore, StoreInfo};
    use std::collections::HashSet;

    const TTL: Duration = Duration::from_secs(60);

    fn reporter(
        capacity: usize,
        threshold: usize,
        mode: ReportMode,
    ) -> (UsageReporter, Arc<MemoryStore>, Arc<CacheMetrics>) {
        let store = Arc::new(MemoryStore::new());
        let metrics = Arc::new(CacheMetrics::new(EvictionPolicy::Ttl));
        let controller = Arc::new(CapacityController::new(
            store.clone(),
            metrics.clone(),
            capacity,
            TTL,
            EvictionPolicy::Ttl,
            Duration::from_secs(2),
        ));
        let reporter = UsageReporter::new(controller, metrics.clone(), threshold, FlushMode::Clear, mode);
        (reporter, store, metrics)
    }

    #[tokio::test]
    async fn test_report_records_metrics() {
        let (reporter, _, metrics) = reporter(10, 10, ReportMode::Push);

        let record = reporter.report("event:1", Outcome::Hit, Duration::from_millis(4)).await;
        reporter.report("event:2", Outcome::Miss, Duration::from_millis(2)).await;

        assert_eq!(record.outcome, Outcome::Hit);
        assert!((record.latency_ms - 4.0).abs() < 1e-9);
        let snapshot = metrics.snapshot();
        assert_eq!(snapshot.hits, 1);
        assert_eq!(snapshot.misses, 1);
    }

    #[tokio::test]
    async fn test_misses_stay_out_of_recency_log() {
        let (reporter, _, _) = reporter(10, 10, ReportMode::Push);

        reporter.report("event:1", Outcome::Miss, Duration::ZERO).await;
        reporter.report("event:2", Outcome::Insert, Duration::ZERO).await;

        assert_eq!(reporter.recent_keys().await, vec!["event:2".to_string()]);
    }

    #[tokio::test]
    async fn test_duplicate_reports_do_not_duplicate_log() {
        let (reporter, _, _) = reporter(10, 10, ReportMode::Push);

        reporter.report("event:1", Outcome::Hit, Duration::ZERO).await;
        reporter.report("event:1", Outcome::Hit, Duration::ZERO).await;

        assert_eq!(reporter.recent_keys().await, vec!["event:1".to_string()]);
    }

    #[tokio::test]
    async fn test_push_flush_enforces_capacity() {
        let (reporter, store, metrics) = reporter(2, 2, ReportMode::Push);

        for key in ["event:a", "event:b", "event:c"] {
            store.set_ex(key, TTL, "v".to_string()).await.unwrap();
        }

        reporter.touch("event:b", None).await;
        let after = reporter.touch("event:c", Some(EvictionPolicy::Ttl)).await;

        // Flush cleared the log and the controller trimmed back to capacity
        assert!(after.is_empty());
        assert_eq!(store.keys("event:*").await.unwrap().len(), 2);
        assert!(!store.exists("event:a").await.unwrap());
        assert_eq!(metrics.evictions(), 1);
    }

    #[tokio::test]
    async fn test_pull_mode_parks_batches_for_poller() {
        let (reporter, store, metrics) = reporter(2, 2, ReportMode::Pull);

        for key in ["event:a", "event:b", "event:c"] {
            store.set_ex(key, TTL, "v".to_string()).await.unwrap();
        }

        reporter.touch("event:b", None).await;
        reporter.touch("event:c", None).await;
        reporter.touch("event:d", None).await;

        // Nothing delivered inline
        assert_eq!(metrics.evictions(), 0);
        assert_eq!(
            reporter.recent_keys().await,
            vec!["event:b".to_string(), "event:c".to_string(), "event:d".to_string()]
        );

        let batch = reporter.pull().await.unwrap();
        assert_eq!(batch.keys.len(), 3);

        // The outbox was drained; only the live log remains
        assert_eq!(reporter.recent_keys().await, vec!["event:d".to_string()]);
    }

    #[tokio::test]
    async fn test_outbox_bounded_to_last_entries() {
        let (reporter, _, _) = reporter(100, 1, ReportMode::Pull);

        for i in 0..25 {
            reporter.touch(&format!("event:{}", i), None).await;
        }

        let recent = reporter.recent_keys().await;
        assert_eq!(recent.len(), OUTBOX_LIMIT);
        assert_eq!(recent.last(), Some(&"event:24".to_string()));
        assert_eq!(recent.first(), Some(&"event:15".to_string()));
    }

    #[tokio::test(start_paused = true)]
    async fn test_pull_mode_keeps_reported_policy() {
        let (reporter, store, _) = reporter(2, 1, ReportMode::Pull);
        let controller = reporter.controller.clone();

        controller.admit("event:A", "v".to_string(), None, EvictionPolicy::Ttl).await.unwrap();
        tokio::time::advance(Duration::from_secs(10)).await;
        controller.admit("event:B", "v".to_string(), None, EvictionPolicy::Ttl).await.unwrap();
        tokio::time::advance(Duration::from_secs(10)).await;
        store.set_ex("event:C", TTL, "v".to_string()).await.unwrap();

        reporter.touch("event:C", Some(EvictionPolicy::Lifo)).await;
        let batch = reporter.pull().await.unwrap();
        assert_eq!(batch.policy, Some(EvictionPolicy::Lifo));

        // ttl would pick event:A, the closest to expiry
        let victims = controller.absorb(&batch.keys, batch.policy).await.unwrap();
        assert_eq!(victims, vec!["event:B".to_string()]);

        // The policy went out with the batch
        assert_eq!(reporter.pull().await.unwrap().policy, None);
    }

    #[tokio::test]
    async fn test_restore_reparks_ahead_of_newer_keys() {
        let (reporter, _, _) = reporter(100, 1, ReportMode::Pull);

        reporter.touch("event:a", Some(EvictionPolicy::Lru)).await;
        reporter.touch("event:b", None).await;
        let batch = reporter.pull().await.unwrap();
        assert!(reporter.recent_keys().await.is_empty());

        reporter.touch("event:c", None).await;
        reporter.restore(batch).await;

        assert_eq!(
            reporter.recent_keys().await,
            vec!["event:a".to_string(), "event:b".to_string(), "event:c".to_string()]
        );
        assert_eq!(reporter.pull().await.unwrap().policy, Some(EvictionPolicy::Lru));
    }

    #[tokio::test]
    async fn test_restore_keeps_newer_policy() {
        let (reporter, _, _) = reporter(100, 1, ReportMode::Pull);

        reporter.touch("event:a", Some(EvictionPolicy::Lru)).await;
        let batch = reporter.pull().await.unwrap();
        reporter.touch("event:b", Some(EvictionPolicy::Lifo)).await;
        reporter.restore(batch).await;

        assert_eq!(reporter.pull().await.unwrap().policy, Some(EvictionPolicy::Lifo));
    }

    /// Memory store that records every key it was asked to EXPIRE.
    #[derive(Default)]
    struct RecordingStore {
        inner: MemoryStore,
        expired: std::sync::Mutex<Vec<String>>,
    }

    #[async_trait]
    impl KvStore for RecordingStore {
        async fn get(&self, key: &str) -> Result<Option<String>> {
            self.inner.get(key).await
        }

        async fn set_ex(&self, key: &str, ttl: Duration, value: String) -> Result<()> {
            self.inner.set_ex(key, ttl, value).await
        }

        async fn expire(&self, key: &str, ttl: Duration) -> Result<bool> {
            self.expired.lock().unwrap().push(key.to_string());
            self.inner.expire(key, ttl).await
        }

        async fn exists(&self, key: &str) -> Result<bool> {
            self.inner.exists(key).await
        }

        async fn keys(&self, pattern: &str) -> Result<Vec<String>> {
            self.inner.keys(pattern).await
        }

        async fn del(&self, key: &str) -> Result<bool> {
            self.inner.del(key).await
        }

        async fn ttl(&self, key: &str) -> Result<KeyTtl> {
            self.inner.ttl(key).await
        }

        async fn info(&self) -> Result<StoreInfo> {
            self.inner.info().await
        }
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 4)]
    async fn test_concurrent_touches_lose_no_keys_across_flushes() {
        let store = Arc::new(RecordingStore::default());
        let metrics = Arc::new(CacheMetrics::new(EvictionPolicy::Ttl));
        let controller = Arc::new(CapacityController::new(
            store.clone(),
            metrics.clone(),
            1000,
            TTL,
            EvictionPolicy::Ttl,
            Duration::from_secs(2),
        ));
        let reporter = Arc::new(UsageReporter::new(controller, metrics, 10, FlushMode::Clear, ReportMode::Push));

        let mut handles = Vec::new();
        for task in 0..8 {
            let reporter = reporter.clone();
            handles.push(tokio::spawn(async move {
                for i in 0..25 {
                    reporter.touch(&format!("event:{}-{}", task, i), None).await;
                }
            }));
        }
        for handle in handles {
            handle.await.unwrap();
        }

        // Every key was either delivered once or is still in the log
        let mut seen = HashSet::new();
        let delivered = store.expired.lock().unwrap().clone();
        let pending = reporter.recent_keys().await;
        for key in delivered.iter().chain(pending.iter()) {
            assert!(seen.insert(key.clone()), "{} seen twice", key);
        }
        assert_eq!(seen.len(), 200);
    }

    #[test]
    fn test_report_mode_from_str() {
        assert_eq!("push".parse::<ReportMode>(), Ok(ReportMode::Push));
        assert_eq!("pull".parse::<ReportMode>(), Ok(ReportMode::Pull));
        assert!("poll".parse::<ReportMode>().is_err());
    }
}
