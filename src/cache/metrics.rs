//! Cache Metrics Module
//!
//! Tracks hit/miss rates, latency, evictions and TTL consumption. Every
//! counter is an independent atomic so handlers never contend on a lock and
//! snapshots never block writers.

use std::sync::atomic::{AtomicU64, AtomicU8, Ordering};
use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::cache::EvictionPolicy;

/// Outcome of a single cache access.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Outcome {
    Hit,
    Miss,
    Insert,
}

// == Cache Metrics ==
/// Process-wide cache counters, shared as `Arc<CacheMetrics>`.
#[derive(Debug, Default)]
pub struct CacheMetrics {
    hits: AtomicU64,
    misses: AtomicU64,
    inserts: AtomicU64,
    /// Summed lookup latency in microseconds
    total_latency_us: AtomicU64,
    evictions: AtomicU64,
    /// Summed TTL consumed at hit time in milliseconds
    ttl_sum_ms: AtomicU64,
    ttl_count: AtomicU64,
    policy_fallbacks: AtomicU64,
    eviction_policy: AtomicU8,
}

/// Point-in-time view of [`CacheMetrics`].
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct MetricsSnapshot {
    pub hits: u64,
    pub misses: u64,
    /// Lookups served (hits + misses)
    pub requests: u64,
    pub inserts: u64,
    pub hit_rate: f64,
    pub miss_rate: f64,
    pub avg_latency_ms: f64,
    pub evictions: u64,
    pub eviction_policy: EvictionPolicy,
    /// Mean seconds of the configured TTL used up before a hit
    pub avg_ttl_consumed: f64,
    pub policy_fallbacks: u64,
}

impl CacheMetrics {
    // == Constructor ==
    /// Creates zeroed metrics labelled with the deployment's policy.
    pub fn new(policy: EvictionPolicy) -> Self {
        let metrics = Self::default();
        metrics.set_policy(policy);
        metrics
    }

    // == Record ==
    /// Records one access. Inserts don't count as lookups.
    pub fn record(&self, outcome: Outcome, latency: Duration) {
        match outcome {
            Outcome::Hit => {
                self.hits.fetch_add(1, Ordering::Relaxed);
                self.add_latency(latency);
            }
            Outcome::Miss => {
                self.misses.fetch_add(1, Ordering::Relaxed);
                self.add_latency(latency);
            }
            Outcome::Insert => {
                self.inserts.fetch_add(1, Ordering::Relaxed);
            }
        }
    }

    fn add_latency(&self, latency: Duration) {
        let micros = u64::try_from(latency.as_micros()).unwrap_or(u64::MAX);
        self.total_latency_us.fetch_add(micros, Ordering::Relaxed);
    }

    // == Record TTL Consumed ==
    /// Records how much of the configured TTL had elapsed when a hit occurred.
    pub fn record_ttl_consumed(&self, consumed: Duration) {
        let millis = u64::try_from(consumed.as_millis()).unwrap_or(u64::MAX);
        self.ttl_sum_ms.fetch_add(millis, Ordering::Relaxed);
        self.ttl_count.fetch_add(1, Ordering::Relaxed);
    }

    // == Record Eviction ==
    /// Counts one eviction and labels the metrics with the policy that chose it.
    pub fn record_eviction(&self, policy: EvictionPolicy) {
        self.evictions.fetch_add(1, Ordering::Relaxed);
        self.set_policy(policy);
    }

    pub fn record_policy_fallback(&self) {
        self.policy_fallbacks.fetch_add(1, Ordering::Relaxed);
    }

    pub fn set_policy(&self, policy: EvictionPolicy) {
        self.eviction_policy.store(policy.as_u8(), Ordering::Relaxed);
    }

    pub fn policy(&self) -> EvictionPolicy {
        EvictionPolicy::from_u8(self.eviction_policy.load(Ordering::Relaxed))
    }

    pub fn evictions(&self) -> u64 {
        self.evictions.load(Ordering::Relaxed)
    }

    // == Snapshot ==
    /// Reads every counter once. Rates derive from the same loaded values,
    /// so `hit_rate + miss_rate == 1` whenever there were requests.
    pub fn snapshot(&self) -> MetricsSnapshot {
        let hits = self.hits.load(Ordering::Relaxed);
        let misses = self.misses.load(Ordering::Relaxed);
        let requests = hits + misses;
        let total_latency_us = self.total_latency_us.load(Ordering::Relaxed);
        let ttl_sum_ms = self.ttl_sum_ms.load(Ordering::Relaxed);
        let ttl_count = self.ttl_count.load(Ordering::Relaxed);

        MetricsSnapshot {
            hits,
            misses,
            requests,
            inserts: self.inserts.load(Ordering::Relaxed),
            hit_rate: ratio(hits as f64, requests),
            miss_rate: ratio(misses as f64, requests),
            avg_latency_ms: ratio(total_latency_us as f64 / 1000.0, requests),
            evictions: self.evictions.load(Ordering::Relaxed),
            eviction_policy: self.policy(),
            avg_ttl_consumed: ratio(ttl_sum_ms as f64 / 1000.0, ttl_count),
            policy_fallbacks: self.policy_fallbacks.load(Ordering::Relaxed),
        }
    }
}

fn ratio(numerator: f64, denominator: u64) -> f64 {
    if denominator == 0 {
        0.0
    } else {
        numerator / denominator as f64
    }
}

// == Unit Tests ==
#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;

    #[test]
    fn test_metrics_new() {
        let snapshot = CacheMetrics::new(EvictionPolicy::Lifo).snapshot();
        assert_eq!(snapshot.hits, 0);
        assert_eq!(snapshot.misses, 0);
        assert_eq!(snapshot.requests, 0);
        assert_eq!(snapshot.evictions, 0);
        assert_eq!(snapshot.eviction_policy, EvictionPolicy::Lifo);
    }

    #[test]
    fn test_rates_zero_without_requests() {
        let snapshot = CacheMetrics::new(EvictionPolicy::Ttl).snapshot();
        assert_eq!(snapshot.hit_rate, 0.0);
        assert_eq!(snapshot.miss_rate, 0.0);
        assert_eq!(snapshot.avg_latency_ms, 0.0);
        assert_eq!(snapshot.avg_ttl_consumed, 0.0);
    }

    #[test]
    fn test_rates_mixed() {
        let metrics = CacheMetrics::new(EvictionPolicy::Ttl);
        metrics.record(Outcome::Hit, Duration::from_millis(2));
        metrics.record(Outcome::Hit, Duration::from_millis(2));
        metrics.record(Outcome::Hit, Duration::from_millis(2));
        metrics.record(Outcome::Miss, Duration::from_millis(6));

        let snapshot = metrics.snapshot();
        assert_eq!(snapshot.requests, 4);
        assert_eq!(snapshot.hit_rate, 0.75);
        assert_eq!(snapshot.miss_rate, 0.25);
        assert!((snapshot.avg_latency_ms - 3.0).abs() < 1e-9);
    }

    #[test]
    fn test_inserts_are_not_requests() {
        let metrics = CacheMetrics::new(EvictionPolicy::Ttl);
        metrics.record(Outcome::Insert, Duration::from_millis(5));

        let snapshot = metrics.snapshot();
        assert_eq!(snapshot.inserts, 1);
        assert_eq!(snapshot.requests, 0);
        assert_eq!(snapshot.hit_rate, 0.0);
    }

    #[test]
    fn test_record_eviction_updates_label() {
        let metrics = CacheMetrics::new(EvictionPolicy::Ttl);
        metrics.record_eviction(EvictionPolicy::Lifo);
        metrics.record_eviction(EvictionPolicy::Lifo);

        let snapshot = metrics.snapshot();
        assert_eq!(snapshot.evictions, 2);
        assert_eq!(snapshot.eviction_policy, EvictionPolicy::Lifo);
    }

    #[test]
    fn test_avg_ttl_consumed_seconds() {
        let metrics = CacheMetrics::new(EvictionPolicy::Ttl);
        metrics.record_ttl_consumed(Duration::from_secs(10));
        metrics.record_ttl_consumed(Duration::from_secs(30));

        assert!((metrics.snapshot().avg_ttl_consumed - 20.0).abs() < 1e-9);
    }

    #[test]
    fn test_snapshot_serializes_policy_label() {
        let metrics = CacheMetrics::new(EvictionPolicy::Lru);
        let json = serde_json::to_value(metrics.snapshot()).unwrap();

        assert_eq!(json["eviction_policy"], "lru");
        assert!(json.get("avg_ttl_consumed").is_some());
    }

    #[test]
    fn test_concurrent_recording() {
        let metrics = Arc::new(CacheMetrics::new(EvictionPolicy::Ttl));
        let handles: Vec<_> = (0..8)
            .map(|i| {
                let metrics = Arc::clone(&metrics);
                std::thread::spawn(move || {
                    for _ in 0..1000 {
                        let outcome = if i % 2 == 0 { Outcome::Hit } else { Outcome::Miss };
                        metrics.record(outcome, Duration::from_micros(10));
                    }
                })
            })
            .collect();
        for handle in handles {
            handle.join().unwrap();
        }

        let snapshot = metrics.snapshot();
        assert_eq!(snapshot.hits, 4000);
        assert_eq!(snapshot.misses, 4000);
        assert!((snapshot.hit_rate + snapshot.miss_rate - 1.0).abs() < 1e-12);
    }
}
