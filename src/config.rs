//! Configuration Module
//!
//! Handles loading and managing coordinator configuration from environment variables.

use std::env;
use std::str::FromStr;
use std::time::Duration;

use crate::cache::{FlushMode, ReportMode};

/// Coordinator configuration parameters.
///
/// All values can be configured via environment variables with sensible defaults.
#[derive(Debug, Clone)]
pub struct Config {
    /// Maximum number of resident keys before eviction kicks in
    pub capacity: usize,
    /// Default TTL in seconds for entries without explicit TTL
    pub default_ttl: u64,
    /// Eviction policy name; resolved (with fallback) when the service is built
    pub eviction_policy: String,
    /// HTTP server port
    pub server_port: u16,
    /// Expiry sweep interval in seconds
    pub cleanup_interval: u64,
    /// Number of distinct keys the recency log holds before it flushes
    pub recency_threshold: usize,
    /// What the recency log does once it reaches the threshold
    pub recency_flush: FlushMode,
    /// Whether flushed usage is pushed inline or pulled by the poll task
    pub report_mode: ReportMode,
    /// Poll task interval in seconds
    pub poll_interval: u64,
    /// Remote `/events-cache/keys` endpoint to poll instead of the local reporter
    pub usage_source_url: Option<String>,
    /// Metrics snapshot interval in seconds
    pub metrics_interval: u64,
    /// Timeout applied to every store and remote call, in milliseconds
    pub store_timeout_ms: u64,
}

impl Config {
    /// Creates a new Config by loading values from environment variables.
    ///
    /// # Environment Variables
    /// - `CACHE_CAPACITY` - Maximum resident keys (default: 1000, minimum 1)
    /// - `CACHE_TTL` - Default TTL in seconds (default: 60)
    /// - `CACHE_POLICY` - `ttl`, `lru` or `lifo` (default: ttl)
    /// - `SERVER_PORT` - HTTP server port (default: 5000)
    /// - `CLEANUP_INTERVAL` - Expiry sweep frequency in seconds (default: 1)
    /// - `RECENCY_THRESHOLD` - Recency log flush threshold (default: 10)
    /// - `RECENCY_FLUSH` - `clear` or `slide` (default: clear)
    /// - `REPORT_MODE` - `push` or `pull` (default: push)
    /// - `POLL_INTERVAL` - Poll frequency in seconds (default: 15)
    /// - `USAGE_SOURCE_URL` - Remote usage source (default: unset, poll locally)
    /// - `METRICS_INTERVAL` - Metrics snapshot frequency in seconds (default: 30)
    /// - `STORE_TIMEOUT_MS` - Store call timeout in milliseconds (default: 2000)
    pub fn from_env() -> Self {
        let defaults = Self::default();
        Self {
            capacity: env_or("CACHE_CAPACITY", defaults.capacity).max(1),
            default_ttl: env_or("CACHE_TTL", defaults.default_ttl),
            eviction_policy: env::var("CACHE_POLICY").unwrap_or(defaults.eviction_policy),
            server_port: env_or("SERVER_PORT", defaults.server_port),
            cleanup_interval: env_or("CLEANUP_INTERVAL", defaults.cleanup_interval),
            recency_threshold: env_or("RECENCY_THRESHOLD", defaults.recency_threshold).max(1),
            recency_flush: env_or("RECENCY_FLUSH", defaults.recency_flush),
            report_mode: env_or("REPORT_MODE", defaults.report_mode),
            poll_interval: env_or("POLL_INTERVAL", defaults.poll_interval),
            usage_source_url: env::var("USAGE_SOURCE_URL")
                .ok()
                .filter(|url| !url.trim().is_empty()),
            metrics_interval: env_or("METRICS_INTERVAL", defaults.metrics_interval),
            store_timeout_ms: env_or("STORE_TIMEOUT_MS", defaults.store_timeout_ms),
        }
    }

    /// Default TTL as a Duration.
    pub fn default_ttl(&self) -> Duration {
        Duration::from_secs(self.default_ttl)
    }

    /// Store call timeout as a Duration.
    pub fn store_timeout(&self) -> Duration {
        Duration::from_millis(self.store_timeout_ms)
    }
}

impl Default for Config {
    fn default() -> Self {
        Self {
            capacity: 1000,
            default_ttl: 60,
            eviction_policy: "ttl".to_string(),
            server_port: 5000,
            cleanup_interval: 1,
            recency_threshold: 10,
            recency_flush: FlushMode::Clear,
            report_mode: ReportMode::Push,
            poll_interval: 15,
            usage_source_url: None,
            metrics_interval: 30,
            store_timeout_ms: 2000,
        }
    }
}

fn env_or<T: FromStr>(name: &str, default: T) -> T {
    env::var(name)
        .ok()
        .and_then(|v| v.trim().parse().ok())
        .unwrap_or(default)
}
