//! Cache Module
//!
//! Capacity control for the event cache: eviction policies, the key-usage
//! reporter with its recency log, and the metrics aggregator.

mod controller;
mod metrics;
mod order;
mod policy;
mod recency;
mod reporter;
mod service;
mod source;


// Re-export public types
pub use controller::{Admission, CapacityController};
pub use metrics::{CacheMetrics, MetricsSnapshot, Outcome};
pub use order::KeyOrder;
pub use policy::{select_victim, Candidate, EvictionPolicy};
pub use recency::{FlushMode, RecencyLog};
pub use reporter::{ReportMode, UsageRecord, UsageReporter, OUTBOX_LIMIT};
pub use service::CacheService;
pub use source::{HttpUsageSource, UsageBatch, UsageSource};
