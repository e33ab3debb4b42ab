//! Background Tasks Module
//!
//! Contains background tasks that run periodically during server operation.
//!
//! # Tasks
//! - TTL Cleanup: Purges expired store entries
//! - Usage Poll: Pull-mode delivery of usage batches to the controller
//! - Metrics: Logs a metrics snapshot

mod cleanup;
mod metrics;
mod periodic;
mod poller;

pub use cleanup::spawn_cleanup_task;
pub use metrics::spawn_metrics_task;
pub use periodic::spawn_periodic;
pub use poller::spawn_poll_task;
