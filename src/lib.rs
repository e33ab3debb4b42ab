//! Event Cache - an out-of-band capacity controller for an event cache
//!
//! Tracks key usage, evicts under ttl, lru or lifo policies once the store
//! reaches capacity, and aggregates hit/miss metrics.

pub mod api;
pub mod cache;
pub mod config;
pub mod error;
pub mod models;
pub mod store;
pub mod tasks;

pub use api::{create_router, AppState};
pub use cache::CacheService;
pub use config::Config;
pub use error::{CacheError, Result};
