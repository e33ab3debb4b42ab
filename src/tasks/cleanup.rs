//! TTL Cleanup Task
//!
//! Background task that periodically purges expired entries from the
//! in-memory store. Reads already hide expired keys; the sweep reclaims them.

use std::sync::Arc;
use std::time::Duration;

use tokio::sync::watch;
use tokio::task::JoinHandle;
use tracing::{debug, info};

use crate::store::MemoryStore;
use crate::tasks::spawn_periodic;

/// Spawns the expiry sweep over `store`, running every `interval`.
///
/// # Returns
/// A JoinHandle that completes once shutdown is signalled.
pub fn spawn_cleanup_task(
    store: Arc<MemoryStore>,
    interval: Duration,
    shutdown: watch::Receiver<bool>,
) -> JoinHandle<()> {
    spawn_periodic("expiry sweep", interval, shutdown, move || {
        let store = store.clone();
        async move {
            let removed = store.purge_expired().await;

            if removed > 0 {
                info!("TTL cleanup: removed {} expired entries", removed);
            } else {
                debug!("TTL cleanup: no expired entries found");
            }
            Ok(())
        }
    })
}
