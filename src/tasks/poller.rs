//! Usage Poll Task
//!
//! Pull-mode delivery: periodically pulls a usage batch from a source and
//! hands it to the capacity controller.

use std::sync::Arc;
use std::time::Duration;

use tokio::sync::watch;
use tokio::task::JoinHandle;
use tracing::{debug, info, warn};

use crate::cache::{CapacityController, UsageSource};
use crate::store::with_timeout;
use crate::tasks::spawn_periodic;

/// Spawns the poll task. Each pull is bounded by `timeout`.
pub fn spawn_poll_task(
    controller: Arc<CapacityController>,
    source: Arc<dyn UsageSource>,
    interval: Duration,
    timeout: Duration,
    shutdown: watch::Receiver<bool>,
) -> JoinHandle<()> {
    spawn_periodic("usage poll", interval, shutdown, move || {
        let controller = controller.clone();
        let source = source.clone();
        async move {
            let batch = with_timeout(timeout, "PULL", source.pull()).await?;
            if batch.keys.is_empty() {
                debug!("No usage pulled from {}", source.name());
                return Ok(());
            }

            let victims = match controller.absorb(&batch.keys, batch.policy).await {
                Ok(victims) => victims,
                Err(err) => {
                    warn!("Returning {} keys to {}", batch.keys.len(), source.name());
                    source.restore(batch).await;
                    return Err(err);
                }
            };
            info!(
                "Absorbed {} keys from {}, evicted {}",
                batch.keys.len(),
                source.name(),
                victims.len()
            );
            Ok(())
        }
    })
}
