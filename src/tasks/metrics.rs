//! Metrics Snapshot Task
//!
//! Logs a metrics snapshot on a fixed interval.

use std::sync::Arc;
use std::time::Duration;

use tokio::sync::watch;
use tokio::task::JoinHandle;
use tracing::info;

use crate::cache::CacheMetrics;
use crate::tasks::spawn_periodic;

pub fn spawn_metrics_task(
    metrics: Arc<CacheMetrics>,
    interval: Duration,
    shutdown: watch::Receiver<bool>,
) -> JoinHandle<()> {
    spawn_periodic("metrics", interval, shutdown, move || {
        let snapshot = metrics.snapshot();
        async move {
            info!(
                "Metrics: requests={}, hit_rate={:.3}, miss_rate={:.3}, avg_latency={:.3}ms, evictions={}, policy={}, avg_ttl_consumed={:.1}s",
                snapshot.requests,
                snapshot.hit_rate,
                snapshot.miss_rate,
                snapshot.avg_latency_ms,
                snapshot.evictions,
                snapshot.eviction_policy,
                snapshot.avg_ttl_consumed
            );
            Ok(())
        }
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cache::EvictionPolicy;

    #[tokio::test(start_paused = true)]
    async fn test_metrics_task_stops_on_shutdown() {
        let metrics = Arc::new(CacheMetrics::new(EvictionPolicy::Ttl));
        let (tx, rx) = watch::channel(false);

        let handle = spawn_metrics_task(metrics, Duration::from_secs(30), rx);
        tokio::time::sleep(Duration::from_secs(61)).await;
        assert!(!handle.is_finished());

        tx.send(true).unwrap();
        handle.await.unwrap();
    }
}
