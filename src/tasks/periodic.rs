//! Periodic Task Helper
//!
//! Runs a fallible job on a fixed interval until shutdown is signalled.

use std::future::Future;
use std::time::Duration;

use tokio::sync::watch;
use tokio::task::JoinHandle;
use tokio::time::{interval_at, Instant, MissedTickBehavior};
use tracing::{debug, info, warn};

use crate::error::Result;

/// Shortest period a task may be scheduled with
const MIN_PERIOD: Duration = Duration::from_millis(10);

/// Spawns `job` to run every `period`, first after one full period.
///
/// A failing tick is logged with its consecutive-failure count and retried
/// on the next tick; it never stops the task. The task exits once `true` is
/// sent on `shutdown` or the sender is dropped.
///
/// # Example
/// ```ignore
/// let (shutdown_tx, shutdown_rx) = watch::channel(false);
/// let handle = spawn_periodic("sweep", Duration::from_secs(1), shutdown_rx, || async { Ok(()) });
/// // Later, during shutdown:
/// let _ = shutdown_tx.send(true);
/// handle.await?;
/// ```
pub fn spawn_periodic<F, Fut>(
    name: &'static str,
    period: Duration,
    mut shutdown: watch::Receiver<bool>,
    mut job: F,
) -> JoinHandle<()>
where
    F: FnMut() -> Fut + Send + 'static,
    Fut: Future<Output = Result<()>> + Send + 'static,
{
    let period = period.max(MIN_PERIOD);

    tokio::spawn(async move {
        let mut ticker = interval_at(Instant::now() + period, period);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Skip);
        let mut failures: u64 = 0;

        info!("Starting {} task with interval of {:?}", name, period);

        loop {
            if *shutdown.borrow() {
                break;
            }

            tokio::select! {
                changed = shutdown.changed() => {
                    if changed.is_err() || *shutdown.borrow() {
                        break;
                    }
                }
                _ = ticker.tick() => {
                    match job().await {
                        Ok(()) => {
                            if failures > 0 {
                                info!("{} task recovered after {} failed ticks", name, failures);
                            }
                            failures = 0;
                        }
                        Err(err) => {
                            failures += 1;
                            warn!("{} tick failed ({} consecutive): {}", name, failures, err);
                        }
                    }
                }
            }
        }

        debug!("{} task stopped", name);
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::CacheError;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Arc;

    fn counting_job(
        runs: Arc<AtomicUsize>,
        fail: bool,
    ) -> impl FnMut() -> std::pin::Pin<Box<dyn Future<Output = Result<()>> + Send>> + Send + 'static {
        move || {
            let runs = runs.clone();
            Box::pin(async move {
                runs.fetch_add(1, Ordering::SeqCst);
                if fail {
                    Err(CacheError::StoreUnavailable("down".to_string()))
                } else {
                    Ok(())
                }
            })
        }
    }

    #[tokio::test(start_paused = true)]
    async fn test_runs_once_per_period() {
        let runs = Arc::new(AtomicUsize::new(0));
        let (tx, rx) = watch::channel(false);

        let handle = spawn_periodic("test", Duration::from_secs(1), rx, counting_job(runs.clone(), false));

        tokio::time::sleep(Duration::from_millis(3500)).await;
        assert_eq!(runs.load(Ordering::SeqCst), 3);

        tx.send(true).unwrap();
        handle.await.unwrap();
    }

    #[tokio::test(start_paused = true)]
    async fn test_failures_do_not_stop_task() {
        let runs = Arc::new(AtomicUsize::new(0));
        let (tx, rx) = watch::channel(false);

        let handle = spawn_periodic("failing", Duration::from_secs(1), rx, counting_job(runs.clone(), true));

        tokio::time::sleep(Duration::from_millis(4500)).await;
        assert_eq!(runs.load(Ordering::SeqCst), 4);
        assert!(!handle.is_finished());

        tx.send(true).unwrap();
        handle.await.unwrap();
    }

    #[tokio::test(start_paused = true)]
    async fn test_stops_when_sender_dropped() {
        let runs = Arc::new(AtomicUsize::new(0));
        let (tx, rx) = watch::channel(false);

        let handle = spawn_periodic("orphan", Duration::from_secs(60), rx, counting_job(runs.clone(), false));
        drop(tx);

        handle.await.unwrap();
        assert_eq!(runs.load(Ordering::SeqCst), 0);
    }
}
