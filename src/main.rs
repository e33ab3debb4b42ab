//! Event Cache - cache coordinator server
//!
//! Serves the cache-facing API and runs the background expiry sweep,
//! metrics snapshots, and (in pull mode) the usage poll task.

use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;

use anyhow::Context;
use tokio::signal;
use tokio::sync::watch;
use tracing::{error, info};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use event_cache::cache::{HttpUsageSource, ReportMode, UsageSource};
use event_cache::store::{MemoryEventStore, MemoryStore};
use event_cache::tasks::{spawn_cleanup_task, spawn_metrics_task, spawn_poll_task};
use event_cache::{create_router, AppState, CacheService, Config};

/// Main entry point for the cache coordinator.
///
/// # Startup Sequence
/// 1. Initialize tracing subscriber for logging
/// 2. Load configuration from environment variables
/// 3. Create stores and the cache service
/// 4. Start background tasks
/// 5. Start HTTP server on configured port
/// 6. Handle graceful shutdown on SIGINT/SIGTERM
#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Defaults to "info" level, can be overridden with RUST_LOG env var
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "event_cache=info,tower_http=info".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    info!("Starting Event Cache Coordinator");

    let config = Config::from_env();
    info!(
        "Configuration loaded: capacity={}, default_ttl={}s, policy={}, report_mode={:?}, port={}",
        config.capacity,
        config.default_ttl,
        config.eviction_policy,
        config.report_mode,
        config.server_port
    );

    let store = Arc::new(MemoryStore::new());
    let events = Arc::new(MemoryEventStore::new());
    let service = CacheService::new(&config, store.clone(), events);
    let state = AppState::new(service);
    info!(
        "Cache service initialized with {} policy",
        state.service.controller().default_policy()
    );

    // Background tasks
    let (shutdown_tx, shutdown_rx) = watch::channel(false);
    let mut handles = vec![
        spawn_cleanup_task(
            store,
            Duration::from_secs(config.cleanup_interval),
            shutdown_rx.clone(),
        ),
        spawn_metrics_task(
            state.service.metrics().clone(),
            Duration::from_secs(config.metrics_interval),
            shutdown_rx.clone(),
        ),
    ];

    if config.report_mode == ReportMode::Pull {
        let source: Arc<dyn UsageSource> = match &config.usage_source_url {
            Some(url) => Arc::new(
                HttpUsageSource::new(url.clone(), config.store_timeout())
                    .context("failed to build usage source client")?,
            ),
            None => state.service.reporter().clone(),
        };
        info!("Polling usage from {}", source.name());

        handles.push(spawn_poll_task(
            state.service.controller().clone(),
            source,
            Duration::from_secs(config.poll_interval),
            config.store_timeout(),
            shutdown_rx,
        ));
    }
    info!("Started {} background tasks", handles.len());

    let app = create_router(state);

    let addr = SocketAddr::from(([0, 0, 0, 0], config.server_port));
    let listener = tokio::net::TcpListener::bind(addr)
        .await
        .with_context(|| format!("failed to bind {}", addr))?;
    info!("Server listening on http://{}", addr);

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await
        .context("server error")?;

    // Stop background tasks and wait for them to finish their current tick
    let _ = shutdown_tx.send(true);
    for handle in handles {
        if let Err(err) = handle.await {
            error!("Background task ended abnormally: {}", err);
        }
    }

    info!("Server shutdown complete");
    Ok(())
}

/// Waits for shutdown signal (Ctrl+C or SIGTERM).
async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(err) = signal::ctrl_c().await {
            error!("Failed to install Ctrl+C handler: {}", err);
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match signal::unix::signal(signal::unix::SignalKind::terminate()) {
            Ok(mut sigterm) => {
                sigterm.recv().await;
            }
            Err(err) => {
                error!("Failed to install SIGTERM handler: {}", err);
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {
            info!("Received Ctrl+C, initiating shutdown...");
        }
        _ = terminate => {
            info!("Received SIGTERM, initiating shutdown...");
        }
    }
}
