//! Startup orchestration.
//!
//! # Responsibilities
//! - Open the counter store named by the validated configuration
//! - Ping the store once and report (an unreachable store is not fatal;
//!   the failure policy governs requests)
//! - Start the expiry sweeper for the in-memory store
//!
//! # Design Decisions
//! - Fail fast on configuration errors, never on store reachability
//! - Listeners start last (traffic only when ready)

use std::sync::Arc;
use std::time::Duration;

use tokio::sync::broadcast;
use tokio::task::JoinHandle;

use crate::config::GatekeeperConfig;
use crate::error::Result;
use crate::lifecycle::Shutdown;
use crate::ratelimit::{CounterStore, MemoryStore, StoreBackend};

/// Open the configured counter store and start its background tasks.
pub async fn open_store(
    config: &GatekeeperConfig,
    shutdown: &Shutdown,
) -> Result<Arc<dyn CounterStore>> {
    let backend = StoreBackend::from_config(&config.store)?;

    if let StoreBackend::Memory(memory) = &backend {
        let every = Duration::from_secs(config.rate_limit.window_secs);
        spawn_sweeper(memory.clone(), every, shutdown.subscribe());
    }

    let store = backend.store();
    let timeout = Duration::from_millis(config.store.timeout_ms);
    match tokio::time::timeout(timeout, store.ping()).await {
        Ok(Ok(())) => tracing::info!(backend = store.backend(), "Counter store reachable"),
        Ok(Err(e)) => tracing::warn!(
            backend = store.backend(),
            error = %e,
            policy = %config.store.failure_policy,
            "Counter store unreachable at startup"
        ),
        Err(_) => tracing::warn!(
            backend = store.backend(),
            timeout_ms = config.store.timeout_ms,
            policy = %config.store.failure_policy,
            "Counter store ping timed out at startup"
        ),
    }

    Ok(store)
}

/// Periodically drop expired records from an in-memory store.
pub fn spawn_sweeper(
    store: Arc<MemoryStore>,
    every: Duration,
    mut shutdown: broadcast::Receiver<()>,
) -> JoinHandle<()> {
    tokio::spawn(async move {
        let mut ticker = tokio::time::interval(every);
        // The first tick completes immediately.
        ticker.tick().await;

        loop {
            tokio::select! {
                _ = ticker.tick() => {
                    let removed = store.purge_expired();
                    if removed > 0 {
                        tracing::debug!(removed, remaining = store.len(), "Purged expired counters");
                    }
                }
                _ = shutdown.recv() => break,
            }
        }
    })
}
