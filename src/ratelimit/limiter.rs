//! Fixed-window, sliding-refresh rate limiter.

use std::fmt;
use std::sync::Arc;
use std::time::{Duration, Instant};

use thiserror::Error;

use crate::config::{FailurePolicy, GatekeeperConfig};
use crate::observability::metrics;
use crate::security::identity::ClientIdentity;

use super::store::{Consumption, CounterRecord, CounterStore, StoreError};

/// Quota usage reported alongside a decision.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Usage {
    /// Counter value after this request, `None` when the store was bypassed.
    pub count: Option<u64>,
    pub limit: u64,
    /// Time until the record expires, when known.
    pub ttl: Option<Duration>,
}

impl Usage {
    pub fn remaining(&self) -> Option<u64> {
        self.count.map(|count| self.limit.saturating_sub(count))
    }
}

/// Admission decision for one request.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Decision {
    Allow(Usage),
    Reject(Usage),
}

impl Decision {
    pub fn is_allowed(&self) -> bool {
        matches!(self, Decision::Allow(_))
    }

    pub fn usage(&self) -> &Usage {
        match self {
            Decision::Allow(usage) | Decision::Reject(usage) => usage,
        }
    }
}

impl fmt::Display for Decision {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Decision::Allow(_) => write!(f, "allow"),
            Decision::Reject(_) => write!(f, "reject"),
        }
    }
}

/// The counter store failed and the failure policy is fail-closed.
#[derive(Debug, Error)]
#[error("rate limiter store unavailable: {0}")]
pub struct StoreUnavailable(#[from] pub StoreError);

/// Per-identity request limiter backed by a shared [`CounterStore`].
///
/// Holds no per-client state of its own. Cheap to share via `Arc`.
pub struct RateLimiter {
    store: Arc<dyn CounterStore>,
    max_requests: u64,
    window: Duration,
    key_prefix: String,
    store_timeout: Duration,
    failure_policy: FailurePolicy,
}

impl RateLimiter {
    pub fn new(config: &GatekeeperConfig, store: Arc<dyn CounterStore>) -> Self {
        Self {
            store,
            max_requests: config.rate_limit.max_requests,
            window: Duration::from_secs(config.rate_limit.window_secs),
            key_prefix: config.rate_limit.key_prefix.clone(),
            store_timeout: Duration::from_millis(config.store.timeout_ms),
            failure_policy: config.store.failure_policy,
        }
    }

    /// Storage key for an identity.
    pub fn key_for(&self, identity: &ClientIdentity) -> String {
        format!("{}{}", self.key_prefix, identity)
    }

    pub fn max_requests(&self) -> u64 {
        self.max_requests
    }

    pub fn window(&self) -> Duration {
        self.window
    }

    /// Decide whether `identity` may make one more request in its window.
    ///
    /// Counts the request when allowed. A store failure yields `Allow` under
    /// the fail-open policy and [`StoreUnavailable`] under fail-closed.
    pub async fn admit(&self, identity: &ClientIdentity) -> Result<Decision, StoreUnavailable> {
        let key = self.key_for(identity);
        let started = Instant::now();
        let result = self
            .bounded(self.store.try_consume(&key, self.max_requests, self.window))
            .await;
        metrics::record_store_latency(started);

        let decision = match result {
            Ok(Consumption::Admitted { count }) => Decision::Allow(Usage {
                count: Some(count),
                limit: self.max_requests,
                ttl: Some(self.window),
            }),
            Ok(Consumption::Exhausted { count, ttl }) => {
                tracing::debug!(client = %identity, count, "Quota exhausted");
                Decision::Reject(Usage {
                    count: Some(count),
                    limit: self.max_requests,
                    ttl,
                })
            }
            Err(err) => return self.on_store_failure(identity, err),
        };

        metrics::record_decision(if decision.is_allowed() { "allow" } else { "reject" });
        Ok(decision)
    }

    /// Read the current counter record for `identity` without counting.
    pub async fn usage(&self, identity: &ClientIdentity) -> Result<Option<CounterRecord>, StoreError> {
        let key = self.key_for(identity);
        self.bounded(self.store.current(&key)).await
    }

    async fn bounded<T, F>(&self, op: F) -> Result<T, StoreError>
    where
        F: std::future::Future<Output = Result<T, StoreError>>,
    {
        tokio::time::timeout(self.store_timeout, op)
            .await
            .unwrap_or(Err(StoreError::Timeout(self.store_timeout)))
    }

    fn on_store_failure(
        &self,
        identity: &ClientIdentity,
        err: StoreError,
    ) -> Result<Decision, StoreUnavailable> {
        metrics::record_store_error(err.kind());

        match self.failure_policy {
            FailurePolicy::Open => {
                tracing::warn!(
                    client = %identity,
                    backend = self.store.backend(),
                    error = %err,
                    "Counter store unavailable, admitting request (fail-open)"
                );
                metrics::record_decision("allow_unmetered");
                Ok(Decision::Allow(Usage {
                    count: None,
                    limit: self.max_requests,
                    ttl: None,
                }))
            }
            FailurePolicy::Closed => {
                tracing::error!(
                    client = %identity,
                    backend = self.store.backend(),
                    error = %err,
                    "Counter store unavailable, refusing request (fail-closed)"
                );
                metrics::record_decision("unavailable");
                Err(StoreUnavailable(err))
            }
        }
    }
}
