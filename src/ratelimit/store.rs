//! Counter store contract.
//!
//! The limiter never reads and writes a counter in separate steps. Every
//! admission goes through [`CounterStore::try_consume`], which each backend
//! must execute as one indivisible operation per key:
//!
//! ```text
//! absent               → SET key = 1, TTL = window   → Admitted(1)
//! present, n < limit   → n + 1, TTL = window          → Admitted(n + 1)
//! present, n >= limit  → untouched                    → Exhausted(n, ttl)
//! ```

use std::time::Duration;

use async_trait::async_trait;
use thiserror::Error;

/// Outcome of one consume attempt against a counter record.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Consumption {
    /// The request was counted. `count` is the value after the increment.
    Admitted { count: u64 },
    /// The record is at or above the limit and was left unchanged.
    Exhausted { count: u64, ttl: Option<Duration> },
}

/// Snapshot of a counter record, used for inspection.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CounterRecord {
    pub count: u64,
    pub ttl: Option<Duration>,
}

/// Failures talking to the counter store.
#[derive(Debug, Error)]
pub enum StoreError {
    /// The store could not be reached (connect refused, connection dropped).
    #[error("counter store unreachable: {0}")]
    Unreachable(String),

    /// The operation did not complete within the configured deadline.
    #[error("counter store timed out after {0:?}")]
    Timeout(Duration),

    /// The store answered with something we could not interpret.
    #[error("counter store protocol error: {0}")]
    Protocol(String),
}

impl StoreError {
    /// Short label for metrics.
    pub fn kind(&self) -> &'static str {
        match self {
            StoreError::Unreachable(_) => "unreachable",
            StoreError::Timeout(_) => "timeout",
            StoreError::Protocol(_) => "protocol",
        }
    }
}

/// A shared key-value service holding per-identity counters.
#[async_trait]
pub trait CounterStore: Send + Sync {
    /// Atomically check and count one request against `key`.
    async fn try_consume(
        &self,
        key: &str,
        limit: u64,
        window: Duration,
    ) -> Result<Consumption, StoreError>;

    /// Read the current record for `key` without modifying it.
    async fn current(&self, key: &str) -> Result<Option<CounterRecord>, StoreError>;

    /// Check that the store is reachable.
    async fn ping(&self) -> Result<(), StoreError>;

    /// Backend name for logs.
    fn backend(&self) -> &'static str;
}
