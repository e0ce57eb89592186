//! Rate limiting engine.
//!
//! # Data Flow
//! ```text
//! ClientIdentity
//!     → limiter.rs (key = prefix + identity, bounded by store timeout)
//!     → store.rs (CounterStore::try_consume, one atomic step per key)
//!         → redis.rs  (Lua script on the shared server)
//!         → memory.rs (sharded map, single process)
//!     → Decision::Allow / Decision::Reject / StoreUnavailable
//! ```
//!
//! # Design Decisions
//! - The limiter is stateless; the store owns every counter
//! - Records expire on their own; absence means a count of zero
//! - Every allowed request refreshes the record's TTL (sliding refresh)
//! - Store failures are typed so the failure policy is an explicit choice

mod limiter;
mod memory;
mod redis;
mod store;

pub use limiter::{Decision, RateLimiter, StoreUnavailable, Usage};
pub use memory::MemoryStore;
pub use redis::RedisStore;
pub use store::{Consumption, CounterRecord, CounterStore, StoreError};

use std::sync::Arc;
use std::time::Duration;

use crate::config::StoreConfig;

/// URL scheme selecting the process-local store.
pub const MEMORY_SCHEME: &str = "memory";

/// Counter store built from configuration.
pub enum StoreBackend {
    Redis(Arc<RedisStore>),
    Memory(Arc<MemoryStore>),
}

impl StoreBackend {
    /// Pick the backend from the configured store URL.
    ///
    /// Callers validate the configuration first; an unparsable Redis URL is
    /// still reported here.
    pub fn from_config(config: &StoreConfig) -> Result<Self, ::redis::RedisError> {
        let url = config.url.as_deref().unwrap_or_default();
        if url.starts_with(&format!("{MEMORY_SCHEME}://")) {
            return Ok(StoreBackend::Memory(Arc::new(MemoryStore::new())));
        }
        Ok(StoreBackend::Redis(Arc::new(RedisStore::open(
            url,
            Duration::from_millis(config.timeout_ms),
        )?)))
    }

    pub fn store(&self) -> Arc<dyn CounterStore> {
        match self {
            StoreBackend::Redis(store) => store.clone(),
            StoreBackend::Memory(store) => store.clone(),
        }
    }
}
