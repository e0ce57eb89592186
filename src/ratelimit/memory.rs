//! Process-local counter store.
//!
//! Used when `REDIS_URL` is `memory://` and throughout the tests. Records live
//! in a sharded map; the entry guard held during [`MemoryStore::try_consume`]
//! makes the check-and-increment indivisible per key without blocking other
//! keys. Expired records are treated as absent on access and dropped by
//! [`MemoryStore::purge_expired`].

use std::time::Duration;

use async_trait::async_trait;
use dashmap::mapref::entry::Entry;
use dashmap::DashMap;
use tokio::time::Instant;

use super::store::{Consumption, CounterRecord, CounterStore, StoreError};

struct Slot {
    count: u64,
    expires_at: Instant,
}

impl Slot {
    fn fresh(now: Instant, window: Duration) -> Self {
        Self {
            count: 1,
            expires_at: now + window,
        }
    }

    fn is_expired(&self, now: Instant) -> bool {
        self.expires_at <= now
    }
}

/// In-memory [`CounterStore`].
#[derive(Default)]
pub struct MemoryStore {
    slots: DashMap<String, Slot>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Drop every expired record. Returns how many were removed.
    pub fn purge_expired(&self) -> usize {
        let now = Instant::now();
        let before = self.slots.len();
        self.slots.retain(|_, slot| !slot.is_expired(now));
        before.saturating_sub(self.slots.len())
    }

    /// Number of records currently held, expired or not.
    pub fn len(&self) -> usize {
        self.slots.len()
    }

    pub fn is_empty(&self) -> bool {
        self.slots.is_empty()
    }
}

#[async_trait]
impl CounterStore for MemoryStore {
    async fn try_consume(
        &self,
        key: &str,
        limit: u64,
        window: Duration,
    ) -> Result<Consumption, StoreError> {
        let now = Instant::now();

        let consumption = match self.slots.entry(key.to_owned()) {
            Entry::Vacant(vacant) => {
                vacant.insert(Slot::fresh(now, window));
                Consumption::Admitted { count: 1 }
            }
            Entry::Occupied(mut occupied) => {
                let slot = occupied.get_mut();
                if slot.is_expired(now) {
                    *slot = Slot::fresh(now, window);
                    Consumption::Admitted { count: 1 }
                } else if slot.count >= limit {
                    Consumption::Exhausted {
                        count: slot.count,
                        ttl: Some(slot.expires_at.duration_since(now)),
                    }
                } else {
                    slot.count += 1;
                    slot.expires_at = now + window;
                    Consumption::Admitted { count: slot.count }
                }
            }
        };

        Ok(consumption)
    }

    async fn current(&self, key: &str) -> Result<Option<CounterRecord>, StoreError> {
        let now = Instant::now();
        Ok(self
            .slots
            .get(key)
            .filter(|slot| !slot.is_expired(now))
            .map(|slot| CounterRecord {
                count: slot.count,
                ttl: Some(slot.expires_at.duration_since(now)),
            }))
    }

    async fn ping(&self) -> Result<(), StoreError> {
        Ok(())
    }

    fn backend(&self) -> &'static str {
        "memory"
    }
}
