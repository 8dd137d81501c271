//! Shared counter storage for rate limiting.
//!
//! The limiter only needs one primitive: an atomic increment that sets a TTL
//! on first write. Abstracting it lets a single-instance deployment use the
//! in-process map below while a clustered deployment substitutes an external
//! cache, without touching the limiter logic.

use std::time::{Duration, Instant};

use async_trait::async_trait;
use dashmap::DashMap;

/// TTL-capable counter store.
#[async_trait]
pub trait CounterStore: Send + Sync {
    /// Atomically increment the counter at `key`, starting it at 1 with the
    /// given TTL if absent or expired. Returns the post-increment value.
    async fn incr(&self, key: &str, ttl: Duration) -> u64;

    /// Current value at `key`, or 0 if absent/expired.
    async fn get(&self, key: &str) -> u64;
}

#[derive(Debug)]
struct CounterEntry {
    count: u64,
    expires_at: Instant,
}

/// In-process counter store. Expired windows are reaped lazily once the map
/// grows past a watermark, so long-gone window keys do not accumulate.
#[derive(Default)]
pub struct InMemoryCounterStore {
    entries: DashMap<String, CounterEntry>,
}

const PURGE_WATERMARK: usize = 4096;

impl InMemoryCounterStore {
    pub fn new() -> Self {
        Self::default()
    }

    fn purge_expired(&self) {
        let now = Instant::now();
        self.entries.retain(|_, entry| entry.expires_at > now);
    }
}

#[async_trait]
impl CounterStore for InMemoryCounterStore {
    async fn incr(&self, key: &str, ttl: Duration) -> u64 {
        if self.entries.len() > PURGE_WATERMARK {
            self.purge_expired();
        }

        let now = Instant::now();
        let mut entry = self
            .entries
            .entry(key.to_string())
            .or_insert_with(|| CounterEntry {
                count: 0,
                expires_at: now + ttl,
            });
        if entry.expires_at <= now {
            entry.count = 0;
            entry.expires_at = now + ttl;
        }
        entry.count += 1;
        entry.count
    }

    async fn get(&self, key: &str) -> u64 {
        match self.entries.get(key) {
            Some(entry) if entry.expires_at > Instant::now() => entry.count,
            _ => 0,
        }
    }
}
