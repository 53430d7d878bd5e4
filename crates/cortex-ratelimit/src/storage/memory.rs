use std::sync::atomic::{AtomicU64, Ordering};
use std::time::{Duration, Instant};

use async_trait::async_trait;
use dashmap::DashMap;

use super::{UsageRecord, UsageStore};
use crate::RateLimitError;

/// Writes between sweeps of expired buckets
const SWEEP_INTERVAL: u64 = 1024;

/// In-process usage store for single-instance deployments
#[derive(Default)]
pub struct MemoryUsageStore {
    buckets: DashMap<String, (UsageRecord, Instant)>,
    writes: AtomicU64,
}

impl MemoryUsageStore {
    pub fn new() -> Self {
        Self::default()
    }

    fn sweep(&self) {
        let now = Instant::now();
        self.buckets.retain(|_, (_, expires_at)| *expires_at > now);
    }
}

#[async_trait]
impl UsageStore for MemoryUsageStore {
    async fn get(&self, key: &str) -> Result<Option<UsageRecord>, RateLimitError> {
        let Some(entry) = self.buckets.get(key) else {
            return Ok(None);
        };

        let (record, expires_at) = *entry;
        drop(entry);

        if expires_at <= Instant::now() {
            self.buckets.remove(key);
            return Ok(None);
        }

        Ok(Some(record))
    }

    async fn put(&self, key: &str, record: UsageRecord, ttl: Duration) -> Result<(), RateLimitError> {
        self.buckets.insert(key.to_owned(), (record, Instant::now() + ttl));

        if self.writes.fetch_add(1, Ordering::Relaxed) % SWEEP_INTERVAL == SWEEP_INTERVAL - 1 {
            self.sweep();
        }

        Ok(())
    }
}
