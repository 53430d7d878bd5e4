pub mod memory;
pub mod redis;

use std::time::Duration;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use crate::RateLimitError;

/// Counters for one (API key, minute) bucket
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct UsageRecord {
    pub requests: u64,
    pub tokens: u64,
}

/// Key/value storage for usage buckets
#[async_trait]
pub trait UsageStore: Send + Sync {
    /// Read a bucket, `None` when it was never written or has expired
    async fn get(&self, key: &str) -> Result<Option<UsageRecord>, RateLimitError>;

    /// Overwrite a bucket, expiring it after `ttl`
    async fn put(&self, key: &str, record: UsageRecord, ttl: Duration) -> Result<(), RateLimitError>;
}
