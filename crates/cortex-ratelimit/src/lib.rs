//! Per-client, per-minute admission control
//!
//! Usage is counted in one-minute buckets keyed by API key. Counters are
//! read, incremented and written back without compare-and-swap, so
//! concurrent requests in the same bucket can under-count.

#![allow(clippy::missing_errors_doc, clippy::must_use_candidate)]

mod error;
mod limiter;
pub mod storage;

use std::sync::Arc;

use cortex_config::{RateLimitConfig, UsageStorage};

pub use error::{LimitKind, RateLimitError};
pub use limiter::{Admission, RateLimitHeaders, UsageLimiter, bucket_key, estimate_tokens};
pub use storage::{UsageRecord, UsageStore};

/// Build a limiter backed by the configured usage store
pub fn create_limiter(config: &RateLimitConfig) -> Result<UsageLimiter, RateLimitError> {
    let store: Arc<dyn UsageStore> = match &config.storage {
        UsageStorage::Memory => Arc::new(storage::memory::MemoryUsageStore::new()),
        UsageStorage::Redis(redis) => Arc::new(storage::redis::RedisUsageStore::new(
            redis.url.as_str(),
            &redis.key_prefix,
        )?),
    };

    Ok(UsageLimiter::new(store))
}
