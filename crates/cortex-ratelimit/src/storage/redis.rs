use std::time::Duration;

use async_trait::async_trait;
use redis::AsyncCommands;

use super::{UsageRecord, UsageStore};
use crate::RateLimitError;

/// Redis-backed usage store shared by every gateway instance
#[derive(Clone)]
pub struct RedisUsageStore {
    client: redis::Client,
    prefix: String,
}

impl RedisUsageStore {
    /// Create a new store; the connection is opened lazily per call
    pub fn new(url: &str, prefix: &str) -> Result<Self, RateLimitError> {
        let client =
            redis::Client::open(url).map_err(|e| RateLimitError::Storage(format!("failed to connect to Redis: {e}")))?;

        Ok(Self {
            client,
            prefix: prefix.to_owned(),
        })
    }

    async fn connection(&self) -> Result<redis::aio::MultiplexedConnection, RateLimitError> {
        self.client
            .get_multiplexed_async_connection()
            .await
            .map_err(|e| RateLimitError::Storage(format!("failed to get connection: {e}")))
    }
}

#[async_trait]
impl UsageStore for RedisUsageStore {
    async fn get(&self, key: &str) -> Result<Option<UsageRecord>, RateLimitError> {
        let mut conn = self.connection().await?;

        let raw: Option<String> = conn
            .get(format!("{}{key}", self.prefix))
            .await
            .map_err(|e| RateLimitError::Storage(format!("GET failed: {e}")))?;

        raw.map(|json| {
            serde_json::from_str(&json).map_err(|e| RateLimitError::Storage(format!("corrupt usage record: {e}")))
        })
        .transpose()
    }

    async fn put(&self, key: &str, record: UsageRecord, ttl: Duration) -> Result<(), RateLimitError> {
        let mut conn = self.connection().await?;

        let json =
            serde_json::to_string(&record).map_err(|e| RateLimitError::Storage(format!("encode failed: {e}")))?;

        let _: () = conn
            .set_ex(format!("{}{key}", self.prefix), json, ttl.as_secs().max(1))
            .await
            .map_err(|e| RateLimitError::Storage(format!("SET EX failed: {e}")))?;

        Ok(())
    }
}
