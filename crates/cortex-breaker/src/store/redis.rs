use async_trait::async_trait;
use redis::AsyncCommands;

use super::BreakerStore;
use crate::{BreakerError, CircuitRecord};

/// Redis-backed store shared by every gateway instance
///
/// Each record lives at `{prefix}breaker:{provider}`; the set
/// `{prefix}breakers` indexes the providers that have one.
#[derive(Clone)]
pub struct RedisBreakerStore {
    client: redis::Client,
    prefix: String,
}

impl RedisBreakerStore {
    pub fn new(url: &str, prefix: &str) -> Result<Self, BreakerError> {
        let client =
            redis::Client::open(url).map_err(|e| BreakerError::Storage(format!("failed to connect to Redis: {e}")))?;

        Ok(Self {
            client,
            prefix: prefix.to_owned(),
        })
    }

    fn record_key(&self, provider: &str) -> String {
        format!("{}breaker:{provider}", self.prefix)
    }

    fn index_key(&self) -> String {
        format!("{}breakers", self.prefix)
    }

    async fn connection(&self) -> Result<redis::aio::MultiplexedConnection, BreakerError> {
        self.client
            .get_multiplexed_async_connection()
            .await
            .map_err(|e| BreakerError::Storage(format!("failed to get connection: {e}")))
    }
}

#[async_trait]
impl BreakerStore for RedisBreakerStore {
    async fn load_all(&self) -> Result<Vec<CircuitRecord>, BreakerError> {
        let mut conn = self.connection().await?;

        let providers: Vec<String> = conn
            .smembers(self.index_key())
            .await
            .map_err(|e| BreakerError::Storage(format!("SMEMBERS failed: {e}")))?;

        let mut records = Vec::with_capacity(providers.len());
        for provider in providers {
            let raw: Option<String> = conn
                .get(self.record_key(&provider))
                .await
                .map_err(|e| BreakerError::Storage(format!("GET failed: {e}")))?;

            let Some(raw) = raw else { continue };

            match serde_json::from_str(&raw) {
                Ok(record) => records.push(record),
                Err(e) => tracing::warn!(provider, error = %e, "skipping corrupt circuit record"),
            }
        }

        Ok(records)
    }

    async fn save(&self, record: &CircuitRecord) -> Result<(), BreakerError> {
        let mut conn = self.connection().await?;

        let json = serde_json::to_string(record).map_err(|e| BreakerError::Storage(format!("encode failed: {e}")))?;

        let _: () = redis::pipe()
            .set(self.record_key(&record.provider), json)
            .ignore()
            .sadd(self.index_key(), &record.provider)
            .ignore()
            .query_async(&mut conn)
            .await
            .map_err(|e| BreakerError::Storage(format!("SET failed: {e}")))?;

        Ok(())
    }
}
