use async_trait::async_trait;
use dashmap::DashMap;

use super::BreakerStore;
use crate::{BreakerError, CircuitRecord};

/// Process-local store; records vanish on restart
#[derive(Debug, Default)]
pub struct MemoryBreakerStore {
    records: DashMap<String, CircuitRecord>,
}

impl MemoryBreakerStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Persisted record for one provider
    pub fn get(&self, provider: &str) -> Option<CircuitRecord> {
        self.records.get(provider).map(|entry| entry.value().clone())
    }
}

#[async_trait]
impl BreakerStore for MemoryBreakerStore {
    async fn load_all(&self) -> Result<Vec<CircuitRecord>, BreakerError> {
        Ok(self.records.iter().map(|entry| entry.value().clone()).collect())
    }

    async fn save(&self, record: &CircuitRecord) -> Result<(), BreakerError> {
        self.records.insert(record.provider.clone(), record.clone());
        Ok(())
    }
}
