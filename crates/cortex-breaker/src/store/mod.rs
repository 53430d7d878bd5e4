//! Persistence for circuit records

pub mod file;
pub mod memory;
pub mod redis;

use async_trait::async_trait;

use crate::{BreakerError, CircuitRecord};

/// Durable home for circuit records
///
/// Actors write through after every mutation; the arena reads everything
/// back once at start-up.
#[async_trait]
pub trait BreakerStore: Send + Sync {
    /// Every record currently persisted
    async fn load_all(&self) -> Result<Vec<CircuitRecord>, BreakerError>;

    /// Overwrite the record for `record.provider`
    async fn save(&self, record: &CircuitRecord) -> Result<(), BreakerError>;
}
