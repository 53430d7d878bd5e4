//! Per-provider circuit breakers
//!
//! Every provider key gets its own actor: a task that owns the provider's
//! [`CircuitRecord`] and processes commands from its mailbox one at a time.
//! The [`BreakerArena`] routes calls to the right mailbox, spawning actors
//! on first use.

#![allow(clippy::must_use_candidate, clippy::missing_errors_doc)]

mod actor;
mod arena;
pub mod clock;
mod error;
mod record;
pub mod store;

use std::sync::Arc;

use cortex_config::{BreakerStorage, CircuitBreakerConfig};

pub use arena::BreakerArena;
pub use clock::{Clock, ManualClock, SystemClock};
pub use error::BreakerError;
pub use record::{BreakerSettings, CircuitRecord, CircuitState, Verdict};
pub use store::BreakerStore;

/// Start the breaker arena described by configuration
///
/// Returns `None` when circuit breaking is disabled.
pub async fn start(config: &CircuitBreakerConfig) -> Result<Option<BreakerArena>, BreakerError> {
    if !config.enabled {
        tracing::info!("circuit breakers disabled");
        return Ok(None);
    }

    let store: Arc<dyn BreakerStore> = match &config.storage {
        BreakerStorage::Memory => Arc::new(store::memory::MemoryBreakerStore::new()),
        BreakerStorage::File { path } => Arc::new(store::file::FileBreakerStore::new(path.clone())),
        BreakerStorage::Redis(redis) => Arc::new(store::redis::RedisBreakerStore::new(
            redis.url.as_str(),
            &redis.key_prefix,
        )?),
    };

    let arena = BreakerArena::start(BreakerSettings::from(config), store, Arc::new(SystemClock)).await;
    Ok(Some(arena))
}
