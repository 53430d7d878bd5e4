use std::sync::Arc;

use dashmap::DashMap;

use crate::actor::BreakerHandle;
use crate::{BreakerError, BreakerSettings, BreakerStore, CircuitRecord, Clock, Verdict};

/// Directory of per-provider breaker actors
///
/// The map only holds mailboxes; every record is owned by its actor.
#[derive(Clone)]
pub struct BreakerArena {
    inner: Arc<ArenaInner>,
}

struct ArenaInner {
    actors: DashMap<String, BreakerHandle>,
    settings: BreakerSettings,
    store: Arc<dyn BreakerStore>,
    clock: Arc<dyn Clock>,
}

impl BreakerArena {
    /// Start the arena, spawning an actor for every persisted record
    ///
    /// A store that cannot be read leaves the arena empty; records are then
    /// created lazily as providers are referenced.
    pub async fn start(settings: BreakerSettings, store: Arc<dyn BreakerStore>, clock: Arc<dyn Clock>) -> Self {
        let arena = Self {
            inner: Arc::new(ArenaInner {
                actors: DashMap::new(),
                settings,
                store,
                clock,
            }),
        };

        match arena.inner.store.load_all().await {
            Ok(records) => {
                tracing::info!(count = records.len(), "restored circuit records");
                for record in records {
                    let provider = record.provider.clone();
                    arena.inner.actors.insert(provider, arena.spawn(record));
                }
            }
            Err(e) => tracing::warn!(error = %e, "failed to restore circuit records"),
        }

        arena
    }

    /// Ask whether `provider` may be called
    pub async fn check(&self, provider: &str) -> Result<Verdict, BreakerError> {
        self.handle(provider).check().await
    }

    /// Record a successful dispatch to `provider`
    pub async fn record_success(&self, provider: &str) -> Result<CircuitRecord, BreakerError> {
        self.handle(provider).record_success().await
    }

    /// Record a failed dispatch to `provider`
    pub async fn record_failure(&self, provider: &str) -> Result<CircuitRecord, BreakerError> {
        self.handle(provider).record_failure().await
    }

    /// Give back a half-open probe slot for a call that never reported an outcome
    pub async fn release_probe(&self, provider: &str) -> Result<CircuitRecord, BreakerError> {
        self.handle(provider).release_probe().await
    }

    /// Return `provider`'s breaker to the closed zero value
    pub async fn reset(&self, provider: &str) -> Result<CircuitRecord, BreakerError> {
        self.handle(provider).reset().await
    }

    /// Current record of one provider
    pub async fn status(&self, provider: &str) -> Result<CircuitRecord, BreakerError> {
        self.handle(provider).snapshot().await
    }

    /// Every record held by a running actor, ordered by provider
    pub async fn status_all(&self) -> Result<Vec<CircuitRecord>, BreakerError> {
        let handles: Vec<BreakerHandle> = self.inner.actors.iter().map(|entry| entry.value().clone()).collect();

        let mut records = Vec::with_capacity(handles.len());
        for handle in handles {
            records.push(handle.snapshot().await?);
        }

        records.sort_by(|a, b| a.provider.cmp(&b.provider));
        Ok(records)
    }

    fn handle(&self, provider: &str) -> BreakerHandle {
        if let Some(handle) = self.inner.actors.get(provider)
            && !handle.is_closed()
        {
            return handle.clone();
        }

        self.inner
            .actors
            .entry(provider.to_owned())
            .and_modify(|handle| {
                if handle.is_closed() {
                    tracing::warn!(provider, "breaker actor stopped, starting a fresh one");
                    *handle = self.spawn(CircuitRecord::new(provider));
                }
            })
            .or_insert_with(|| self.spawn(CircuitRecord::new(provider)))
            .clone()
    }

    fn spawn(&self, record: CircuitRecord) -> BreakerHandle {
        BreakerHandle::spawn(
            record,
            self.inner.settings,
            Arc::clone(&self.inner.store),
            Arc::clone(&self.inner.clock),
        )
    }
}
