use std::sync::Arc;

use tokio::sync::{mpsc, oneshot};

use crate::{BreakerError, BreakerSettings, BreakerStore, CircuitRecord, Clock, Verdict};

/// Commands queued for one provider's actor
enum Command {
    Check(oneshot::Sender<Verdict>),
    RecordSuccess(oneshot::Sender<CircuitRecord>),
    RecordFailure(oneshot::Sender<CircuitRecord>),
    ReleaseProbe(oneshot::Sender<CircuitRecord>),
    Reset(oneshot::Sender<CircuitRecord>),
    Snapshot(oneshot::Sender<CircuitRecord>),
}

/// Mailbox depth per provider
const MAILBOX: usize = 256;

/// Address of a running breaker actor
#[derive(Clone)]
pub(crate) struct BreakerHandle {
    provider: Arc<str>,
    tx: mpsc::Sender<Command>,
}

impl BreakerHandle {
    /// Spawn the actor owning `record`
    pub(crate) fn spawn(
        record: CircuitRecord,
        settings: BreakerSettings,
        store: Arc<dyn BreakerStore>,
        clock: Arc<dyn Clock>,
    ) -> Self {
        let (tx, rx) = mpsc::channel(MAILBOX);
        let provider: Arc<str> = Arc::from(record.provider.as_str());

        let actor = BreakerActor {
            record,
            settings,
            store,
            clock,
        };
        tokio::spawn(actor.run(rx));

        Self { provider, tx }
    }

    pub(crate) async fn check(&self) -> Result<Verdict, BreakerError> {
        self.call(Command::Check).await
    }

    pub(crate) async fn record_success(&self) -> Result<CircuitRecord, BreakerError> {
        self.call(Command::RecordSuccess).await
    }

    pub(crate) async fn record_failure(&self) -> Result<CircuitRecord, BreakerError> {
        self.call(Command::RecordFailure).await
    }

    pub(crate) async fn release_probe(&self) -> Result<CircuitRecord, BreakerError> {
        self.call(Command::ReleaseProbe).await
    }

    pub(crate) async fn reset(&self) -> Result<CircuitRecord, BreakerError> {
        self.call(Command::Reset).await
    }

    pub(crate) async fn snapshot(&self) -> Result<CircuitRecord, BreakerError> {
        self.call(Command::Snapshot).await
    }

    pub(crate) fn is_closed(&self) -> bool {
        self.tx.is_closed()
    }

    async fn call<T>(&self, command: impl FnOnce(oneshot::Sender<T>) -> Command) -> Result<T, BreakerError> {
        let (reply_tx, reply_rx) = oneshot::channel();

        self.tx
            .send(command(reply_tx))
            .await
            .map_err(|_| BreakerError::Unavailable(format!("actor for {} has stopped", self.provider)))?;

        reply_rx
            .await
            .map_err(|_| BreakerError::Unavailable(format!("actor for {} dropped the reply", self.provider)))
    }
}

/// Sole owner of one provider's record
struct BreakerActor {
    record: CircuitRecord,
    settings: BreakerSettings,
    store: Arc<dyn BreakerStore>,
    clock: Arc<dyn Clock>,
}

impl BreakerActor {
    async fn run(mut self, mut rx: mpsc::Receiver<Command>) {
        while let Some(command) = rx.recv().await {
            match command {
                Command::Check(reply) => {
                    let before = self.record.clone();
                    let verdict = self.record.check(&self.settings, self.clock.now_ms());
                    if self.record != before {
                        if before.state != self.record.state {
                            tracing::info!(provider = %self.record.provider, "circuit breaker half-open, probing");
                        }
                        self.persist().await;
                    }
                    let _ = reply.send(verdict);
                }
                Command::RecordSuccess(reply) => {
                    let before = self.record.state;
                    self.record.record_success();
                    if before != self.record.state {
                        tracing::info!(provider = %self.record.provider, "circuit breaker closed");
                    }
                    self.persist().await;
                    let _ = reply.send(self.record.clone());
                }
                Command::RecordFailure(reply) => {
                    let before = self.record.state;
                    self.record.record_failure(&self.settings, self.clock.now_ms());
                    if before != self.record.state {
                        tracing::warn!(
                            provider = %self.record.provider,
                            failure_count = self.record.failure_count,
                            "circuit breaker opened"
                        );
                    }
                    self.persist().await;
                    let _ = reply.send(self.record.clone());
                }
                Command::ReleaseProbe(reply) => {
                    let before = self.record.half_open_calls;
                    self.record.release_probe();
                    if before != self.record.half_open_calls {
                        tracing::debug!(provider = %self.record.provider, "half-open probe abandoned, slot released");
                        self.persist().await;
                    }
                    let _ = reply.send(self.record.clone());
                }
                Command::Reset(reply) => {
                    self.record.reset();
                    tracing::info!(provider = %self.record.provider, "circuit breaker reset");
                    self.persist().await;
                    let _ = reply.send(self.record.clone());
                }
                Command::Snapshot(reply) => {
                    let _ = reply.send(self.record.clone());
                }
            }
        }

        tracing::debug!(provider = %self.record.provider, "breaker mailbox closed");
    }

    async fn persist(&self) {
        if let Err(e) = self.store.save(&self.record).await {
            tracing::warn!(provider = %self.record.provider, error = %e, "failed to persist circuit record");
        }
    }
}
