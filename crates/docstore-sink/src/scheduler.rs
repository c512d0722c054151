//! Drain-cycle scheduler: a single-owner actor loop over the queue.
//!
//! One spawned task owns all drain activity. It selects between a timer
//! re-armed from cycle completion and a command channel carrying forced
//! flushes and shutdown. Because the loop is the only consumer, drains
//! never overlap and every trigger gets its own completed cycle, in
//! arrival order.
//!
//! A drain cycle snapshots the queue, stores each item sequentially, and
//! funnels per-record failures through [`ErrorAggregator`] without
//! aborting the cycle. Forced-flush callers receive the aggregate outcome
//! over their oneshot; timer cycles log it instead, there is no caller to
//! notify. Shutdown runs one final forced drain, logs any failure, acks,
//! and exits.

use std::sync::Arc;
use std::time::Duration;
use tokio::sync::{mpsc, oneshot};
use tokio::time;
use tracing::{debug, error, warn};

use crate::client::StoreClient;
use crate::config::{DocumentFormat, SinkConfig};
use crate::error::{AggregateFailure, StoreError};
use crate::queue::{IngestionQueue, PendingItem};

/// Commands accepted by the scheduler loop.
enum Command {
    Flush(oneshot::Sender<Result<(), AggregateFailure>>),
    Shutdown(oneshot::Sender<()>),
}

/// Collects per-record failures within one drain cycle.
#[derive(Default)]
pub struct ErrorAggregator {
    causes: Vec<StoreError>,
}

impl ErrorAggregator {
    /// Records one failure; the cycle keeps going.
    pub fn record(&mut self, error: StoreError) {
        warn!(%error, "failed to persist record");
        self.causes.push(error);
    }

    /// The cycle outcome: `Ok` when nothing failed, else the aggregate.
    pub fn finish(self) -> Result<(), AggregateFailure> {
        if self.causes.is_empty() {
            Ok(())
        } else {
            Err(AggregateFailure {
                count: self.causes.len(),
                causes: self.causes,
            })
        }
    }
}

/// Cloneable handle used to trigger flushes and shut the scheduler down.
#[derive(Clone)]
pub struct SchedulerHandle {
    tx: mpsc::UnboundedSender<Command>,
}

impl SchedulerHandle {
    /// Forces a drain cycle and waits for its aggregate outcome.
    ///
    /// A pending timer drain that wins the race runs first; this request
    /// then drains whatever remains queued.
    ///
    /// # Errors
    ///
    /// Returns the cycle's [`AggregateFailure`] when at least one record
    /// could not be persisted.
    pub async fn flush(&self) -> Result<(), AggregateFailure> {
        let (ack_tx, ack_rx) = oneshot::channel();
        if self.tx.send(Command::Flush(ack_tx)).is_err() {
            // Scheduler already stopped; nothing left to drain.
            return Ok(());
        }
        ack_rx.await.unwrap_or(Ok(()))
    }

    /// Stops the scheduler after one final forced drain.
    pub async fn shutdown(&self) {
        let (ack_tx, ack_rx) = oneshot::channel();
        if self.tx.send(Command::Shutdown(ack_tx)).is_ok() {
            let _ = ack_rx.await;
        }
    }
}

/// The scheduler actor. Construct with [`FlushScheduler::new`], then
/// `tokio::spawn(scheduler.run())`.
pub struct FlushScheduler {
    queue: Arc<IngestionQueue>,
    client: Arc<dyn StoreClient>,
    bucket: String,
    format: DocumentFormat,
    ttl: Option<Duration>,
    interval: Duration,
    rx: mpsc::UnboundedReceiver<Command>,
}

impl FlushScheduler {
    /// Creates the scheduler and its command handle.
    #[must_use]
    pub fn new(
        config: &SinkConfig,
        queue: Arc<IngestionQueue>,
        client: Arc<dyn StoreClient>,
    ) -> (Self, SchedulerHandle) {
        let (tx, rx) = mpsc::unbounded_channel();
        let scheduler = FlushScheduler {
            queue,
            client,
            bucket: config.bucket.clone(),
            format: config.document_format,
            ttl: config.document_expiration(),
            interval: config.flush_interval(),
            rx,
        };
        (scheduler, SchedulerHandle { tx })
    }

    /// Runs until shutdown or until every handle is dropped.
    pub async fn run(mut self) {
        loop {
            // Re-armed from cycle completion, not from the previous arm.
            let tick = time::sleep(self.interval);
            tokio::select! {
                () = tick => {
                    if let Err(failure) = self.drain().await {
                        error!(%failure, "periodic drain cycle had failures");
                    }
                }
                command = self.rx.recv() => match command {
                    Some(Command::Flush(ack)) => {
                        let _ = ack.send(self.drain().await);
                    }
                    Some(Command::Shutdown(ack)) => {
                        self.final_drain().await;
                        let _ = ack.send(());
                        return;
                    }
                    None => {
                        self.final_drain().await;
                        return;
                    }
                },
            }
        }
    }

    async fn final_drain(&self) {
        if let Err(failure) = self.drain().await {
            error!(%failure, "final drain cycle had failures");
        }
    }

    /// One drain cycle over the items present at cycle start.
    async fn drain(&self) -> Result<(), AggregateFailure> {
        let snapshot = self.queue.take_snapshot();
        if snapshot.is_empty() {
            return Ok(());
        }
        debug!(count = snapshot.len(), "draining queue");

        let mut aggregator = ErrorAggregator::default();
        for item in snapshot {
            if let Err(error) = self.store_one(&item).await {
                aggregator.record(error);
            }
        }
        aggregator.finish()
    }

    /// Stores one item, classifying a refused write by probing the key.
    async fn store_one(&self, item: &PendingItem) -> Result<(), StoreError> {
        let stored = self
            .client
            .store(&item.key, &item.document, self.format, self.ttl)
            .await
            .map_err(|source| StoreError::Connectivity {
                key: item.key.clone(),
                source,
            })?;
        if stored {
            return Ok(());
        }

        match self.client.get(&item.key).await {
            Ok(Some(_)) => Err(StoreError::DuplicateKey {
                bucket: self.bucket.clone(),
                key: item.key.clone(),
            }),
            Ok(None) => Err(StoreError::Rejected {
                key: item.key.clone(),
                hint: "write refused and key absent; check credentials and bucket configuration"
                    .to_string(),
            }),
            Err(source) => Err(StoreError::Connectivity {
                key: item.key.clone(),
                source,
            }),
        }
    }
}
