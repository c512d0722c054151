//! The sink facade: the interface a host logging adapter consumes.
//!
//! [`Sink`] is the full surface an adapter needs: synchronous `write`,
//! awaited `flush` with the aggregate outcome, and `close` for teardown.
//! The core never depends on any host framework type.
//!
//! [`DocumentStoreSink`] wires the pieces together: it validates the
//! configuration, compiles the document builder, spawns the flush
//! scheduler, and (when the client provides one) a node-failure listener
//! that logs diagnostics until close.

use async_trait::async_trait;
use std::sync::Arc;
use tokio_util::sync::CancellationToken;
use tracing::error;

use crate::builder::DocumentBuilder;
use crate::client::{HttpStoreClient, NodeFailure, StoreClient};
use crate::config::SinkConfig;
use crate::error::{AggregateFailure, ConfigError};
use crate::queue::IngestionQueue;
use crate::record::LogRecord;
use crate::scheduler::{FlushScheduler, SchedulerHandle};
use tokio::sync::mpsc;

/// The persistence sink as seen by a host logging adapter.
#[async_trait]
pub trait Sink: Send + Sync {
    /// Accepts one record. Fast, never blocks on I/O; a record that fails
    /// to build is logged and dropped.
    fn write(&self, record: &LogRecord);

    /// Forces a drain cycle and reports its aggregate outcome.
    ///
    /// # Errors
    ///
    /// Returns [`AggregateFailure`] when at least one queued record could
    /// not be persisted during the cycle.
    async fn flush(&self) -> Result<(), AggregateFailure>;

    /// Drains one final time and tears the sink down. Failures in the
    /// final drain are logged, not returned.
    async fn close(&self);
}

/// Queue-and-flush sink persisting records to a remote document store.
pub struct DocumentStoreSink {
    builder: DocumentBuilder,
    queue: Arc<IngestionQueue>,
    scheduler: SchedulerHandle,
    shutdown: CancellationToken,
}

impl DocumentStoreSink {
    /// Builds the sink on top of an already-constructed store client.
    ///
    /// Must be called from within a tokio runtime; the scheduler and the
    /// node-failure listener are spawned here.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError`] when validation or template compilation
    /// fails. No task is spawned on the error path.
    pub fn new(config: SinkConfig, client: Arc<dyn StoreClient>) -> Result<Self, ConfigError> {
        config.validate()?;
        let builder = DocumentBuilder::new(&config)?;

        let queue = Arc::new(IngestionQueue::new());
        let (scheduler, handle) =
            FlushScheduler::new(&config, Arc::clone(&queue), Arc::clone(&client));
        tokio::spawn(scheduler.run());

        let shutdown = CancellationToken::new();
        if let Some(failures) = client.take_node_failures() {
            tokio::spawn(listen_for_node_failures(failures, shutdown.clone()));
        }

        Ok(DocumentStoreSink {
            builder,
            queue,
            scheduler: handle,
            shutdown,
        })
    }

    /// Validates the configuration and connects an [`HttpStoreClient`].
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError`] when validation, template compilation, or
    /// client construction fails.
    pub fn connect(config: SinkConfig) -> Result<Self, ConfigError> {
        config.validate()?;
        let client = Arc::new(HttpStoreClient::new(&config)?);
        Self::new(config, client)
    }

    /// Number of records currently awaiting the next drain cycle.
    #[must_use]
    pub fn pending(&self) -> usize {
        self.queue.len()
    }
}

#[async_trait]
impl Sink for DocumentStoreSink {
    fn write(&self, record: &LogRecord) {
        match self.builder.build(record) {
            Ok(item) => self.queue.enqueue(item),
            Err(error) => {
                error!(%error, logger = %record.logger, "dropping record that failed to build");
            }
        }
    }

    async fn flush(&self) -> Result<(), AggregateFailure> {
        self.scheduler.flush().await
    }

    async fn close(&self) {
        self.scheduler.shutdown().await;
        self.shutdown.cancel();
    }
}

/// Logs node-failure diagnostics until the sink closes. Purely
/// informational; the drain state machine never sees these events.
async fn listen_for_node_failures(
    mut failures: mpsc::UnboundedReceiver<NodeFailure>,
    shutdown: CancellationToken,
) {
    loop {
        tokio::select! {
            () = shutdown.cancelled() => return,
            failure = failures.recv() => match failure {
                Some(failure) => {
                    error!(
                        endpoint = %failure.endpoint,
                        detail = %failure.detail,
                        "store node failure reported"
                    );
                }
                None => return,
            },
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::DocumentFormat;
    use crate::error::ClientFault;
    use serde_json::{json, Value};
    use std::sync::Mutex;
    use std::time::Duration;

    #[derive(Default)]
    struct CountingClient {
        stored: Mutex<Vec<(String, Value)>>,
    }

    #[async_trait]
    impl StoreClient for CountingClient {
        async fn store(
            &self,
            key: &str,
            document: &Value,
            _format: DocumentFormat,
            _ttl: Option<Duration>,
        ) -> Result<bool, ClientFault> {
            self.stored
                .lock()
                .expect("lock")
                .push((key.to_string(), document.clone()));
            Ok(true)
        }

        async fn get(&self, _key: &str) -> Result<Option<Value>, ClientFault> {
            Ok(None)
        }
    }

    fn config() -> SinkConfig {
        SinkConfig {
            bucket: "logs".to_string(),
            servers: vec!["http://127.0.0.1:8091".to_string()],
            flush_interval_seconds: 3_600,
            ..SinkConfig::default()
        }
    }

    fn sink_with(client: &Arc<CountingClient>, config: SinkConfig) -> DocumentStoreSink {
        let store: Arc<dyn StoreClient> = Arc::clone(client) as Arc<dyn StoreClient>;
        DocumentStoreSink::new(config, store).expect("sink should build")
    }

    #[tokio::test]
    async fn write_enqueues_and_flush_stores() {
        let client = Arc::new(CountingClient::default());
        let sink = sink_with(&client, config());

        sink.write(&LogRecord::new("app", crate::record::Level::Info, "one"));
        sink.write(&LogRecord::new("app", crate::record::Level::Info, "two"));
        assert_eq!(sink.pending(), 2);

        sink.flush().await.expect("flush should succeed");
        assert_eq!(sink.pending(), 0);
        assert_eq!(client.stored.lock().expect("lock").len(), 2);
        sink.close().await;
    }

    #[tokio::test]
    async fn record_that_fails_to_build_is_dropped_before_the_queue() {
        let client = Arc::new(CountingClient::default());
        let mut config = config();
        // Renders only when the record carries at least six parameters.
        config.key_template = Some("${param:5}".to_string());
        let sink = sink_with(&client, config);

        sink.write(&LogRecord::new("app", crate::record::Level::Info, "bare"));
        assert_eq!(sink.pending(), 0);
        sink.close().await;
    }

    #[tokio::test]
    async fn close_drains_whatever_is_still_queued() {
        let client = Arc::new(CountingClient::default());
        let sink = sink_with(&client, config());

        sink.write(&LogRecord::new("app", crate::record::Level::Warn, "tail"));
        sink.close().await;
        assert_eq!(client.stored.lock().expect("lock").len(), 1);
    }

    #[tokio::test]
    async fn invalid_config_never_spawns_anything() {
        let client: Arc<dyn StoreClient> = Arc::new(CountingClient::default());
        let result = DocumentStoreSink::new(SinkConfig::default(), client);
        assert!(matches!(result, Err(ConfigError::MissingBucket)));
    }

    #[test]
    fn connect_rejects_invalid_config_without_a_runtime() {
        // Validation runs before any client or task is created, so no
        // runtime is needed on the error path.
        assert!(DocumentStoreSink::connect(SinkConfig::default()).is_err());
    }
}
