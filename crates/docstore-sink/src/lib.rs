//! # docstore-sink
//!
//! Asynchronous, batched persistence sink for structured log records.
//! Records are transformed into (key, document) pairs by a configurable
//! mapping pipeline, buffered in memory, and periodically drained into a
//! remote key/document store, so log emission never waits on the network.
//!
//! ## Architecture
//!
//! - [`builder`]: turns one record into a pending (key, document) pair
//! - [`queue`]: thread-safe FIFO between producers and the drain cycle
//! - [`scheduler`]: actor loop owning the timer and exclusive drains
//! - [`client`]: the store contract plus the HTTP implementation
//! - [`sink`]: the facade a host logging adapter consumes
//! - [`template`] / [`context`]: layout rendering and diagnostic contexts
//!
//! ## Example
//!
//! ```no_run
//! use docstore_sink::config::SinkConfig;
//! use docstore_sink::record::{Level, LogRecord};
//! use docstore_sink::sink::{DocumentStoreSink, Sink};
//!
//! # #[tokio::main]
//! # async fn main() -> Result<(), docstore_sink::error::ConfigError> {
//! let sink = DocumentStoreSink::connect(SinkConfig {
//!     bucket: "system_logging".to_string(),
//!     servers: vec!["http://127.0.0.1:8091".to_string()],
//!     ..SinkConfig::default()
//! })?;
//!
//! sink.write(&LogRecord::new("orders", Level::Info, "order placed"));
//! sink.flush().await.ok();
//! sink.close().await;
//! # Ok(())
//! # }
//! ```
//!
//! Delivery is at-most-once: there is no durable buffering and no retry;
//! duplicate-key detection is the only dedup signal.

#![deny(clippy::all)]

pub mod builder;
pub mod client;
pub mod config;
pub mod constants;
pub mod context;
pub mod error;
pub mod queue;
pub mod record;
pub mod scheduler;
pub mod sink;
pub mod template;

pub use builder::DocumentBuilder;
pub use client::{HttpStoreClient, NodeFailure, StoreClient};
pub use config::{Credential, DocumentFormat, DocumentSource, SinkConfig};
pub use error::{AggregateFailure, BuildError, ClientFault, ConfigError, StoreError};
pub use queue::{IngestionQueue, PendingItem};
pub use record::{Level, LogRecord};
pub use scheduler::{ErrorAggregator, FlushScheduler, SchedulerHandle};
pub use sink::{DocumentStoreSink, Sink};
pub use template::{Template, TemplateError};
