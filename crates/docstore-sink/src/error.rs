//! Error taxonomy for the sink.
//!
//! Errors are contained at the stage that produces them:
//!
//! - [`ConfigError`] is fatal at initialization and halts sink startup.
//! - [`BuildError`] is per-record: the write path logs it and drops the
//!   record before it ever reaches the queue.
//! - [`StoreError`] is per-record inside a drain cycle: it is collected by
//!   the error aggregator and never aborts the cycle.
//! - [`AggregateFailure`] is the only thing a forced-flush caller sees: a
//!   count plus causes, never per-record callbacks.
//!
//! Platform-level faults (out-of-memory, stack exhaustion) are deliberately
//! never caught; the sink contains no `catch_unwind`.

use thiserror::Error;

use crate::template::TemplateError;

/// Configuration problems detected synchronously at initialization,
/// before any connection attempt.
#[derive(Debug, Error)]
pub enum ConfigError {
    /// The bucket/collection identifier is required and must be non-empty.
    #[error("bucket name is required and cannot be empty")]
    MissingBucket,

    /// At least one server URI must be configured.
    #[error("at least one server URI must be configured")]
    NoServers,

    /// A server URI was empty or failed to parse.
    #[error("server URI {uri:?} is not valid: {reason}")]
    InvalidServerUri { uri: String, reason: String },

    /// A mapping rule used the reserved `Parameters` context, which is
    /// declared but not implemented.
    #[error("mapping rule {name:?} uses the reserved parameters context, which is not supported")]
    UnsupportedRuleContext { name: String },

    /// The key template, default layout, or a rendered-layout include
    /// failed to parse.
    #[error("invalid template {template:?}: {source}")]
    InvalidTemplate {
        template: String,
        #[source]
        source: TemplateError,
    },
}

/// A record could not be turned into a (key, document) pair.
///
/// Caught and logged by the write path; the record is dropped before
/// enqueue and never becomes a stored failure.
#[derive(Debug, Error)]
pub enum BuildError {
    /// Rendering the key template, default layout, or an include layout
    /// failed for this record.
    #[error("failed to render template: {0}")]
    Render(#[from] TemplateError),
}

/// Transport or protocol fault raised by a [`StoreClient`](crate::client::StoreClient).
#[derive(Debug, Error)]
pub enum ClientFault {
    /// The request never completed (connection refused, timeout, TLS, ...).
    #[error("transport error talking to {endpoint}: {source}")]
    Transport {
        endpoint: String,
        #[source]
        source: reqwest::Error,
    },

    /// The store answered with a status the client does not understand.
    #[error("store returned unexpected status {status} for key {key:?}")]
    UnexpectedStatus { key: String, status: u16 },

    /// Catch-all for faults raised by non-HTTP client implementations.
    #[error("{0}")]
    Other(String),
}

/// Per-record failure observed while draining the queue into the store.
#[derive(Debug, Error)]
pub enum StoreError {
    /// The store refused the write and a follow-up `get` found the key:
    /// someone already stored a document under it. Non-retryable; the
    /// record is dropped.
    #[error("bucket {bucket:?} already contains a document with key {key:?}")]
    DuplicateKey { bucket: String, key: String },

    /// The store refused the write and the key does not exist. Commonly a
    /// credentials or bucket configuration problem.
    #[error("store rejected key {key:?}: {hint}")]
    Rejected { key: String, hint: String },

    /// The store (or the duplicate-probe `get`) could not be reached.
    #[error("connectivity failure while storing key {key:?}")]
    Connectivity {
        key: String,
        #[source]
        source: ClientFault,
    },
}

/// Aggregate outcome of one drain cycle with at least one failure.
///
/// A forced-flush caller learns only this aggregate; timer-triggered cycles
/// surface it via the diagnostic log instead.
#[derive(Debug, Error)]
#[error("drain cycle failed to persist {count} record(s)")]
pub struct AggregateFailure {
    /// Number of records that failed in the cycle.
    pub count: usize,
    /// The per-record causes, in drain order.
    pub causes: Vec<StoreError>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn config_error_display_names_the_uri() {
        let err = ConfigError::InvalidServerUri {
            uri: "not a uri".to_string(),
            reason: "relative URL without a base".to_string(),
        };
        let message = err.to_string();
        assert!(message.contains("not a uri"));
        assert!(message.contains("relative URL"));
    }

    #[test]
    fn duplicate_key_display_names_bucket_and_key() {
        let err = StoreError::DuplicateKey {
            bucket: "system_logging".to_string(),
            key: "log_abc".to_string(),
        };
        let message = err.to_string();
        assert!(message.contains("system_logging"));
        assert!(message.contains("log_abc"));
    }

    #[test]
    fn aggregate_failure_reports_count() {
        let failure = AggregateFailure {
            count: 3,
            causes: Vec::new(),
        };
        assert!(failure.to_string().contains('3'));
    }
}
