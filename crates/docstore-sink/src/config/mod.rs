//! Sink configuration and synchronous validation.
//!
//! The configuration surface mirrors what a host logging framework binds
//! from its own config file and hands to the sink: bucket name, optional
//! credential, server list, flush interval, templates, document source and
//! format, optional expiration, and mapping rule-sets.
//!
//! [`SinkConfig::validate`] runs synchronously at initialization, before
//! any connection attempt; every violation is a fatal
//! [`ConfigError`](crate::error::ConfigError) that halts sink startup.
//!
//! Durations are configured in whole seconds (`*_seconds` fields) and
//! exposed as `std::time::Duration` through accessors.

pub mod mapping_rule;

use serde::Deserialize;
use std::time::Duration;

use crate::constants;
use crate::error::ConfigError;
use mapping_rule::{ExcludeRule, IncludeRule, MappingRuleSet, RuleContext};

/// What the document is built from, configured once per sink.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DocumentSource {
    /// A statically rendered layout value.
    #[default]
    None,
    /// The record's properties, filtered by the mapping rules.
    Properties,
    /// The record's positional parameters.
    Parameters,
    /// A fresh map built from includes plus well-known event fields.
    All,
}

/// How documents are written to the remote store.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DocumentFormat {
    /// Opaque text.
    #[default]
    Default,
    /// Structured JSON.
    Json,
}

/// Optional credential for the bucket.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct Credential {
    pub username: String,
    pub password: String,
}

/// Complete sink configuration.
///
/// All fields have serde defaults so partial host configuration binds
/// cleanly; [`SinkConfig::validate`] decides what is actually acceptable.
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct SinkConfig {
    /// Bucket/collection the documents are stored in. Required, non-empty.
    pub bucket: String,

    /// Optional credential sent with every store call.
    pub credential: Option<Credential>,

    /// Server URIs, at least one, each well-formed. Load balancing is
    /// client-side round-robin across this list.
    pub servers: Vec<String>,

    /// Seconds between drain cycles, measured from cycle completion.
    pub flush_interval_seconds: u64,

    /// Per-call timeout for remote store operations, in seconds.
    pub store_timeout_seconds: u64,

    /// Template for document keys. When absent, or when it renders empty
    /// for a record, a unique key is synthesized.
    pub key_template: Option<String>,

    /// Default document layout, used in `None` mode and as the fallback
    /// for the other modes.
    pub layout: Option<String>,

    /// What documents are built from.
    pub document_source: DocumentSource,

    /// How documents are written.
    pub document_format: DocumentFormat,

    /// Optional document time-to-live, in seconds. Absent means the store
    /// keeps documents indefinitely.
    pub document_expiration_seconds: Option<u64>,

    /// Mapping rule-sets, applied in order (all excludes before includes).
    pub mappings: Vec<MappingRuleSet>,
}

impl Default for SinkConfig {
    fn default() -> Self {
        SinkConfig {
            bucket: String::new(),
            credential: None,
            servers: Vec::new(),
            flush_interval_seconds: constants::DEFAULT_FLUSH_INTERVAL_SECS,
            store_timeout_seconds: constants::DEFAULT_STORE_TIMEOUT_SECS,
            key_template: None,
            layout: None,
            document_source: DocumentSource::default(),
            document_format: DocumentFormat::default(),
            document_expiration_seconds: None,
            mappings: Vec::new(),
        }
    }
}

impl SinkConfig {
    /// Checks the configuration before any connection attempt.
    ///
    /// # Errors
    ///
    /// Returns the first [`ConfigError`] found: missing bucket, empty
    /// server list, malformed server URI, or a mapping rule using the
    /// reserved `Parameters` context.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.bucket.trim().is_empty() {
            return Err(ConfigError::MissingBucket);
        }

        if self.servers.is_empty() {
            return Err(ConfigError::NoServers);
        }
        for server in &self.servers {
            if server.trim().is_empty() {
                return Err(ConfigError::InvalidServerUri {
                    uri: server.clone(),
                    reason: "empty URI".to_string(),
                });
            }
            reqwest::Url::parse(server).map_err(|e| ConfigError::InvalidServerUri {
                uri: server.clone(),
                reason: e.to_string(),
            })?;
        }

        for rule_set in &self.mappings {
            for exclude in &rule_set.excludes {
                if exclude.context == RuleContext::Parameters {
                    return Err(ConfigError::UnsupportedRuleContext {
                        name: exclude.name.clone(),
                    });
                }
            }
            for include in &rule_set.includes {
                if include.context == RuleContext::Parameters {
                    return Err(ConfigError::UnsupportedRuleContext {
                        name: include.name.clone(),
                    });
                }
            }
        }

        Ok(())
    }

    /// Period between drain cycles.
    #[must_use]
    pub fn flush_interval(&self) -> Duration {
        Duration::from_secs(self.flush_interval_seconds)
    }

    /// Per-call store timeout.
    #[must_use]
    pub fn store_timeout(&self) -> Duration {
        Duration::from_secs(self.store_timeout_seconds)
    }

    /// Document time-to-live, if configured.
    #[must_use]
    pub fn document_expiration(&self) -> Option<Duration> {
        self.document_expiration_seconds.map(Duration::from_secs)
    }

    /// All excludes across every rule-set, in configuration order.
    pub(crate) fn flat_excludes(&self) -> impl Iterator<Item = &ExcludeRule> {
        self.mappings.iter().flat_map(|set| set.excludes.iter())
    }

    /// All includes across every rule-set, in configuration order.
    pub(crate) fn flat_includes(&self) -> impl Iterator<Item = &IncludeRule> {
        self.mappings.iter().flat_map(|set| set.includes.iter())
    }
}
