//! Remote store client: the trait the drain cycle talks to, plus the
//! HTTP implementation used by [`DocumentStoreSink::connect`](crate::sink::DocumentStoreSink::connect).
//!
//! The contract is deliberately small: `store` answers `Ok(true)` when the
//! document was created, `Ok(false)` when the store refused the write
//! without faulting (the scheduler then probes with `get` to tell a
//! duplicate key from a rejection), and `Err` for transport-level trouble.
//!
//! Connectivity faults additionally surface as [`NodeFailure`] events on a
//! channel the sink drains for diagnostic logging only.

use async_trait::async_trait;
use reqwest::{StatusCode, Url};
use serde_json::Value;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Mutex, PoisonError};
use std::time::Duration;
use tokio::sync::mpsc;

use crate::config::{Credential, DocumentFormat, SinkConfig};
use crate::error::{ClientFault, ConfigError};

/// A store node became unreachable. Diagnostic only.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NodeFailure {
    /// The endpoint that failed.
    pub endpoint: String,
    /// Human-readable failure detail.
    pub detail: String,
}

/// The remote document store as seen by the drain cycle.
#[async_trait]
pub trait StoreClient: Send + Sync {
    /// Stores `document` under `key`.
    ///
    /// `Ok(true)` means created; `Ok(false)` means the store refused the
    /// write without faulting (key conflict or rejection, probed via
    /// [`get`](StoreClient::get)).
    async fn store(
        &self,
        key: &str,
        document: &Value,
        format: DocumentFormat,
        ttl: Option<Duration>,
    ) -> Result<bool, ClientFault>;

    /// Fetches the document stored under `key`, if any.
    async fn get(&self, key: &str) -> Result<Option<Value>, ClientFault>;

    /// Hands over the node-failure event receiver.
    ///
    /// Returns `Some` at most once; implementations without node
    /// diagnostics return `None`.
    fn take_node_failures(&self) -> Option<mpsc::UnboundedReceiver<NodeFailure>> {
        None
    }
}

/// HTTP document-store client.
///
/// Documents live at `{server}/{bucket}/{key}`. Writes are `POST`; the
/// store answers 2xx for created, 409 for an existing key. Requests are
/// spread round-robin across the configured servers.
pub struct HttpStoreClient {
    client: reqwest::Client,
    servers: Vec<Url>,
    bucket: String,
    credential: Option<Credential>,
    next_server: AtomicUsize,
    failure_tx: mpsc::UnboundedSender<NodeFailure>,
    failure_rx: Mutex<Option<mpsc::UnboundedReceiver<NodeFailure>>>,
}

impl HttpStoreClient {
    /// Builds a client from validated configuration.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::InvalidServerUri`] when a server URI fails
    /// to parse. Callers run [`SinkConfig::validate`] first, so this only
    /// fires on a construction path that skipped validation.
    pub fn new(config: &SinkConfig) -> Result<Self, ConfigError> {
        let servers = config
            .servers
            .iter()
            .map(|uri| {
                Url::parse(uri).map_err(|e| ConfigError::InvalidServerUri {
                    uri: uri.clone(),
                    reason: e.to_string(),
                })
            })
            .collect::<Result<Vec<_>, _>>()?;

        let client = reqwest::Client::builder()
            .timeout(config.store_timeout())
            .build()
            .expect("failed to build HTTP client");

        let (failure_tx, failure_rx) = mpsc::unbounded_channel();
        Ok(HttpStoreClient {
            client,
            servers,
            bucket: config.bucket.clone(),
            credential: config.credential.clone(),
            next_server: AtomicUsize::new(0),
            failure_tx,
            failure_rx: Mutex::new(Some(failure_rx)),
        })
    }

    fn document_url(&self, key: &str) -> (String, String) {
        let index = self.next_server.fetch_add(1, Ordering::Relaxed) % self.servers.len();
        let server = &self.servers[index];
        let endpoint = server.as_str().trim_end_matches('/').to_string();
        let url = format!("{endpoint}/{}/{key}", self.bucket);
        (endpoint, url)
    }

    fn with_auth(&self, request: reqwest::RequestBuilder) -> reqwest::RequestBuilder {
        match &self.credential {
            Some(credential) => {
                request.basic_auth(&credential.username, Some(&credential.password))
            }
            None => request,
        }
    }

    fn report_failure(&self, endpoint: &str, error: &reqwest::Error) {
        // Listener may already be gone during teardown.
        let _ = self.failure_tx.send(NodeFailure {
            endpoint: endpoint.to_string(),
            detail: error.to_string(),
        });
    }
}

#[async_trait]
impl StoreClient for HttpStoreClient {
    async fn store(
        &self,
        key: &str,
        document: &Value,
        format: DocumentFormat,
        ttl: Option<Duration>,
    ) -> Result<bool, ClientFault> {
        let (endpoint, url) = self.document_url(key);
        let mut request = self.with_auth(self.client.post(&url));
        if let Some(ttl) = ttl {
            request = request.query(&[("ttl", ttl.as_secs())]);
        }
        request = match format {
            DocumentFormat::Json => request.json(document),
            DocumentFormat::Default => request.body(document_text(document)),
        };

        let response = request.send().await.map_err(|source| {
            self.report_failure(&endpoint, &source);
            ClientFault::Transport { endpoint, source }
        })?;

        match response.status() {
            status if status.is_success() => Ok(true),
            StatusCode::CONFLICT => Ok(false),
            status => Err(ClientFault::UnexpectedStatus {
                key: key.to_string(),
                status: status.as_u16(),
            }),
        }
    }

    async fn get(&self, key: &str) -> Result<Option<Value>, ClientFault> {
        let (endpoint, url) = self.document_url(key);
        let response = self
            .with_auth(self.client.get(&url))
            .send()
            .await
            .map_err(|source| {
                self.report_failure(&endpoint, &source);
                ClientFault::Transport {
                    endpoint: endpoint.clone(),
                    source,
                }
            })?;

        match response.status() {
            status if status.is_success() => {
                let text = response
                    .text()
                    .await
                    .map_err(|source| ClientFault::Transport { endpoint, source })?;
                // Plain-text documents come back as a JSON string value.
                Ok(Some(
                    serde_json::from_str(&text).unwrap_or(Value::String(text)),
                ))
            }
            StatusCode::NOT_FOUND => Ok(None),
            status => Err(ClientFault::UnexpectedStatus {
                key: key.to_string(),
                status: status.as_u16(),
            }),
        }
    }

    fn take_node_failures(&self) -> Option<mpsc::UnboundedReceiver<NodeFailure>> {
        self.failure_rx
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .take()
    }
}

/// Wire form of a document in `Default` (opaque text) format.
fn document_text(document: &Value) -> String {
    match document {
        Value::String(text) => text.clone(),
        other => other.to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn config(servers: Vec<String>) -> SinkConfig {
        SinkConfig {
            bucket: "logs".to_string(),
            servers,
            ..SinkConfig::default()
        }
    }

    fn client_for(server: &mockito::ServerGuard) -> HttpStoreClient {
        HttpStoreClient::new(&config(vec![server.url()])).expect("client should build")
    }

    #[tokio::test]
    async fn store_maps_created_to_true() {
        let mut server = mockito::Server::new_async().await;
        let mock = server
            .mock("POST", "/logs/k1")
            .with_status(201)
            .create_async()
            .await;

        let stored = client_for(&server)
            .store("k1", &json!({"a": 1}), DocumentFormat::Json, None)
            .await
            .expect("store should succeed");
        assert!(stored);
        mock.assert_async().await;
    }

    #[tokio::test]
    async fn store_maps_conflict_to_false() {
        let mut server = mockito::Server::new_async().await;
        server
            .mock("POST", "/logs/k1")
            .with_status(409)
            .create_async()
            .await;

        let stored = client_for(&server)
            .store("k1", &json!("doc"), DocumentFormat::Default, None)
            .await
            .expect("conflict is not a fault");
        assert!(!stored);
    }

    #[tokio::test]
    async fn store_surfaces_unexpected_status() {
        let mut server = mockito::Server::new_async().await;
        server
            .mock("POST", "/logs/k1")
            .with_status(503)
            .create_async()
            .await;

        let fault = client_for(&server)
            .store("k1", &json!("doc"), DocumentFormat::Json, None)
            .await
            .expect_err("503 should fault");
        assert!(matches!(
            fault,
            ClientFault::UnexpectedStatus { status: 503, .. }
        ));
    }

    #[tokio::test]
    async fn store_sends_ttl_query_and_basic_auth() {
        let mut server = mockito::Server::new_async().await;
        let mock = server
            .mock("POST", "/logs/k1")
            .match_query(mockito::Matcher::UrlEncoded(
                "ttl".to_string(),
                "600".to_string(),
            ))
            .match_header("authorization", mockito::Matcher::Regex("Basic .+".to_string()))
            .with_status(201)
            .create_async()
            .await;

        let mut config = config(vec![server.url()]);
        config.credential = Some(Credential {
            username: "logger".to_string(),
            password: "vagrant".to_string(),
        });
        let client = HttpStoreClient::new(&config).expect("client should build");

        client
            .store(
                "k1",
                &json!({"a": 1}),
                DocumentFormat::Json,
                Some(Duration::from_secs(600)),
            )
            .await
            .expect("store should succeed");
        mock.assert_async().await;
    }

    #[tokio::test]
    async fn default_format_posts_plain_text_body() {
        let mut server = mockito::Server::new_async().await;
        let mock = server
            .mock("POST", "/logs/k1")
            .match_body("order placed")
            .with_status(201)
            .create_async()
            .await;

        client_for(&server)
            .store("k1", &json!("order placed"), DocumentFormat::Default, None)
            .await
            .expect("store should succeed");
        mock.assert_async().await;
    }

    #[tokio::test]
    async fn get_returns_document_and_maps_not_found_to_none() {
        let mut server = mockito::Server::new_async().await;
        server
            .mock("GET", "/logs/found")
            .with_status(200)
            .with_body(r#"{"a":1}"#)
            .create_async()
            .await;
        server
            .mock("GET", "/logs/missing")
            .with_status(404)
            .create_async()
            .await;

        let client = client_for(&server);
        assert_eq!(
            client.get("found").await.expect("get"),
            Some(json!({"a": 1}))
        );
        assert_eq!(client.get("missing").await.expect("get"), None);
    }

    #[tokio::test]
    async fn requests_round_robin_across_servers() {
        let mut first = mockito::Server::new_async().await;
        let mut second = mockito::Server::new_async().await;
        let first_mock = first
            .mock("POST", "/logs/k")
            .with_status(201)
            .create_async()
            .await;
        let second_mock = second
            .mock("POST", "/logs/k")
            .with_status(201)
            .create_async()
            .await;

        let client = HttpStoreClient::new(&config(vec![first.url(), second.url()]))
            .expect("client should build");
        for _ in 0..2 {
            client
                .store("k", &json!("doc"), DocumentFormat::Default, None)
                .await
                .expect("store should succeed");
        }

        first_mock.assert_async().await;
        second_mock.assert_async().await;
    }

    #[tokio::test]
    async fn transport_failure_emits_a_node_failure_event() {
        // Nothing listens on this port.
        let client = HttpStoreClient::new(&config(vec!["http://127.0.0.1:9".to_string()]))
            .expect("client should build");
        let mut failures = client
            .take_node_failures()
            .expect("first take yields the receiver");
        assert!(client.take_node_failures().is_none());

        let fault = client
            .store("k", &json!("doc"), DocumentFormat::Default, None)
            .await
            .expect_err("unreachable server should fault");
        assert!(matches!(fault, ClientFault::Transport { .. }));

        let failure = failures.try_recv().expect("failure event should be queued");
        assert!(failure.endpoint.contains("127.0.0.1:9"));
    }
}
