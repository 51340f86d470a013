//! Command transport: single HTTP GET calls to a controller
//!
//! Every command of the controller protocol is an idempotent GET. Calls are bounded by short
//! timeouts and never retried: a failed call reports [TransportError::NetworkFailure] and the
//! caller decides what to do with it.

use std::sync::Arc;

use async_trait::async_trait;
use parse_display::Display;
use thiserror::Error;
use tokio::sync::watch;
use url::Url;

use crate::config::TransportSettings;
use crate::endpoint::Endpoint;

#[cfg(test)]
pub(crate) mod mock;

#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum TransportError {
    /// Timeout, refused connection, DNS failure: the caller only learns there was no code
    #[error("network failure: {0}")]
    NetworkFailure(String),
    #[error("cannot build http client: {0}")]
    Client(String),
}

/// Status code and body of a completed call
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Response {
    pub code: u16,
    pub body: Option<String>,
}

impl Response {
    pub fn new(code: u16) -> Self {
        Self { code, body: None }
    }

    pub fn with_body(code: u16, body: impl Into<String>) -> Self {
        Self {
            code,
            body: Some(body.into()),
        }
    }

    pub fn is_success(&self) -> bool {
        (200..300).contains(&self.code)
    }
}

#[derive(Debug, Display, Clone, Copy, PartialEq, Eq)]
pub enum RequestOutcome {
    #[display("pending")]
    Pending,
    #[display("{0}")]
    Status(u16),
    #[display("failed")]
    Failed,
}

/// The last request issued by a transport
#[derive(Debug, Display, Clone, PartialEq, Eq)]
#[display("{url} -> {outcome}")]
pub struct RequestRecord {
    pub url: String,
    pub outcome: RequestOutcome,
}

/// Last-write-wins cell holding the most recent request, with change notification
///
/// Concurrent callers overwrite each other freely. Readers only ever see the latest write.
#[derive(Debug, Clone)]
pub struct RequestMonitor {
    tx: Arc<watch::Sender<Option<RequestRecord>>>,
}

impl RequestMonitor {
    pub fn new() -> Self {
        let (tx, _) = watch::channel(None);
        Self { tx: Arc::new(tx) }
    }

    pub fn record(&self, url: &Url, outcome: RequestOutcome) {
        self.tx.send_replace(Some(RequestRecord {
            url: url.to_string(),
            outcome,
        }));
    }

    pub fn last(&self) -> Option<RequestRecord> {
        self.tx.borrow().clone()
    }

    pub fn subscribe(&self) -> watch::Receiver<Option<RequestRecord>> {
        self.tx.subscribe()
    }
}

impl Default for RequestMonitor {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
pub trait Transport: Send + Sync {
    /// Issue a GET for `path` on `endpoint` with the given query parameters
    async fn request(
        &self,
        endpoint: &Endpoint,
        path: &str,
        query: &[(&str, String)],
    ) -> Result<Response, TransportError>;

    /// Observability handle for the last issued request
    fn monitor(&self) -> &RequestMonitor;
}

pub struct HttpTransport {
    client: reqwest::Client,
    monitor: RequestMonitor,
}

impl HttpTransport {
    pub fn new(settings: &TransportSettings) -> Result<Self, TransportError> {
        let client = reqwest::Client::builder()
            .connect_timeout(settings.connect_timeout())
            .timeout(settings.timeout())
            .build()
            .map_err(|error| TransportError::Client(error.to_string()))?;

        Ok(Self {
            client,
            monitor: RequestMonitor::new(),
        })
    }
}

#[async_trait]
impl Transport for HttpTransport {
    async fn request(
        &self,
        endpoint: &Endpoint,
        path: &str,
        query: &[(&str, String)],
    ) -> Result<Response, TransportError> {
        let url = endpoint.url(path, query);

        self.monitor.record(&url, RequestOutcome::Pending);
        debug!(url = %url, "GET");

        match self.client.get(url.clone()).send().await {
            Ok(response) => {
                let code = response.status().as_u16();
                self.monitor.record(&url, RequestOutcome::Status(code));
                trace!(url = %url, code, "response");

                // The code is what matters, a body that cannot be read is simply absent
                let body = response.text().await.ok();

                Ok(Response { code, body })
            }
            Err(error) => {
                self.monitor.record(&url, RequestOutcome::Failed);
                debug!(url = %url, error = %error, "request failed");

                Err(TransportError::NetworkFailure(error.to_string()))
            }
        }
    }

    fn monitor(&self) -> &RequestMonitor {
        &self.monitor
    }
}
