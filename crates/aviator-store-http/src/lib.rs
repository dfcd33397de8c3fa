// # HTTP Append Transport
//
// This crate provides the HTTP transport used by the delivery client to
// append records to a realtime-database style store.
//
// ## Contract
//
// - Exactly one HTTP request per `append()` call
// - No retries, no fallback (owned by `DeliveryClient`)
// - Non-2xx responses are reported with their status and body text
// - Every request is bounded by the configured timeout
//
// ## Wire Format
//
// ```text
// POST {target}
// Content-Type: application/json
//
// "2.50x - 09:15:00"
// ```
//
// The payload is sent as a JSON string, so the store keeps it as a single
// string child under a generated key.
//
// ## Reading Back
//
// `HttpHistoryReader` fetches the whole history tree with one GET per
// endpoint, in priority order, stopping at the first endpoint that answers
// 2xx:
//
// ```text
// GET {endpoint}/{root_namespace}/historico.json
// ```

use async_trait::async_trait;
use aviator_core::delivery::{HISTORY_COLLECTION, first_success};
use aviator_core::history::recent_from_json;
use aviator_core::traits::{AppendError, AppendTransport};
use aviator_core::{Error, HistoryEntry, Result};
use std::time::Duration;
use tracing::{debug, warn};

/// Appends records with one JSON POST per call
#[derive(Clone)]
pub struct HttpAppendTransport {
    client: reqwest::Client,
    timeout: Duration,
}

impl HttpAppendTransport {
    /// Create a transport with the given per-request timeout
    pub fn new(timeout: Duration) -> Result<Self> {
        let client = reqwest::Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|e| Error::http(format!("Failed to build HTTP client: {}", e)))?;

        Ok(Self { client, timeout })
    }

    /// Per-request timeout
    pub fn timeout(&self) -> Duration {
        self.timeout
    }
}

#[async_trait]
impl AppendTransport for HttpAppendTransport {
    async fn append(&self, target: &str, payload: &str) -> std::result::Result<(), AppendError> {
        debug!("POST {}", target);

        let response = self
            .client
            .post(target)
            .json(payload)
            .send()
            .await
            .map_err(|e| AppendError::transport(e.to_string()))?;

        let status = response.status();
        if status.is_success() {
            return Ok(());
        }

        // The store explains rejections in the body (rules, auth, quota)
        let body = response
            .text()
            .await
            .unwrap_or_else(|e| format!("<unreadable body: {}>", e));

        Err(AppendError::rejected(status.as_u16(), body))
    }

    fn transport_name(&self) -> &'static str {
        "http"
    }
}

impl std::fmt::Debug for HttpAppendTransport {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("HttpAppendTransport")
            .field("timeout", &self.timeout)
            .finish()
    }
}

/// Reads the delivered history back from the store
#[derive(Clone)]
pub struct HttpHistoryReader {
    client: reqwest::Client,
    endpoints: Vec<String>,
    root_namespace: String,
}

impl HttpHistoryReader {
    /// Create a reader over `endpoints`, in priority order
    pub fn new(
        endpoints: Vec<String>,
        root_namespace: impl Into<String>,
        timeout: Duration,
    ) -> Result<Self> {
        if endpoints.is_empty() {
            return Err(Error::config("At least one endpoint is required"));
        }

        let client = reqwest::Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|e| Error::http(format!("Failed to build HTTP client: {}", e)))?;

        Ok(Self {
            client,
            endpoints,
            root_namespace: root_namespace.into(),
        })
    }

    /// History tree URL for `endpoint`
    pub fn history_url(&self, endpoint: &str) -> String {
        format!(
            "{}/{}/{}.json",
            endpoint.trim_end_matches('/'),
            self.root_namespace,
            HISTORY_COLLECTION
        )
    }

    /// The `limit` most recent readable entries, oldest first
    ///
    /// Records that cannot be placed on a timeline are skipped. A body that
    /// is not JSON fails with [`Error::Json`] without trying further
    /// endpoints.
    pub async fn recent(&self, limit: usize) -> Result<Vec<HistoryEntry>> {
        let outcome = first_success(&self.endpoints, |endpoint| async move {
            let url = self.history_url(endpoint);
            debug!("GET {}", url);

            self.fetch(&url).await.map_err(|detail| {
                warn!("History read from {} failed: {}", endpoint, detail);
                format!("{}: {}", endpoint, detail)
            })
        })
        .await;

        match outcome {
            Ok(success) => recent_from_json(&success.value, limit),
            Err(failures) => Err(Error::http(format!(
                "History read failed on {} endpoint(s): {}",
                failures.len(),
                failures.join(" | ")
            ))),
        }
    }

    async fn fetch(&self, url: &str) -> std::result::Result<String, String> {
        let response = self
            .client
            .get(url)
            .send()
            .await
            .map_err(|e| format!("network: {}", e))?;

        let status = response.status();
        if !status.is_success() {
            return Err(status.as_u16().to_string());
        }

        response
            .text()
            .await
            .map_err(|e| format!("unreadable body: {}", e))
    }
}

impl std::fmt::Debug for HttpHistoryReader {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("HttpHistoryReader")
            .field("endpoints", &self.endpoints.len())
            .field("root_namespace", &self.root_namespace)
            .finish()
    }
}
