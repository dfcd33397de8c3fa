// # Append Transport Trait
//
// Defines the single-attempt append operation against one remote store URL.
//
// ## Implementations
//
// - HTTP: `aviator-store-http` crate
//
// The transport never retries and never falls back to another endpoint; the
// `DeliveryClient` owns the endpoint order and aggregates failures.

use async_trait::async_trait;
use thiserror::Error;

/// Why a single append attempt failed
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum AppendError {
    /// Network-level failure: the endpoint could not be reached or the
    /// exchange did not complete
    #[error("network: {0}")]
    Transport(String),

    /// The endpoint answered with a non-success status
    #[error("{status}: {body}")]
    RemoteRejection {
        /// HTTP status code
        status: u16,
        /// Response body, as far as it could be read
        body: String,
    },
}

impl AppendError {
    /// Create a transport error
    pub fn transport(detail: impl Into<String>) -> Self {
        Self::Transport(detail.into())
    }

    /// Create a rejection error
    pub fn rejected(status: u16, body: impl Into<String>) -> Self {
        Self::RemoteRejection {
            status,
            body: body.into(),
        }
    }

    /// Status code of a rejection, `None` for network failures
    pub fn status(&self) -> Option<u16> {
        match self {
            AppendError::Transport(_) => None,
            AppendError::RemoteRejection { status, .. } => Some(*status),
        }
    }

    /// Short label: the status code, or `network`
    pub fn label(&self) -> String {
        match self.status() {
            Some(status) => status.to_string(),
            None => "network".to_string(),
        }
    }

    /// Human-readable detail without the label
    pub fn detail(&self) -> &str {
        match self {
            AppendError::Transport(detail) => detail,
            AppendError::RemoteRejection { body, .. } => body,
        }
    }
}

/// Trait for append transports
///
/// # Trust Level: Untrusted
///
/// - ✅ Perform exactly one request per call
/// - ✅ Report network failures and non-success statuses as [`AppendError`]
/// - ❌ Retry, back off, or try other endpoints (owned by `DeliveryClient`)
/// - ❌ Decide whether a value needs delivering (owned by `Collector`)
#[async_trait]
pub trait AppendTransport: Send + Sync {
    /// Append `payload` to the collection at `target`
    ///
    /// # Parameters
    ///
    /// - `target`: Full URL of the append target
    /// - `payload`: Record text; sent JSON-encoded as a string
    ///
    /// # Returns
    ///
    /// - `Ok(())`: The store acknowledged the append
    /// - `Err(AppendError)`: The attempt failed
    async fn append(&self, target: &str, payload: &str) -> Result<(), AppendError>;

    /// Get the transport name (for logging/debugging)
    fn transport_name(&self) -> &'static str;
}
