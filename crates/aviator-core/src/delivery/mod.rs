//! Delivery client
//!
//! Appends an accepted observation to the remote store. Endpoints are tried in
//! their configured priority order, one attempt each; the first success ends
//! the delivery and all failures are aggregated when none succeeds.
//!
//! ## Target Layout
//!
//! ```text
//! POST {endpoint}/{root_namespace}/historico/{YYYY-MM-DD}.json
//! Content-Type: application/json
//!
//! "2.50x - 09:15:00"
//! ```
//!
//! ## Idempotence
//!
//! None. An append that reached the store but whose response was lost counts
//! as a failure, and the next endpoint receives the same record.

pub mod fallback;

use chrono::NaiveDate;
use serde::Serialize;
use std::fmt;
use tracing::{debug, warn};

use crate::observation::Observation;
use crate::traits::{AppendError, AppendTransport};

pub use fallback::{FirstSuccess, first_success};

/// Sub-collection under the root namespace that holds the history
pub const HISTORY_COLLECTION: &str = "historico";

/// One record to append
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct DeliveryRecord {
    /// `"<value> - <timestamp>"`
    pub payload: String,
    /// Local calendar date the record is grouped under
    pub date_bucket: NaiveDate,
}

impl DeliveryRecord {
    /// Build the record for `observation`, grouped under `date_bucket`
    pub fn new(observation: &Observation, date_bucket: NaiveDate) -> Self {
        Self {
            payload: observation.payload(),
            date_bucket,
        }
    }

    /// Date bucket key, `YYYY-MM-DD`
    pub fn bucket_key(&self) -> String {
        self.date_bucket.format("%Y-%m-%d").to_string()
    }
}

/// A failed attempt against one endpoint
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AttemptFailure {
    /// Endpoint base URL
    pub endpoint: String,
    /// What went wrong
    pub error: AppendError,
}

impl fmt::Display for AttemptFailure {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{} {}: {}",
            self.error.label(),
            self.endpoint,
            self.error.detail()
        )
    }
}

/// Every endpoint failed
///
/// Carries one [`AttemptFailure`] per endpoint, in endpoint order.
#[derive(thiserror::Error, Debug, Clone, PartialEq, Eq)]
pub struct AggregatedFailure {
    pub attempts: Vec<AttemptFailure>,
}

impl fmt::Display for AggregatedFailure {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.attempts.is_empty() {
            return write!(f, "Delivery failed: no endpoints configured");
        }

        write!(f, "Delivery failed on {} endpoint(s): ", self.attempts.len())?;
        for (i, attempt) in self.attempts.iter().enumerate() {
            if i > 0 {
                write!(f, " | ")?;
            }
            write!(f, "{}", attempt)?;
        }
        Ok(())
    }
}

/// A successful delivery
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Delivered {
    /// Endpoint base URL that accepted the record
    pub endpoint: String,
    /// Full append target URL
    pub target: String,
    /// Endpoints that failed before this one, in endpoint order
    pub failed_attempts: Vec<AttemptFailure>,
}

/// Delivers records to an ordered list of store endpoints
pub struct DeliveryClient {
    endpoints: Vec<String>,
    root_namespace: String,
    transport: Box<dyn AppendTransport>,
}

impl DeliveryClient {
    /// Create a new delivery client
    ///
    /// # Parameters
    ///
    /// - `endpoints`: Store base URLs, in priority order
    /// - `root_namespace`: Root path segment under each endpoint
    /// - `transport`: Single-attempt append transport
    pub fn new(
        endpoints: Vec<String>,
        root_namespace: impl Into<String>,
        transport: Box<dyn AppendTransport>,
    ) -> Self {
        Self {
            endpoints,
            root_namespace: root_namespace.into(),
            transport,
        }
    }

    /// Configured endpoints, in priority order
    pub fn endpoints(&self) -> &[String] {
        &self.endpoints
    }

    /// Append target URL for `endpoint` and a record's date bucket
    pub fn target_for(&self, endpoint: &str, record: &DeliveryRecord) -> String {
        format!(
            "{}/{}/{}/{}.json",
            endpoint.trim_end_matches('/'),
            self.root_namespace,
            HISTORY_COLLECTION,
            record.bucket_key()
        )
    }

    /// Deliver `record`, falling back through the endpoints in order
    ///
    /// # Returns
    ///
    /// - `Ok(Delivered)`: The first endpoint that accepted the record
    /// - `Err(AggregatedFailure)`: Every endpoint failed
    pub async fn deliver(&self, record: &DeliveryRecord) -> Result<Delivered, AggregatedFailure> {
        let outcome = first_success(&self.endpoints, |endpoint| async move {
            let target = self.target_for(endpoint, record);
            debug!(
                "Appending via {} to {}",
                self.transport.transport_name(),
                target
            );

            match self.transport.append(&target, &record.payload).await {
                Ok(()) => Ok(target),
                Err(error) => {
                    let failure = AttemptFailure {
                        endpoint: endpoint.clone(),
                        error,
                    };
                    warn!("Delivery attempt failed: {}", failure);
                    Err(failure)
                }
            }
        })
        .await;

        match outcome {
            Ok(success) => Ok(Delivered {
                endpoint: self.endpoints[success.index].clone(),
                target: success.value,
                failed_attempts: success.failures,
            }),
            Err(attempts) => Err(AggregatedFailure { attempts }),
        }
    }
}

impl fmt::Debug for DeliveryClient {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("DeliveryClient")
            .field("endpoints", &self.endpoints)
            .field("root_namespace", &self.root_namespace)
            .field("transport", &self.transport.transport_name())
            .finish()
    }
}
