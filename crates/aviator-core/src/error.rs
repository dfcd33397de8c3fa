//! Error types for the collector
//!
//! This module defines the error taxonomy shared by every stage of a cycle.
//! None of these errors escape a cycle: the [`Collector`](crate::Collector)
//! turns each of them into a [`CycleOutcome`](crate::CycleOutcome) and a log line.

use thiserror::Error;

use crate::delivery::AggregatedFailure;

/// Result type alias for collector operations
pub type Result<T> = std::result::Result<T, Error>;

/// Core error type for the collector
#[derive(Error, Debug)]
pub enum Error {
    /// The poll budget ran out before both fields parsed
    #[error("Extraction timed out after {budget_ms}ms")]
    ExtractionTimeout {
        /// Budget that was exhausted
        budget_ms: u64,
    },

    /// A reveal or conceal control could not be located
    #[error("Trigger not found: {trigger}")]
    TriggerNotFound {
        /// Trigger name ("reveal" or "conceal")
        trigger: String,
    },

    /// Every configured endpoint failed
    #[error(transparent)]
    Delivery(#[from] AggregatedFailure),

    /// The observed surface failed to answer a lookup, read or click
    #[error("Surface error: {0}")]
    Surface(String),

    /// Configuration errors
    #[error("Configuration error: {0}")]
    Config(String),

    /// JSON serialization/deserialization errors
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// HTTP client errors outside of a delivery attempt
    #[error("HTTP error: {0}")]
    Http(String),
}

impl Error {
    /// Create an extraction timeout error
    pub fn extraction_timeout(budget_ms: u64) -> Self {
        Self::ExtractionTimeout { budget_ms }
    }

    /// Create a "trigger not found" error
    pub fn trigger_not_found(trigger: impl Into<String>) -> Self {
        Self::TriggerNotFound {
            trigger: trigger.into(),
        }
    }

    /// Create a surface error
    pub fn surface(msg: impl Into<String>) -> Self {
        Self::Surface(msg.into())
    }

    /// Create a configuration error
    pub fn config(msg: impl Into<String>) -> Self {
        Self::Config(msg.into())
    }

    /// Create an HTTP error
    pub fn http(msg: impl Into<String>) -> Self {
        Self::Http(msg.into())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_messages() {
        assert_eq!(
            Error::extraction_timeout(4500).to_string(),
            "Extraction timed out after 4500ms"
        );
        assert_eq!(
            Error::trigger_not_found("reveal").to_string(),
            "Trigger not found: reveal"
        );
        assert_eq!(
            Error::config("no endpoints").to_string(),
            "Configuration error: no endpoints"
        );
    }
}
