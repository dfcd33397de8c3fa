//! Bounded retry-with-sleep extraction
//!
//! The observed interface has no change notification, so the [`Poller`]
//! re-reads both fields until they parse or the budget runs out, sleeping a
//! fixed interval between attempts. The budget is checked between attempts;
//! an attempt in progress is never interrupted.

use std::time::Duration;
use tracing::debug;

use crate::error::Result;
use crate::extract::{extract_field, parse_multiplier, parse_time};
use crate::observation::Observation;
use crate::traits::{Clock, SelectorExpr, Surface};

/// Candidate lookup expressions for the two observed fields
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FieldSelectors {
    /// Multiplier field candidates, first match wins
    pub multiplier: Vec<SelectorExpr>,
    /// Time field candidates, first match wins
    pub time: Vec<SelectorExpr>,
}

/// Polls a surface for a complete [`Observation`]
#[derive(Debug, Clone)]
pub struct Poller {
    fields: FieldSelectors,
    budget: Duration,
    sleep: Duration,
}

impl Poller {
    /// Create a new poller
    ///
    /// # Parameters
    ///
    /// - `fields`: Candidate selectors for both fields
    /// - `budget`: Total time allowed for one poll
    /// - `sleep`: Delay between attempts
    pub fn new(fields: FieldSelectors, budget: Duration, sleep: Duration) -> Self {
        Self {
            fields,
            budget,
            sleep,
        }
    }

    /// Read both fields once
    ///
    /// Returns `None` unless both fields are present and the multiplier parses.
    pub async fn attempt(&self, surface: &dyn Surface) -> Result<Option<Observation>> {
        let raw_value = extract_field(surface, &self.fields.multiplier).await?;
        let raw_time = extract_field(surface, &self.fields.time).await?;

        let value = raw_value.as_deref().and_then(parse_multiplier);
        let timestamp = raw_time.as_deref().map(parse_time);

        match (value, timestamp) {
            (Some(value), Some(timestamp)) => Ok(Some(Observation::new(value, timestamp))),
            _ => {
                debug!(
                    "Fields not ready (multiplier: {:?}, time: {:?})",
                    raw_value, raw_time
                );
                Ok(None)
            }
        }
    }

    /// Poll until both fields parse or the budget is exhausted
    ///
    /// # Returns
    ///
    /// - `Ok(Some(Observation))`: Both fields parsed
    /// - `Ok(None)`: The budget ran out
    /// - `Err(Error)`: The surface failed
    pub async fn poll(
        &self,
        surface: &dyn Surface,
        clock: &dyn Clock,
    ) -> Result<Option<Observation>> {
        let start = clock.now();
        let mut attempts = 0usize;

        while clock.elapsed_since(start) < self.budget {
            attempts += 1;
            if let Some(observation) = self.attempt(surface).await? {
                debug!("Observation ready after {} attempt(s)", attempts);
                return Ok(Some(observation));
            }

            clock.sleep(self.sleep).await;
        }

        debug!(
            "Poll budget of {:?} exhausted after {} attempt(s)",
            self.budget, attempts
        );
        Ok(None)
    }
}
