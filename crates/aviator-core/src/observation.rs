//! Observation data model
//!
//! An [`Observation`] is the pair read from the surface in one cycle: a
//! canonical multiplier and the time shown next to it. Both halves are
//! newtypes over their canonical string form, so equality is exact string
//! equality on canonical forms.

use serde::{Deserialize, Serialize};
use std::fmt;

use crate::extract::{parse_multiplier, parse_time};

/// Separator between value and timestamp in a delivered payload
pub const PAYLOAD_SEPARATOR: &str = " - ";

/// Canonical multiplier, e.g. `"2.50x"`
///
/// Decimal separator is `.`, whitespace is stripped and the value always ends
/// with the `x` marker.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Multiplier(String);

impl Multiplier {
    pub(crate) fn from_canonical(value: String) -> Self {
        Self(value)
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for Multiplier {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Canonical time: an `H:MM[:SS]` match, or the cleaned raw text when the
/// surface shows no such pattern
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ObservedTime(String);

impl ObservedTime {
    pub(crate) fn from_canonical(value: String) -> Self {
        Self(value)
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Whether the value came from a time pattern rather than the raw-text fallback
    pub fn is_clock_time(&self) -> bool {
        crate::extract::TIME_RE
            .find(&self.0)
            .is_some_and(|m| m.as_str() == self.0)
    }
}

impl fmt::Display for ObservedTime {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// One observed (multiplier, time) pair
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Observation {
    /// Canonical multiplier
    pub value: Multiplier,
    /// Canonical time
    pub timestamp: ObservedTime,
}

impl Observation {
    /// Create an observation from already-normalized halves
    pub fn new(value: Multiplier, timestamp: ObservedTime) -> Self {
        Self { value, timestamp }
    }

    /// Normalize raw field texts into an observation
    ///
    /// Returns `None` when the multiplier text holds no number or the time
    /// text is blank.
    pub fn parse(raw_value: &str, raw_time: &str) -> Option<Self> {
        let value = parse_multiplier(raw_value)?;
        if raw_time.trim().is_empty() {
            return None;
        }
        Some(Self::new(value, parse_time(raw_time)))
    }

    /// The delivered payload text: `"<value> - <timestamp>"`
    pub fn payload(&self) -> String {
        format!("{}{}{}", self.value, PAYLOAD_SEPARATOR, self.timestamp)
    }

    /// Read a delivered payload back into an observation
    ///
    /// The value half must already be canonical, except that an uppercase
    /// `X` marker is accepted and lowercased. The timestamp half is kept
    /// verbatim.
    pub fn from_payload(payload: &str) -> Option<Self> {
        let (value, timestamp) = payload.split_once(PAYLOAD_SEPARATOR)?;
        let canonical = parse_multiplier(value)?;
        if !canonical.as_str().eq_ignore_ascii_case(value) || timestamp.is_empty() {
            return None;
        }
        Some(Self::new(
            canonical,
            ObservedTime::from_canonical(timestamp.to_string()),
        ))
    }
}

impl fmt::Display for Observation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.payload())
    }
}
