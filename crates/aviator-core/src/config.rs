//! Configuration types for the collector
//!
//! This module defines all configuration structures used throughout the crate.
//! Defaults reproduce the cadence and selectors of the production collector.

use serde::{Deserialize, Serialize};
use std::time::Duration;

use crate::poller::FieldSelectors;
use crate::traits::{SelectorExpr, Trigger};

/// Main collector configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CollectorConfig {
    /// Cycle cadence and delays
    #[serde(default)]
    pub timing: TimingConfig,

    /// Remote store settings
    pub delivery: DeliveryConfig,

    /// Lookup expressions for fields and triggers
    #[serde(default)]
    pub selectors: SelectorConfig,

    /// Capacity of the collector event channel
    ///
    /// When full, events are dropped (with a warning log).
    #[serde(default = "default_event_channel_capacity")]
    pub event_channel_capacity: usize,
}

impl CollectorConfig {
    /// Create a configuration with default timing and selectors
    pub fn new(endpoints: Vec<String>) -> Self {
        Self {
            timing: TimingConfig::default(),
            delivery: DeliveryConfig::new(endpoints),
            selectors: SelectorConfig::default(),
            event_channel_capacity: default_event_channel_capacity(),
        }
    }

    /// Validate the configuration
    pub fn validate(&self) -> Result<(), crate::Error> {
        self.timing.validate()?;
        self.delivery.validate()?;
        self.selectors.validate()?;

        if self.event_channel_capacity == 0 {
            return Err(crate::Error::config("Event channel capacity must be > 0"));
        }

        Ok(())
    }
}

/// Timing configuration, all values in milliseconds
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TimingConfig {
    /// Timer period between cycle starts
    #[serde(default = "default_cycle_interval_ms")]
    pub cycle_interval_ms: u64,

    /// Total time allowed for one extraction poll
    #[serde(default = "default_poll_budget_ms")]
    pub poll_budget_ms: u64,

    /// Delay between extraction attempts within a poll
    #[serde(default = "default_poll_sleep_ms")]
    pub poll_sleep_ms: u64,

    /// Delay after clicking the reveal trigger
    #[serde(default = "default_reveal_render_delay_ms")]
    pub reveal_render_delay_ms: u64,

    /// Delay before clicking the conceal trigger
    #[serde(default = "default_post_cycle_delay_ms")]
    pub post_cycle_delay_ms: u64,
}

impl TimingConfig {
    /// Validate the timing configuration
    pub fn validate(&self) -> Result<(), crate::Error> {
        if self.cycle_interval_ms == 0 {
            return Err(crate::Error::config("Cycle interval must be > 0"));
        }
        if self.poll_sleep_ms == 0 {
            return Err(crate::Error::config("Poll sleep must be > 0"));
        }
        Ok(())
    }

    pub fn cycle_interval(&self) -> Duration {
        Duration::from_millis(self.cycle_interval_ms)
    }

    pub fn poll_budget(&self) -> Duration {
        Duration::from_millis(self.poll_budget_ms)
    }

    pub fn poll_sleep(&self) -> Duration {
        Duration::from_millis(self.poll_sleep_ms)
    }

    pub fn reveal_render_delay(&self) -> Duration {
        Duration::from_millis(self.reveal_render_delay_ms)
    }

    pub fn post_cycle_delay(&self) -> Duration {
        Duration::from_millis(self.post_cycle_delay_ms)
    }
}

impl Default for TimingConfig {
    fn default() -> Self {
        Self {
            cycle_interval_ms: default_cycle_interval_ms(),
            poll_budget_ms: default_poll_budget_ms(),
            poll_sleep_ms: default_poll_sleep_ms(),
            reveal_render_delay_ms: default_reveal_render_delay_ms(),
            post_cycle_delay_ms: default_post_cycle_delay_ms(),
        }
    }
}

/// Remote store configuration
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DeliveryConfig {
    /// Store base URLs, in priority order
    pub endpoints: Vec<String>,

    /// Root path segment under each endpoint
    #[serde(default = "default_root_namespace")]
    pub root_namespace: String,

    /// Per-request timeout for HTTP transports (in seconds)
    #[serde(default = "default_request_timeout_secs")]
    pub request_timeout_secs: u64,
}

impl DeliveryConfig {
    /// Create a delivery configuration with the default namespace
    pub fn new(endpoints: Vec<String>) -> Self {
        Self {
            endpoints,
            root_namespace: default_root_namespace(),
            request_timeout_secs: default_request_timeout_secs(),
        }
    }

    /// Validate the delivery configuration
    pub fn validate(&self) -> Result<(), crate::Error> {
        if self.endpoints.is_empty() {
            return Err(crate::Error::config("No delivery endpoints configured"));
        }

        for endpoint in &self.endpoints {
            if !endpoint.starts_with("https://") && !endpoint.starts_with("http://") {
                return Err(crate::Error::config(format!(
                    "Endpoint must use HTTP or HTTPS scheme. Got: {}",
                    endpoint
                )));
            }
        }

        if self.root_namespace.is_empty() || self.root_namespace.contains('/') {
            return Err(crate::Error::config(format!(
                "Root namespace must be a single non-empty path segment. Got: '{}'",
                self.root_namespace
            )));
        }

        if self.request_timeout_secs == 0 {
            return Err(crate::Error::config("Request timeout must be > 0"));
        }

        Ok(())
    }

    pub fn request_timeout(&self) -> Duration {
        Duration::from_secs(self.request_timeout_secs)
    }
}

/// Lookup expressions for the observed fields and the panel triggers
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SelectorConfig {
    /// Multiplier field candidates
    #[serde(default = "default_multiplier_selectors")]
    pub multiplier: Vec<SelectorExpr>,

    /// Time field candidates
    #[serde(default = "default_time_selectors")]
    pub time: Vec<SelectorExpr>,

    /// Control that opens the panel showing both fields
    #[serde(default = "default_reveal_selectors")]
    pub reveal: Vec<SelectorExpr>,

    /// Control that closes the panel again
    #[serde(default = "default_conceal_selectors")]
    pub conceal: Vec<SelectorExpr>,
}

impl SelectorConfig {
    /// Validate the selector configuration
    pub fn validate(&self) -> Result<(), crate::Error> {
        if self.multiplier.is_empty() {
            return Err(crate::Error::config("Multiplier selectors cannot be empty"));
        }
        if self.time.is_empty() {
            return Err(crate::Error::config("Time selectors cannot be empty"));
        }
        if self.reveal.is_empty() {
            return Err(crate::Error::config("Reveal selectors cannot be empty"));
        }
        Ok(())
    }

    /// Field candidates for the poller
    pub fn fields(&self) -> FieldSelectors {
        FieldSelectors {
            multiplier: self.multiplier.clone(),
            time: self.time.clone(),
        }
    }

    pub fn reveal_trigger(&self) -> Trigger {
        Trigger::new("reveal", self.reveal.clone())
    }

    pub fn conceal_trigger(&self) -> Trigger {
        Trigger::new("conceal", self.conceal.clone())
    }
}

impl Default for SelectorConfig {
    fn default() -> Self {
        Self {
            multiplier: default_multiplier_selectors(),
            time: default_time_selectors(),
            reveal: default_reveal_selectors(),
            conceal: default_conceal_selectors(),
        }
    }
}

fn default_cycle_interval_ms() -> u64 {
    2500
}

fn default_poll_budget_ms() -> u64 {
    4500
}

fn default_poll_sleep_ms() -> u64 {
    120
}

fn default_reveal_render_delay_ms() -> u64 {
    700
}

fn default_post_cycle_delay_ms() -> u64 {
    300
}

fn default_root_namespace() -> String {
    "aviator".to_string()
}

fn default_request_timeout_secs() -> u64 {
    10
}

fn default_event_channel_capacity() -> usize {
    256
}

fn default_multiplier_selectors() -> Vec<SelectorExpr> {
    vec![
        SelectorExpr::css(".bubble-multiplier.font-weight-bold"),
        SelectorExpr::css(".bubble-multiplier"),
        SelectorExpr::css("[class*='multiplier']"),
    ]
}

fn default_time_selectors() -> Vec<SelectorExpr> {
    vec![
        SelectorExpr::css(".header__info-time"),
        SelectorExpr::css("[class*='time']"),
        SelectorExpr::css("[class*='clock']"),
    ]
}

fn default_reveal_selectors() -> Vec<SelectorExpr> {
    vec![
        SelectorExpr::xpath(
            "/html/body/app-root/app-game/div/div/div[2]/div/div[2]/div[2]/app-stats-widget/div/div/div/div",
        ),
        SelectorExpr::css("app-stats-widget div"),
    ]
}

fn default_conceal_selectors() -> Vec<SelectorExpr> {
    vec![
        SelectorExpr::xpath("/html/body/ngb-modal-window/div/div/app-fairness/div/button/span"),
        SelectorExpr::css("ngb-modal-window app-fairness button"),
        SelectorExpr::css("ngb-modal-window button"),
    ]
}
