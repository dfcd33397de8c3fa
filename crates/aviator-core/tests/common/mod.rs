//! Test doubles and common utilities for collector contract tests
//!
//! This module provides minimal doubles for the three collaborators:
//! a scripted surface, a recording transport and a manual clock.

#![allow(dead_code)]

use aviator_core::config::{CollectorConfig, SelectorConfig};
use aviator_core::traits::{AppendError, AppendTransport, Clock, Element, SelectorExpr, Surface};
use aviator_core::Result;
use chrono::NaiveDate;
use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;
use tokio::sync::Notify;
use tokio::time::Instant;

pub const REVEAL: &str = "#open-stats";
pub const CONCEAL: &str = "#close-stats";
pub const MULTIPLIER: &str = ".bubble-multiplier";
pub const TIME: &str = ".header__info-time";

struct FakeElement {
    text: String,
    /// Lookup number (1-based) from which the element is visible
    visible_from: usize,
}

/// Blocks the next click until released
struct ClickGate {
    entered: Arc<Notify>,
    release: Arc<Notify>,
}

/// A scripted surface
///
/// Elements can appear after a number of lookups to simulate partial
/// rendering. Clicks are recorded per selector.
#[derive(Clone, Default)]
pub struct FakeSurface {
    elements: Arc<Mutex<HashMap<SelectorExpr, FakeElement>>>,
    lookups: Arc<Mutex<HashMap<SelectorExpr, usize>>>,
    clicks: Arc<Mutex<Vec<SelectorExpr>>>,
    gate: Arc<Mutex<Option<ClickGate>>>,
    panic_on_read: Arc<AtomicBool>,
}

impl FakeSurface {
    pub fn new() -> Self {
        Self::default()
    }

    /// The panel layout used by [`collector_config`]: reveal and conceal
    /// controls, both fields filled in
    pub fn panel(value: &str, time: &str) -> Self {
        let surface = Self::new();
        surface.set_text(SelectorExpr::css(REVEAL), "Stats");
        surface.set_text(SelectorExpr::css(CONCEAL), "Close");
        surface.set_text(SelectorExpr::css(MULTIPLIER), value);
        surface.set_text(SelectorExpr::css(TIME), time);
        surface
    }

    /// Add or replace an element that is visible immediately
    pub fn set_text(&self, selector: SelectorExpr, text: &str) {
        self.set_text_from_lookup(selector, text, 1);
    }

    /// Add or replace an element that becomes visible on the `n`th lookup
    pub fn set_text_from_lookup(&self, selector: SelectorExpr, text: &str, n: usize) {
        self.elements.lock().unwrap().insert(
            selector,
            FakeElement {
                text: text.to_string(),
                visible_from: n,
            },
        );
    }

    pub fn remove(&self, selector: &SelectorExpr) {
        self.elements.lock().unwrap().remove(selector);
    }

    /// Make the next click wait until the returned `release` is notified
    ///
    /// Returns `(entered, release)`: `entered` is notified once the click
    /// has started.
    pub fn gate_next_click(&self) -> (Arc<Notify>, Arc<Notify>) {
        let entered = Arc::new(Notify::new());
        let release = Arc::new(Notify::new());
        *self.gate.lock().unwrap() = Some(ClickGate {
            entered: Arc::clone(&entered),
            release: Arc::clone(&release),
        });
        (entered, release)
    }

    pub fn panic_on_read(&self, enabled: bool) {
        self.panic_on_read.store(enabled, Ordering::SeqCst);
    }

    /// Number of clicks dispatched on elements located by `selector`
    pub fn click_count(&self, selector: &str) -> usize {
        let selector = SelectorExpr::css(selector);
        self.clicks
            .lock()
            .unwrap()
            .iter()
            .filter(|s| **s == selector)
            .count()
    }

    pub fn lookup_count(&self, selector: &str) -> usize {
        self.lookups
            .lock()
            .unwrap()
            .get(&SelectorExpr::css(selector))
            .copied()
            .unwrap_or(0)
    }
}

#[async_trait::async_trait]
impl Surface for FakeSurface {
    async fn lookup(&self, selector: &SelectorExpr) -> Result<Option<Element>> {
        let n = {
            let mut lookups = self.lookups.lock().unwrap();
            let count = lookups.entry(selector.clone()).or_insert(0);
            *count += 1;
            *count
        };

        let elements = self.elements.lock().unwrap();
        Ok(elements
            .get(selector)
            .filter(|element| n >= element.visible_from)
            .map(|_| Element::new(selector.clone())))
    }

    async fn read_text(&self, element: &Element) -> Result<String> {
        if self.panic_on_read.load(Ordering::SeqCst) {
            panic!("surface detached");
        }

        let elements = self.elements.lock().unwrap();
        Ok(elements
            .get(element.selector())
            .map(|e| e.text.clone())
            .unwrap_or_default())
    }

    async fn dispatch_click(&self, element: &Element) -> Result<()> {
        self.clicks.lock().unwrap().push(element.selector().clone());

        let gate = self.gate.lock().unwrap().take();
        if let Some(gate) = gate {
            gate.entered.notify_one();
            gate.release.notified().await;
        }

        Ok(())
    }

    fn surface_name(&self) -> &'static str {
        "fake"
    }
}

/// One recorded append call
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AppendCall {
    pub target: String,
    pub payload: String,
}

/// A transport that records calls and answers per endpoint
#[derive(Clone, Default)]
pub struct RecordingTransport {
    failures: Arc<Mutex<HashMap<String, AppendError>>>,
    calls: Arc<Mutex<Vec<AppendCall>>>,
}

impl RecordingTransport {
    pub fn new() -> Self {
        Self::default()
    }

    /// Make every append under `endpoint` fail with `error`
    pub fn fail(&self, endpoint: &str, error: AppendError) {
        self.failures
            .lock()
            .unwrap()
            .insert(endpoint.to_string(), error);
    }

    /// Stop failing
    pub fn recover(&self) {
        self.failures.lock().unwrap().clear();
    }

    pub fn calls(&self) -> Vec<AppendCall> {
        self.calls.lock().unwrap().clone()
    }

    pub fn call_count(&self) -> usize {
        self.calls.lock().unwrap().len()
    }
}

#[async_trait::async_trait]
impl AppendTransport for RecordingTransport {
    async fn append(&self, target: &str, payload: &str) -> std::result::Result<(), AppendError> {
        self.calls.lock().unwrap().push(AppendCall {
            target: target.to_string(),
            payload: payload.to_string(),
        });

        let failures = self.failures.lock().unwrap();
        match failures
            .iter()
            .find(|(endpoint, _)| target.starts_with(endpoint.as_str()))
        {
            Some((_, error)) => Err(error.clone()),
            None => Ok(()),
        }
    }

    fn transport_name(&self) -> &'static str {
        "recording"
    }
}

/// A clock whose `sleep()` advances virtual time and returns at once
#[derive(Clone)]
pub struct ManualClock {
    base: Instant,
    offset: Arc<Mutex<Duration>>,
    sleeps: Arc<Mutex<Vec<Duration>>>,
    today: NaiveDate,
}

impl ManualClock {
    pub fn new(today: NaiveDate) -> Self {
        Self {
            base: Instant::now(),
            offset: Arc::new(Mutex::new(Duration::ZERO)),
            sleeps: Arc::new(Mutex::new(Vec::new())),
            today,
        }
    }

    pub fn sleeps(&self) -> Vec<Duration> {
        self.sleeps.lock().unwrap().clone()
    }

    pub fn elapsed(&self) -> Duration {
        *self.offset.lock().unwrap()
    }
}

#[async_trait::async_trait]
impl Clock for ManualClock {
    fn now(&self) -> Instant {
        self.base + *self.offset.lock().unwrap()
    }

    async fn sleep(&self, duration: Duration) {
        self.sleeps.lock().unwrap().push(duration);
        *self.offset.lock().unwrap() += duration;
        tokio::task::yield_now().await;
    }

    fn today(&self) -> NaiveDate {
        self.today
    }
}

pub fn test_date() -> NaiveDate {
    NaiveDate::from_ymd_opt(2026, 10, 19).unwrap()
}

/// Collector config pointing at the [`FakeSurface::panel`] layout
pub fn collector_config(endpoints: &[&str]) -> CollectorConfig {
    let mut config = CollectorConfig::new(endpoints.iter().map(|e| e.to_string()).collect());
    config.selectors = SelectorConfig {
        multiplier: vec![SelectorExpr::css(MULTIPLIER)],
        time: vec![SelectorExpr::css(TIME)],
        reveal: vec![SelectorExpr::css(REVEAL)],
        conceal: vec![SelectorExpr::css(CONCEAL)],
    };
    config
}
