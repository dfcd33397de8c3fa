//! Architectural Contract Test: Ordered Endpoint Fallback
//!
//! This test verifies that endpoints are tried strictly in configured order,
//! one attempt each, and that the first success ends the delivery.
//!
//! Constraints verified:
//! - Endpoints after the accepting one are never contacted
//! - Earlier failures are kept, in endpoint order
//! - When every endpoint fails, the last delivered observation is unchanged
//!
//! If this test fails, someone has added:
//! - Retries against a single endpoint
//! - Parallel fan-out to all endpoints
//! - State updates on failed deliveries

mod common;

use aviator_core::traits::AppendError;
use aviator_core::{Collector, CycleOutcome, DeliveryClient, DeliveryRecord, Observation};
use common::*;
use std::sync::Arc;

const PRIMARY: &str = "https://primary.example";
const SECONDARY: &str = "https://secondary.example";
const TERTIARY: &str = "https://tertiary.example";

fn record() -> DeliveryRecord {
    let observation = Observation::parse("2.50x", "09:15:00").unwrap();
    DeliveryRecord::new(&observation, test_date())
}

#[tokio::test]
async fn first_success_after_failures_stops_the_fallback() {
    let transport = RecordingTransport::new();
    transport.fail(PRIMARY, AppendError::transport("connection refused"));
    transport.fail(SECONDARY, AppendError::rejected(401, "Permission denied"));

    let client = DeliveryClient::new(
        vec![PRIMARY.to_string(), SECONDARY.to_string(), TERTIARY.to_string()],
        "aviator",
        Box::new(transport.clone()),
    );

    let delivered = client.deliver(&record()).await.expect("third endpoint accepts");

    assert_eq!(delivered.endpoint, TERTIARY);
    assert_eq!(
        delivered.target,
        "https://tertiary.example/aviator/historico/2026-10-19.json"
    );

    let failed: Vec<&str> = delivered
        .failed_attempts
        .iter()
        .map(|f| f.endpoint.as_str())
        .collect();
    assert_eq!(failed, vec![PRIMARY, SECONDARY]);
    assert_eq!(delivered.failed_attempts[1].error.status(), Some(401));

    let calls = transport.calls();
    assert_eq!(calls.len(), 3, "one attempt per endpoint, no retries");
    assert!(calls[0].target.starts_with(PRIMARY));
    assert!(calls[1].target.starts_with(SECONDARY));
    assert!(calls[2].target.starts_with(TERTIARY));
    assert!(calls.iter().all(|c| c.payload == "2.50x - 09:15:00"));
}

#[tokio::test]
async fn endpoints_after_a_success_are_never_contacted() {
    let transport = RecordingTransport::new();
    let client = DeliveryClient::new(
        vec![PRIMARY.to_string(), SECONDARY.to_string()],
        "aviator",
        Box::new(transport.clone()),
    );

    let delivered = client.deliver(&record()).await.unwrap();

    assert_eq!(delivered.endpoint, PRIMARY);
    assert!(delivered.failed_attempts.is_empty());
    assert_eq!(transport.call_count(), 1);
}

#[tokio::test]
async fn all_endpoints_failing_yields_one_entry_per_endpoint() {
    let transport = RecordingTransport::new();
    transport.fail(PRIMARY, AppendError::rejected(503, "Service Unavailable"));
    transport.fail(SECONDARY, AppendError::transport("timed out"));

    let client = DeliveryClient::new(
        vec![PRIMARY.to_string(), SECONDARY.to_string()],
        "aviator",
        Box::new(transport.clone()),
    );

    let failure = client.deliver(&record()).await.unwrap_err();

    assert_eq!(failure.attempts.len(), 2);
    assert_eq!(failure.attempts[0].endpoint, PRIMARY);
    assert_eq!(failure.attempts[1].endpoint, SECONDARY);
    assert_eq!(
        failure.to_string(),
        "Delivery failed on 2 endpoint(s): 503 https://primary.example: Service Unavailable | network https://secondary.example: timed out"
    );
}

#[tokio::test]
async fn failed_delivery_leaves_last_delivered_unchanged() {
    let surface = FakeSurface::panel("1.20x", "10:00:00");
    let transport = RecordingTransport::new();
    let clock = ManualClock::new(test_date());

    let (collector, _events) = Collector::new(
        Arc::new(surface.clone()),
        Box::new(transport.clone()),
        Arc::new(clock),
        collector_config(&[PRIMARY, SECONDARY]),
    )
    .expect("collector construction succeeds");

    // First cycle succeeds
    let first = collector.run_cycle().await;
    assert!(matches!(first, CycleOutcome::Delivered { .. }));
    let baseline = collector.last_delivered().await;

    // Second cycle sees a new value but every endpoint fails
    surface.set_text(aviator_core::SelectorExpr::css(MULTIPLIER), "3.00x");
    transport.fail(PRIMARY, AppendError::transport("connection reset"));
    transport.fail(SECONDARY, AppendError::rejected(500, "Internal Server Error"));

    let second = collector.run_cycle().await;
    match second {
        CycleOutcome::DeliveryFailed(failure) => assert_eq!(failure.attempts.len(), 2),
        other => panic!("expected DeliveryFailed, got {:?}", other),
    }

    assert_eq!(collector.last_delivered().await, baseline);
    assert_eq!(surface.click_count(CONCEAL), 2, "conceal runs after failure too");
}
