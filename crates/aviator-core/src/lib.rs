// # aviator-core
//
// Core library for the periodic observation collector.
//
// ## Architecture Overview
//
// This library provides the observation-and-delivery core:
// - **Surface**: Trait for querying, reading and clicking the observed interface
// - **Extractor**: First-match field lookup plus multiplier/time normalization
// - **Poller**: Bounded retry-with-sleep until both fields parse
// - **Dedup gate**: Skips observations equal to the last delivered one
// - **DeliveryClient**: Ordered endpoint fallback with aggregated failures
// - **Collector**: Single-flight cycle scheduler driving all of the above
// - **History**: Read-back of delivered records into a timeline
//
// ## Design Principles
//
// 1. **Separation of Concerns**: Core logic is separate from surface and transport implementations
// 2. **Explicit State**: The last delivered observation and the running flag belong to a Collector instance
// 3. **Injectable Time**: Every wait goes through the `Clock` trait
// 4. **Library-First**: All core functionality can be used as a library
// 5. **Contained Failure**: No cycle error reaches the timer loop

pub mod traits;
pub mod observation;
pub mod extract;
pub mod poller;
pub mod dedup;
pub mod delivery;
pub mod collector;
pub mod history;
pub mod config;
pub mod error;

// Re-export core types for convenience
pub use traits::{AppendError, AppendTransport, Clock, Element, SelectorExpr, Surface, SystemClock, Trigger};
pub use observation::{Multiplier, Observation, ObservedTime};
pub use extract::{extract_field, parse_multiplier, parse_time};
pub use poller::{FieldSelectors, Poller};
pub use dedup::should_deliver;
pub use delivery::{AggregatedFailure, AttemptFailure, Delivered, DeliveryClient, DeliveryRecord};
pub use collector::{Collector, CollectorEvent, CycleOutcome};
pub use history::HistoryEntry;
pub use config::{CollectorConfig, DeliveryConfig, SelectorConfig, TimingConfig};
pub use error::{Error, Result};
