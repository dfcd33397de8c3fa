//! Cycle scheduler
//!
//! The Collector is responsible for:
//! - Revealing the panel that shows the observed fields
//! - Polling the surface for a complete observation
//! - Skipping observations equal to the last delivered one
//! - Delivering new observations through the ordered endpoint list
//! - Concealing the panel again, whatever happened before
//!
//! ## Architecture
//!
//! ```text
//!   timer tick
//!       │
//!       ▼
//! ┌──────────────┐  busy   ┌──────────────┐
//! │ single-flight│───────▶ │  (dropped)   │
//! │    guard     │         └──────────────┘
//! └──────────────┘
//!       │ idle
//!       ▼
//!   reveal ──▶ poll ──▶ dedup ──▶ deliver
//!       │        │         │          │
//!       └────────┴─────────┴──────────┘
//!                     │
//!                     ▼
//!                  conceal ──▶ idle
//! ```
//!
//! ## State
//!
//! The running flag and the last delivered observation are owned by the
//! Collector instance. Nothing is persisted: after a restart the first
//! observation is delivered again even when it is unchanged.

use futures::FutureExt;
use std::any::Any;
use std::panic::AssertUnwindSafe;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use tokio::sync::{RwLock, mpsc};
use tokio::task::JoinSet;
use tokio::time::{Instant, MissedTickBehavior};
use tokio_stream::StreamExt;
use tokio_stream::wrappers::IntervalStream;
use tracing::{debug, error, info, warn};

use crate::config::{CollectorConfig, TimingConfig};
use crate::dedup::should_deliver;
use crate::delivery::{AggregatedFailure, DeliveryClient, DeliveryRecord};
use crate::error::{Error, Result};
use crate::observation::Observation;
use crate::poller::Poller;
use crate::traits::{AppendTransport, Clock, Surface, Trigger};

/// Events emitted by the Collector
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CollectorEvent {
    /// Timer loop started
    Started { endpoints_count: usize },

    /// A cycle was requested while another was in flight
    CycleSkipped,

    /// Both fields parsed
    ObservationCaptured { observation: Observation },

    /// Observation equals the last delivered one
    DuplicateIgnored { observation: Observation },

    /// Observation appended to the store
    Delivered {
        observation: Observation,
        endpoint: String,
    },

    /// Every endpoint failed
    DeliveryFailed { error: String },

    /// The cycle ended early (trigger missing, timeout, surface fault)
    CycleAborted { reason: String },

    /// Timer loop stopped
    Stopped { reason: String },
}

/// How a single cycle ended
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CycleOutcome {
    /// Another cycle was in flight; nothing was done
    AlreadyRunning,

    /// The reveal control could not be located
    RevealNotFound,

    /// The poll budget ran out
    ExtractionTimedOut,

    /// The observation equals the last delivered one
    Duplicate(Observation),

    /// The observation was delivered
    Delivered {
        observation: Observation,
        endpoint: String,
    },

    /// Every endpoint failed
    DeliveryFailed(AggregatedFailure),

    /// Unexpected fault (surface error or panic)
    Faulted(String),
}

/// Releases the single-flight flag when dropped, including during unwinding
struct CycleGuard<'a> {
    running: &'a AtomicBool,
}

impl<'a> CycleGuard<'a> {
    fn acquire(running: &'a AtomicBool) -> Option<Self> {
        running
            .compare_exchange(false, true, Ordering::AcqRel, Ordering::Acquire)
            .ok()
            .map(|_| Self { running })
    }
}

impl Drop for CycleGuard<'_> {
    fn drop(&mut self) {
        self.running.store(false, Ordering::Release);
    }
}

/// Periodic observation collector
///
/// ## Lifecycle
///
/// 1. Create with [`Collector::new()`]
/// 2. Either drive single cycles with [`Collector::run_cycle()`] or start the
///    timer with [`Collector::run()`]
/// 3. The timer runs until a shutdown signal is received
///
/// ## Threading
///
/// Cycles may be requested from any task; the single-flight guard makes all
/// but one of any overlapping requests return [`CycleOutcome::AlreadyRunning`].
pub struct Collector {
    /// Observed interface
    surface: Arc<dyn Surface>,

    /// Time source for delays, poll budget and date bucket
    clock: Arc<dyn Clock>,

    /// Ordered-fallback delivery
    delivery: DeliveryClient,

    /// Bounded extraction loop
    poller: Poller,

    /// Opens the panel
    reveal: Trigger,

    /// Closes the panel
    conceal: Trigger,

    /// Cadence and delays
    timing: TimingConfig,

    /// Single-flight flag
    running: AtomicBool,

    /// Most recently delivered observation
    last_delivered: RwLock<Option<Observation>>,

    /// Event sender for external monitoring
    event_tx: mpsc::Sender<CollectorEvent>,
}

impl Collector {
    /// Create a new collector
    ///
    /// # Parameters
    ///
    /// - `surface`: Observed interface
    /// - `transport`: Append transport used for every endpoint
    /// - `clock`: Time source
    /// - `config`: Collector configuration
    ///
    /// # Returns
    ///
    /// A tuple of (collector, event_receiver) where event_receiver yields collector events
    pub fn new(
        surface: Arc<dyn Surface>,
        transport: Box<dyn AppendTransport>,
        clock: Arc<dyn Clock>,
        config: CollectorConfig,
    ) -> Result<(Self, mpsc::Receiver<CollectorEvent>)> {
        config.validate()?;

        let (tx, rx) = mpsc::channel(config.event_channel_capacity);

        let collector = Self {
            surface,
            clock,
            delivery: DeliveryClient::new(
                config.delivery.endpoints.clone(),
                config.delivery.root_namespace.clone(),
                transport,
            ),
            poller: Poller::new(
                config.selectors.fields(),
                config.timing.poll_budget(),
                config.timing.poll_sleep(),
            ),
            reveal: config.selectors.reveal_trigger(),
            conceal: config.selectors.conceal_trigger(),
            timing: config.timing,
            running: AtomicBool::new(false),
            last_delivered: RwLock::new(None),
            event_tx: tx,
        };

        Ok((collector, rx))
    }

    /// Whether a cycle is in flight
    pub fn is_running(&self) -> bool {
        self.running.load(Ordering::Acquire)
    }

    /// The most recently delivered observation, if any
    pub async fn last_delivered(&self) -> Option<Observation> {
        self.last_delivered.read().await.clone()
    }

    /// Run one full cycle
    ///
    /// Returns [`CycleOutcome::AlreadyRunning`] without touching the surface
    /// when another cycle holds the guard. Otherwise the conceal step always
    /// runs, whichever way the cycle ended, and no error or panic escapes.
    pub async fn run_cycle(&self) -> CycleOutcome {
        let Some(_guard) = CycleGuard::acquire(&self.running) else {
            debug!("Cycle already in flight, skipping");
            self.emit_event(CollectorEvent::CycleSkipped);
            return CycleOutcome::AlreadyRunning;
        };

        let outcome = match AssertUnwindSafe(self.observe_and_deliver())
            .catch_unwind()
            .await
        {
            Ok(Ok(outcome)) => outcome,
            Ok(Err(e)) => Self::classify(e),
            Err(panic) => CycleOutcome::Faulted(panic_message(panic)),
        };

        self.report(&outcome);

        match AssertUnwindSafe(self.conceal_panel()).catch_unwind().await {
            Ok(Ok(())) => {}
            Ok(Err(e)) => warn!("Failed to conceal panel: {}", e),
            Err(panic) => error!("Conceal step panicked: {}", panic_message(panic)),
        }

        outcome
    }

    /// Steps 1-5 of a cycle: reveal, poll, dedup, deliver
    async fn observe_and_deliver(&self) -> Result<CycleOutcome> {
        let surface = self.surface.as_ref();

        let reveal = self
            .reveal
            .locate(surface)
            .await?
            .ok_or_else(|| Error::trigger_not_found(self.reveal.name()))?;
        surface.dispatch_click(&reveal).await?;
        self.clock.sleep(self.timing.reveal_render_delay()).await;

        let observation = self
            .poller
            .poll(surface, self.clock.as_ref())
            .await?
            .ok_or_else(|| Error::extraction_timeout(self.timing.poll_budget_ms))?;
        let date_bucket = self.clock.today();

        self.emit_event(CollectorEvent::ObservationCaptured {
            observation: observation.clone(),
        });

        if !should_deliver(&observation, self.last_delivered.read().await.as_ref()) {
            return Ok(CycleOutcome::Duplicate(observation));
        }

        let record = DeliveryRecord::new(&observation, date_bucket);
        let delivered = self.delivery.deliver(&record).await?;
        if !delivered.failed_attempts.is_empty() {
            warn!(
                "Delivered via fallback endpoint {} after {} failed attempt(s)",
                delivered.endpoint,
                delivered.failed_attempts.len()
            );
        }

        *self.last_delivered.write().await = Some(observation.clone());

        Ok(CycleOutcome::Delivered {
            observation,
            endpoint: delivered.endpoint,
        })
    }

    /// Step 6: wait, then click the conceal control if it is present
    async fn conceal_panel(&self) -> Result<()> {
        self.clock.sleep(self.timing.post_cycle_delay()).await;

        match self.conceal.locate(self.surface.as_ref()).await? {
            Some(element) => self.surface.dispatch_click(&element).await,
            None => {
                debug!("Conceal trigger not found, leaving panel as is");
                Ok(())
            }
        }
    }

    fn classify(error: Error) -> CycleOutcome {
        match error {
            Error::TriggerNotFound { .. } => CycleOutcome::RevealNotFound,
            Error::ExtractionTimeout { .. } => CycleOutcome::ExtractionTimedOut,
            Error::Delivery(failure) => CycleOutcome::DeliveryFailed(failure),
            other => CycleOutcome::Faulted(other.to_string()),
        }
    }

    /// Log the outcome and emit the matching event
    fn report(&self, outcome: &CycleOutcome) {
        match outcome {
            CycleOutcome::AlreadyRunning => {}
            CycleOutcome::RevealNotFound => {
                warn!("Reveal trigger not found");
                self.emit_event(CollectorEvent::CycleAborted {
                    reason: "reveal trigger not found".to_string(),
                });
            }
            CycleOutcome::ExtractionTimedOut => {
                warn!(
                    "Could not read multiplier and time within {}ms",
                    self.timing.poll_budget_ms
                );
                self.emit_event(CollectorEvent::CycleAborted {
                    reason: "extraction timed out".to_string(),
                });
            }
            CycleOutcome::Duplicate(observation) => {
                info!("Ignored (unchanged): {}", observation);
                self.emit_event(CollectorEvent::DuplicateIgnored {
                    observation: observation.clone(),
                });
            }
            CycleOutcome::Delivered {
                observation,
                endpoint,
            } => {
                info!("Saved {} via {}", observation, endpoint);
                self.emit_event(CollectorEvent::Delivered {
                    observation: observation.clone(),
                    endpoint: endpoint.clone(),
                });
            }
            CycleOutcome::DeliveryFailed(failure) => {
                error!("{}", failure);
                self.emit_event(CollectorEvent::DeliveryFailed {
                    error: failure.to_string(),
                });
            }
            CycleOutcome::Faulted(reason) => {
                error!("Cycle error: {}", reason);
                self.emit_event(CollectorEvent::CycleAborted {
                    reason: reason.clone(),
                });
            }
        }
    }

    /// Run the timer loop
    ///
    /// Starts a cycle every `cycle_interval_ms` until SIGINT. Ticks that fire
    /// while a cycle is in flight are dropped by the single-flight guard.
    pub async fn run(self: Arc<Self>) -> Result<()> {
        self.run_internal(None).await
    }

    /// Run the timer loop until `shutdown_rx` fires
    ///
    /// Embedders that manage shutdown themselves use this instead of
    /// [`Collector::run()`], which waits for SIGINT.
    pub async fn run_with_shutdown(
        self: Arc<Self>,
        shutdown_rx: Option<tokio::sync::oneshot::Receiver<()>>,
    ) -> Result<()> {
        self.run_internal(shutdown_rx).await
    }

    async fn run_internal(
        self: Arc<Self>,
        shutdown_rx: Option<tokio::sync::oneshot::Receiver<()>>,
    ) -> Result<()> {
        self.emit_event(CollectorEvent::Started {
            endpoints_count: self.delivery.endpoints().len(),
        });

        let period = self.timing.cycle_interval();
        let mut interval = tokio::time::interval_at(Instant::now() + period, period);
        interval.set_missed_tick_behavior(MissedTickBehavior::Skip);
        let mut ticks = IntervalStream::new(interval);

        let shutdown = async {
            match shutdown_rx {
                Some(rx) => {
                    let _ = rx.await;
                }
                None => {
                    if let Err(e) = tokio::signal::ctrl_c().await {
                        error!("Failed to listen for shutdown signal: {}", e);
                    }
                }
            }
        };
        tokio::pin!(shutdown);

        info!("Collector started (interval={:?})", period);

        let mut cycles = JoinSet::new();
        loop {
            tokio::select! {
                Some(_) = ticks.next() => {
                    let collector = Arc::clone(&self);
                    cycles.spawn(async move { collector.run_cycle().await });
                }

                Some(joined) = cycles.join_next() => {
                    if let Err(e) = joined {
                        error!("Cycle task failed: {}", e);
                    }
                }

                _ = &mut shutdown => {
                    info!("Shutdown signal received");
                    break;
                }
            }
        }

        // Let an in-flight cycle finish so the panel is concealed
        while let Some(joined) = cycles.join_next().await {
            if let Err(e) = joined {
                error!("Cycle task failed: {}", e);
            }
        }

        self.emit_event(CollectorEvent::Stopped {
            reason: "Shutdown signal".to_string(),
        });
        info!("Collector stopped");

        Ok(())
    }

    /// Emit a collector event
    fn emit_event(&self, event: CollectorEvent) {
        match self.event_tx.try_send(event) {
            Ok(()) => {}
            Err(mpsc::error::TrySendError::Full(_)) => {
                warn!("Event channel full, dropping event. Consider increasing event_channel_capacity.");
            }
            Err(mpsc::error::TrySendError::Closed(_)) => {}
        }
    }
}

fn panic_message(panic: Box<dyn Any + Send>) -> String {
    if let Some(msg) = panic.downcast_ref::<&str>() {
        format!("panic: {}", msg)
    } else if let Some(msg) = panic.downcast_ref::<String>() {
        format!("panic: {}", msg)
    } else {
        "panic".to_string()
    }
}
