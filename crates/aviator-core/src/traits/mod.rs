//! Collaborator traits for the collector
//!
//! This module defines the abstract interfaces the core drives.
//!
//! - [`Surface`]: Query, read and click the observed interface
//! - [`AppendTransport`]: One append attempt against one store URL
//! - [`Clock`]: Monotonic time, sleeping and the local calendar date

pub mod clock;
pub mod surface;
pub mod transport;

pub use clock::{Clock, SystemClock};
pub use surface::{Element, SelectorExpr, Surface, Trigger};
pub use transport::{AppendError, AppendTransport};
