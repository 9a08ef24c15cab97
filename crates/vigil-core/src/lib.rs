//! Vigil core: transport-agnostic metric aggregation and threshold alerting.
//!
//! This crate owns the shared state of the request-lifecycle pipeline: the
//! bounded logs, the windowed metric aggregator, and the alert evaluator.
//! It carries no HTTP or runtime dependencies so the gateway, binaries, and
//! tests can drive it directly.
//!
//! # Defensive guarantees
//! Panics, `unwrap`, and `expect` are compile-denied here
//! (`#![deny(clippy::panic, clippy::unwrap_used, clippy::expect_used)]`).
//! Poisoned locks are recovered instead of propagated as panics.

#![deny(clippy::unwrap_used)]
#![deny(clippy::expect_used)]
#![deny(clippy::panic)]

pub mod aggregate;
pub mod alert;
pub mod bounded;
pub mod clock;
pub mod error;

pub use aggregate::{AggregateWindow, AggregatorSettings, MetricAggregator, MetricSample, Tags};
pub use alert::{Alert, NotificationEvaluator, Severity, ThresholdTable, CRITICAL_RATIO};
pub use bounded::BoundedLog;
pub use clock::{Clock, ManualClock, SystemClock};
/// Shared result type.
pub use error::{Result, VigilError};
