//! Observability: Prometheus-compatible metrics and tracing setup.
//!
//! Metrics are stored as atomics keyed by sorted label sets and rendered by
//! the `/metrics` handler.

pub mod logging;
pub mod metrics;
