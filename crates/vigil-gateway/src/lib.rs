//! Vigil gateway library entry.
//!
//! Wires the config loader, request interceptor, host probe, metrics
//! exposition, and periodic threshold evaluation into an axum service. It is
//! consumed by the binaries (`main.rs`, `bin/healthcheck.rs`) and by
//! integration tests.

pub mod app_state;
pub mod config;
pub mod error;
pub mod healthcheck;
pub mod host;
pub mod intercept;
pub mod monitor;
pub mod obs;
pub mod ops;
pub mod router;
