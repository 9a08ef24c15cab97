//! Shared application state (composition root).
//!
//! Owns the aggregator, the alert evaluator, the bounded logs, the host
//! probe, and the metrics registry for the lifetime of the process. Handlers
//! and middleware receive it by cheap `Clone` (one `Arc`).

use std::sync::Arc;
use std::time::Instant;

use chrono::Duration;
use vigil_core::error::Result;
use vigil_core::{AggregatorSettings, BoundedLog, MetricAggregator, NotificationEvaluator};

use crate::config::VigilConfig;
use crate::host::{HostProbe, HostSnapshot};
use crate::intercept::{ErrorRecord, Interceptor};
use crate::obs::metrics::ServiceMetrics;

#[derive(Clone)]
pub struct AppState {
    inner: Arc<AppStateInner>,
}

struct AppStateInner {
    cfg: VigilConfig,
    aggregator: Arc<MetricAggregator>,
    evaluator: Arc<NotificationEvaluator>,
    errors: Arc<BoundedLog<ErrorRecord>>,
    history: BoundedLog<HostSnapshot>,
    probe: Arc<HostProbe>,
    metrics: Arc<ServiceMetrics>,
    interceptor: Interceptor,
    started: Instant,
}

impl AppState {
    /// Build application state reading real host counters.
    /// Returns Result so main can handle errors gracefully (no panic).
    pub fn new(cfg: VigilConfig) -> Result<Self> {
        Self::with_probe(cfg, HostProbe::system())
    }

    pub fn with_probe(cfg: VigilConfig, probe: HostProbe) -> Result<Self> {
        cfg.validate()?;

        let mon = &cfg.monitoring;
        let settings = AggregatorSettings {
            retention: Duration::hours(mon.retention_hours as i64),
            cleanup_interval: Duration::minutes(mon.cleanup_interval_minutes as i64),
        };

        let aggregator = Arc::new(MetricAggregator::new(settings));
        let evaluator = Arc::new(NotificationEvaluator::new(
            cfg.thresholds.clone(),
            mon.notification_capacity,
        ));
        let errors = Arc::new(BoundedLog::new(mon.error_capacity));
        let history = BoundedLog::new(mon.history_capacity);
        let metrics = Arc::new(ServiceMetrics::default());
        let interceptor = Interceptor::new(
            Arc::clone(&aggregator),
            Arc::clone(&errors),
            Arc::clone(&metrics),
        );

        tracing::debug!(
            thresholds = cfg.thresholds.len(),
            retention_hours = mon.retention_hours,
            "monitoring state ready"
        );

        Ok(Self {
            inner: Arc::new(AppStateInner {
                cfg,
                aggregator,
                evaluator,
                errors,
                history,
                probe: Arc::new(probe),
                metrics,
                interceptor,
                started: Instant::now(),
            }),
        })
    }

    pub fn cfg(&self) -> &VigilConfig {
        &self.inner.cfg
    }

    pub fn aggregator(&self) -> &MetricAggregator {
        &self.inner.aggregator
    }

    pub fn evaluator(&self) -> &NotificationEvaluator {
        &self.inner.evaluator
    }

    /// Recent request failures.
    pub fn errors(&self) -> &BoundedLog<ErrorRecord> {
        &self.inner.errors
    }

    /// Host snapshots taken by the evaluation loop.
    pub fn history(&self) -> &BoundedLog<HostSnapshot> {
        &self.inner.history
    }

    pub fn probe(&self) -> Arc<HostProbe> {
        Arc::clone(&self.inner.probe)
    }

    pub fn metrics(&self) -> &ServiceMetrics {
        &self.inner.metrics
    }

    pub fn interceptor(&self) -> &Interceptor {
        &self.inner.interceptor
    }

    pub fn uptime_secs(&self) -> f64 {
        self.inner.started.elapsed().as_secs_f64()
    }

    /// Extra gauge lines for the `/metrics` endpoint.
    pub fn metrics_extra(&self) -> Vec<(&'static str, f64)> {
        vec![
            ("vigil_uptime_seconds", self.uptime_secs()),
            ("vigil_notifications_buffered", self.evaluator().notification_count() as f64),
            ("vigil_recent_errors_buffered", self.errors().len() as f64),
            ("vigil_host_history_buffered", self.history().len() as f64),
        ]
    }
}
