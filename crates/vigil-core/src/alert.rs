//! Static-threshold alert evaluation.
//!
//! A metric value strictly above its threshold produces an alert. The alert
//! is `Critical` when the value is strictly above `threshold * CRITICAL_RATIO`,
//! otherwise `Warning`. Every emitted alert is also appended to a bounded
//! notification log.

use std::collections::BTreeMap;
use std::sync::Arc;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::bounded::BoundedLog;
use crate::clock::{Clock, SystemClock};

/// Values above `threshold * CRITICAL_RATIO` are critical.
pub const CRITICAL_RATIO: f64 = 1.2;

/// Metric name -> limit. Fixed for the lifetime of the evaluator.
pub type ThresholdTable = BTreeMap<String, f64>;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Severity {
    Warning,
    Critical,
}

impl Severity {
    /// Classify `value` against `threshold`; `None` when within limits.
    pub fn classify(value: f64, threshold: f64) -> Option<Self> {
        if value > threshold * CRITICAL_RATIO {
            Some(Severity::Critical)
        } else if value > threshold {
            Some(Severity::Warning)
        } else {
            None
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            Severity::Warning => "warning",
            Severity::Critical => "critical",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Alert {
    pub metric: String,
    pub value: f64,
    pub threshold: f64,
    pub severity: Severity,
    pub timestamp: DateTime<Utc>,
}

pub struct NotificationEvaluator {
    thresholds: ThresholdTable,
    log: BoundedLog<Alert>,
    clock: Arc<dyn Clock>,
}

impl NotificationEvaluator {
    pub fn new(thresholds: ThresholdTable, capacity: usize) -> Self {
        Self::with_clock(thresholds, capacity, Arc::new(SystemClock))
    }

    pub fn with_clock(thresholds: ThresholdTable, capacity: usize, clock: Arc<dyn Clock>) -> Self {
        Self {
            thresholds,
            log: BoundedLog::new(capacity),
            clock,
        }
    }

    pub fn thresholds(&self) -> &ThresholdTable {
        &self.thresholds
    }

    pub fn threshold(&self, metric: &str) -> Option<f64> {
        self.thresholds.get(metric).copied()
    }

    /// Compare each metric with its threshold, in metric-name order.
    /// Metrics without a registered threshold are ignored.
    pub fn evaluate(&self, metrics: &BTreeMap<String, f64>) -> Vec<Alert> {
        let now = self.clock.now();
        let alerts: Vec<Alert> = metrics
            .iter()
            .filter_map(|(metric, &value)| {
                let threshold = self.threshold(metric)?;
                let severity = Severity::classify(value, threshold)?;
                Some(Alert {
                    metric: metric.clone(),
                    value,
                    threshold,
                    severity,
                    timestamp: now,
                })
            })
            .collect();

        for a in &alerts {
            tracing::warn!(
                metric = %a.metric,
                value = a.value,
                threshold = a.threshold,
                severity = a.severity.as_str(),
                "threshold exceeded"
            );
        }
        self.log.extend(alerts.iter().cloned());
        alerts
    }

    /// Up to `limit` logged alerts, newest first.
    pub fn recent(&self, limit: usize) -> Vec<Alert> {
        self.log.recent(limit)
    }

    pub fn notification_count(&self) -> usize {
        self.log.len()
    }

    pub fn notification_capacity(&self) -> usize {
        self.log.capacity()
    }
}
