//! Periodic threshold evaluation.
//!
//! Each tick reads the host probe on a blocking thread, records the readings
//! as samples, stores the snapshot in the bounded history, and evaluates the
//! host readings plus the recent request-latency average against the
//! threshold table.

use std::collections::BTreeMap;
use std::time::Duration;

use tokio::task::JoinHandle;
use vigil_core::{Alert, Tags};

use crate::app_state::AppState;
use crate::host::HostStatus;
use crate::intercept::DURATION_METRIC;

/// Run one evaluation pass and return the alerts it emitted.
pub async fn evaluate_once(state: &AppState) -> Vec<Alert> {
    let probe = state.probe();
    let status = match tokio::task::spawn_blocking(move || probe.snapshot()).await {
        Ok(status) => status,
        Err(e) => HostStatus::Error {
            status: "error",
            message: format!("host probe task failed: {e}"),
        },
    };

    let mut readings = BTreeMap::new();

    match status {
        HostStatus::Ok(snapshot) => {
            let mut tags = Tags::new();
            tags.insert("source".into(), "host".into());
            for (name, value) in snapshot.as_metrics() {
                state.aggregator().record(name, value, tags.clone());
                state
                    .metrics()
                    .host_utilisation
                    .set(&[("resource", name.trim_end_matches("_percent"))], value);
                readings.insert(name.to_string(), value);
            }
            state.history().push(snapshot);
        }
        HostStatus::Error { message, .. } => {
            state.metrics().host_probe_failures.inc(&[]);
            tracing::warn!(error = %message, "skipping host thresholds for this pass");
        }
    }

    let window = state.cfg().monitoring.default_window_minutes;
    let latency = state.aggregator().aggregate(DURATION_METRIC, window);
    if latency.count > 0 {
        readings.insert(DURATION_METRIC.to_string(), latency.avg);
    }

    let alerts = state.evaluator().evaluate(&readings);
    record_alert_metrics(state, &alerts);
    alerts
}

pub(crate) fn record_alert_metrics(state: &AppState, alerts: &[Alert]) {
    for a in alerts {
        state
            .metrics()
            .alerts_emitted
            .inc(&[("metric", a.metric.as_str()), ("severity", a.severity.as_str())]);
    }
}

/// Spawn the evaluation loop. Returns `None` when the interval is 0.
pub fn spawn_evaluation_loop(state: AppState) -> Option<JoinHandle<()>> {
    let secs = state.cfg().monitoring.evaluation_interval_secs;
    if secs == 0 {
        tracing::info!("periodic threshold evaluation disabled");
        return None;
    }

    Some(tokio::spawn(async move {
        let mut tick = tokio::time::interval(Duration::from_secs(secs));
        tick.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Delay);
        // First tick completes immediately.
        tick.tick().await;

        loop {
            tick.tick().await;
            let alerts = evaluate_once(&state).await;
            if !alerts.is_empty() {
                tracing::info!(count = alerts.len(), "evaluation pass emitted alerts");
            }
        }
    }))
}
