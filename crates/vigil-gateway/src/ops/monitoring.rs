//! JSON API over the aggregator, evaluator, host probe, and failure log.

use std::collections::BTreeMap;

use axum::{
    extract::{
        rejection::{JsonRejection, PathRejection, QueryRejection},
        Path, Query, State,
    },
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde::{Deserialize, Serialize};
use serde_json::json;
use vigil_core::{AggregateWindow, Alert, Tags};

use crate::app_state::AppState;
use crate::error::{ApiError, ApiResult};
use crate::host::HostStatus;
use crate::monitor;

const DEFAULT_LIMIT: usize = 50;
const MAX_METRIC_NAME_LEN: usize = 128;

#[derive(Debug, Deserialize)]
pub struct LimitQuery {
    pub limit: Option<usize>,
}

impl LimitQuery {
    fn resolve(&self) -> usize {
        self.limit.unwrap_or(DEFAULT_LIMIT)
    }
}

#[derive(Debug, Deserialize)]
pub struct WindowQuery {
    pub window_minutes: Option<u64>,
}

/// Extractor rejections become `ApiError`s so they answer in JSON and reach
/// the failure log like any other handler error.
fn query<T>(q: Result<Query<T>, QueryRejection>) -> ApiResult<T> {
    q.map(|Query(v)| v).map_err(|e| ApiError::bad_request(e.body_text()))
}

fn path<T>(p: Result<Path<T>, PathRejection>) -> ApiResult<T> {
    p.map(|Path(v)| v).map_err(|e| ApiError::bad_request(e.body_text()))
}

fn window(state: &AppState, q: &WindowQuery) -> ApiResult<u64> {
    let retention_minutes = state.cfg().monitoring.retention_hours * 60;
    match q.window_minutes {
        None => Ok(state.cfg().monitoring.default_window_minutes),
        Some(w) if (1..=retention_minutes).contains(&w) => Ok(w),
        Some(w) => Err(ApiError::bad_request(format!(
            "window_minutes must be between 1 and {retention_minutes}, got {w}"
        ))),
    }
}

fn validate_metric_name(name: &str) -> ApiResult<()> {
    let ok = !name.is_empty()
        && name.len() <= MAX_METRIC_NAME_LEN
        && name
            .bytes()
            .all(|b| b.is_ascii_alphanumeric() || matches!(b, b'_' | b'.' | b':' | b'-'));
    if ok {
        Ok(())
    } else {
        Err(ApiError::bad_request(format!("invalid metric name: {name:?}")))
    }
}

/// `GET /api/v1/system`
pub async fn system(State(state): State<AppState>) -> Response {
    let probe = state.probe();
    let status = match tokio::task::spawn_blocking(move || probe.snapshot()).await {
        Ok(status) => status,
        Err(e) => HostStatus::Error {
            status: "error",
            message: format!("host probe task failed: {e}"),
        },
    };
    let code = if status.is_ok() {
        StatusCode::OK
    } else {
        state.metrics().host_probe_failures.inc(&[]);
        StatusCode::SERVICE_UNAVAILABLE
    };
    (code, Json(status)).into_response()
}

/// `GET /api/v1/system/history`
pub async fn system_history(
    State(state): State<AppState>,
    q: Result<Query<LimitQuery>, QueryRejection>,
) -> ApiResult<Response> {
    let q = query(q)?;
    let snapshots = state.history().recent(q.resolve());
    Ok(Json(json!({
        "count": snapshots.len(),
        "capacity": state.history().capacity(),
        "snapshots": snapshots,
    }))
    .into_response())
}

#[derive(Debug, Serialize)]
pub struct AggregateBody {
    pub metric: String,
    pub window_minutes: u64,
    #[serde(flatten)]
    pub window: AggregateWindow,
}

/// `GET /api/v1/metrics`
pub async fn list_aggregates(
    State(state): State<AppState>,
    q: Result<Query<WindowQuery>, QueryRejection>,
) -> ApiResult<Response> {
    let q = query(q)?;
    let window_minutes = window(&state, &q)?;
    let metrics: BTreeMap<String, AggregateWindow> =
        state.aggregator().aggregate_all(window_minutes).into_iter().collect();
    Ok(Json(json!({
        "window_minutes": window_minutes,
        "metrics": metrics,
    }))
    .into_response())
}

/// `GET /api/v1/metrics/:name` (unknown names yield the zero aggregate)
pub async fn get_aggregate(
    State(state): State<AppState>,
    name: Result<Path<String>, PathRejection>,
    q: Result<Query<WindowQuery>, QueryRejection>,
) -> ApiResult<Json<AggregateBody>> {
    let name = path(name)?;
    let q = query(q)?;
    validate_metric_name(&name)?;
    let window_minutes = window(&state, &q)?;
    let window = state.aggregator().aggregate(&name, window_minutes);
    Ok(Json(AggregateBody {
        metric: name,
        window_minutes,
        window,
    }))
}

#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct RecordReq {
    pub value: f64,
    #[serde(default)]
    pub tags: Tags,
}

/// `POST /api/v1/metrics/:name`
pub async fn record_metric(
    State(state): State<AppState>,
    name: Result<Path<String>, PathRejection>,
    body: Result<Json<RecordReq>, JsonRejection>,
) -> ApiResult<Response> {
    let name = path(name)?;
    validate_metric_name(&name)?;
    let Json(req) = body.map_err(|e| ApiError::bad_request(e.body_text()))?;
    if !req.value.is_finite() {
        return Err(ApiError::bad_request("value must be a finite number"));
    }

    state.aggregator().record(&name, req.value, req.tags);
    Ok((
        StatusCode::CREATED,
        Json(json!({ "metric": name, "value": req.value, "recorded": true })),
    )
        .into_response())
}

#[derive(Debug, Serialize)]
pub struct AlertsBody {
    pub count: usize,
    pub capacity: usize,
    pub alerts: Vec<Alert>,
}

/// `GET /api/v1/alerts` (newest first)
pub async fn alerts(
    State(state): State<AppState>,
    q: Result<Query<LimitQuery>, QueryRejection>,
) -> ApiResult<Json<AlertsBody>> {
    let q = query(q)?;
    let ev = state.evaluator();
    Ok(Json(AlertsBody {
        count: ev.notification_count(),
        capacity: ev.notification_capacity(),
        alerts: ev.recent(q.resolve()),
    }))
}

#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct EvaluateReq {
    pub metrics: BTreeMap<String, f64>,
}

/// `POST /api/v1/alerts/evaluate`
pub async fn evaluate(
    State(state): State<AppState>,
    body: Result<Json<EvaluateReq>, JsonRejection>,
) -> ApiResult<Response> {
    let Json(req) = body.map_err(|e| ApiError::bad_request(e.body_text()))?;
    if let Some((name, _)) = req.metrics.iter().find(|(_, v)| !v.is_finite()) {
        return Err(ApiError::bad_request(format!("metrics.{name} must be a finite number")));
    }

    let alerts = state.evaluator().evaluate(&req.metrics);
    monitor::record_alert_metrics(&state, &alerts);
    Ok(Json(json!({ "count": alerts.len(), "alerts": alerts })).into_response())
}

/// `GET /api/v1/thresholds`
pub async fn thresholds(State(state): State<AppState>) -> Response {
    Json(json!({
        "critical_ratio": vigil_core::CRITICAL_RATIO,
        "thresholds": state.evaluator().thresholds(),
    }))
    .into_response()
}

/// `GET /api/v1/errors` (newest first)
pub async fn errors(
    State(state): State<AppState>,
    q: Result<Query<LimitQuery>, QueryRejection>,
) -> ApiResult<Response> {
    let q = query(q)?;
    let errors = state.errors().recent(q.resolve());
    Ok(Json(json!({
        "count": errors.len(),
        "capacity": state.errors().capacity(),
        "errors": errors,
    }))
    .into_response())
}
