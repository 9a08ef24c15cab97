//! Request interceptor (timing, request ids, failure logging, hardening headers).
//!
//! Contract per request:
//! - start: monotonic start instant + request id (inbound `X-Request-ID`
//!   when it looks sane, otherwise a fresh UUID v4)
//! - finish: one `request_duration_ms` sample tagged with method and route,
//!   `X-Request-ID` / `X-Response-Time` response headers
//! - failure: when the handler produced an `ApiError`, exactly one failure
//!   entry is logged under the same request id and the error response is
//!   returned unchanged

use std::sync::Arc;
use std::time::{Duration, Instant};

use axum::{
    extract::{MatchedPath, Request, State},
    http::{HeaderName, HeaderValue, StatusCode},
    middleware::Next,
    response::Response,
};
use chrono::{DateTime, Utc};
use serde::Serialize;
use tracing::Instrument;
use uuid::Uuid;

use vigil_core::{BoundedLog, MetricAggregator, Tags};

use crate::app_state::AppState;
use crate::error::HandlerFailure;
use crate::obs::metrics::ServiceMetrics;

pub const REQUEST_ID_HEADER: &str = "x-request-id";
pub const RESPONSE_TIME_HEADER: &str = "x-response-time";
/// Aggregator metric fed with every request's latency.
pub const DURATION_METRIC: &str = "request_duration_ms";
/// Route label for requests that matched no route.
pub const UNMATCHED_ROUTE: &str = "unmatched";

const MAX_INBOUND_ID_LEN: usize = 128;

const HARDENING_HEADERS: [(&str, &str); 3] = [
    ("x-content-type-options", "nosniff"),
    ("x-frame-options", "DENY"),
    ("x-xss-protection", "1; mode=block"),
];

/// One failed request, kept in the bounded recent-errors log.
#[derive(Debug, Clone, Serialize)]
pub struct ErrorRecord {
    pub request_id: String,
    pub method: String,
    pub route: String,
    pub status: u16,
    pub kind: String,
    pub message: String,
    pub duration_ms: f64,
    pub timestamp: DateTime<Utc>,
}

/// In-flight request handle produced by `Interceptor::begin`.
#[derive(Debug)]
pub struct RequestTimer {
    request_id: String,
    method: String,
    route: String,
    started: Instant,
}

impl RequestTimer {
    pub fn request_id(&self) -> &str {
        &self.request_id
    }
    pub fn method(&self) -> &str {
        &self.method
    }
    pub fn route(&self) -> &str {
        &self.route
    }
}

/// Shared interceptor state: where samples, failures, and counters go.
#[derive(Clone)]
pub struct Interceptor {
    aggregator: Arc<MetricAggregator>,
    errors: Arc<BoundedLog<ErrorRecord>>,
    metrics: Arc<ServiceMetrics>,
}

impl Interceptor {
    pub fn new(
        aggregator: Arc<MetricAggregator>,
        errors: Arc<BoundedLog<ErrorRecord>>,
        metrics: Arc<ServiceMetrics>,
    ) -> Self {
        Self {
            aggregator,
            errors,
            metrics,
        }
    }

    pub fn begin(&self, method: &str, route: &str, inbound_id: Option<&str>) -> RequestTimer {
        let request_id = inbound_id
            .filter(|id| is_valid_request_id(id))
            .map(str::to_string)
            .unwrap_or_else(|| Uuid::new_v4().to_string());
        RequestTimer {
            request_id,
            method: method.to_string(),
            route: route.to_string(),
            started: Instant::now(),
        }
    }

    /// Close out a request: record the duration sample and counters, and
    /// log `failure` once when present. Returns the elapsed duration.
    pub fn finish(&self, timer: &RequestTimer, status: StatusCode, failure: Option<&HandlerFailure>) -> Duration {
        let elapsed = timer.started.elapsed();
        let duration_ms = elapsed.as_secs_f64() * 1000.0;
        let status_str = status.as_u16().to_string();

        let mut tags = Tags::new();
        tags.insert("method".into(), timer.method.clone());
        tags.insert("route".into(), timer.route.clone());
        self.aggregator.record(DURATION_METRIC, duration_ms, tags);

        let route_labels = [("method", timer.method.as_str()), ("route", timer.route.as_str())];
        self.metrics.http_request_duration.observe(&route_labels, elapsed);
        self.metrics.http_requests.inc(&[
            ("method", timer.method.as_str()),
            ("route", timer.route.as_str()),
            ("status", status_str.as_str()),
        ]);

        if let Some(f) = failure {
            if status.is_server_error() {
                tracing::error!(
                    request_id = %timer.request_id,
                    status = status.as_u16(),
                    kind = f.kind,
                    duration_ms,
                    error = %f.message,
                    "request failed"
                );
            } else {
                tracing::warn!(
                    request_id = %timer.request_id,
                    status = status.as_u16(),
                    kind = f.kind,
                    duration_ms,
                    error = %f.message,
                    "request rejected"
                );
            }
            self.metrics.http_errors.inc(&[
                ("method", timer.method.as_str()),
                ("route", timer.route.as_str()),
                ("kind", f.kind),
            ]);
            self.errors.push(ErrorRecord {
                request_id: timer.request_id.clone(),
                method: timer.method.clone(),
                route: timer.route.clone(),
                status: status.as_u16(),
                kind: f.kind.to_string(),
                message: f.message.clone(),
                duration_ms,
                timestamp: Utc::now(),
            });
        } else {
            tracing::debug!(
                request_id = %timer.request_id,
                status = status.as_u16(),
                duration_ms,
                "request completed"
            );
        }

        elapsed
    }
}

fn is_valid_request_id(id: &str) -> bool {
    !id.is_empty()
        && id.len() <= MAX_INBOUND_ID_LEN
        && id.bytes().all(|b| b.is_ascii_alphanumeric() || matches!(b, b'-' | b'_' | b'.'))
}

/// Format a duration for the `X-Response-Time` header, e.g. `12.345ms`.
pub fn format_response_time(elapsed: Duration) -> String {
    format!("{:.3}ms", elapsed.as_secs_f64() * 1000.0)
}

/// axum middleware entry; install with `middleware::from_fn_with_state`.
pub async fn intercept(State(state): State<AppState>, request: Request, next: Next) -> Response {
    let method = request.method().to_string();
    let route = request
        .extensions()
        .get::<MatchedPath>()
        .map(|p| p.as_str().to_string())
        .unwrap_or_else(|| UNMATCHED_ROUTE.to_string());
    let inbound_id = request
        .headers()
        .get(REQUEST_ID_HEADER)
        .and_then(|v| v.to_str().ok());

    let interceptor = state.interceptor();
    let timer = interceptor.begin(&method, &route, inbound_id);

    let span = tracing::info_span!(
        "http_request",
        request_id = %timer.request_id(),
        method = %timer.method(),
        route = %timer.route(),
    );

    let mut response = next.run(request).instrument(span.clone()).await;

    let failure = response.extensions_mut().remove::<HandlerFailure>();
    let elapsed = span.in_scope(|| interceptor.finish(&timer, response.status(), failure.as_ref()));

    let headers = response.headers_mut();
    if let Ok(v) = HeaderValue::from_str(timer.request_id()) {
        headers.insert(HeaderName::from_static(REQUEST_ID_HEADER), v);
    }
    if let Ok(v) = HeaderValue::from_str(&format_response_time(elapsed)) {
        headers.insert(HeaderName::from_static(RESPONSE_TIME_HEADER), v);
    }
    for (name, value) in HARDENING_HEADERS {
        headers.insert(HeaderName::from_static(name), HeaderValue::from_static(value));
    }

    response
}

#[cfg(test)]
mod tests {
    use super::*;
    use vigil_core::AggregatorSettings;

    fn interceptor() -> (Interceptor, Arc<MetricAggregator>, Arc<BoundedLog<ErrorRecord>>) {
        let agg = Arc::new(MetricAggregator::new(AggregatorSettings::default()));
        let errors = Arc::new(BoundedLog::new(10));
        let i = Interceptor::new(agg.clone(), errors.clone(), Arc::new(ServiceMetrics::default()));
        (i, agg, errors)
    }

    #[test]
    fn inbound_request_id_is_reused_when_sane() {
        let (i, _, _) = interceptor();
        assert_eq!(i.begin("GET", "/x", Some("abc-123")).request_id(), "abc-123");

        let generated = i.begin("GET", "/x", Some("bad id with spaces"));
        assert!(Uuid::parse_str(generated.request_id()).is_ok());
    }

    #[test]
    fn success_records_sample_without_failure() {
        let (i, agg, errors) = interceptor();
        let t = i.begin("GET", "/health", None);
        i.finish(&t, StatusCode::OK, None);

        assert_eq!(agg.aggregate(DURATION_METRIC, 1).count, 1);
        let sample = &agg.samples(DURATION_METRIC, 1)[0];
        assert_eq!(sample.tags.get("route").map(String::as_str), Some("/health"));
        assert_eq!(sample.tags.get("method").map(String::as_str), Some("GET"));
        assert!(errors.is_empty());
    }

    #[test]
    fn failure_is_logged_once_with_request_id() {
        let (i, agg, errors) = interceptor();
        let t = i.begin("POST", "/boom", Some("req-1"));
        let failure = HandlerFailure {
            kind: "INTERNAL",
            message: "internal: kaboom".into(),
        };
        i.finish(&t, StatusCode::INTERNAL_SERVER_ERROR, Some(&failure));

        assert_eq!(agg.sample_count(DURATION_METRIC), 1);
        let logged = errors.snapshot();
        assert_eq!(logged.len(), 1);
        assert_eq!(logged[0].request_id, "req-1");
        assert_eq!(logged[0].kind, "INTERNAL");
        assert_eq!(logged[0].status, 500);
    }

    #[test]
    fn response_time_has_millisecond_precision() {
        assert_eq!(format_response_time(Duration::from_micros(12_345)), "12.345ms");
    }
}
