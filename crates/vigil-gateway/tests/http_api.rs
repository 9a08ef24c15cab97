#![allow(clippy::unwrap_used)]
#![allow(clippy::expect_used)]
#![allow(clippy::panic)]

mod common;

use axum::http::StatusCode;
use serde_json::json;

use common::{get, json_body, post_json, send, state, state_with, text_body, BrokenCounters};
use vigil_gateway::intercept::DURATION_METRIC;
use vigil_gateway::{monitor, router};

#[tokio::test]
async fn health_and_aliases() {
    let app = router::build_router(state());

    for path in ["/health", "/api/health", "/api/v1/health"] {
        let resp = send(&app, get(path)).await;
        assert_eq!(resp.status(), StatusCode::OK, "path={path}");

        let h = resp.headers();
        assert_eq!(h["x-content-type-options"], "nosniff");
        assert_eq!(h["x-frame-options"], "DENY");
        assert_eq!(h["x-xss-protection"], "1; mode=block");
        assert!(h.contains_key("x-request-id"));
        assert!(h["x-response-time"].to_str().unwrap().ends_with("ms"));

        let body = json_body(resp).await;
        assert_eq!(body["status"], "healthy");
        assert_eq!(body["environment"], "test");
        assert_eq!(body["version"], env!("CARGO_PKG_VERSION"));
        assert!(body["timestamp"].is_string());
    }
}

#[tokio::test]
async fn every_request_feeds_the_aggregator() {
    let state = state();
    let app = router::build_router(state.clone());

    send(&app, get("/health")).await;
    send(&app, get("/api/health")).await;

    assert_eq!(state.aggregator().aggregate(DURATION_METRIC, 5).count, 2);
    let routes: Vec<String> = state
        .aggregator()
        .samples(DURATION_METRIC, 5)
        .into_iter()
        .filter_map(|s| s.tags.get("route").cloned())
        .collect();
    assert_eq!(routes, vec!["/health".to_string(), "/api/health".to_string()]);
}

#[tokio::test]
async fn inbound_request_id_is_echoed() {
    let app = router::build_router(state());
    let req = axum::http::Request::builder()
        .uri("/health")
        .header("x-request-id", "trace-42")
        .body(axum::body::Body::empty())
        .unwrap();
    let resp = send(&app, req).await;
    assert_eq!(resp.headers()["x-request-id"], "trace-42");
}

#[tokio::test]
async fn unknown_route_is_json_404_and_logged() {
    let state = state();
    let app = router::build_router(state.clone());

    let resp = send(&app, get("/nope")).await;
    assert_eq!(resp.status(), StatusCode::NOT_FOUND);
    let request_id = resp.headers()["x-request-id"].to_str().unwrap().to_string();
    let body = json_body(resp).await;
    assert_eq!(body["error"], "NOT_FOUND");

    let errors = state.errors().snapshot();
    assert_eq!(errors.len(), 1);
    assert_eq!(errors[0].request_id, request_id);
    assert_eq!(errors[0].route, "unmatched");
}

#[tokio::test]
async fn metrics_exposition() {
    let app = router::build_router(state());
    send(&app, get("/health")).await;

    let resp = send(&app, get("/metrics")).await;
    assert_eq!(resp.status(), StatusCode::OK);
    assert!(resp.headers()["content-type"].to_str().unwrap().starts_with("text/plain"));

    let text = text_body(resp).await;
    assert!(text.contains("# TYPE vigil_http_requests_total counter"));
    assert!(text.contains("vigil_http_requests_total{method=\"GET\",route=\"/health\",status=\"200\"} 1"));
    assert!(text.contains("# TYPE vigil_http_request_duration_micros histogram"));
    assert!(text.contains("vigil_uptime_seconds"));
}

#[tokio::test]
async fn system_snapshot_ok_and_error() {
    let app = router::build_router(state());
    let resp = send(&app, get("/api/v1/system")).await;
    assert_eq!(resp.status(), StatusCode::OK);
    let body = json_body(resp).await;
    assert_eq!(body["cpu_percent"], 97.0);
    assert_eq!(body["memory_percent"], 50.0);

    let app = router::build_router(state_with(BrokenCounters));
    let resp = send(&app, get("/api/v1/system")).await;
    assert_eq!(resp.status(), StatusCode::SERVICE_UNAVAILABLE);
    let body = json_body(resp).await;
    assert_eq!(body["status"], "error");
    assert!(body["message"].as_str().unwrap().contains("counters unreadable"));
    assert!(body.get("cpu_percent").is_none());
}

#[tokio::test]
async fn record_and_aggregate_custom_metric() {
    let app = router::build_router(state());

    for v in [10.0, 20.0, 60.0] {
        let resp = send(&app, post_json("/api/v1/metrics/queue_depth", json!({ "value": v }))).await;
        assert_eq!(resp.status(), StatusCode::CREATED);
    }

    let body = json_body(send(&app, get("/api/v1/metrics/queue_depth?window_minutes=10")).await).await;
    assert_eq!(body["metric"], "queue_depth");
    assert_eq!(body["window_minutes"], 10);
    assert_eq!(body["count"], 3);
    assert_eq!(body["avg"], 30.0);
    assert_eq!(body["min"], 10.0);
    assert_eq!(body["max"], 60.0);

    let body = json_body(send(&app, get("/api/v1/metrics/never_seen")).await).await;
    assert_eq!(body["count"], 0);
    assert_eq!(body["avg"], 0.0);

    let body = json_body(send(&app, get("/api/v1/metrics")).await).await;
    assert_eq!(body["metrics"]["queue_depth"]["count"], 3);
}

#[tokio::test]
async fn bad_record_requests_are_rejected() {
    let state = state();
    let app = router::build_router(state.clone());

    let resp = send(&app, post_json("/api/v1/metrics/ok_name", json!({ "val": 1 }))).await;
    assert_eq!(resp.status(), StatusCode::BAD_REQUEST);
    assert_eq!(json_body(resp).await["error"], "BAD_REQUEST");

    let resp = send(&app, get("/api/v1/metrics/ok_name?window_minutes=0")).await;
    assert_eq!(resp.status(), StatusCode::BAD_REQUEST);

    assert_eq!(state.errors().len(), 2);
    assert_eq!(state.aggregator().sample_count("ok_name"), 0);
}

#[tokio::test]
async fn malformed_query_is_json_400_and_logged() {
    let state = state();
    let app = router::build_router(state.clone());

    for path in ["/api/v1/alerts?limit=abc", "/api/v1/metrics/latency?window_minutes=-1"] {
        let resp = send(&app, get(path)).await;
        assert_eq!(resp.status(), StatusCode::BAD_REQUEST, "path={path}");
        assert!(resp.headers()["content-type"].to_str().unwrap().starts_with("application/json"));
        let body = json_body(resp).await;
        assert_eq!(body["error"], "BAD_REQUEST");
        assert!(body["message"].as_str().unwrap().contains("query string"));
    }

    let errors = state.errors().recent(10);
    assert_eq!(errors.len(), 2);
    assert_eq!(errors[1].route, "/api/v1/alerts");
    assert_eq!(errors[1].kind, "BAD_REQUEST");
}

#[tokio::test]
async fn wrong_method_is_json_405_and_logged() {
    let state = state();
    let app = router::build_router(state.clone());

    let req = axum::http::Request::builder()
        .method("POST")
        .uri("/health")
        .body(axum::body::Body::empty())
        .unwrap();
    let resp = send(&app, req).await;
    assert_eq!(resp.status(), StatusCode::METHOD_NOT_ALLOWED);
    assert_eq!(resp.headers()["x-content-type-options"], "nosniff");
    let request_id = resp.headers()["x-request-id"].to_str().unwrap().to_string();
    let body = json_body(resp).await;
    assert_eq!(body["error"], "METHOD_NOT_ALLOWED");
    assert!(body["message"].as_str().unwrap().contains("POST"));

    let errors = state.errors().snapshot();
    assert_eq!(errors.len(), 1);
    assert_eq!(errors[0].request_id, request_id);
    assert_eq!(errors[0].route, "/health");
    assert_eq!(errors[0].status, 405);
    assert_eq!(state.aggregator().sample_count(DURATION_METRIC), 1);
}

#[tokio::test]
async fn evaluate_endpoint_and_alert_log() {
    let app = router::build_router(state());

    let resp = send(
        &app,
        post_json(
            "/api/v1/alerts/evaluate",
            json!({ "metrics": { "memory_percent": 90.0, "cpu_percent": 97.0, "unknown": 1e6 } }),
        ),
    )
    .await;
    assert_eq!(resp.status(), StatusCode::OK);
    let body = json_body(resp).await;
    assert_eq!(body["count"], 2);
    assert_eq!(body["alerts"][0]["metric"], "cpu_percent");
    assert_eq!(body["alerts"][0]["severity"], "critical");
    assert_eq!(body["alerts"][1]["metric"], "memory_percent");
    assert_eq!(body["alerts"][1]["severity"], "warning");

    let resp = send(&app, post_json("/api/v1/alerts/evaluate", json!({ "metrics": { "cpu_percent": 50.0 } }))).await;
    assert_eq!(json_body(resp).await["count"], 0);

    let body = json_body(send(&app, get("/api/v1/alerts?limit=1")).await).await;
    assert_eq!(body["count"], 2);
    assert_eq!(body["capacity"], 100);
    assert_eq!(body["alerts"].as_array().unwrap().len(), 1);
    assert_eq!(body["alerts"][0]["metric"], "memory_percent");
}

#[tokio::test]
async fn periodic_pass_records_host_and_alerts() {
    let state = state();
    let alerts = monitor::evaluate_once(&state).await;

    assert_eq!(alerts.len(), 1);
    assert_eq!(alerts[0].metric, "cpu_percent");
    assert_eq!(state.history().len(), 1);
    assert_eq!(state.aggregator().aggregate("memory_percent", 5).count, 1);
    assert_eq!(
        state.metrics().alerts_emitted.get(&[("metric", "cpu_percent"), ("severity", "critical")]),
        1
    );

    let app = router::build_router(state.clone());
    let body = json_body(send(&app, get("/api/v1/system/history")).await).await;
    assert_eq!(body["count"], 1);
    assert_eq!(body["snapshots"][0]["cpu_percent"], 97.0);
}

#[tokio::test]
async fn periodic_pass_survives_probe_failure() {
    let state = state_with(BrokenCounters);
    let alerts = monitor::evaluate_once(&state).await;
    assert!(alerts.is_empty());
    assert!(state.history().is_empty());
    assert_eq!(state.metrics().host_probe_failures.total(), 1);
}

#[tokio::test]
async fn thresholds_are_exposed() {
    let app = router::build_router(state());
    let body = json_body(send(&app, get("/api/v1/thresholds")).await).await;
    assert_eq!(body["critical_ratio"], 1.2);
    assert_eq!(body["thresholds"]["disk_percent"], 90.0);
}
