//! Shared fixtures for HTTP-level tests.

#![allow(clippy::unwrap_used)]
#![allow(clippy::expect_used)]
#![allow(clippy::panic)]
#![allow(dead_code)]

use axum::{
    body::{to_bytes, Body},
    http::{Request, Response},
    Router,
};
use serde_json::Value;
use tower::ServiceExt;

use vigil_core::error::{Result, VigilError};
use vigil_gateway::app_state::AppState;
use vigil_gateway::config::VigilConfig;
use vigil_gateway::host::{HostCounters, HostProbe, RawCounters};

pub struct FixedCounters(pub RawCounters);

impl HostCounters for FixedCounters {
    fn read(&self) -> Result<RawCounters> {
        Ok(self.0)
    }
}

pub struct BrokenCounters;

impl HostCounters for BrokenCounters {
    fn read(&self) -> Result<RawCounters> {
        Err(VigilError::Unavailable("counters unreadable".into()))
    }
}

pub fn busy_host() -> RawCounters {
    RawCounters {
        cpu_percent: Some(97.0),
        memory_used: 50,
        memory_total: 100,
        disk_used: 10,
        disk_total: 100,
    }
}

pub fn state_with(counters: impl HostCounters + 'static) -> AppState {
    let mut cfg = VigilConfig::default();
    cfg.server.environment = "test".into();
    cfg.monitoring.evaluation_interval_secs = 0;
    AppState::with_probe(cfg, HostProbe::new(Box::new(counters))).unwrap()
}

pub fn state() -> AppState {
    state_with(FixedCounters(busy_host()))
}

pub async fn send(app: &Router, req: Request<Body>) -> Response<Body> {
    app.clone().oneshot(req).await.unwrap()
}

pub fn get(uri: &str) -> Request<Body> {
    Request::builder().uri(uri).body(Body::empty()).unwrap()
}

pub fn post_json(uri: &str, body: Value) -> Request<Body> {
    Request::builder()
        .method("POST")
        .uri(uri)
        .header("content-type", "application/json")
        .body(Body::from(body.to_string()))
        .unwrap()
}

pub async fn json_body(resp: Response<Body>) -> Value {
    let bytes = to_bytes(resp.into_body(), usize::MAX).await.unwrap();
    serde_json::from_slice(&bytes).unwrap()
}

pub async fn text_body(resp: Response<Body>) -> String {
    let bytes = to_bytes(resp.into_body(), usize::MAX).await.unwrap();
    String::from_utf8(bytes.to_vec()).unwrap()
}
