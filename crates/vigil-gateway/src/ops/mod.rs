//! Operational HTTP endpoints.
//!
//! - `/health`, `/api/health`, `/api/v1/health` : liveness + build info
//! - `/metrics` : Prometheus text format
//! - fallbacks : JSON 404 for unknown paths, JSON 405 for a known path with
//!   the wrong method

pub mod monitoring;

use axum::{
    extract::State,
    http::{header, Method, StatusCode, Uri},
    response::{IntoResponse, Response},
    Json,
};
use chrono::{DateTime, Utc};
use serde::Serialize;

use crate::app_state::AppState;
use crate::error::ApiError;

#[derive(Debug, Serialize)]
pub struct HealthBody {
    pub status: &'static str,
    pub timestamp: DateTime<Utc>,
    pub environment: String,
    pub version: String,
}

pub async fn health(State(state): State<AppState>) -> Json<HealthBody> {
    let server = &state.cfg().server;
    Json(HealthBody {
        status: "healthy",
        timestamp: Utc::now(),
        environment: server.environment.clone(),
        version: server.version.clone(),
    })
}

pub async fn metrics(State(state): State<AppState>) -> Response {
    let extra = state.metrics_extra();
    let body = state.metrics().render(&extra);

    (
        StatusCode::OK,
        [(header::CONTENT_TYPE, "text/plain; version=0.0.4; charset=utf-8")],
        body,
    )
        .into_response()
}

pub async fn not_found() -> ApiError {
    ApiError::not_found("no such route; see /health for service status")
}

pub async fn method_not_allowed(method: Method, uri: Uri) -> ApiError {
    ApiError::method_not_allowed(format!("{method} is not supported on {}", uri.path()))
}
