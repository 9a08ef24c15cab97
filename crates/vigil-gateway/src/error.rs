//! HTTP mapping of `VigilError`.
//!
//! Every error response carries a `HandlerFailure` extension so the request
//! interceptor can log the failure under the request id before the response
//! leaves the service.

use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde_json::json;
use vigil_core::error::{ClientCode, VigilError};

pub type ApiResult<T> = std::result::Result<T, ApiError>;

#[derive(Debug)]
pub struct ApiError(pub VigilError);

impl From<VigilError> for ApiError {
    fn from(e: VigilError) -> Self {
        Self(e)
    }
}

impl ApiError {
    pub fn bad_request(msg: impl Into<String>) -> Self {
        Self(VigilError::BadRequest(msg.into()))
    }

    pub fn not_found(msg: impl Into<String>) -> Self {
        Self(VigilError::NotFound(msg.into()))
    }

    pub fn method_not_allowed(msg: impl Into<String>) -> Self {
        Self(VigilError::MethodNotAllowed(msg.into()))
    }

    pub fn status(&self) -> StatusCode {
        match self.0.client_code() {
            ClientCode::BadRequest => StatusCode::BAD_REQUEST,
            ClientCode::NotFound => StatusCode::NOT_FOUND,
            ClientCode::MethodNotAllowed => StatusCode::METHOD_NOT_ALLOWED,
            ClientCode::Unavailable => StatusCode::SERVICE_UNAVAILABLE,
            ClientCode::UnsupportedVersion | ClientCode::Internal => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

/// Marker left on error responses for the interceptor.
#[derive(Debug, Clone)]
pub struct HandlerFailure {
    pub kind: &'static str,
    pub message: String,
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = self.status();
        let code = self.0.client_code().as_str();
        let message = self.0.to_string();

        let mut response = (
            status,
            Json(json!({
                "error": code,
                "message": message,
            })),
        )
            .into_response();
        response.extensions_mut().insert(HandlerFailure { kind: code, message });
        response
    }
}
