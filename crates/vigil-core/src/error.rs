//! Shared error type across Vigil crates.

use thiserror::Error;

/// Client-facing error codes (stable API).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ClientCode {
    /// Invalid input / malformed request.
    BadRequest,
    /// Requested resource does not exist.
    NotFound,
    /// Route exists but not for this HTTP method.
    MethodNotAllowed,
    /// A dependency (host counters, upstream) could not be read.
    Unavailable,
    /// Unsupported config version.
    UnsupportedVersion,
    /// Internal server error.
    Internal,
}

impl ClientCode {
    /// String representation used in JSON responses.
    pub fn as_str(self) -> &'static str {
        match self {
            ClientCode::BadRequest => "BAD_REQUEST",
            ClientCode::NotFound => "NOT_FOUND",
            ClientCode::MethodNotAllowed => "METHOD_NOT_ALLOWED",
            ClientCode::Unavailable => "UNAVAILABLE",
            ClientCode::UnsupportedVersion => "UNSUPPORTED_VERSION",
            ClientCode::Internal => "INTERNAL",
        }
    }
}

/// Shared result type.
pub type Result<T> = std::result::Result<T, VigilError>;

/// Unified error type used by core and gateway.
#[derive(Debug, Error)]
pub enum VigilError {
    #[error("bad request: {0}")]
    BadRequest(String),
    #[error("not found: {0}")]
    NotFound(String),
    #[error("method not allowed: {0}")]
    MethodNotAllowed(String),
    #[error("unavailable: {0}")]
    Unavailable(String),
    #[error("unsupported config version")]
    UnsupportedVersion,
    #[error("internal: {0}")]
    Internal(String),
}

impl VigilError {
    /// Map internal error to a stable client-facing code.
    pub fn client_code(&self) -> ClientCode {
        match self {
            VigilError::BadRequest(_) => ClientCode::BadRequest,
            VigilError::NotFound(_) => ClientCode::NotFound,
            VigilError::MethodNotAllowed(_) => ClientCode::MethodNotAllowed,
            VigilError::Unavailable(_) => ClientCode::Unavailable,
            VigilError::UnsupportedVersion => ClientCode::UnsupportedVersion,
            VigilError::Internal(_) => ClientCode::Internal,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn client_codes_are_stable() {
        assert_eq!(VigilError::NotFound("x".into()).client_code().as_str(), "NOT_FOUND");
        assert_eq!(VigilError::Unavailable("disk".into()).client_code().as_str(), "UNAVAILABLE");
        assert_eq!(
            VigilError::MethodNotAllowed("POST /health".into()).client_code().as_str(),
            "METHOD_NOT_ALLOWED"
        );
        assert_eq!(VigilError::UnsupportedVersion.client_code().as_str(), "UNSUPPORTED_VERSION");
    }
}
