//! Client side of the health-check CLI.

use std::time::Duration;

use serde_json::Value;
use vigil_core::error::{Result, VigilError};

/// Outcome of probing a running service.
#[derive(Debug, Clone)]
pub struct HealthReport {
    pub http_status: u16,
    pub body: Value,
}

impl HealthReport {
    pub fn is_healthy(&self) -> bool {
        is_healthy(self.http_status, &self.body)
    }
}

/// Healthy means HTTP 200 and `{"status": "healthy"}`.
pub fn is_healthy(http_status: u16, body: &Value) -> bool {
    http_status == 200 && body.get("status").and_then(Value::as_str) == Some("healthy")
}

/// Join a base URL and a path without doubling or dropping the slash.
pub fn health_url(base: &str, path: &str) -> String {
    format!("{}/{}", base.trim_end_matches('/'), path.trim_start_matches('/'))
}

pub async fn check(url: &str, timeout: Duration) -> Result<HealthReport> {
    let client = reqwest::Client::builder()
        .timeout(timeout)
        .build()
        .map_err(|e| VigilError::Internal(format!("http client: {e}")))?;

    let resp = client
        .get(url)
        .send()
        .await
        .map_err(|e| VigilError::Unavailable(format!("GET {url}: {e}")))?;
    let http_status = resp.status().as_u16();
    let body = resp.json::<Value>().await.unwrap_or(Value::Null);

    Ok(HealthReport { http_status, body })
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn healthy_needs_status_and_body() {
        assert!(is_healthy(200, &json!({"status": "healthy"})));
        assert!(!is_healthy(503, &json!({"status": "healthy"})));
        assert!(!is_healthy(200, &json!({"status": "degraded"})));
        assert!(!is_healthy(200, &Value::Null));
    }

    #[test]
    fn url_join() {
        assert_eq!(health_url("http://localhost:8080/", "/health"), "http://localhost:8080/health");
        assert_eq!(health_url("http://localhost:8080", "health"), "http://localhost:8080/health");
    }

    #[tokio::test]
    async fn unreachable_service_is_an_error() {
        let r = check("http://127.0.0.1:1/health", Duration::from_millis(500)).await;
        assert!(r.is_err());
    }
}
