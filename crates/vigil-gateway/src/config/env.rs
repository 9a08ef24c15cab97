//! Environment variable overrides.

use super::schema::{Redacted, VigilConfig};

pub const PORT: &str = "PORT";
pub const SECRET_KEY: &str = "SECRET_KEY";
pub const DATABASE_URL: &str = "DATABASE_URL";
pub const APP_ENV: &str = "APP_ENV";
/// Older deployments set this instead of `APP_ENV`.
pub const FLASK_ENV: &str = "FLASK_ENV";
pub const CORS_ORIGINS: &str = "CORS_ORIGINS";
pub const LOG_LEVEL: &str = "LOG_LEVEL";

/// Apply every recognised override found through `lookup`.
/// Unparseable values are skipped and reported in the returned warnings.
pub fn apply_overrides(cfg: &mut VigilConfig, lookup: &dyn Fn(&str) -> Option<String>) -> Vec<String> {
    let mut warnings = Vec::new();
    let get = |key: &str| lookup(key).map(|v| v.trim().to_string()).filter(|v| !v.is_empty());

    if let Some(port) = get(PORT) {
        match port.parse::<u16>() {
            Ok(port) => cfg.server.listen = with_port(&cfg.server.listen, port),
            Err(_) => warnings.push(format!("ignoring {PORT}={port}: not a valid port")),
        }
    }

    if let Some(key) = get(SECRET_KEY) {
        cfg.server.secret_key = Redacted::new(key);
    }

    if let Some(url) = get(DATABASE_URL) {
        cfg.server.database_url = Redacted::new(url);
    }

    if let Some(env) = get(APP_ENV).or_else(|| get(FLASK_ENV)) {
        cfg.server.environment = env;
    }

    if let Some(origins) = get(CORS_ORIGINS) {
        cfg.server.cors_origins = origins
            .split(',')
            .map(str::trim)
            .filter(|o| !o.is_empty())
            .map(str::to_string)
            .collect();
    }

    if let Some(level) = get(LOG_LEVEL) {
        cfg.logging.level = level.to_lowercase();
    }

    warnings
}

/// Replace the port of a `host:port` listen string, keeping the host.
fn with_port(listen: &str, port: u16) -> String {
    match listen.rsplit_once(':') {
        Some((host, _)) => format!("{host}:{port}"),
        None => format!("0.0.0.0:{port}"),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn lookup(pairs: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let map: HashMap<String, String> = pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        move |k| map.get(k).cloned()
    }

    #[test]
    fn port_keeps_host() {
        assert_eq!(with_port("127.0.0.1:8080", 9000), "127.0.0.1:9000");
        assert_eq!(with_port("[::1]:8080", 9000), "[::1]:9000");
    }

    #[test]
    fn overrides_apply() {
        let mut cfg = VigilConfig::default();
        let warnings = apply_overrides(
            &mut cfg,
            &lookup(&[
                (PORT, "9100"),
                (FLASK_ENV, "production"),
                (CORS_ORIGINS, "https://a.example, https://b.example,"),
                (LOG_LEVEL, "DEBUG"),
                (SECRET_KEY, "s3cret"),
            ]),
        );
        assert!(warnings.is_empty());
        assert_eq!(cfg.server.listen, "0.0.0.0:9100");
        assert_eq!(cfg.server.environment, "production");
        assert_eq!(cfg.server.cors_origins, vec!["https://a.example", "https://b.example"]);
        assert_eq!(cfg.logging.level, "debug");
        assert_eq!(cfg.server.secret_key.expose(), "s3cret");
        assert!(!format!("{:?}", cfg.server).contains("s3cret"));
    }

    #[test]
    fn app_env_wins_over_flask_env() {
        let mut cfg = VigilConfig::default();
        apply_overrides(&mut cfg, &lookup(&[(APP_ENV, "staging"), (FLASK_ENV, "production")]));
        assert_eq!(cfg.server.environment, "staging");
    }

    #[test]
    fn bad_port_is_reported_not_applied() {
        let mut cfg = VigilConfig::default();
        let warnings = apply_overrides(&mut cfg, &lookup(&[(PORT, "http")]));
        assert_eq!(warnings.len(), 1);
        assert_eq!(cfg.server.listen, "0.0.0.0:8080");
    }
}
