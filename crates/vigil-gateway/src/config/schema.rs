use std::collections::BTreeMap;
use std::fmt;
use std::net::SocketAddr;

use serde::Deserialize;
use vigil_core::error::{Result, VigilError};

pub const CONFIG_VERSION: u32 = 1;

#[derive(Debug, Clone, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct VigilConfig {
    pub version: u32,

    #[serde(default)]
    pub server: ServerSection,

    #[serde(default)]
    pub monitoring: MonitoringSection,

    #[serde(default = "default_thresholds")]
    pub thresholds: BTreeMap<String, f64>,

    #[serde(default)]
    pub logging: LoggingSection,
}

impl Default for VigilConfig {
    fn default() -> Self {
        Self {
            version: CONFIG_VERSION,
            server: ServerSection::default(),
            monitoring: MonitoringSection::default(),
            thresholds: default_thresholds(),
            logging: LoggingSection::default(),
        }
    }
}

impl VigilConfig {
    pub fn validate(&self) -> Result<()> {
        if self.version != CONFIG_VERSION {
            return Err(VigilError::UnsupportedVersion);
        }

        self.server.validate()?;
        self.monitoring.validate()?;

        for (name, limit) in &self.thresholds {
            if name.trim().is_empty() {
                return Err(VigilError::BadRequest("thresholds: metric name must not be empty".into()));
            }
            if !limit.is_finite() || *limit <= 0.0 {
                return Err(VigilError::BadRequest(format!(
                    "thresholds.{name} must be a positive finite number"
                )));
            }
        }

        Ok(())
    }

    pub fn listen_addr(&self) -> Result<SocketAddr> {
        self.server
            .listen
            .parse()
            .map_err(|e| VigilError::BadRequest(format!("server.listen must be a valid SocketAddr: {e}")))
    }
}

/// String that never shows up in `Debug` output.
#[derive(Clone, Default, Deserialize, PartialEq, Eq)]
#[serde(transparent)]
pub struct Redacted(String);

impl Redacted {
    pub fn new(s: impl Into<String>) -> Self {
        Self(s.into())
    }

    pub fn expose(&self) -> &str {
        &self.0
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

impl fmt::Debug for Redacted {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.0.is_empty() {
            f.write_str("\"\"")
        } else {
            f.write_str("\"***\"")
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct ServerSection {
    #[serde(default = "default_listen")]
    pub listen: String,

    #[serde(default = "default_environment")]
    pub environment: String,

    #[serde(default = "default_version")]
    pub version: String,

    /// Allowed CORS origins; `*` allows any, empty disables CORS headers.
    #[serde(default)]
    pub cors_origins: Vec<String>,

    #[serde(default)]
    pub secret_key: Redacted,

    #[serde(default = "default_database_url")]
    pub database_url: Redacted,
}

impl Default for ServerSection {
    fn default() -> Self {
        Self {
            listen: default_listen(),
            environment: default_environment(),
            version: default_version(),
            cors_origins: Vec::new(),
            secret_key: Redacted::default(),
            database_url: default_database_url(),
        }
    }
}

impl ServerSection {
    pub fn validate(&self) -> Result<()> {
        self.listen
            .parse::<SocketAddr>()
            .map_err(|e| VigilError::BadRequest(format!("server.listen must be a valid SocketAddr: {e}")))?;
        if self.environment.trim().is_empty() {
            return Err(VigilError::BadRequest("server.environment must not be empty".into()));
        }
        Ok(())
    }

    /// URL scheme of `database_url`, safe to log (`"unset"` when empty).
    pub fn database_scheme(&self) -> &str {
        if self.database_url.is_empty() {
            return "unset";
        }
        match self.database_url.expose().split_once("://") {
            Some((scheme, _)) if !scheme.is_empty() => scheme,
            _ => "unknown",
        }
    }

    /// Credential problems worth a startup warning. Never includes the values.
    pub fn credential_warnings(&self) -> Vec<String> {
        let mut out = Vec::new();
        if self.secret_key.is_empty() && self.environment != DEVELOPMENT {
            out.push(format!("SECRET_KEY is not set in the {} environment", self.environment));
        }
        if self.database_url.is_empty() {
            out.push("DATABASE_URL is empty".to_string());
        }
        out
    }
}

fn default_listen() -> String {
    "0.0.0.0:8080".into()
}
const DEVELOPMENT: &str = "development";

fn default_environment() -> String {
    DEVELOPMENT.into()
}
fn default_version() -> String {
    env!("CARGO_PKG_VERSION").into()
}
fn default_database_url() -> Redacted {
    Redacted::new("sqlite:///app.db")
}

#[derive(Debug, Clone, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct MonitoringSection {
    #[serde(default = "default_retention_hours")]
    pub retention_hours: u64,

    #[serde(default = "default_cleanup_interval_minutes")]
    pub cleanup_interval_minutes: u64,

    /// Period of the background threshold evaluation; 0 disables it.
    #[serde(default = "default_evaluation_interval_secs")]
    pub evaluation_interval_secs: u64,

    #[serde(default = "default_window_minutes")]
    pub default_window_minutes: u64,

    #[serde(default = "default_capacity")]
    pub notification_capacity: usize,

    #[serde(default = "default_capacity")]
    pub error_capacity: usize,

    #[serde(default = "default_capacity")]
    pub history_capacity: usize,
}

impl Default for MonitoringSection {
    fn default() -> Self {
        Self {
            retention_hours: default_retention_hours(),
            cleanup_interval_minutes: default_cleanup_interval_minutes(),
            evaluation_interval_secs: default_evaluation_interval_secs(),
            default_window_minutes: default_window_minutes(),
            notification_capacity: default_capacity(),
            error_capacity: default_capacity(),
            history_capacity: default_capacity(),
        }
    }
}

const MAX_CAPACITY: usize = 100_000;

impl MonitoringSection {
    pub fn validate(&self) -> Result<()> {
        if !(1..=24 * 365).contains(&self.retention_hours) {
            return Err(VigilError::BadRequest(
                "monitoring.retention_hours must be between 1 and 8760".into(),
            ));
        }
        if !(1..=24 * 60).contains(&self.cleanup_interval_minutes) {
            return Err(VigilError::BadRequest(
                "monitoring.cleanup_interval_minutes must be between 1 and 1440".into(),
            ));
        }
        if self.evaluation_interval_secs > 86_400 {
            return Err(VigilError::BadRequest(
                "monitoring.evaluation_interval_secs must be at most 86400".into(),
            ));
        }
        if self.default_window_minutes == 0 || self.default_window_minutes > self.retention_hours * 60 {
            return Err(VigilError::BadRequest(
                "monitoring.default_window_minutes must be between 1 and the retention period".into(),
            ));
        }
        for (field, cap) in [
            ("notification_capacity", self.notification_capacity),
            ("error_capacity", self.error_capacity),
            ("history_capacity", self.history_capacity),
        ] {
            if !(1..=MAX_CAPACITY).contains(&cap) {
                return Err(VigilError::BadRequest(format!(
                    "monitoring.{field} must be between 1 and {MAX_CAPACITY}"
                )));
            }
        }
        Ok(())
    }
}

fn default_retention_hours() -> u64 {
    24
}
fn default_cleanup_interval_minutes() -> u64 {
    60
}
fn default_evaluation_interval_secs() -> u64 {
    60
}
fn default_window_minutes() -> u64 {
    5
}
fn default_capacity() -> usize {
    100
}

fn default_thresholds() -> BTreeMap<String, f64> {
    [
        ("cpu_percent", 80.0),
        ("memory_percent", 85.0),
        ("disk_percent", 90.0),
        ("request_duration_ms", 1000.0),
    ]
    .into_iter()
    .map(|(k, v)| (k.to_string(), v))
    .collect()
}

#[derive(Debug, Clone, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct LoggingSection {
    /// `EnvFilter` directive used when `RUST_LOG` is unset.
    #[serde(default = "default_log_level")]
    pub level: String,

    #[serde(default)]
    pub json: bool,
}

impl Default for LoggingSection {
    fn default() -> Self {
        Self {
            level: default_log_level(),
            json: false,
        }
    }
}

fn default_log_level() -> String {
    "info".into()
}
