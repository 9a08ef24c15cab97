//! Service config loader (strict YAML, then environment overrides).
//!
//! Startup never aborts on configuration: a missing or invalid file, or
//! overrides that leave the config invalid, fall back to
//! `VigilConfig::default()`. The reasons are returned as warnings so they
//! can be logged once the subscriber is installed.

pub mod env;
pub mod schema;

use std::fs;

use vigil_core::error::{Result, VigilError};

pub use schema::{LoggingSection, MonitoringSection, Redacted, ServerSection, VigilConfig};

/// Env var naming the config file.
pub const CONFIG_PATH_VAR: &str = "VIGIL_CONFIG";
pub const DEFAULT_CONFIG_PATH: &str = "vigil.yaml";

pub fn load_from_file(path: &str) -> Result<VigilConfig> {
    let s = fs::read_to_string(path)
        .map_err(|e| VigilError::Internal(format!("read config failed ({path}): {e}")))?;
    load_from_str(&s)
}

pub fn load_from_str(s: &str) -> Result<VigilConfig> {
    let cfg: VigilConfig = serde_yaml::from_str(s)
        .map_err(|e| VigilError::BadRequest(format!("invalid yaml: {e}")))?;
    cfg.validate()?;
    Ok(cfg)
}

/// Result of a fault-tolerant load.
#[derive(Debug)]
pub struct Loaded {
    pub config: VigilConfig,
    pub warnings: Vec<String>,
}

/// Load `path`, apply environment overrides, and fall back to defaults on
/// any failure.
pub fn load_or_default(path: &str, lookup: &dyn Fn(&str) -> Option<String>) -> Loaded {
    let mut warnings = Vec::new();

    let mut config = match load_from_file(path) {
        Ok(cfg) => cfg,
        Err(e) => {
            warnings.push(format!("config load failed, using defaults: {e}"));
            VigilConfig::default()
        }
    };

    warnings.extend(env::apply_overrides(&mut config, lookup));

    if let Err(e) = config.validate() {
        warnings.push(format!("config invalid after env overrides, using defaults: {e}"));
        config = VigilConfig::default();
    }

    Loaded { config, warnings }
}
