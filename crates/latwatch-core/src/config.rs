//! Watchdog configuration, loadable from TOML.

use std::path::Path;
use std::time::Duration;

use regex::Regex;
use serde::{Deserialize, Serialize};

use crate::error::{ConfigError, ConfigResult};
use crate::types::Thresholds;

/// Named handlers that can be enabled from a config file.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum BuiltinHandler {
    /// Structured log record per alert and restore.
    Log,
    /// Non-fatal event submitted to an error-reporting collaborator.
    ErrorReport,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct WatchdogConfig {
    /// Seconds between checks.
    pub poll_interval: f64,
    /// Latency (seconds) above which a queue is high.
    pub latency_threshold: f64,
    /// Latency (seconds) at or below which a high queue is recovered.
    pub latency_restored_threshold: Option<f64>,
    /// Minimum seconds between two alert dispatches. Zero disables suppression.
    pub alert_interval: f64,
    /// Pattern matched against the instance identifier or hostname.
    pub hostname_regex: String,
    /// Environment variable holding the instance identifier.
    pub instance_env_var: String,
    pub handlers: Vec<BuiltinHandler>,
}

impl Default for WatchdogConfig {
    fn default() -> Self {
        Self {
            poll_interval: 5.0,
            latency_threshold: 10.0,
            latency_restored_threshold: None,
            alert_interval: 60.0,
            hostname_regex: ".*".to_string(),
            instance_env_var: "DYNO".to_string(),
            handlers: vec![BuiltinHandler::Log],
        }
    }
}

impl WatchdogConfig {
    /// Load and validate a TOML file.
    pub fn from_file(path: &Path) -> ConfigResult<Self> {
        let content = std::fs::read_to_string(path)?;
        Self::from_toml_str(&content)
    }

    /// Parse and validate a TOML document.
    pub fn from_toml_str(content: &str) -> ConfigResult<Self> {
        let config: WatchdogConfig = toml::from_str(content)?;
        config.validate()?;
        Ok(config)
    }

    /// Check every field, returning the first violation.
    pub fn validate(&self) -> ConfigResult<()> {
        self.thresholds()?;
        self.poll_interval()?;
        self.alert_interval()?;
        self.hostname_regex()?;
        Ok(())
    }

    /// Validated trip and restore thresholds.
    pub fn thresholds(&self) -> ConfigResult<Thresholds> {
        Thresholds::new(self.latency_threshold, self.latency_restored_threshold)
    }

    /// Poll interval as a `Duration`. Must be positive and representable.
    pub fn poll_interval(&self) -> ConfigResult<Duration> {
        let secs = self.poll_interval;
        if secs <= 0.0 {
            return Err(ConfigError::InvalidPollInterval(secs));
        }
        Duration::try_from_secs_f64(secs).map_err(|_| ConfigError::InvalidPollInterval(secs))
    }

    /// Alert interval as a `Duration`. Zero is allowed.
    pub fn alert_interval(&self) -> ConfigResult<Duration> {
        let secs = self.alert_interval;
        Duration::try_from_secs_f64(secs).map_err(|_| ConfigError::InvalidAlertInterval(secs))
    }

    /// Compiled `hostname_regex`.
    pub fn hostname_regex(&self) -> ConfigResult<Regex> {
        Ok(Regex::new(&self.hostname_regex)?)
    }
}
