//! Configuration error types.

use thiserror::Error;

/// Result type alias for configuration validation.
pub type ConfigResult<T> = Result<T, ConfigError>;

/// Errors raised while building a watchdog configuration.
///
/// A watchdog is never constructed from a config that fails validation.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("latency_threshold must be a positive number, got {0}")]
    InvalidLatencyThreshold(f64),

    #[error("latency_restored_threshold must not be negative, got {0}")]
    InvalidRestoredThreshold(f64),

    #[error("latency_restored_threshold ({restored}) must not exceed latency_threshold ({threshold})")]
    RestoredAboveThreshold { restored: f64, threshold: f64 },

    #[error("poll_interval must be a positive number of seconds, got {0}")]
    InvalidPollInterval(f64),

    #[error("alert_interval must not be negative, got {0}")]
    InvalidAlertInterval(f64),

    #[error("invalid hostname_regex: {0}")]
    InvalidHostnameRegex(#[from] regex::Error),

    #[error("failed to parse config: {0}")]
    Parse(#[from] toml::de::Error),

    #[error("failed to read config: {0}")]
    Io(#[from] std::io::Error),
}
