//! Watchdog error types.

use thiserror::Error;

use latwatch_core::ConfigError;

/// Errors surfaced by watchdog construction and by a single check.
#[derive(Debug, Error)]
pub enum WatchdogError {
    #[error("invalid configuration: {0}")]
    Config(#[from] ConfigError),

    #[error("latency source setup failed: {0:#}")]
    Setup(#[source] anyhow::Error),

    #[error("latency source failed: {0:#}")]
    Source(#[source] anyhow::Error),

    #[error("handler #{index} failed: {source:#}")]
    Handler {
        index: usize,
        #[source]
        source: anyhow::Error,
    },
}

pub type WatchdogResult<T> = Result<T, WatchdogError>;
