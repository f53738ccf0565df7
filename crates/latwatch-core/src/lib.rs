//! latwatch-core — shared types for the queue-latency watchdog.
//!
//! Holds the per-poll data model (`QueueSnapshot`, `HighLatencyQueues`,
//! `EpisodeContext`), validated `Thresholds`, and the `WatchdogConfig`
//! parsed from TOML.

pub mod config;
pub mod error;
pub mod types;

pub use config::{BuiltinHandler, WatchdogConfig};
pub use error::{ConfigError, ConfigResult};
pub use types::*;
