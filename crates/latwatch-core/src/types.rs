//! Domain types for the latency watchdog.
//!
//! A `QueueSnapshot` is produced fresh on every poll; nothing here carries
//! identity across polls beyond the queue name.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use crate::error::{ConfigError, ConfigResult};

/// Wait latency of a single queue, in seconds of oldest-job wait.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct QueueLatency {
    pub name: String,
    pub latency: f64,
}

impl QueueLatency {
    pub fn new(name: impl Into<String>, latency: f64) -> Self {
        Self {
            name: name.into(),
            latency,
        }
    }
}

/// Ordered list of queues as returned by a latency source for one poll.
pub type QueueSnapshot = Vec<QueueLatency>;

/// Queue name → latency for queues currently above the latency threshold.
///
/// Keyed and iterated in name order, so handlers and reports see queues
/// sorted alphabetically rather than in snapshot order.
pub type HighLatencyQueues = BTreeMap<String, f64>;

/// Keyword context attached to alert and restored events.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct EpisodeContext {
    /// Number of polls with at least one high-latency queue in this episode.
    pub depth: u32,
    /// Seconds elapsed since the episode began.
    pub duration: f64,
}

impl EpisodeContext {
    pub fn new(depth: u32, duration: f64) -> Self {
        Self { depth, duration }
    }
}

/// Trip and restore thresholds, in seconds.
///
/// Always satisfies `0 <= latency_restored_threshold <= latency_threshold`
/// and `latency_threshold > 0`; the only constructor enforces it.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Thresholds {
    latency_threshold: f64,
    latency_restored_threshold: f64,
}

impl Thresholds {
    /// Validate and build thresholds. The restored threshold defaults to
    /// the latency threshold when omitted.
    pub fn new(latency_threshold: f64, latency_restored_threshold: Option<f64>) -> ConfigResult<Self> {
        if !latency_threshold.is_finite() || latency_threshold <= 0.0 {
            return Err(ConfigError::InvalidLatencyThreshold(latency_threshold));
        }

        let restored = latency_restored_threshold.unwrap_or(latency_threshold);
        if restored.is_nan() || restored < 0.0 {
            return Err(ConfigError::InvalidRestoredThreshold(restored));
        }
        if restored > latency_threshold {
            return Err(ConfigError::RestoredAboveThreshold {
                restored,
                threshold: latency_threshold,
            });
        }

        Ok(Self {
            latency_threshold,
            latency_restored_threshold: restored,
        })
    }

    /// Latency above which a queue counts as high.
    pub fn latency_threshold(&self) -> f64 {
        self.latency_threshold
    }

    /// Latency at or below which a previously high queue counts as recovered.
    pub fn latency_restored_threshold(&self) -> f64 {
        self.latency_restored_threshold
    }
}
