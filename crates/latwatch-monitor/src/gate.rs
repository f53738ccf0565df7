//! Host gate: decides whether this process should monitor at all.
//!
//! In a fleet of identical workers only one process should poll. The gate
//! matches `hostname_regex` against an instance identifier taken from the
//! environment (a dyno or node name), falling back to the hostname.

use regex::Regex;
use tracing::debug;

use latwatch_core::{ConfigResult, WatchdogConfig};

#[derive(Debug, Clone)]
pub struct HostGate {
    pattern: Regex,
    env_var: String,
}

impl HostGate {
    /// Create a gate matching `pattern` against `env_var` or the hostname.
    pub fn new(pattern: Regex, env_var: impl Into<String>) -> Self {
        Self {
            pattern,
            env_var: env_var.into(),
        }
    }

    /// Build the gate from `hostname_regex` and `instance_env_var`.
    pub fn from_config(config: &WatchdogConfig) -> ConfigResult<Self> {
        Ok(Self::new(
            config.hostname_regex()?,
            config.instance_env_var.clone(),
        ))
    }

    /// Identifier for this process: the env var when set and non-empty,
    /// else the machine hostname. Re-read on every call.
    pub fn resolve_identifier(&self) -> Option<String> {
        self.resolve_with(
            |name| std::env::var(name).ok(),
            || hostname::get().ok().and_then(|h| h.into_string().ok()),
        )
    }

    /// Resolve with injected lookups.
    pub fn resolve_with(
        &self,
        env: impl FnOnce(&str) -> Option<String>,
        hostname: impl FnOnce() -> Option<String>,
    ) -> Option<String> {
        env(&self.env_var)
            .filter(|v| !v.is_empty())
            .or_else(hostname)
    }

    /// Whether `identifier` matches the pattern.
    pub fn matches(&self, identifier: &str) -> bool {
        self.pattern.is_match(identifier)
    }

    /// Evaluate the gate against the live environment.
    pub fn is_match(&self) -> bool {
        match self.resolve_identifier() {
            Some(identifier) => {
                let matched = self.matches(&identifier);
                debug!(%identifier, pattern = %self.pattern, matched, "host gate evaluated");
                matched
            }
            None => {
                debug!(env_var = %self.env_var, "no instance identifier or hostname available");
                false
            }
        }
    }

    /// Environment variable consulted before the hostname.
    pub fn env_var(&self) -> &str {
        &self.env_var
    }
}
