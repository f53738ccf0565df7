//! Daemon config file: watchdog keys plus source and webhook tables.
//!
//! Watchdog keys sit at the top level; `[source]` and `[webhook]` are split
//! off before the remainder is handed to `WatchdogConfig`, so unknown keys
//! are rejected everywhere.

use std::path::{Path, PathBuf};
use std::time::Duration;

use anyhow::Context;
use serde::Deserialize;

use latwatch_core::WatchdogConfig;

#[derive(Debug, Clone)]
pub struct DaemonConfig {
    pub watchdog: WatchdogConfig,
    pub source: SourceConfig,
    pub webhook: Option<WebhookConfig>,
}

/// Where queue latencies are read from on each poll.
#[derive(Debug, Clone, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct SourceConfig {
    /// JSON file holding `[{"name": ..., "latency": ...}]`.
    pub path: PathBuf,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct WebhookConfig {
    /// `http://host:port/path` receiving error reports as JSON.
    pub url: String,
    /// Request timeout in seconds.
    #[serde(default = "default_webhook_timeout")]
    pub timeout: f64,
}

fn default_webhook_timeout() -> f64 {
    5.0
}

impl WebhookConfig {
    /// Request timeout as a `Duration`. Must be positive and representable.
    pub fn timeout(&self) -> anyhow::Result<Duration> {
        if self.timeout <= 0.0 {
            anyhow::bail!(
                "webhook.timeout must be a positive number of seconds, got {}",
                self.timeout
            );
        }
        Duration::try_from_secs_f64(self.timeout)
            .with_context(|| format!("webhook.timeout {} is out of range", self.timeout))
    }
}

impl DaemonConfig {
    pub fn from_file(path: &Path) -> anyhow::Result<Self> {
        let content = std::fs::read_to_string(path)
            .with_context(|| format!("failed to read {}", path.display()))?;
        Self::from_toml_str(&content)
    }

    pub fn from_toml_str(content: &str) -> anyhow::Result<Self> {
        let mut table: toml::Table = toml::from_str(content).context("invalid config file")?;

        let source: SourceConfig = table
            .remove("source")
            .context("missing [source] table")?
            .try_into()
            .context("invalid [source] table")?;
        let webhook: Option<WebhookConfig> = table
            .remove("webhook")
            .map(|value| value.try_into())
            .transpose()
            .context("invalid [webhook] table")?;
        let watchdog: WatchdogConfig = toml::Value::Table(table)
            .try_into()
            .context("invalid watchdog settings")?;

        watchdog.validate()?;
        if let Some(webhook) = &webhook {
            webhook.timeout()?;
        }
        Ok(Self {
            watchdog,
            source,
            webhook,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use latwatch_core::BuiltinHandler;

    #[test]
    fn parse_daemon_config() {
        let config = DaemonConfig::from_toml_str(
            r#"
poll_interval = 10
latency_threshold = 30.0
latency_restored_threshold = 15.0
handlers = ["log", "error_report"]

[source]
path = "/var/run/queues.json"

[webhook]
url = "http://127.0.0.1:9000/alerts"
"#,
        )
        .unwrap();

        assert_eq!(config.watchdog.poll_interval, 10.0);
        assert_eq!(config.watchdog.latency_restored_threshold, Some(15.0));
        assert_eq!(
            config.watchdog.handlers,
            vec![BuiltinHandler::Log, BuiltinHandler::ErrorReport]
        );
        assert_eq!(config.source.path, PathBuf::from("/var/run/queues.json"));
        let webhook = config.webhook.unwrap();
        assert_eq!(webhook.url, "http://127.0.0.1:9000/alerts");
        assert_eq!(webhook.timeout, 5.0);
    }

    #[test]
    fn watchdog_defaults_apply() {
        let config = DaemonConfig::from_toml_str("[source]\npath = \"q.json\"").unwrap();
        assert_eq!(config.watchdog.latency_threshold, 10.0);
        assert!(config.webhook.is_none());
    }

    #[test]
    fn missing_source_is_rejected() {
        assert!(DaemonConfig::from_toml_str("latency_threshold = 3.0").is_err());
    }

    #[test]
    fn invalid_watchdog_values_are_rejected() {
        let err = DaemonConfig::from_toml_str(
            "latency_threshold = -1.0\n[source]\npath = \"q.json\"",
        )
        .unwrap_err();
        assert!(err.to_string().contains("latency_threshold"));
    }

    #[test]
    fn misspelled_keys_are_rejected() {
        let err = DaemonConfig::from_toml_str(
            "latency_treshold = 3.0\n[source]\npath = \"q.json\"",
        )
        .unwrap_err();
        assert!(format!("{err:#}").contains("latency_treshold"));

        let err = DaemonConfig::from_toml_str("[source]\npth = \"q.json\"").unwrap_err();
        assert!(format!("{err:#}").contains("pth"));

        let err = DaemonConfig::from_toml_str(
            "[source]\npath = \"q.json\"\n[webhook]\nurl = \"http://h/\"\ntimout = 2.0",
        )
        .unwrap_err();
        assert!(format!("{err:#}").contains("timout"));
    }

    #[test]
    fn oversized_webhook_timeout_is_an_error() {
        let err = DaemonConfig::from_toml_str(
            "[source]\npath = \"q.json\"\n[webhook]\nurl = \"http://h/\"\ntimeout = 1e300",
        )
        .unwrap_err();
        assert!(format!("{err:#}").contains("webhook.timeout"));

        let err = DaemonConfig::from_toml_str(
            "[source]\npath = \"q.json\"\n[webhook]\nurl = \"http://h/\"\ntimeout = 0",
        )
        .unwrap_err();
        assert!(format!("{err:#}").contains("webhook.timeout"));
    }

    #[test]
    fn webhook_timeout_converts_to_duration() {
        let config = DaemonConfig::from_toml_str(
            "[source]\npath = \"q.json\"\n[webhook]\nurl = \"http://h/\"\ntimeout = 0.25",
        )
        .unwrap();
        assert_eq!(
            config.webhook.unwrap().timeout().unwrap(),
            Duration::from_millis(250)
        );
    }
}
