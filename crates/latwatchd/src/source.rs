//! JSON file latency source.
//!
//! Whatever exports queue latencies (a cron job, a sidecar) rewrites the
//! file; the watchdog re-reads it on every poll.

use std::path::PathBuf;

use anyhow::Context;

use latwatch_core::QueueSnapshot;
use latwatch_monitor::LatencySource;

#[derive(Debug, Clone)]
pub struct FileSource {
    path: PathBuf,
}

impl FileSource {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }
}

impl LatencySource for FileSource {
    fn setup(&mut self) -> anyhow::Result<()> {
        std::fs::metadata(&self.path)
            .with_context(|| format!("latency file {} is not readable", self.path.display()))?;
        Ok(())
    }

    fn all(&self) -> anyhow::Result<QueueSnapshot> {
        let content = std::fs::read_to_string(&self.path)
            .with_context(|| format!("failed to read {}", self.path.display()))?;
        let snapshot: QueueSnapshot = serde_json::from_str(&content)
            .with_context(|| format!("malformed latency file {}", self.path.display()))?;
        Ok(snapshot)
    }
}
