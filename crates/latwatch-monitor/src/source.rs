//! The latency source seam.

use latwatch_core::QueueSnapshot;

/// Supplies the current queues and their latencies on demand.
pub trait LatencySource: Send {
    /// One-time initialization, run before the first snapshot is taken.
    fn setup(&mut self) -> anyhow::Result<()> {
        Ok(())
    }

    /// Snapshot of every queue known right now.
    fn all(&self) -> anyhow::Result<QueueSnapshot>;
}

impl<F> LatencySource for F
where
    F: Fn() -> anyhow::Result<QueueSnapshot> + Send,
{
    fn all(&self) -> anyhow::Result<QueueSnapshot> {
        self()
    }
}
