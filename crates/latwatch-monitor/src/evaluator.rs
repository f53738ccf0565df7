//! Threshold evaluation over a single snapshot.

use latwatch_core::{HighLatencyQueues, QueueLatency};

/// Queues whose latency is strictly above `threshold`.
///
/// A latency equal to the threshold does not count. When a name appears
/// twice in one snapshot the later entry wins.
pub fn over_threshold(snapshot: &[QueueLatency], threshold: f64) -> HighLatencyQueues {
    let mut over = HighLatencyQueues::new();
    for queue in snapshot {
        if queue.latency > threshold {
            over.insert(queue.name.clone(), queue.latency);
        } else {
            over.remove(&queue.name);
        }
    }
    over
}

/// Whether any queue in the snapshot is strictly above `threshold`.
pub fn any_above(snapshot: &[QueueLatency], threshold: f64) -> bool {
    !over_threshold(snapshot, threshold).is_empty()
}
