//! Overload tracking across repeated polls.
//!
//! The tracker turns a stream of snapshots into episodes: an episode starts
//! on the first poll with a queue above the latency threshold and ends on
//! the first poll where no queue remains above the restored threshold.

use std::time::{Duration, Instant};

use tracing::debug;

use latwatch_core::{EpisodeContext, HighLatencyQueues, QueueLatency, Thresholds};

use crate::evaluator::{any_above, over_threshold};

/// Decision taken by the tracker for one poll.
#[derive(Debug, Clone, PartialEq)]
pub enum CheckOutcome {
    /// No episode, nothing high.
    Idle,
    /// High-latency queues found; handlers are notified.
    Alerted {
        queues: HighLatencyQueues,
        context: EpisodeContext,
    },
    /// High-latency queues found inside the alert interval; no dispatch.
    Suppressed {
        queues: HighLatencyQueues,
        context: EpisodeContext,
    },
    /// Nothing above the latency threshold, but a queue is still above the
    /// restored threshold, so the episode continues without dispatch.
    Holding { context: EpisodeContext },
    /// The episode ended; handlers are notified once.
    Restored { context: EpisodeContext },
}

/// Episode state owned by a single tracker.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct OverloadState {
    pub active: bool,
    pub since: Option<Instant>,
    /// Polls with at least one high queue since the episode began.
    pub max_depth: u32,
    pub last_alert_at: Option<Instant>,
}

impl OverloadState {
    fn duration_at(&self, now: Instant) -> f64 {
        self.since
            .map(|since| now.saturating_duration_since(since).as_secs_f64())
            .unwrap_or(0.0)
    }

    fn context_at(&self, now: Instant) -> EpisodeContext {
        EpisodeContext::new(self.max_depth, self.duration_at(now))
    }
}

/// Stateful overload detector with trip/restore hysteresis and alert
/// suppression.
#[derive(Debug)]
pub struct OverloadTracker {
    thresholds: Thresholds,
    alert_interval: Duration,
    state: OverloadState,
}

impl OverloadTracker {
    /// Create a tracker with no active episode.
    pub fn new(thresholds: Thresholds, alert_interval: Duration) -> Self {
        Self {
            thresholds,
            alert_interval,
            state: OverloadState::default(),
        }
    }

    /// Fold one snapshot, taken at `now`, into the episode state.
    pub fn observe(&mut self, snapshot: &[QueueLatency], now: Instant) -> CheckOutcome {
        let over = over_threshold(snapshot, self.thresholds.latency_threshold());

        if !over.is_empty() {
            if !self.state.active {
                self.state = OverloadState {
                    active: true,
                    since: Some(now),
                    max_depth: 0,
                    last_alert_at: None,
                };
                debug!(queues = over.len(), "overload episode started");
            }
            self.state.max_depth += 1;
            let context = self.state.context_at(now);

            if self.alert_due(now) {
                self.state.last_alert_at = Some(now);
                debug!(
                    queues = over.len(),
                    depth = context.depth,
                    duration = context.duration,
                    "alert due"
                );
                return CheckOutcome::Alerted {
                    queues: over,
                    context,
                };
            }

            debug!(depth = context.depth, "alert suppressed by alert_interval");
            return CheckOutcome::Suppressed {
                queues: over,
                context,
            };
        }

        if !self.state.active {
            return CheckOutcome::Idle;
        }

        let context = self.state.context_at(now);
        if any_above(snapshot, self.thresholds.latency_restored_threshold()) {
            debug!(
                depth = context.depth,
                restored_threshold = self.thresholds.latency_restored_threshold(),
                "queues below latency threshold but not yet restored"
            );
            return CheckOutcome::Holding { context };
        }

        self.state = OverloadState::default();
        debug!(
            depth = context.depth,
            duration = context.duration,
            "overload episode ended"
        );
        CheckOutcome::Restored { context }
    }

    fn alert_due(&self, now: Instant) -> bool {
        self.state
            .last_alert_at
            .is_none_or(|last| now.saturating_duration_since(last) >= self.alert_interval)
    }

    /// Current episode state.
    pub fn state(&self) -> &OverloadState {
        &self.state
    }

    pub fn thresholds(&self) -> Thresholds {
        self.thresholds
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn tracker(threshold: f64, restored: Option<f64>, alert_interval: Duration) -> OverloadTracker {
        OverloadTracker::new(Thresholds::new(threshold, restored).unwrap(), alert_interval)
    }

    fn snap(latency: f64) -> Vec<QueueLatency> {
        vec![QueueLatency::new("y", latency)]
    }

    #[test]
    fn starts_empty() {
        let t = tracker(10.0, None, Duration::ZERO);
        assert_eq!(t.state(), &OverloadState::default());
    }

    #[test]
    fn nothing_high_is_idle() {
        let mut t = tracker(10.0, None, Duration::ZERO);
        assert_eq!(t.observe(&snap(1.0), Instant::now()), CheckOutcome::Idle);
        assert!(!t.state().active);
    }

    #[test]
    fn first_high_poll_has_depth_one_and_zero_duration() {
        let mut t = tracker(10.0, None, Duration::ZERO);
        let now = Instant::now();

        match t.observe(&snap(20.0), now) {
            CheckOutcome::Alerted { queues, context } => {
                assert_eq!(queues.get("y"), Some(&20.0));
                assert_eq!(context, EpisodeContext::new(1, 0.0));
            }
            other => panic!("expected alert, got {other:?}"),
        }
        assert!(t.state().active);
        assert_eq!(t.state().since, Some(now));
    }

    #[test]
    fn depth_counts_polls_not_queues() {
        let mut t = tracker(2.0, None, Duration::ZERO);
        let start = Instant::now();
        let many = vec![
            QueueLatency::new("a", 9.0),
            QueueLatency::new("b", 9.0),
            QueueLatency::new("c", 9.0),
        ];

        t.observe(&many, start);
        let outcome = t.observe(&snap(3.0), start + Duration::from_secs(5));
        assert_eq!(
            outcome,
            CheckOutcome::Alerted {
                queues: HighLatencyQueues::from([("y".to_string(), 3.0)]),
                context: EpisodeContext::new(2, 5.0),
            }
        );
    }

    #[test]
    fn restore_fires_once_with_final_depth() {
        let mut t = tracker(2.0, None, Duration::ZERO);
        let start = Instant::now();

        t.observe(&snap(20.0), start);
        t.observe(&snap(3.0), start + Duration::from_secs(1));
        let outcome = t.observe(&snap(2.0), start + Duration::from_secs(3));
        assert_eq!(
            outcome,
            CheckOutcome::Restored {
                context: EpisodeContext::new(2, 3.0)
            }
        );
        assert_eq!(t.state(), &OverloadState::default());

        // Already restored: nothing more to report.
        assert_eq!(
            t.observe(&snap(2.0), start + Duration::from_secs(4)),
            CheckOutcome::Idle
        );
    }

    #[test]
    fn restore_when_queue_disappears() {
        let mut t = tracker(5.0, None, Duration::ZERO);
        let start = Instant::now();
        t.observe(&snap(20.0), start);

        let outcome = t.observe(&[], start + Duration::from_secs(2));
        assert!(matches!(outcome, CheckOutcome::Restored { context } if context.depth == 1));
    }

    #[test]
    fn hysteresis_holds_between_thresholds() {
        let mut t = tracker(10.0, Some(4.0), Duration::ZERO);
        let start = Instant::now();

        t.observe(&snap(12.0), start);
        let outcome = t.observe(&snap(6.0), start + Duration::from_secs(1));
        assert_eq!(
            outcome,
            CheckOutcome::Holding {
                context: EpisodeContext::new(1, 1.0)
            }
        );
        assert!(t.state().active);

        // Back above the trip threshold: same episode, depth continues.
        let outcome = t.observe(&snap(11.0), start + Duration::from_secs(2));
        assert!(matches!(outcome, CheckOutcome::Alerted { context, .. } if context.depth == 2));

        let outcome = t.observe(&snap(4.0), start + Duration::from_secs(3));
        assert_eq!(
            outcome,
            CheckOutcome::Restored {
                context: EpisodeContext::new(2, 3.0)
            }
        );
    }

    #[test]
    fn alert_interval_suppresses_repeat_alerts() {
        let mut t = tracker(10.0, None, Duration::from_secs(60));
        let start = Instant::now();

        assert!(matches!(t.observe(&snap(20.0), start), CheckOutcome::Alerted { .. }));
        assert!(matches!(
            t.observe(&snap(20.0), start + Duration::from_secs(30)),
            CheckOutcome::Suppressed { context, .. } if context.depth == 2
        ));
        assert!(matches!(
            t.observe(&snap(20.0), start + Duration::from_secs(60)),
            CheckOutcome::Alerted { context, .. } if context.depth == 3
        ));
        assert_eq!(t.state().last_alert_at, Some(start + Duration::from_secs(60)));
    }

    #[test]
    fn new_episode_is_not_suppressed_by_previous_alert() {
        let mut t = tracker(10.0, None, Duration::from_secs(600));
        let start = Instant::now();

        t.observe(&snap(20.0), start);
        t.observe(&snap(1.0), start + Duration::from_secs(1));
        assert!(matches!(
            t.observe(&snap(20.0), start + Duration::from_secs(2)),
            CheckOutcome::Alerted { context, .. } if context.depth == 1 && context.duration == 0.0
        ));
    }
}
