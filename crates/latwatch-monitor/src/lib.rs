//! latwatch-monitor — queue-latency watchdog.
//!
//! Samples per-queue wait latency from an injected source, tracks overload
//! episodes with separate trip and restore thresholds, and notifies
//! handlers when an episode starts, persists, or ends.
//!
//! # Architecture
//!
//! ```text
//! WatchdogService
//!   ├── HostGate (env identifier or hostname vs. hostname_regex)
//!   └── Background poll loop (tokio task, fixed interval)
//!       └── Watchdog::check()
//!           ├── LatencySource::all() → QueueSnapshot
//!           ├── over_threshold() → HighLatencyQueues
//!           ├── OverloadTracker (depth, duration, alert_interval)
//!           └── Dispatcher → Handler (Queues | WithContext | Variadic | Event)
//! ```
//!
//! # Episodes
//!
//! An episode starts on the first poll with a queue strictly above
//! `latency_threshold` and ends on the first poll where no queue is above
//! `latency_restored_threshold`. Depth counts the polls with a high queue,
//! not the number of high queues. Alerts repeat at most once per
//! `alert_interval`; the restore fires exactly once.

pub mod builtin;
pub mod error;
pub mod evaluator;
pub mod gate;
pub mod handler;
pub mod service;
pub mod source;
pub mod tracker;
pub mod watchdog;

pub use builtin::{
    error_report_handler, log_handler, ErrorReport, ErrorReporter, LogConfig, LogLevel, LogRecord,
    LogSink, TracingSink,
};
pub use error::{WatchdogError, WatchdogResult};
pub use gate::HostGate;
pub use handler::{Dispatcher, Handler, HandlerArg, WatchdogEvent};
pub use service::WatchdogService;
pub use source::LatencySource;
pub use tracker::{CheckOutcome, OverloadState, OverloadTracker};
pub use watchdog::{Watchdog, WatchdogBuilder};
