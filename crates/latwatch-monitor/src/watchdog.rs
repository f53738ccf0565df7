//! The watchdog: source → evaluator → tracker → dispatcher.
//!
//! `Watchdog::check` is synchronous and runs one full poll. It can be
//! called directly (tests, one-shot CLI) or from the polling loop in
//! `WatchdogService`.

use std::sync::Arc;
use std::time::Instant;

use tracing::{debug, warn};

use latwatch_core::{BuiltinHandler, Thresholds, WatchdogConfig};

use crate::builtin::{error_report_handler, log_handler, ErrorReporter, LogConfig};
use crate::error::{WatchdogError, WatchdogResult};
use crate::handler::{Dispatcher, Handler, WatchdogEvent};
use crate::source::LatencySource;
use crate::tracker::{CheckOutcome, OverloadState, OverloadTracker};

pub struct Watchdog {
    config: WatchdogConfig,
    source: Box<dyn LatencySource>,
    tracker: OverloadTracker,
    dispatcher: Dispatcher,
    setup_done: bool,
}

impl Watchdog {
    /// Start building a watchdog over `source`.
    pub fn builder(config: WatchdogConfig, source: impl LatencySource + 'static) -> WatchdogBuilder {
        WatchdogBuilder::new(config, Box::new(source))
    }

    /// Run the source's one-time setup. Idempotent.
    pub fn setup(&mut self) -> WatchdogResult<()> {
        if self.setup_done {
            return Ok(());
        }
        self.source.setup().map_err(WatchdogError::Setup)?;
        self.setup_done = true;
        debug!("latency source set up");
        Ok(())
    }

    /// Poll once, now.
    pub fn check(&mut self) -> WatchdogResult<CheckOutcome> {
        self.check_at(Instant::now())
    }

    /// Poll once, treating `now` as the current instant.
    ///
    /// Episode state is updated before any handler runs, so a handler
    /// failure never rolls back depth or duration accounting.
    pub fn check_at(&mut self, now: Instant) -> WatchdogResult<CheckOutcome> {
        self.setup()?;

        let snapshot = self.source.all().map_err(WatchdogError::Source)?;
        let outcome = self.tracker.observe(&snapshot, now);
        debug!(queues = snapshot.len(), ?outcome, "latency check complete");

        match &outcome {
            CheckOutcome::Alerted { queues, context } => {
                self.dispatcher.dispatch(&WatchdogEvent::HighLatency {
                    queues,
                    context: *context,
                })?;
            }
            CheckOutcome::Restored { context } => {
                self.dispatcher
                    .dispatch(&WatchdogEvent::Restored { context: *context })?;
            }
            CheckOutcome::Idle | CheckOutcome::Suppressed { .. } | CheckOutcome::Holding { .. } => {}
        }

        Ok(outcome)
    }

    /// Current episode state.
    pub fn state(&self) -> &OverloadState {
        self.tracker.state()
    }

    /// Validated trip and restore thresholds.
    pub fn thresholds(&self) -> Thresholds {
        self.tracker.thresholds()
    }

    /// Config the watchdog was built from.
    pub fn config(&self) -> &WatchdogConfig {
        &self.config
    }

    /// Number of handlers, built-in and custom.
    pub fn handler_count(&self) -> usize {
        self.dispatcher.len()
    }
}

/// Builds a validated `Watchdog`.
///
/// Handlers named in `WatchdogConfig::handlers` come first, in config
/// order, followed by handlers added with [`WatchdogBuilder::handler`].
pub struct WatchdogBuilder {
    config: WatchdogConfig,
    source: Box<dyn LatencySource>,
    log: LogConfig,
    reporter: Option<Arc<dyn ErrorReporter>>,
    handlers: Vec<Handler>,
}

impl WatchdogBuilder {
    fn new(config: WatchdogConfig, source: Box<dyn LatencySource>) -> Self {
        Self {
            config,
            source,
            log: LogConfig::default(),
            reporter: None,
            handlers: Vec::new(),
        }
    }

    /// Log settings for the built-in `log` handler.
    pub fn log_config(mut self, log: LogConfig) -> Self {
        self.log = log;
        self
    }

    /// Reporter for the built-in `error_report` handler.
    pub fn error_reporter(mut self, reporter: Arc<dyn ErrorReporter>) -> Self {
        self.reporter = Some(reporter);
        self
    }

    /// Add a custom handler, run after the built-ins.
    pub fn handler(mut self, handler: Handler) -> Self {
        self.handlers.push(handler);
        self
    }

    /// Validate the config and assemble the handler list.
    pub fn build(self) -> WatchdogResult<Watchdog> {
        self.config.validate()?;
        let thresholds = self.config.thresholds()?;
        let alert_interval = self.config.alert_interval()?;

        let mut dispatcher = Dispatcher::default();
        for builtin in &self.config.handlers {
            match builtin {
                BuiltinHandler::Log => dispatcher.push(log_handler(self.log.clone())),
                BuiltinHandler::ErrorReport => match &self.reporter {
                    Some(reporter) => dispatcher.push(error_report_handler(reporter.clone())),
                    None => warn!("error_report handler configured without a reporter; skipping"),
                },
            }
        }
        for handler in self.handlers {
            dispatcher.push(handler);
        }

        Ok(Watchdog {
            config: self.config,
            source: self.source,
            tracker: OverloadTracker::new(thresholds, alert_interval),
            dispatcher,
            setup_done: false,
        })
    }
}
