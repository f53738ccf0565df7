//! Watchdog service — gate check plus the background polling loop.
//!
//! `start()` evaluates the host gate once. Only a matching process spawns
//! the loop; everywhere else the service stays inert and can be started
//! again later.

use std::sync::Arc;
use std::time::Duration;

use parking_lot::Mutex;
use tokio::sync::watch;
use tokio::task::JoinHandle;
use tracing::{debug, error, info};

use crate::error::WatchdogResult;
use crate::gate::HostGate;
use crate::tracker::CheckOutcome;
use crate::watchdog::Watchdog;

/// Handle to the running poll loop.
struct LoopSlot {
    handle: JoinHandle<()>,
    shutdown_tx: watch::Sender<bool>,
}

pub struct WatchdogService {
    watchdog: Arc<Mutex<Watchdog>>,
    gate: HostGate,
    poll_interval: Duration,
    running: Option<LoopSlot>,
}

impl WatchdogService {
    /// Wrap a watchdog; gate and poll interval come from its config.
    pub fn new(watchdog: Watchdog) -> WatchdogResult<Self> {
        let gate = HostGate::from_config(watchdog.config())?;
        let poll_interval = watchdog.config().poll_interval()?;
        Ok(Self {
            watchdog: Arc::new(Mutex::new(watchdog)),
            gate,
            poll_interval,
            running: None,
        })
    }

    /// Replace the gate built from config.
    pub fn with_gate(mut self, gate: HostGate) -> Self {
        self.gate = gate;
        self
    }

    /// Start polling if this host passes the gate.
    ///
    /// Returns `Ok(false)` when the gate does not match; no task is
    /// spawned. Must be called from within a tokio runtime.
    pub fn start(&mut self) -> WatchdogResult<bool> {
        if self.is_running() {
            return Ok(true);
        }

        if !self.gate.is_match() {
            info!(
                env_var = %self.gate.env_var(),
                "host does not match hostname_regex; latency watchdog not started"
            );
            return Ok(false);
        }

        self.watchdog.lock().setup()?;

        let (shutdown_tx, shutdown_rx) = watch::channel(false);
        let watchdog = self.watchdog.clone();
        let interval = self.poll_interval;
        let handle = tokio::spawn(async move {
            run_poll_loop(watchdog, interval, shutdown_rx).await;
        });

        self.running = Some(LoopSlot {
            handle,
            shutdown_tx,
        });
        info!(
            poll_interval_secs = interval.as_secs_f64(),
            "latency watchdog started"
        );
        Ok(true)
    }

    /// Stop the poll loop and wait for the task to finish.
    pub async fn stop(&mut self) {
        if let Some(slot) = self.running.take() {
            let _ = slot.shutdown_tx.send(true);
            slot.handle.abort();
            let _ = slot.handle.await;
            info!("latency watchdog stopped");
        }
    }

    /// Whether the poll loop is alive.
    pub fn is_running(&self) -> bool {
        self.running
            .as_ref()
            .is_some_and(|slot| !slot.handle.is_finished())
    }

    /// Run a single check outside the loop.
    pub fn check(&self) -> WatchdogResult<CheckOutcome> {
        self.watchdog.lock().check()
    }

    /// Shared access to the underlying watchdog.
    pub fn watchdog(&self) -> Arc<Mutex<Watchdog>> {
        self.watchdog.clone()
    }
}

impl Drop for WatchdogService {
    fn drop(&mut self) {
        if let Some(slot) = self.running.take() {
            let _ = slot.shutdown_tx.send(true);
            slot.handle.abort();
        }
    }
}

/// Fixed-interval loop: sleep, check, repeat until shut down.
async fn run_poll_loop(
    watchdog: Arc<Mutex<Watchdog>>,
    interval: Duration,
    mut shutdown: watch::Receiver<bool>,
) {
    debug!("latency poll loop starting");

    loop {
        tokio::select! {
            _ = tokio::time::sleep(interval) => {
                let result = watchdog.lock().check();
                if let Err(e) = result {
                    error!(error = %e, "latency check failed");
                }
            }
            _ = shutdown.changed() => {
                debug!("latency poll loop shutting down");
                break;
            }
        }
    }
}
