//! latwatchd — runs the queue-latency watchdog as a process.
//!
//! # Usage
//!
//! ```text
//! latwatchd run --config /etc/latwatch/watchdog.toml
//! latwatchd check --config /etc/latwatch/watchdog.toml
//! ```
//!
//! `run` polls until Ctrl-C when this host passes the gate, and exits
//! immediately otherwise. `check` performs a single poll and prints the
//! outcome as JSON.

mod config;
mod source;
mod webhook;

use std::path::PathBuf;
use std::sync::Arc;

use clap::{Parser, Subcommand};
use serde_json::json;
use tracing::info;

use latwatch_monitor::{CheckOutcome, Watchdog, WatchdogService};

use crate::config::DaemonConfig;
use crate::source::FileSource;
use crate::webhook::WebhookReporter;

#[derive(Parser)]
#[command(name = "latwatchd", about = "Queue-latency watchdog")]
struct Cli {
    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Poll queue latencies until interrupted.
    Run {
        /// Path to the TOML config file.
        #[arg(long, default_value = "latwatch.toml")]
        config: PathBuf,
    },
    /// Poll once and print the outcome.
    Check {
        /// Path to the TOML config file.
        #[arg(long, default_value = "latwatch.toml")]
        config: PathBuf,
    },
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info,latwatch_monitor=info")),
        )
        .init();

    let cli = Cli::parse();

    match cli.command {
        Command::Run { config } => run(DaemonConfig::from_file(&config)?).await,
        Command::Check { config } => check_once(DaemonConfig::from_file(&config)?).await,
    }
}

/// Build the watchdog and, when a webhook is configured, its reporter.
fn build_watchdog(config: DaemonConfig) -> anyhow::Result<(Watchdog, Option<Arc<WebhookReporter>>)> {
    let reporter = match &config.webhook {
        Some(webhook) => Some(Arc::new(WebhookReporter::new(
            &webhook.url,
            webhook.timeout()?,
            tokio::runtime::Handle::current(),
        )?)),
        None => None,
    };

    let mut builder = Watchdog::builder(config.watchdog, FileSource::new(config.source.path));
    if let Some(reporter) = &reporter {
        builder = builder.error_reporter(reporter.clone());
    }
    Ok((builder.build()?, reporter))
}

async fn run(config: DaemonConfig) -> anyhow::Result<()> {
    let (watchdog, reporter) = build_watchdog(config)?;
    let mut service = WatchdogService::new(watchdog)?;

    if !service.start()? {
        info!("latwatchd exiting: this host is not selected for monitoring");
        return Ok(());
    }

    tokio::signal::ctrl_c().await?;
    info!("shutdown signal received");
    service.stop().await;

    if let Some(reporter) = reporter {
        info!(pending = reporter.in_flight(), "flushing error reports");
        reporter.flush().await;
    }
    Ok(())
}

async fn check_once(config: DaemonConfig) -> anyhow::Result<()> {
    let (mut watchdog, reporter) = build_watchdog(config)?;
    let outcome = watchdog.check();

    if let Some(reporter) = reporter {
        reporter.flush().await;
    }

    println!("{}", outcome_json(&outcome?));
    Ok(())
}

fn outcome_json(outcome: &CheckOutcome) -> serde_json::Value {
    match outcome {
        CheckOutcome::Idle => json!({ "outcome": "idle" }),
        CheckOutcome::Alerted { queues, context } => {
            json!({ "outcome": "alerted", "queues": queues, "depth": context.depth, "duration": context.duration })
        }
        CheckOutcome::Suppressed { queues, context } => {
            json!({ "outcome": "suppressed", "queues": queues, "depth": context.depth, "duration": context.duration })
        }
        CheckOutcome::Holding { context } => {
            json!({ "outcome": "holding", "depth": context.depth, "duration": context.duration })
        }
        CheckOutcome::Restored { context } => {
            json!({ "outcome": "restored", "depth": context.depth, "duration": context.duration })
        }
    }
}
