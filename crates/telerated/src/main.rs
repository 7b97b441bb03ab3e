//! telerated: the telerate daemon.
//!
//! Reads newline-delimited JSON samples from stdin, aggregates them with
//! a [`RateAggregator`], and writes one rate record per series to stdout
//! every flush period.
//!
//! # Usage
//!
//! ```text
//! docker-stats-poller | telerated --config /etc/telerate/rate.toml | insights-forwarder
//! ```

mod input;
mod output;

use std::future::Future;
use std::io::{self, Write};
use std::path::PathBuf;
use std::sync::Arc;

use anyhow::Context;
use clap::Parser;
use tokio::sync::{mpsc, watch};
use tracing::{info, warn};

use telerate_aggregator::{Flusher, RateAggregator};
use telerate_core::{RateConfig, Sample};

use crate::input::spawn_line_reader;
use crate::output::{write_sample, JsonLinesSink};

#[derive(Parser)]
#[command(name = "telerated", about = "Streaming rate-of-change aggregator")]
struct Cli {
    /// Path to the rate aggregator config (TOML). Uses the built-in
    /// sample config when omitted.
    #[arg(long)]
    config: Option<PathBuf>,

    /// Print the effective config and exit.
    #[arg(long)]
    print_config: bool,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // stdout carries data, so logs go to stderr.
    tracing_subscriber::fmt()
        .with_writer(std::io::stderr)
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "info,telerated=debug,telerate=debug".into()),
        )
        .init();

    let cli = Cli::parse();

    let config = match &cli.config {
        Some(path) => RateConfig::from_file(path)
            .with_context(|| format!("loading config from {}", path.display()))?,
        None => RateConfig::sample(),
    };

    if cli.print_config {
        print!("{}", config.to_toml_string()?);
        return Ok(());
    }

    run(config).await
}

async fn run(config: RateConfig) -> anyhow::Result<()> {
    let period = config.period_duration()?;
    let aggregator = Arc::new(RateAggregator::from_config(&config)?);
    info!(
        period_ms = period.as_millis() as u64,
        series = config.fields.len(),
        drop_original = config.drop_original,
        "rate aggregator initialized"
    );

    let (shutdown_tx, shutdown_rx) = watch::channel(false);
    let flusher = Flusher::new(Arc::clone(&aggregator), period);
    let flush_handle = tokio::spawn(async move {
        flusher
            .run(JsonLinesSink::new(std::io::stdout()), shutdown_rx)
            .await;
    });

    // Stdin is read on its own thread; a blocked read must not keep the
    // runtime from shutting down on Ctrl-C.
    let mut lines =
        spawn_line_reader(io::BufReader::new(io::stdin())).context("starting stdin reader")?;
    let mut stats = IngestStats::default();
    let ingested = ingest_until(
        &mut lines,
        shutdown_signal(),
        &aggregator,
        config.drop_original,
        &mut io::stdout(),
        &mut stats,
    )
    .await;

    let _ = shutdown_tx.send(true);
    flush_handle.await.context("flusher task failed")?;
    ingested.context("reading stdin")?;

    info!(accepted = stats.accepted, rejected = stats.rejected, "telerated stopped");
    Ok(())
}

async fn shutdown_signal() {
    match tokio::signal::ctrl_c().await {
        Ok(()) => info!("shutdown signal received"),
        Err(e) => {
            warn!(error = %e, "failed to listen for ctrl-c");
            std::future::pending::<()>().await;
        }
    }
}

/// Feed lines into the aggregator until the input ends or `shutdown`
/// resolves, whichever comes first.
async fn ingest_until<F, W>(
    lines: &mut mpsc::Receiver<io::Result<String>>,
    shutdown: F,
    aggregator: &RateAggregator,
    drop_original: bool,
    out: &mut W,
    stats: &mut IngestStats,
) -> io::Result<()>
where
    F: Future<Output = ()>,
    W: Write,
{
    tokio::pin!(shutdown);

    loop {
        tokio::select! {
            line = lines.recv() => match line {
                Some(line) => ingest_line(&line?, aggregator, drop_original, out, stats),
                None => {
                    info!("stdin closed");
                    return Ok(());
                }
            },
            _ = &mut shutdown => return Ok(()),
        }
    }
}

#[derive(Debug, Default, PartialEq, Eq)]
struct IngestStats {
    accepted: u64,
    rejected: u64,
}

/// Parse one input line and hand the sample to the aggregator.
///
/// Blank lines are ignored. Malformed lines are logged and counted.
fn ingest_line<W: Write>(
    line: &str,
    aggregator: &RateAggregator,
    drop_original: bool,
    out: &mut W,
    stats: &mut IngestStats,
) {
    let line = line.trim();
    if line.is_empty() {
        return;
    }

    let sample: Sample = match serde_json::from_str(line) {
        Ok(s) => s,
        Err(e) => {
            stats.rejected += 1;
            warn!(error = %e, "skipping malformed sample");
            return;
        }
    };

    if !drop_original {
        if let Err(e) = write_sample(out, &sample) {
            warn!(error = %e, series = %sample.name, "failed to forward sample");
        }
    }

    stats.accepted += 1;
    aggregator.add(sample);
}
