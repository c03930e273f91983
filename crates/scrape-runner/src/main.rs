//! # scrape-runner
//!
//! Polls exchange order books on fixed intervals and appends one CSV file per
//! `(exchange, data type, symbol)` until interrupted.
//!
//! # Usage
//!
//! ```bash
//! scrape-runner --config config.json --log-level info
//! scrape-runner --exchanges BINANCE,LUNO --types ORDER_BOOK --symbols BTCUSDT,XBTZAR --interval 5
//! ```

use std::path::PathBuf;
use std::sync::Arc;

use anyhow::{Context, Result, bail};
use clap::Parser;
use scrape_core::config::{AppConfig, load_config};
use scrape_core::sink::CsvSinkFactory;
use scrape_engine::http::HttpClient;
use scrape_engine::job::JobSettings;
use scrape_engine::manager::Manager;
use scrape_engine::registry::Registry;
use tokio_util::sync::CancellationToken;
use tracing::{error, info, warn};

/// Periodic exchange order book scraper.
#[derive(Parser)]
#[command(name = "scrape-runner", about = "Periodic exchange order book scraper")]
struct Cli {
    /// Configuration file path (JSON). Mutually exclusive with the list flags.
    #[arg(short, long, conflicts_with_all = ["exchanges", "symbols"])]
    config: Option<PathBuf>,

    /// Comma-delimited exchanges (e.g. `BINANCE,BYBIT`).
    #[arg(long)]
    exchanges: Option<String>,

    /// Comma-delimited data types (e.g. `ORDER_BOOK`).
    #[arg(long, default_value = "ORDER_BOOK")]
    types: String,

    /// Comma-delimited symbols.
    #[arg(long)]
    symbols: Option<String>,

    /// Polling interval in seconds for list mode.
    #[arg(long, default_value_t = 5)]
    interval: u64,

    /// Directory for CSV output (overrides the config file).
    #[arg(short, long)]
    output_dir: Option<PathBuf>,

    /// Per-call scrape deadline in seconds.
    #[arg(long)]
    timeout: Option<u64>,

    /// Output queue capacity per job.
    #[arg(long)]
    queue_capacity: Option<usize>,

    /// Concurrent firings per job; 0 disables the bound.
    #[arg(long)]
    max_in_flight: Option<usize>,

    /// Log level (trace, debug, info, warn, error).
    #[arg(short, long, default_value = "info")]
    log_level: String,

    /// Optional log directory for file output.
    #[arg(long)]
    log_dir: Option<String>,
}

impl Cli {
    /// Config from `--config` or the list flags, with CLI overrides applied.
    fn app_config(&self) -> Result<AppConfig> {
        let mut config = match (&self.config, &self.exchanges, &self.symbols) {
            (Some(path), _, _) => load_config(path)?,
            (None, Some(exchanges), Some(symbols)) => {
                AppConfig::from_lists(exchanges, &self.types, symbols, self.interval)
                    .context("build config from command line")?
            }
            _ => bail!("either --config or both --exchanges and --symbols are required"),
        };

        if let Some(dir) = &self.output_dir {
            config.output_dir = dir.clone();
        }
        if self.timeout.is_some() {
            config.scrape_timeout_secs = self.timeout;
        }
        if self.queue_capacity.is_some() {
            config.queue_capacity = self.queue_capacity;
        }
        if self.max_in_flight.is_some() {
            config.max_in_flight_per_job = self.max_in_flight;
        }
        Ok(config)
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    // 1. Initialize logging
    scrape_core::logging::init_logging(&cli.log_level, cli.log_dir.as_deref(), "scrape-runner");

    // 2. Assemble configuration
    let config = cli.app_config()?;
    let tree = config.scrape_tree()?;
    let settings = JobSettings::from_config(&config);
    info!(
        output_dir = %config.output_dir.display(),
        exchanges = tree.len(),
        timeout = ?settings.scrape_timeout,
        queue_capacity = settings.queue_capacity,
        max_in_flight = ?settings.max_in_flight,
        "scrape-runner starting"
    );

    // 3. Wire registry, sinks and manager
    let registry = Arc::new(Registry::with_default_capabilities(HttpClient::new())?);
    let sinks = Arc::new(CsvSinkFactory::new(&config.output_dir));
    let manager = Manager::new(registry, sinks, settings);

    // 4. Cancel on Ctrl+C / SIGTERM
    let token = CancellationToken::new();
    tokio::spawn(cancel_on_signal(token.clone()));

    // 5. Run until every job has drained
    let report = manager.run(token, &tree).await?;

    for job in &report.completed {
        info!(
            target_leaf = %job.target,
            fired = job.scheduler.fired,
            skipped_ticks = job.scheduler.skipped,
            written = job.pipeline.written,
            dropped = job.pipeline.dropped,
            write_errors = job.pipeline.write_errors,
            "job finished"
        );
    }
    for (target, reason) in &report.failed {
        error!(target_leaf = %target, reason = %reason, "job failed");
    }
    for target in &report.skipped {
        warn!(target_leaf = %target, "leaf skipped, no capability");
    }

    info!(
        completed = report.completed.len(),
        failed = report.failed.len(),
        skipped = report.skipped.len(),
        "scrape-runner stopped"
    );
    Ok(())
}

async fn cancel_on_signal(token: CancellationToken) {
    #[cfg(unix)]
    {
        use tokio::signal::unix::{SignalKind, signal};

        match signal(SignalKind::terminate()) {
            Ok(mut sigterm) => {
                tokio::select! {
                    res = tokio::signal::ctrl_c() => {
                        if let Err(e) = res {
                            error!(error = %e, "ctrl-c handler failed");
                        }
                    }
                    _ = sigterm.recv() => {}
                }
            }
            Err(e) => {
                warn!(error = %e, "SIGTERM handler unavailable, listening for ctrl-c only");
                if let Err(e) = tokio::signal::ctrl_c().await {
                    error!(error = %e, "ctrl-c handler failed");
                }
            }
        }
    }
    #[cfg(not(unix))]
    if let Err(e) = tokio::signal::ctrl_c().await {
        error!(error = %e, "ctrl-c handler failed");
    }

    info!("shutdown signal received, stopping jobs");
    token.cancel();
}
