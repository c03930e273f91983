//! Logging initialization using the `tracing` ecosystem.
//!
//! - Console output (colored, human-readable, thread names so each sink
//!   consumer thread `sink-<leaf>` is identifiable)
//! - Optional JSON-lines file output with daily rotation via `tracing-appender`
//! - Level from `RUST_LOG`, falling back to the explicit parameter

use tracing_subscriber::{EnvFilter, fmt, layer::SubscriberExt, util::SubscriberInitExt};

/// Install the global tracing subscriber. Call once at program start.
///
/// - `log_level`: default filter when `RUST_LOG` is unset (e.g. `"info"`)
/// - `log_dir`: directory for daily-rotating `{file_prefix}.log.YYYY-MM-DD` files
/// - `file_prefix`: log file prefix, usually the binary name
pub fn init_logging(log_level: &str, log_dir: Option<&str>, file_prefix: &str) {
    let env_filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(log_level));

    let console_layer = fmt::layer().with_target(true).with_thread_names(true).with_ansi(true);

    let file_layer = log_dir.map(|dir| {
        fmt::layer()
            .json()
            .with_writer(tracing_appender::rolling::daily(dir, format!("{file_prefix}.log")))
            .with_current_span(false)
            .with_thread_names(true)
    });

    tracing_subscriber::registry()
        .with(env_filter)
        .with(console_layer)
        .with(file_layer)
        .init();
}
