//! Configuration parsing for the scraper.
//!
//! Settings come either from a JSON file or from comma-delimited CLI lists.
//! Both produce an [`AppConfig`] whose `exchanges` block is a plain string
//! tree; [`AppConfig::scrape_tree`] maps it onto typed identifiers and drops
//! names the scraper does not know.
//!
//! # Example config
//!
//! ```json
//! {
//!   "output_dir": "data",
//!   "scrape_timeout_secs": 10,
//!   "queue_capacity": 1000,
//!   "max_in_flight_per_job": 2,
//!   "exchanges": {
//!     "BINANCE": { "ORDER_BOOK": { "BTCUSDT": 5, "ETHUSDT": 10 } },
//!     "LUNO":    { "ORDER_BOOK": { "BTCZAR": 5 } }
//!   }
//! }
//! ```

use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use std::time::Duration;

use anyhow::Context;
use serde::Deserialize;
use tracing::warn;

use crate::error::ScrapeError;
use crate::types::{DataType, Exchange, ScrapeTree};

/// Raw tree as written in the config file: `exchange -> type -> symbol -> seconds`.
pub type RawTree = BTreeMap<String, BTreeMap<String, BTreeMap<String, u64>>>;

pub const DEFAULT_SCRAPE_TIMEOUT_SECS: u64 = 10;
pub const DEFAULT_QUEUE_CAPACITY: usize = 1000;
pub const DEFAULT_MAX_IN_FLIGHT: usize = 2;

/// Top-level application config.
#[derive(Debug, Clone, Deserialize)]
pub struct AppConfig {
    /// Directory receiving the per-job CSV files (default: current directory).
    #[serde(default = "default_output_dir")]
    pub output_dir: PathBuf,

    /// Per-call deadline for one capability invocation (default: 10).
    pub scrape_timeout_secs: Option<u64>,

    /// Output queue capacity per job (default: 1000).
    pub queue_capacity: Option<usize>,

    /// Concurrent firings allowed per job; `0` disables the bound (default: 2).
    pub max_in_flight_per_job: Option<usize>,

    /// Scrape tree keyed by names.
    pub exchanges: RawTree,
}

fn default_output_dir() -> PathBuf {
    PathBuf::from(".")
}

impl AppConfig {
    /// Build a config from comma-delimited lists: every exchange × type ×
    /// symbol combination polls at the same interval.
    ///
    /// Fails if no known exchange or no known data type survives mapping.
    pub fn from_lists(
        exchanges: &str,
        types: &str,
        symbols: &str,
        interval_secs: u64,
    ) -> Result<Self, ScrapeError> {
        let known_exchanges: Vec<Exchange> = split_list(exchanges)
            .filter_map(|s| map_name::<Exchange>(s, "exchange"))
            .collect();
        if known_exchanges.is_empty() {
            return Err(ScrapeError::Config(format!("no allowed exchanges: {exchanges}")));
        }

        let known_types: Vec<DataType> =
            split_list(types).filter_map(|s| map_name::<DataType>(s, "data type")).collect();
        if known_types.is_empty() {
            return Err(ScrapeError::Config(format!("no allowed types: {types}")));
        }

        let symbols: Vec<&str> = split_list(symbols).collect();
        if symbols.is_empty() {
            return Err(ScrapeError::Config("no symbols given".into()));
        }

        let mut tree = RawTree::new();
        for exchange in &known_exchanges {
            let by_type = tree.entry(exchange.to_string()).or_default();
            for data_type in &known_types {
                let by_symbol = by_type.entry(data_type.to_string()).or_default();
                for symbol in &symbols {
                    by_symbol.insert(symbol.to_string(), interval_secs);
                }
            }
        }

        Ok(Self {
            output_dir: default_output_dir(),
            scrape_timeout_secs: None,
            queue_capacity: None,
            max_in_flight_per_job: None,
            exchanges: tree,
        })
    }

    /// Map the raw tree onto typed identifiers.
    ///
    /// Unknown exchange or data-type names are logged and dropped. A zero
    /// interval is a hard error.
    pub fn scrape_tree(&self) -> Result<ScrapeTree, ScrapeError> {
        let mut tree = ScrapeTree::new();
        for (exchange_name, types) in &self.exchanges {
            let Some(exchange) = map_name::<Exchange>(exchange_name, "exchange") else {
                continue;
            };
            for (type_name, symbols) in types {
                let Some(data_type) = map_name::<DataType>(type_name, "data type") else {
                    continue;
                };
                for (symbol, secs) in symbols {
                    if *secs == 0 {
                        return Err(ScrapeError::Config(format!(
                            "{exchange}/{data_type}/{symbol}: interval must be > 0"
                        )));
                    }
                    tree.entry(exchange)
                        .or_default()
                        .entry(data_type)
                        .or_default()
                        .insert(symbol.clone(), Duration::from_secs(*secs));
                }
            }
        }
        Ok(tree)
    }

    /// Returns the effective per-call deadline.
    pub fn scrape_timeout(&self) -> Duration {
        Duration::from_secs(self.scrape_timeout_secs.unwrap_or(DEFAULT_SCRAPE_TIMEOUT_SECS))
    }

    /// Returns the effective queue capacity (never below 1).
    pub fn effective_queue_capacity(&self) -> usize {
        self.queue_capacity.unwrap_or(DEFAULT_QUEUE_CAPACITY).max(1)
    }

    /// Returns the in-flight bound; `None` means unbounded.
    pub fn effective_max_in_flight(&self) -> Option<usize> {
        match self.max_in_flight_per_job.unwrap_or(DEFAULT_MAX_IN_FLIGHT) {
            0 => None,
            n => Some(n),
        }
    }
}

fn split_list(list: &str) -> impl Iterator<Item = &str> {
    list.split(',').map(str::trim).filter(|s| !s.is_empty())
}

fn map_name<T: std::str::FromStr>(name: &str, kind: &str) -> Option<T> {
    match name.parse::<T>() {
        Ok(v) => Some(v),
        Err(_) => {
            warn!(name, kind, "ignoring unknown name in config");
            None
        }
    }
}

/// Load and parse a JSON config file.
pub fn load_config(path: &Path) -> anyhow::Result<AppConfig> {
    let content = std::fs::read_to_string(path)
        .with_context(|| format!("read config {}", path.display()))?;
    let config: AppConfig = serde_json::from_str(&content)
        .with_context(|| format!("parse config {}", path.display()))?;
    Ok(config)
}
