//! # scrape-core
//!
//! Core crate for the exchange scraper, providing:
//!
//! - **Types** (`types`): exchange/data-type enums, poll targets, records, order book snapshots
//! - **Configuration** (`config`): JSON / CLI config into a typed scrape tree
//! - **Error types** (`error`): domain-specific `ScrapeError` via thiserror
//! - **Sinks** (`sink`): append-only CSV output, one file per job
//! - **Time utilities** (`time_util`): timestamp formatting
//! - **Logging** (`logging`): tracing-based structured logging

pub mod config;
pub mod error;
pub mod logging;
pub mod sink;
pub mod time_util;
pub mod types;

// Re-export types at crate root for convenience.
pub use error::ScrapeError;
pub use types::*;
