//! Typed error definitions for the scraper.
//!
//! Provides [`ScrapeError`] for domain-specific errors that are more
//! informative than plain `anyhow::Error` strings. All variants implement
//! `std::error::Error` via `thiserror`, so they integrate with `anyhow::Result`.

use thiserror::Error;

/// Domain-specific errors for the scraper.
#[derive(Debug, Error)]
pub enum ScrapeError {
    /// Configuration parsing or validation error.
    #[error("config error: {0}")]
    Config(String),

    /// Transport-level or non-success HTTP response.
    #[error("http error: {0}")]
    Http(String),

    /// Exchange response could not be decoded into a record.
    #[error("parse error: {0}")]
    Parse(String),

    /// Output sink could not be acquired or written.
    #[error("sink error: {0}")]
    Sink(String),

    /// Capability registration conflict.
    #[error("registry error: {0}")]
    Registry(String),

    /// Poll result violates the header/value shape contract.
    #[error("record error: {0}")]
    Record(String),
}
