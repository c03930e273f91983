//! Identifier enumerations used throughout the scraper.
//!
//! Configuration carries plain strings; they are mapped onto these enums
//! before reaching the engine, so the engine only ever sees known
//! identifiers.

use std::fmt;
use std::str::FromStr;


use crate::error::ScrapeError;

// ---------------------------------------------------------------------------
// Exchange identifiers
// ---------------------------------------------------------------------------

/// Exchanges the scraper knows by name.
///
/// Knowing a name does not imply a polling capability is registered for it
/// (e.g. `Kraken` is recognised but has none).
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum Exchange {
    Binance,
    Bybit,
    Luno,
    Kraken,
}

impl Exchange {
    pub const ALL: [Exchange; 4] = [Self::Binance, Self::Bybit, Self::Luno, Self::Kraken];

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Binance => "BINANCE",
            Self::Bybit => "BYBIT",
            Self::Luno => "LUNO",
            Self::Kraken => "KRAKEN",
        }
    }
}

impl fmt::Display for Exchange {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Exchange {
    type Err = ScrapeError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let upper = s.trim().to_ascii_uppercase();
        Self::ALL
            .into_iter()
            .find(|e| e.as_str() == upper)
            .ok_or_else(|| ScrapeError::Config(format!("unknown exchange: {s}")))
    }
}

// ---------------------------------------------------------------------------
// Data types
// ---------------------------------------------------------------------------

/// Kind of market data a capability polls.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum DataType {
    /// Top of book: best bid and best ask.
    OrderBook,
}

impl DataType {
    pub const ALL: [DataType; 1] = [Self::OrderBook];

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::OrderBook => "ORDER_BOOK",
        }
    }
}

impl fmt::Display for DataType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for DataType {
    type Err = ScrapeError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let upper = s.trim().to_ascii_uppercase();
        Self::ALL
            .into_iter()
            .find(|t| t.as_str() == upper)
            .ok_or_else(|| ScrapeError::Config(format!("unknown data type: {s}")))
    }
}
