//! Poll targets, requests, results and the records derived from them.

use std::collections::BTreeMap;
use std::fmt;
use std::time::Duration;

use crate::error::ScrapeError;
use crate::types::enums::{DataType, Exchange};

/// Configuration tree: `exchange -> data type -> symbol -> interval`.
///
/// `BTreeMap` keeps expansion order deterministic.
pub type ScrapeTree = BTreeMap<Exchange, BTreeMap<DataType, BTreeMap<String, Duration>>>;

/// Flatten a [`ScrapeTree`] into its leaves, in tree order.
///
/// Leaves with a zero interval are rejected; the tree is otherwise
/// accepted as-is.
pub fn tree_leaves(tree: &ScrapeTree) -> Result<Vec<PollTarget>, ScrapeError> {
    let mut leaves = Vec::new();
    for (exchange, types) in tree {
        for (data_type, symbols) in types {
            for (symbol, interval) in symbols {
                leaves.push(PollTarget::new(*exchange, *data_type, symbol.clone(), *interval)?);
            }
        }
    }
    Ok(leaves)
}

/// One fully specified leaf of the configuration tree.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct PollTarget {
    pub exchange: Exchange,
    pub data_type: DataType,
    pub symbol: String,
    pub interval: Duration,
}

impl PollTarget {
    /// Build a target, rejecting empty symbols and zero intervals.
    pub fn new(
        exchange: Exchange,
        data_type: DataType,
        symbol: impl Into<String>,
        interval: Duration,
    ) -> Result<Self, ScrapeError> {
        let symbol = symbol.into();
        if symbol.trim().is_empty() {
            return Err(ScrapeError::Config(format!("{exchange}/{data_type}: empty symbol")));
        }
        if interval.is_zero() {
            return Err(ScrapeError::Config(format!(
                "{exchange}/{data_type}/{symbol}: interval must be > 0"
            )));
        }
        Ok(Self { exchange, data_type, symbol, interval })
    }
}

impl fmt::Display for PollTarget {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{}/{}/{}@{}s",
            self.exchange,
            self.data_type,
            self.symbol,
            self.interval.as_secs_f64()
        )
    }
}

/// Argument passed to a capability on every firing.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PollRequest {
    pub symbol: String,
}

impl PollRequest {
    pub fn new(symbol: impl Into<String>) -> Self {
        Self { symbol: symbol.into() }
    }
}

/// Structured outcome of one successful poll.
///
/// Implementations must return header and value sequences of equal,
/// fixed length, in a deterministic order.
pub trait PollResult: Send + Sync {
    /// Column names, written once at the top of a sink.
    fn header_fields(&self) -> Vec<String>;
    /// Column values for this observation.
    fn value_fields(&self) -> Vec<String>;
}

/// A poll result flattened for the output pipeline.
///
/// The header travels with every record so the consumer can emit it
/// lazily on the first pull.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Record {
    pub header: Vec<String>,
    pub values: Vec<String>,
}

impl Record {
    /// Flatten a result, enforcing `len(header) == len(values)`.
    pub fn from_result(result: &dyn PollResult) -> Result<Self, ScrapeError> {
        let header = result.header_fields();
        let values = result.value_fields();
        if header.len() != values.len() {
            return Err(ScrapeError::Record(format!(
                "header has {} fields, values have {}",
                header.len(),
                values.len()
            )));
        }
        Ok(Self { header, values })
    }
}
