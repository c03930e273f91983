//! # scrape-engine
//!
//! Job scheduling and fan-out/fan-in dispatch for periodic exchange polling.
//!
//! ## Architecture
//!
//! ```text
//! ScrapeTree ──► Manager.plan()  ──► one Job per resolvable leaf
//!            ──► Manager.run()   ──► [Scheduler + OutputPipeline + Capability] per Job
//! cancel     ──► Schedulers stop ──► in-flight firings joined ──► pipelines drain ──► sinks closed
//! ```
//!
//! ## Components
//!
//! - [`scheduler`]: fixed-interval firing with a per-job in-flight bound
//! - [`registry`]: immutable `(exchange, data type) -> Capability` map
//! - [`pipeline`]: bounded queue + single consumer per sink
//! - [`job`]: one `(exchange, data type, symbol)` poller
//! - [`manager`]: expands the tree and runs every job to completion
//! - [`binance`], [`bybit`], [`luno`]: order book capabilities
//! - [`http`]: shared REST client

pub mod binance;
pub mod bybit;
pub mod http;
pub mod job;
pub mod json_util;
pub mod luno;
pub mod manager;
pub mod pipeline;
pub mod registry;
pub mod scheduler;

#[cfg(test)]
mod testing;

use anyhow::Result;
use async_trait::async_trait;
use scrape_core::{PollRequest, PollResult};

/// Polling logic for one `(exchange, data type)` pair.
///
/// Implementations are shared across all jobs of that pair, so `scrape`
/// takes `&self` and may run concurrently.
#[async_trait]
pub trait Capability: Send + Sync {
    /// Human-readable name (e.g. `"binance_order_book"`).
    fn name(&self) -> &str;
    /// Fetch one observation for `request.symbol`.
    async fn scrape(&self, request: &PollRequest) -> Result<Box<dyn PollResult>>;
}
