//! Luno order book capability.
//!
//! Polls `/api/1/orderbook_top`. Luno lists bitcoin as `XBT`, so `BTC` in a
//! configured pair is rewritten before the request.

pub mod json_parser;

use anyhow::{Context, Result};
use async_trait::async_trait;
use scrape_core::{PollRequest, PollResult};

use crate::Capability;
use crate::http::HttpClient;

pub const BASE_URL: &str = "https://api.luno.com";
const ORDER_BOOK_PATH: &str = "/api/1/orderbook_top";

/// `(standard, luno)` asset code replacements; first match wins.
const ASSET_REPLACEMENTS: &[(&str, &str)] = &[("BTC", "XBT")];

pub struct LunoOrderBook {
    http: HttpClient,
    url: String,
}

impl LunoOrderBook {
    pub fn new(http: HttpClient) -> Self {
        Self::with_base_url(http, BASE_URL)
    }

    pub fn with_base_url(http: HttpClient, base_url: &str) -> Self {
        Self { http, url: format!("{}{ORDER_BOOK_PATH}", base_url.trim_end_matches('/')) }
    }
}

/// Convert a standard pair (e.g. `BTCZAR`) to Luno's code (`XBTZAR`).
pub fn to_luno_pair(symbol: &str) -> String {
    for (from, to) in ASSET_REPLACEMENTS {
        if symbol.contains(from) {
            return symbol.replace(from, to);
        }
    }
    symbol.to_string()
}

#[async_trait]
impl Capability for LunoOrderBook {
    fn name(&self) -> &str {
        "luno_order_book"
    }

    async fn scrape(&self, request: &PollRequest) -> Result<Box<dyn PollResult>> {
        let pair = to_luno_pair(&request.symbol);
        let body = self
            .http
            .get_text(&self.url, &[("pair", pair.as_str())])
            .await
            .context("luno orderbook_top request")?;
        let top = json_parser::parse_orderbook_top(&body)?;
        Ok(Box::new(top))
    }
}
