//! Bybit order book capability.
//!
//! Polls `/v5/market/orderbook` for the spot category and keeps the first
//! level of each side.

pub mod json_parser;

use anyhow::{Context, Result};
use async_trait::async_trait;
use scrape_core::{PollRequest, PollResult};

use crate::Capability;
use crate::http::HttpClient;

pub const BASE_URL: &str = "https://api.bybit.com";
const ORDER_BOOK_PATH: &str = "/v5/market/orderbook";

pub struct BybitOrderBook {
    http: HttpClient,
    url: String,
}

impl BybitOrderBook {
    pub fn new(http: HttpClient) -> Self {
        Self::with_base_url(http, BASE_URL)
    }

    pub fn with_base_url(http: HttpClient, base_url: &str) -> Self {
        Self { http, url: format!("{}{ORDER_BOOK_PATH}", base_url.trim_end_matches('/')) }
    }
}

#[async_trait]
impl Capability for BybitOrderBook {
    fn name(&self) -> &str {
        "bybit_order_book"
    }

    async fn scrape(&self, request: &PollRequest) -> Result<Box<dyn PollResult>> {
        let body = self
            .http
            .get_text(&self.url, &[("category", "spot"), ("symbol", request.symbol.as_str())])
            .await
            .context("bybit orderbook request")?;
        let top = json_parser::parse_order_book(&body)?;
        Ok(Box::new(top))
    }
}
