//! Binance order book capability.
//!
//! Polls the spot book ticker (`/api/v3/ticker/bookTicker`), which returns
//! the best bid and ask for one symbol.

pub mod json_parser;

use anyhow::{Context, Result};
use async_trait::async_trait;
use scrape_core::{PollRequest, PollResult};

use crate::Capability;
use crate::http::HttpClient;

pub const BASE_URL: &str = "https://api.binance.com";
const ORDER_BOOK_PATH: &str = "/api/v3/ticker/bookTicker";

pub struct BinanceOrderBook {
    http: HttpClient,
    url: String,
}

impl BinanceOrderBook {
    pub fn new(http: HttpClient) -> Self {
        Self::with_base_url(http, BASE_URL)
    }

    /// Point the capability at another host (tests, mirrors).
    pub fn with_base_url(http: HttpClient, base_url: &str) -> Self {
        Self { http, url: format!("{}{ORDER_BOOK_PATH}", base_url.trim_end_matches('/')) }
    }
}

#[async_trait]
impl Capability for BinanceOrderBook {
    fn name(&self) -> &str {
        "binance_order_book"
    }

    async fn scrape(&self, request: &PollRequest) -> Result<Box<dyn PollResult>> {
        let body = self
            .http
            .get_text(&self.url, &[("symbol", request.symbol.as_str())])
            .await
            .context("binance book ticker request")?;
        let top = json_parser::parse_book_ticker(&body)?;
        Ok(Box::new(top))
    }
}

#[cfg(test)]
mod tests {
    use scrape_core::ScrapeError;

    use super::*;
    use crate::testing::{local_client, request_line, serve_once};

    #[tokio::test]
    async fn scrape_requests_book_ticker_and_decodes_it() {
        let body = r#"{"symbol":"BTCUSDT","bidPrice":"64010.01","bidQty":"1.2","askPrice":"64010.02","askQty":"0.4"}"#;
        let (base, head) = serve_once("200 OK", body).await;
        let cap = BinanceOrderBook::with_base_url(local_client(), &base);

        let result = cap.scrape(&PollRequest::new("BTCUSDT")).await.unwrap();

        assert_eq!(
            request_line(&head.await.unwrap()),
            "GET /api/v3/ticker/bookTicker?symbol=BTCUSDT HTTP/1.1"
        );
        assert_eq!(&result.value_fields()[1..], ["64010.01", "1.2", "64010.02", "0.4"]);
    }

    #[tokio::test]
    async fn server_error_surfaces_as_http_error() {
        let body = r#"{"code":-1003,"msg":"Too many requests"}"#;
        let (base, _head) = serve_once("500 Internal Server Error", body).await;
        let cap = BinanceOrderBook::with_base_url(local_client(), &base);

        let err = cap.scrape(&PollRequest::new("BTCUSDT")).await.err().unwrap();

        match err.downcast_ref::<ScrapeError>() {
            Some(ScrapeError::Http(msg)) => assert!(msg.contains("Too many requests"), "{msg}"),
            other => panic!("expected http error, got {other:?}"),
        }
    }
}
