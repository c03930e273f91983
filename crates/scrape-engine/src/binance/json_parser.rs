//! Binance REST response parser.

use scrape_core::{OrderBookTop, ScrapeError, time_util};
use serde::Deserialize;

use crate::json_util;

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct BookTicker {
    bid_price: String,
    bid_qty: String,
    ask_price: String,
    ask_qty: String,
}

/// Parse a `bookTicker` response body.
pub fn parse_book_ticker(body: &str) -> Result<OrderBookTop, ScrapeError> {
    let t: BookTicker = json_util::decode(body)?;
    Ok(OrderBookTop {
        timestamp: time_util::now(),
        bid_price: t.bid_price,
        bid_quantity: t.bid_qty,
        ask_price: t.ask_price,
        ask_quantity: t.ask_qty,
    })
}
