//! Luno REST response parser.

use scrape_core::{OrderBookTop, ScrapeError, time_util};
use serde::Deserialize;

use crate::json_util;

#[derive(Debug, Deserialize)]
struct Order {
    price: String,
    volume: String,
}

#[derive(Debug, Deserialize)]
struct OrderBookTopResponse {
    #[serde(default)]
    asks: Vec<Order>,
    #[serde(default)]
    bids: Vec<Order>,
}

/// Parse an `orderbook_top` response body; both sides must be non-empty.
pub fn parse_orderbook_top(body: &str) -> Result<OrderBookTop, ScrapeError> {
    let resp: OrderBookTopResponse = json_util::decode(body)?;
    let bid = resp
        .bids
        .into_iter()
        .next()
        .ok_or_else(|| ScrapeError::Parse(format!("expected at least one bid; body: {body}")))?;
    let ask = resp
        .asks
        .into_iter()
        .next()
        .ok_or_else(|| ScrapeError::Parse(format!("expected at least one ask; body: {body}")))?;

    Ok(OrderBookTop {
        timestamp: time_util::now(),
        bid_price: bid.price,
        bid_quantity: bid.volume,
        ask_price: ask.price,
        ask_quantity: ask.volume,
    })
}
