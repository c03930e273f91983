//! Bybit v5 REST response parser.

use scrape_core::{OrderBookTop, ScrapeError, time_util};
use serde::Deserialize;
use serde_json::Value;

use crate::json_util;

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct Envelope {
    ret_msg: String,
    #[serde(default)]
    result: Option<BookResult>,
}

#[derive(Debug, Deserialize)]
struct BookResult {
    #[serde(default)]
    a: Vec<Value>,
    #[serde(default)]
    b: Vec<Value>,
}

/// Parse an orderbook response body.
///
/// `retMsg` must be `"OK"` and both sides must carry at least one level.
pub fn parse_order_book(body: &str) -> Result<OrderBookTop, ScrapeError> {
    let env: Envelope = json_util::decode(body)?;
    if env.ret_msg != "OK" {
        return Err(ScrapeError::Parse(format!("retMsg {:?}; body: {body}", env.ret_msg)));
    }
    let book = env
        .result
        .ok_or_else(|| ScrapeError::Parse(format!("missing result; body: {body}")))?;

    let (bid_price, bid_quantity) = json_util::first_level(&book.b)
        .ok_or_else(|| ScrapeError::Parse(format!("bids is empty; body: {body}")))?;
    let (ask_price, ask_quantity) = json_util::first_level(&book.a)
        .ok_or_else(|| ScrapeError::Parse(format!("asks is empty; body: {body}")))?;

    Ok(OrderBookTop {
        timestamp: time_util::now(),
        bid_price,
        bid_quantity,
        ask_price,
        ask_quantity,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parse_order_book_msg() {
        let json = r#"{"retCode":0,"retMsg":"OK","result":{"s":"BTCUSDT","a":[["65557.7","16.606555"],["65558","0.1"]],"b":[["65485.47","47.081829"]],"ts":1716863719031,"u":230704},"time":1716863719382}"#;
        let top = parse_order_book(json).unwrap();
        assert_eq!(top.bid_price, "65485.47");
        assert_eq!(top.bid_quantity, "47.081829");
        assert_eq!(top.ask_price, "65557.7");
        assert_eq!(top.ask_quantity, "16.606555");
    }

    #[test]
    fn not_ok_is_rejected() {
        let json = r#"{"retCode":10001,"retMsg":"params error","result":{}}"#;
        assert!(matches!(parse_order_book(json), Err(ScrapeError::Parse(_))));
    }

    #[test]
    fn empty_side_is_rejected() {
        let json = r#"{"retCode":0,"retMsg":"OK","result":{"a":[["1","1"]],"b":[]}}"#;
        let err = parse_order_book(json).unwrap_err();
        assert!(err.to_string().contains("bids is empty"));
    }
}
