//! Market data observations produced by exchange capabilities.

use chrono::{DateTime, Utc};

use crate::time_util;
use crate::types::poll::PollResult;

/// Column names for [`OrderBookTop`] rows.
pub const ORDER_BOOK_HEADER: [&str; 5] =
    ["timestamp", "bidPrice", "bidQuantity", "askPrice", "askQuantity"];

/// Best bid / best ask snapshot.
///
/// Prices and quantities keep the exchange's decimal strings verbatim so no
/// precision is lost on the way to the sink. `timestamp` is local receipt
/// time.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OrderBookTop {
    pub timestamp: DateTime<Utc>,
    pub bid_price: String,
    pub bid_quantity: String,
    pub ask_price: String,
    pub ask_quantity: String,
}

impl PollResult for OrderBookTop {
    fn header_fields(&self) -> Vec<String> {
        ORDER_BOOK_HEADER.iter().map(|s| s.to_string()).collect()
    }

    fn value_fields(&self) -> Vec<String> {
        vec![
            time_util::format_rfc3339_nanos(&self.timestamp),
            self.bid_price.clone(),
            self.bid_quantity.clone(),
            self.ask_price.clone(),
            self.ask_quantity.clone(),
        ]
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::poll::Record;
    use chrono::TimeZone;

    #[test]
    fn order_book_row_matches_header() {
        let top = OrderBookTop {
            timestamp: Utc.with_ymd_and_hms(2024, 3, 1, 0, 0, 0).unwrap(),
            bid_price: "64000.10".into(),
            bid_quantity: "0.5".into(),
            ask_price: "64000.20".into(),
            ask_quantity: "1.25".into(),
        };
        let record = Record::from_result(&top).unwrap();
        assert_eq!(record.header, ORDER_BOOK_HEADER);
        assert_eq!(
            record.values,
            vec!["2024-03-01T00:00:00.000000000Z", "64000.10", "0.5", "64000.20", "1.25"]
        );
    }
}
