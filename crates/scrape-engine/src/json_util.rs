//! Shared JSON decoding helpers used by the exchange capabilities.

use scrape_core::ScrapeError;
use serde::de::DeserializeOwned;
use serde_json::Value;

/// Decode `body` into `T`, keeping the body in the error for diagnosis.
pub fn decode<T: DeserializeOwned>(body: &str) -> Result<T, ScrapeError> {
    serde_json::from_str(body).map_err(|e| ScrapeError::Parse(format!("{e}; body: {body}")))
}

/// Read a JSON value (string or number) as its decimal string form.
///
/// Exchanges encode prices either as `"30000.5"` or `30000.5`; both are
/// kept verbatim.
#[inline]
pub fn as_decimal_string(v: Option<&Value>) -> Option<String> {
    let v = v?;
    if let Some(s) = v.as_str() {
        Some(s.to_string())
    } else if v.is_number() {
        Some(v.to_string())
    } else {
        None
    }
}

/// First `[price, size, ...]` level of a book side.
pub fn first_level(side: &[Value]) -> Option<(String, String)> {
    let level = side.first()?.as_array()?;
    Some((as_decimal_string(level.first())?, as_decimal_string(level.get(1))?))
}
