//! Core data types: identifiers, poll targets and records, market data.

pub mod enums;
pub mod market_data;
pub mod poll;

pub use enums::*;
pub use market_data::*;
pub use poll::*;
