//! Data types shared across the crate.
//!
//! - [`messages`] - wire types for the depth snapshot endpoint and streams
//! - [`PriceLevel`] - one (price, quantity) entry of a book side
//!
//! Prices and quantities are [`rust_decimal::Decimal`]: the API serializes
//! them as strings, and a book must compare them exactly. Floats are never
//! used.

pub mod messages;

use serde::{Deserialize, Serialize};

use crate::error::Error;

pub use messages::{DepthSnapshot, DepthUpdate};

/// Price of a level
pub type Price = rust_decimal::Decimal;

/// Quantity resting at a level
pub type Quantity = rust_decimal::Decimal;

/// Sequence id identifying an update's position in the depth stream
pub type UpdateId = u64;

/// One price level of a book side
///
/// Deserializes from the API's `["price", "quantity"]` string pairs.
/// A quantity of zero means "remove this price level".
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(from = "(Price, Quantity)", into = "(Price, Quantity)")]
pub struct PriceLevel {
    /// Price, the uniqueness key within a side
    pub price: Price,
    /// Quantity resting at this price
    pub quantity: Quantity,
}

impl PriceLevel {
    /// Create a new price level
    pub fn new(price: Price, quantity: Quantity) -> Self {
        Self { price, quantity }
    }
}

impl From<(Price, Quantity)> for PriceLevel {
    fn from((price, quantity): (Price, Quantity)) -> Self {
        Self { price, quantity }
    }
}

impl From<PriceLevel> for (Price, Quantity) {
    fn from(level: PriceLevel) -> Self {
        (level.price, level.quantity)
    }
}

/// Validate a symbol before it is used in a request or stream name
///
/// Symbols are 1-20 characters of uppercase letters, digits, `-`, `_` or `.`.
pub fn validate_symbol(symbol: &str) -> Result<(), Error> {
    let valid = !symbol.is_empty()
        && symbol.len() <= 20
        && symbol
            .chars()
            .all(|c| c.is_ascii_uppercase() || c.is_ascii_digit() || matches!(c, '-' | '_' | '.'));

    if valid {
        Ok(())
    } else {
        Err(Error::InvalidSymbol(symbol.to_string()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal::Decimal;

    #[test]
    fn test_price_level_from_string_pair() {
        let level: PriceLevel = serde_json::from_str(r#"["0.00241000","431.00000000"]"#).unwrap();
        assert_eq!(level.price, "0.00241".parse::<Decimal>().unwrap());
        assert_eq!(level.quantity, Decimal::from(431));
    }

    #[test]
    fn test_validate_symbol() {
        assert!(validate_symbol("BTCUSDT").is_ok());
        assert!(validate_symbol("1000SHIBUSDT").is_ok());
        assert!(validate_symbol("").is_err());
        assert!(validate_symbol("btcusdt").is_err());
        assert!(validate_symbol("BTC USDT").is_err());
        assert!(validate_symbol("AVERYLONGSYMBOLNAMEXX").is_err());
    }
}
