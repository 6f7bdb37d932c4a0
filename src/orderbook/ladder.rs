//! Core price ladder data structure.
//!
//! This implementation uses `BTreeMap` for sorted price levels, providing:
//!
//! - O(log n) insertion, deletion, and lookup
//! - O(1) access to best bid/ask (via `first_key_value` / `last_key_value`)
//! - Ordered iteration for depth-of-book queries

use std::collections::BTreeMap;

use rust_decimal::Decimal;

use crate::types::{DepthUpdate, Price, PriceLevel, Quantity, UpdateId};

/// Price ladder for a single symbol: both book sides plus a sequence marker.
///
/// # Design Decisions
///
/// 1. **Decimal prices**: Prices and quantities are `rust_decimal::Decimal`,
///    matching the API's string serialization exactly and avoiding
///    floating-point comparison bugs at the uniqueness key.
///
/// 2. **BTreeMap**: Provides sorted price levels with O(log n) operations.
///    Best bid/ask are O(1) via `last_key_value()` / `first_key_value()`.
///
/// 3. **Zero removes**: A zero-quantity level is a removal instruction; the
///    ladder never stores one.
///
/// # Thread Safety
///
/// This struct is `Send + Sync` but not internally synchronized. The
/// synchronizer wraps it in `parking_lot::RwLock`.
#[derive(Debug, Clone, Default)]
pub struct PriceLadder {
    /// Bid levels: price -> quantity, best bid = highest = last
    bids: BTreeMap<Price, Quantity>,

    /// Ask levels: price -> quantity, best ask = lowest = first
    asks: BTreeMap<Price, Quantity>,

    /// Update id the ladder currently reflects
    last_update_id: UpdateId,
}

impl PriceLadder {
    /// Create a new empty ladder
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Get the update id the ladder currently reflects
    #[must_use]
    pub const fn last_update_id(&self) -> UpdateId {
        self.last_update_id
    }

    /// Replace the entire ladder content from a snapshot
    ///
    /// Zero-quantity levels in the input are skipped, never stored.
    pub fn seed(&mut self, last_update_id: UpdateId, bids: &[PriceLevel], asks: &[PriceLevel]) {
        self.bids.clear();
        self.asks.clear();

        for level in bids {
            if !level.quantity.is_zero() {
                self.bids.insert(level.price, level.quantity);
            }
        }
        for level in asks {
            if !level.quantity.is_zero() {
                self.asks.insert(level.price, level.quantity);
            }
        }

        self.last_update_id = last_update_id;
    }

    /// Apply the level changes of a depth update
    ///
    /// For each level: zero quantity removes the price if present (no-op if
    /// absent), any other quantity inserts or overwrites. The caller is
    /// responsible for sequence ordering; this method never fails.
    pub fn apply(&mut self, update: &DepthUpdate) {
        for level in &update.bids {
            Self::apply_level(&mut self.bids, level);
        }
        for level in &update.asks {
            Self::apply_level(&mut self.asks, level);
        }
        self.last_update_id = update.last_update_id;
    }

    fn apply_level(side: &mut BTreeMap<Price, Quantity>, level: &PriceLevel) {
        if level.quantity.is_zero() {
            side.remove(&level.price);
        } else {
            side.insert(level.price, level.quantity);
        }
    }

    /// Get the best (highest) bid
    #[must_use]
    pub fn best_bid(&self) -> Option<PriceLevel> {
        self.bids
            .last_key_value()
            .map(|(&price, &quantity)| PriceLevel { price, quantity })
    }

    /// Get the best (lowest) ask
    #[must_use]
    pub fn best_ask(&self) -> Option<PriceLevel> {
        self.asks
            .first_key_value()
            .map(|(&price, &quantity)| PriceLevel { price, quantity })
    }

    /// Get the mid price, or `None` if either side is empty
    #[must_use]
    pub fn mid_price(&self) -> Option<Price> {
        match (self.best_bid(), self.best_ask()) {
            (Some(bid), Some(ask)) => Some((bid.price + ask.price) / Decimal::TWO),
            _ => None,
        }
    }

    /// Get the spread, or `None` if either side is empty
    #[must_use]
    pub fn spread(&self) -> Option<Price> {
        match (self.best_bid(), self.best_ask()) {
            (Some(bid), Some(ask)) => Some(ask.price - bid.price),
            _ => None,
        }
    }

    /// Check if the book is crossed (best bid >= best ask)
    ///
    /// This shouldn't happen in a healthy market but is useful for validation.
    #[must_use]
    pub fn is_crossed(&self) -> bool {
        match (self.best_bid(), self.best_ask()) {
            (Some(bid), Some(ask)) => bid.price >= ask.price,
            _ => false,
        }
    }

    /// Get all bid levels, best (highest) first
    pub fn bids(&self) -> impl Iterator<Item = PriceLevel> + '_ {
        self.bids
            .iter()
            .rev()
            .map(|(&price, &quantity)| PriceLevel { price, quantity })
    }

    /// Get all ask levels, best (lowest) first
    pub fn asks(&self) -> impl Iterator<Item = PriceLevel> + '_ {
        self.asks
            .iter()
            .map(|(&price, &quantity)| PriceLevel { price, quantity })
    }

    /// Get the top N bid levels
    #[must_use]
    pub fn top_bids(&self, n: usize) -> Vec<PriceLevel> {
        self.bids().take(n).collect()
    }

    /// Get the top N ask levels
    #[must_use]
    pub fn top_asks(&self, n: usize) -> Vec<PriceLevel> {
        self.asks().take(n).collect()
    }

    /// Empty both sides and reset the sequence marker
    pub fn clear(&mut self) {
        self.bids.clear();
        self.asks.clear();
        self.last_update_id = 0;
    }

    /// Check if both sides are empty
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.bids.is_empty() && self.asks.is_empty()
    }

    /// Get the number of (bid, ask) price levels
    #[must_use]
    pub fn num_levels(&self) -> (usize, usize) {
        (self.bids.len(), self.asks.len())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn lvl(price: i64, quantity: i64) -> PriceLevel {
        PriceLevel::new(Decimal::from(price), Decimal::from(quantity))
    }

    fn update(last: UpdateId, bids: Vec<PriceLevel>, asks: Vec<PriceLevel>) -> DepthUpdate {
        DepthUpdate {
            first_update_id: Some(last),
            last_update_id: last,
            bids,
            asks,
        }
    }

    #[test]
    fn test_seed_replaces_content() {
        let mut ladder = PriceLadder::new();
        ladder.seed(10, &[lvl(100, 5)], &[lvl(101, 3)]);
        ladder.seed(20, &[lvl(99, 1)], &[lvl(102, 2)]);

        assert_eq!(ladder.last_update_id(), 20);
        assert_eq!(ladder.best_bid(), Some(lvl(99, 1)));
        assert_eq!(ladder.best_ask(), Some(lvl(102, 2)));
        assert_eq!(ladder.num_levels(), (1, 1));
    }

    #[test]
    fn test_seed_skips_zero_quantities() {
        let mut ladder = PriceLadder::new();
        ladder.seed(5, &[lvl(100, 0), lvl(99, 2)], &[]);

        assert_eq!(ladder.num_levels(), (1, 0));
        assert_eq!(ladder.best_bid(), Some(lvl(99, 2)));
    }

    #[test]
    fn test_apply_insert_update_remove() {
        let mut ladder = PriceLadder::new();
        ladder.seed(1, &[lvl(100, 5)], &[lvl(101, 3)]);

        // Insert a new level and overwrite an existing one
        ladder.apply(&update(2, vec![lvl(99, 7), lvl(100, 4)], vec![]));
        assert_eq!(ladder.best_bid(), Some(lvl(100, 4)));
        assert_eq!(ladder.num_levels(), (2, 1));

        // Zero removes
        ladder.apply(&update(3, vec![lvl(100, 0)], vec![]));
        assert_eq!(ladder.best_bid(), Some(lvl(99, 7)));
        assert_eq!(ladder.last_update_id(), 3);
    }

    #[test]
    fn test_zero_quantity_on_absent_level_is_noop() {
        let mut ladder = PriceLadder::new();
        ladder.seed(1, &[lvl(100, 5)], &[]);

        ladder.apply(&update(2, vec![lvl(98, 0)], vec![]));
        assert_eq!(ladder.num_levels(), (1, 0));
    }

    #[test]
    fn test_side_ordering() {
        let mut ladder = PriceLadder::new();
        ladder.seed(
            1,
            &[lvl(98, 1), lvl(100, 1), lvl(99, 1)],
            &[lvl(103, 1), lvl(101, 1), lvl(102, 1)],
        );

        let bid_prices: Vec<_> = ladder.bids().map(|l| l.price).collect();
        let ask_prices: Vec<_> = ladder.asks().map(|l| l.price).collect();

        assert!(bid_prices.windows(2).all(|w| w[0] > w[1]));
        assert!(ask_prices.windows(2).all(|w| w[0] < w[1]));
    }

    #[test]
    fn test_mid_price_and_spread() {
        let mut ladder = PriceLadder::new();
        ladder.seed(1, &[lvl(99, 1)], &[lvl(101, 1)]);

        assert_eq!(ladder.mid_price(), Some(Decimal::from(100)));
        assert_eq!(ladder.spread(), Some(Decimal::from(2)));
        assert!(!ladder.is_crossed());
    }

    #[test]
    fn test_crossed_book() {
        let mut ladder = PriceLadder::new();
        ladder.seed(1, &[lvl(102, 1)], &[lvl(101, 1)]);
        assert!(ladder.is_crossed());
    }

    #[test]
    fn test_top_levels() {
        let mut ladder = PriceLadder::new();
        ladder.seed(1, &[lvl(97, 1), lvl(98, 2), lvl(99, 3)], &[]);

        let top = ladder.top_bids(2);
        assert_eq!(top, vec![lvl(99, 3), lvl(98, 2)]);
    }

    #[test]
    fn test_clear() {
        let mut ladder = PriceLadder::new();
        ladder.seed(7, &[lvl(100, 1)], &[lvl(101, 1)]);
        ladder.clear();

        assert!(ladder.is_empty());
        assert_eq!(ladder.last_update_id(), 0);
        assert_eq!(ladder.best_bid(), None);
    }
}
