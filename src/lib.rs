//! # binance-orderbook
//!
//! A self-synchronizing local order book for a single Binance spot symbol.
//!
//! The book combines a one-shot REST depth snapshot with the diff-depth
//! WebSocket stream, reconciles the two by update-id range, and keeps the
//! ladder current through validated incremental updates. Missed updates are
//! detected as sequence gaps and repaired by a transparent resync; readers
//! never observe a partially-reconciled book.
//!
//! ## Features
//!
//! - **Two modes**: full-depth incremental (snapshot + diffs) or fixed-depth
//!   (each stream message replaces the top N levels, no REST call)
//! - **Exact prices**: `rust_decimal::Decimal` end to end, no floats
//! - **Gap recovery**: automatic resync on stream discontinuity
//! - **Observable**: a `watch`-based status stream for state transitions
//! - **Testable**: the synchronizer is generic over its snapshot and delta
//!   sources
//!
//! ## Quick Start
//!
//! ```rust,no_run
//! use binance_orderbook::{BookConfig, OrderBookSynchronizer};
//!
//! #[tokio::main]
//! async fn main() -> Result<(), binance_orderbook::Error> {
//!     let book = OrderBookSynchronizer::binance(BookConfig::new("BTCUSDT"))?;
//!     book.start().await?;
//!
//!     if let (Some(bid), Some(ask)) = (book.best_bid(), book.best_ask()) {
//!         println!("{} / {}", bid.price, ask.price);
//!     }
//!
//!     book.dispose().await;
//!     Ok(())
//! }
//! ```
//!
//! ## Architecture
//!
//! - [`orderbook`] - the price ladder, the sequence gate, and the
//!   synchronizer driving them
//! - [`client`] - REST and WebSocket clients, plus the source traits the
//!   synchronizer is generic over
//! - [`types`] - wire types for the snapshot endpoint and the depth streams
//! - [`config`] - per-book configuration
//! - [`error`] - error types for the crate

#![warn(missing_docs)]
#![deny(unsafe_code)]

pub mod client;
pub mod config;
pub mod error;
pub mod orderbook;
pub mod types;

pub use client::{BinanceRest, BinanceStream, DeltaSource, DeltaSubscription, SnapshotSource};
pub use config::{BookConfig, Endpoints};
pub use error::{Error, Result};
pub use orderbook::{OrderBookSynchronizer, PriceLadder, SyncStatus};
pub use types::{DepthSnapshot, DepthUpdate, Price, PriceLevel, Quantity, UpdateId};

/// A synchronizer wired to the production API clients
pub type BinanceOrderBook = OrderBookSynchronizer<BinanceRest, BinanceStream>;
