//! Order book: the price ladder, the sequence gate, and the synchronizer
//! that drives them from a snapshot source and a delta stream.

pub mod gate;
pub mod ladder;
pub mod sync;

pub use gate::{GateDecision, Reconciliation, SequenceGate};
pub use ladder::PriceLadder;
pub use sync::{OrderBookSynchronizer, SyncStatus};
