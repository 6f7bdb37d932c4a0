//! API clients: the REST snapshot endpoint and the depth stream.
//!
//! The synchronizer talks to these through the [`SnapshotSource`] and
//! [`DeltaSource`] traits so its logic can be tested against in-process
//! feeds. [`BinanceRest`] and [`BinanceStream`] are the production
//! implementations.

pub mod rest;
pub mod websocket;

use async_trait::async_trait;
use tokio::sync::{mpsc, oneshot};
use tokio::task::JoinHandle;
use tracing::debug;

use crate::error::Error;
use crate::types::{DepthSnapshot, DepthUpdate};

pub use rest::BinanceRest;
pub use websocket::BinanceStream;

/// Source of one-shot depth snapshots
#[async_trait]
pub trait SnapshotSource: Send + Sync + 'static {
    /// Fetch the current depth snapshot for a symbol
    async fn fetch_snapshot(&self, symbol: &str, depth: u32) -> Result<DepthSnapshot, Error>;
}

/// Source of streamed depth updates
#[async_trait]
pub trait DeltaSource: Send + Sync + 'static {
    /// Subscribe to the depth stream for a symbol
    ///
    /// `limit` selects the partial-depth stream (full top-N replacements);
    /// `None` selects the diff-depth stream. `update_interval_ms` picks the
    /// server-side conflation interval where the stream supports one.
    async fn subscribe(
        &self,
        symbol: &str,
        limit: Option<u32>,
        update_interval_ms: Option<u32>,
    ) -> Result<DeltaSubscription, Error>;
}

/// An active depth stream subscription
///
/// Updates arrive on `events` in stream order. The channel closing means
/// the subscription is gone for good; the producer never reconnects behind
/// the consumer's back.
pub struct DeltaSubscription {
    /// Stream-ordered depth updates
    pub events: mpsc::Receiver<DepthUpdate>,
    /// Handle that tears the subscription down
    pub handle: SubscriptionHandle,
}

/// Tears down the producer side of a subscription
///
/// Dropping the handle without calling [`SubscriptionHandle::unsubscribe`]
/// has the same effect; unsubscribe just does it eagerly.
pub struct SubscriptionHandle {
    closer: Option<oneshot::Sender<()>>,
    task: Option<JoinHandle<()>>,
}

impl SubscriptionHandle {
    /// Create a handle for a producer task listening on `closer`
    pub fn new(closer: oneshot::Sender<()>, task: JoinHandle<()>) -> Self {
        Self {
            closer: Some(closer),
            task: Some(task),
        }
    }

    /// Create a handle with nothing to tear down, for producers whose
    /// lifetime is tied to the event channel alone
    pub fn detached() -> Self {
        Self {
            closer: None,
            task: None,
        }
    }

    /// Tear down the producer
    ///
    /// Signals a graceful close first, then aborts the task so a wedged
    /// producer cannot outlive its subscription.
    pub fn unsubscribe(mut self) {
        if let Some(closer) = self.closer.take() {
            let _ = closer.send(());
        }
        if let Some(task) = self.task.take() {
            task.abort();
            debug!("depth stream subscription torn down");
        }
    }
}

impl Drop for SubscriptionHandle {
    fn drop(&mut self) {
        if let Some(closer) = self.closer.take() {
            let _ = closer.send(());
        }
        if let Some(task) = self.task.take() {
            task.abort();
        }
    }
}

impl std::fmt::Debug for SubscriptionHandle {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SubscriptionHandle")
            .field("active", &self.task.is_some())
            .finish()
    }
}
