//! Error types for the binance-orderbook crate.
//!
//! The taxonomy distinguishes failures that abort `start()` (subscription,
//! snapshot fetch, timeout) from conditions handled internally: a sequence
//! gap triggers a transparent resync and is never surfaced as a hard error
//! once the book is synced.

use thiserror::Error;

/// Convenience alias used throughout the crate
pub type Result<T> = std::result::Result<T, Error>;

/// The main error type for this crate
#[derive(Debug, Error)]
pub enum Error {
    /// HTTP request failed
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    /// WebSocket transport error
    #[error("WebSocket error: {0}")]
    WebSocket(#[from] tokio_tungstenite::tungstenite::Error),

    /// JSON serialization/deserialization error
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// API returned a non-success response
    #[error("API error ({status}): {message}")]
    Api {
        /// HTTP status code
        status: u16,
        /// Response body as returned by the API
        message: String,
    },

    /// Subscribing to the depth stream failed; `start()` is aborted
    #[error("subscription failed")]
    Subscription(#[source] Box<Error>),

    /// Fetching the depth snapshot failed; the initial sync attempt is aborted
    #[error("snapshot fetch failed")]
    SnapshotFetch(#[source] Box<Error>),

    /// One or more updates were missed in the delta stream
    #[error("sequence gap: expected {expected}, got {got}")]
    SequenceGap {
        /// Expected first update id
        expected: u64,
        /// Actual first update id received
        got: u64,
    },

    /// The pre-sync delta buffer hit its hard cap before reconciliation
    #[error("delta buffer overflowed with {buffered} updates before reconciliation")]
    BufferOverflow {
        /// Number of updates buffered when the cap was hit
        buffered: usize,
    },

    /// Timed out waiting for the book to reach `Synced`
    #[error("timed out waiting for initial order book")]
    Timeout,

    /// Operation is not valid in the current status
    #[error("invalid state: {0}")]
    InvalidState(&'static str),

    /// Symbol failed validation
    #[error("invalid symbol: {0}")]
    InvalidSymbol(String),

    /// The depth stream closed unexpectedly
    #[error("connection closed")]
    ConnectionClosed,
}

impl Error {
    /// Wrap a transport error as a subscription failure
    pub(crate) fn subscription(err: Error) -> Self {
        Error::Subscription(Box::new(err))
    }

    /// Wrap a transport error as a snapshot fetch failure
    pub(crate) fn snapshot_fetch(err: Error) -> Self {
        Error::SnapshotFetch(Box::new(err))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_sequence_gap_display() {
        let err = Error::SequenceGap {
            expected: 102,
            got: 105,
        };
        assert!(err.to_string().contains("102"));
        assert!(err.to_string().contains("105"));
    }

    #[test]
    fn test_snapshot_fetch_keeps_source() {
        let err = Error::snapshot_fetch(Error::Api {
            status: 503,
            message: "unavailable".to_string(),
        });
        let source = std::error::Error::source(&err).expect("source");
        assert!(source.to_string().contains("503"));
    }

    #[test]
    fn test_buffer_overflow_display() {
        let err = Error::BufferOverflow { buffered: 2000 };
        assert!(err.to_string().contains("2000"));
    }
}
