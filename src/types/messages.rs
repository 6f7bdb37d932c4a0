//! Wire types for the depth snapshot endpoint and the depth streams.
//!
//! Two stream shapes exist:
//!
//! - Diff-depth (`<symbol>@depth`): incremental changes carrying a
//!   contiguous `U..=u` update-id range.
//! - Partial-depth (`<symbol>@depth<levels>`): each message is a full top-N
//!   replacement tagged with a single update id.
//!
//! Both normalize into [`DepthUpdate`], the only shape the sequence gate
//! consumes.

use serde::Deserialize;

use super::{PriceLevel, UpdateId};

/// REST depth snapshot (`GET /api/v3/depth`)
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DepthSnapshot {
    /// Position of this snapshot in the update stream
    pub last_update_id: UpdateId,
    /// Bid levels, best first
    pub bids: Vec<PriceLevel>,
    /// Ask levels, best first
    pub asks: Vec<PriceLevel>,
}

/// Diff-depth stream event
#[derive(Debug, Clone, Deserialize)]
pub struct DiffDepthEvent {
    /// Event type, always `depthUpdate`
    #[serde(rename = "e")]
    pub event_type: String,
    /// Event time in milliseconds
    #[serde(rename = "E")]
    pub event_time: u64,
    /// Symbol
    #[serde(rename = "s")]
    pub symbol: String,
    /// First update id covered by this event
    #[serde(rename = "U")]
    pub first_update_id: UpdateId,
    /// Last update id covered by this event
    #[serde(rename = "u")]
    pub last_update_id: UpdateId,
    /// Bid levels to change
    #[serde(rename = "b")]
    pub bids: Vec<PriceLevel>,
    /// Ask levels to change
    #[serde(rename = "a")]
    pub asks: Vec<PriceLevel>,
}

/// Partial-depth stream event: a full top-N replacement
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PartialDepthEvent {
    /// Position of this replacement in the update stream
    pub last_update_id: UpdateId,
    /// Full bid ladder, best first
    pub bids: Vec<PriceLevel>,
    /// Full ask ladder, best first
    pub asks: Vec<PriceLevel>,
}

/// Normalized depth update consumed by the sequence gate
///
/// `first_update_id` is `Some` for diff-depth events and `None` for
/// partial-depth replacements; the gate uses its presence to pick the
/// validation rule.
#[derive(Debug, Clone)]
pub struct DepthUpdate {
    /// First update id covered, absent for full replacements
    pub first_update_id: Option<UpdateId>,
    /// Last update id covered
    pub last_update_id: UpdateId,
    /// Bid level changes (or the full bid ladder for replacements)
    pub bids: Vec<PriceLevel>,
    /// Ask level changes (or the full ask ladder for replacements)
    pub asks: Vec<PriceLevel>,
}

impl DepthUpdate {
    /// First update id covered, falling back to the last for replacements
    pub fn first_id(&self) -> UpdateId {
        self.first_update_id.unwrap_or(self.last_update_id)
    }
}

impl From<DiffDepthEvent> for DepthUpdate {
    fn from(event: DiffDepthEvent) -> Self {
        Self {
            first_update_id: Some(event.first_update_id),
            last_update_id: event.last_update_id,
            bids: event.bids,
            asks: event.asks,
        }
    }
}

impl From<PartialDepthEvent> for DepthUpdate {
    fn from(event: PartialDepthEvent) -> Self {
        Self {
            first_update_id: None,
            last_update_id: event.last_update_id,
            bids: event.bids,
            asks: event.asks,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_diff_depth_event() {
        let json = r#"{
            "e": "depthUpdate",
            "E": 1672515782136,
            "s": "BNBBTC",
            "U": 157,
            "u": 160,
            "b": [["0.0024", "10"]],
            "a": [["0.0026", "100"]]
        }"#;

        let event: DiffDepthEvent = serde_json::from_str(json).unwrap();
        assert_eq!(event.first_update_id, 157);
        assert_eq!(event.last_update_id, 160);
        assert_eq!(event.bids.len(), 1);

        let update = DepthUpdate::from(event);
        assert_eq!(update.first_id(), 157);
    }

    #[test]
    fn test_parse_partial_depth_event() {
        let json = r#"{
            "lastUpdateId": 160,
            "bids": [["0.0024", "10"], ["0.0022", "5"]],
            "asks": [["0.0026", "100"]]
        }"#;

        let event: PartialDepthEvent = serde_json::from_str(json).unwrap();
        let update = DepthUpdate::from(event);
        assert_eq!(update.first_update_id, None);
        assert_eq!(update.first_id(), 160);
        assert_eq!(update.bids.len(), 2);
    }

    #[test]
    fn test_parse_snapshot() {
        let json = r#"{
            "lastUpdateId": 1027024,
            "bids": [["4.00000000", "431.00000000"]],
            "asks": [["4.00000200", "12.00000000"]]
        }"#;

        let snapshot: DepthSnapshot = serde_json::from_str(json).unwrap();
        assert_eq!(snapshot.last_update_id, 1027024);
        assert_eq!(snapshot.bids.len(), 1);
        assert_eq!(snapshot.asks.len(), 1);
    }
}
