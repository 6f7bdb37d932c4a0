//! WebSocket client for the depth streams.
//!
//! Each subscription opens a dedicated raw-stream connection. A spawned
//! reader task parses frames into [`DepthUpdate`]s and forwards them over a
//! bounded channel in arrival order; it answers pings and exits when the
//! server closes, the transport errors, or the subscription is torn down.
//! Reconnecting is deliberately left to the consumer: a silently respawned
//! stream would hide the sequence discontinuity the book must react to.

use async_trait::async_trait;
use futures_util::{SinkExt, StreamExt};
use tokio::sync::{mpsc, oneshot};
use tokio_tungstenite::connect_async;
use tokio_tungstenite::tungstenite::Message;
use tracing::{debug, warn};

use crate::client::{DeltaSource, DeltaSubscription, SubscriptionHandle};
use crate::config::BookConfig;
use crate::error::Error;
use crate::types::messages::{DiffDepthEvent, PartialDepthEvent};
use crate::types::DepthUpdate;

/// Bound on undelivered updates before the reader applies backpressure
const EVENT_CHANNEL_CAPACITY: usize = 1024;

/// WebSocket client for the public depth streams
#[derive(Debug)]
pub struct BinanceStream {
    base_url: String,
}

impl BinanceStream {
    /// Create a new stream client
    pub fn new(config: &BookConfig) -> Self {
        Self {
            base_url: config.endpoints().websocket_base_url().to_string(),
        }
    }

    /// Build the raw stream name for a symbol and mode
    ///
    /// `btcusdt@depth` (diff), `btcusdt@depth20` (partial), with an optional
    /// `@100ms` interval suffix.
    fn stream_name(symbol: &str, limit: Option<u32>, update_interval_ms: Option<u32>) -> String {
        let mut name = format!("{}@depth", symbol.to_lowercase());
        if let Some(limit) = limit {
            name.push_str(&limit.to_string());
        }
        if let Some(interval) = update_interval_ms {
            name.push_str(&format!("@{}ms", interval));
        }
        name
    }
}

#[async_trait]
impl DeltaSource for BinanceStream {
    async fn subscribe(
        &self,
        symbol: &str,
        limit: Option<u32>,
        update_interval_ms: Option<u32>,
    ) -> Result<DeltaSubscription, Error> {
        let url = format!(
            "{}/{}",
            self.base_url,
            Self::stream_name(symbol, limit, update_interval_ms)
        );

        let (ws_stream, _response) = connect_async(url.as_str()).await?;
        debug!(%url, "depth stream connected");

        let (mut write, mut read) = ws_stream.split();
        let (event_tx, event_rx) = mpsc::channel(EVENT_CHANNEL_CAPACITY);
        let (close_tx, mut close_rx) = oneshot::channel::<()>();

        let task = tokio::spawn(async move {
            loop {
                tokio::select! {
                    _ = &mut close_rx => {
                        let _ = write.close().await;
                        break;
                    }
                    frame = read.next() => {
                        match frame {
                            Some(Ok(Message::Text(text))) => {
                                let parsed: Result<DepthUpdate, _> = if limit.is_some() {
                                    serde_json::from_str::<PartialDepthEvent>(&text)
                                        .map(DepthUpdate::from)
                                } else {
                                    serde_json::from_str::<DiffDepthEvent>(&text)
                                        .map(DepthUpdate::from)
                                };
                                match parsed {
                                    Ok(update) => {
                                        if event_tx.send(update).await.is_err() {
                                            break;
                                        }
                                    }
                                    Err(e) => {
                                        warn!(error = %e, "ignoring unparseable depth frame");
                                    }
                                }
                            }
                            Some(Ok(Message::Ping(data))) => {
                                if write.send(Message::Pong(data)).await.is_err() {
                                    break;
                                }
                            }
                            Some(Ok(Message::Close(_))) | None => {
                                debug!("depth stream closed by server");
                                break;
                            }
                            Some(Ok(_)) => {}
                            Some(Err(e)) => {
                                warn!(error = %e, "depth stream transport error");
                                break;
                            }
                        }
                    }
                }
            }
        });

        Ok(DeltaSubscription {
            events: event_rx,
            handle: SubscriptionHandle::new(close_tx, task),
        })
    }
}
