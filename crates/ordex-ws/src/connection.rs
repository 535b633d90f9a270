//! Websocket connection driver.
//!
//! Connects, subscribes, and pumps messages through the gap detector to a
//! consumer channel. The driver runs one connection to completion and
//! returns the reason it ended; the caller owns the reconnect policy.

use crate::error::{WsError, WsResult};
use crate::gap::GapDetector;
use crate::heartbeat::Heartbeat;
use futures_util::{SinkExt, StreamExt};
use serde::Deserialize;
use serde_json::json;
use std::sync::Arc;
use tokio::sync::mpsc;
use tokio_tungstenite::connect_async;
use tokio_tungstenite::tungstenite::Message;
use tokio_util::sync::CancellationToken;

#[derive(Debug, Clone)]
pub struct FeedConfig {
    pub url: String,
    /// Topics to subscribe, e.g. `execution`, `position`.
    pub topics: Vec<String>,
}

/// One routed message from a subscribed topic.
#[derive(Debug, Clone, Deserialize)]
pub struct FeedMessage {
    pub topic: String,
    #[serde(default)]
    pub seq: Option<u64>,
    #[serde(default)]
    pub data: serde_json::Value,
}

pub struct FeedConnection {
    config: FeedConfig,
    gap: Arc<GapDetector>,
}

impl FeedConnection {
    pub fn new(config: FeedConfig, gap: Arc<GapDetector>) -> Self {
        Self { config, gap }
    }

    /// Drive one connection until it dies, the venue closes it, or the
    /// token is cancelled. Sequenced messages that fail the gap check are
    /// never forwarded.
    pub async fn run(
        &self,
        out: mpsc::Sender<FeedMessage>,
        shutdown: CancellationToken,
    ) -> WsResult<()> {
        let (stream, _) = connect_async(&self.config.url).await?;
        let (mut write, mut read) = stream.split();

        let subscribe = json!({ "op": "subscribe", "args": self.config.topics });
        write.send(Message::Text(subscribe.to_string())).await?;
        tracing::info!(url = %self.config.url, topics = ?self.config.topics, "feed connected");

        let mut heartbeat = Heartbeat::new();
        let mut ping_timer = tokio::time::interval(heartbeat.ping_interval());
        ping_timer.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Delay);
        // First tick fires immediately; consume it.
        ping_timer.tick().await;

        let result = loop {
            tokio::select! {
                _ = shutdown.cancelled() => {
                    let _ = write.send(Message::Close(None)).await;
                    break Ok(());
                }
                _ = ping_timer.tick() => {
                    if let Err(err) = heartbeat.check() {
                        break Err(err);
                    }
                    write.send(Message::Ping(Vec::new())).await?;
                    heartbeat.record_ping();
                }
                frame = read.next() => {
                    match frame {
                        None => break Err(WsError::Closed),
                        Some(Err(err)) => break Err(err.into()),
                        Some(Ok(msg)) => {
                            heartbeat.record_activity();
                            if let Some(feed_msg) = self.handle_frame(msg).await? {
                                if out.send(feed_msg).await.is_err() {
                                    // Consumer gone; nothing left to feed.
                                    break Ok(());
                                }
                            }
                        }
                    }
                }
            }
        };

        self.gap.on_disconnect();
        result
    }

    async fn handle_frame(&self, msg: Message) -> WsResult<Option<FeedMessage>> {
        let text = match msg {
            Message::Text(text) => text,
            Message::Pong(_) | Message::Ping(_) => return Ok(None),
            Message::Close(_) => return Err(WsError::Closed),
            _ => return Ok(None),
        };

        // Subscription confirmations and pong replies have no topic.
        let Ok(feed_msg) = serde_json::from_str::<FeedMessage>(&text) else {
            tracing::debug!(%text, "non-topic frame ignored");
            return Ok(None);
        };
        if feed_msg.topic.is_empty() {
            return Ok(None);
        }

        if let Some(seq) = feed_msg.seq {
            if !self.gap.observe(&feed_msg.topic, seq).await? {
                return Ok(None);
            }
        }
        Ok(Some(feed_msg))
    }
}
