//! Webcast bridge client
//!
//! The bridge service maintains the actual TikTok webcast connection and
//! re-emits room events as one JSON object per WebSocket text frame. This
//! source maps those frames to `LiveEvent`s and applies the spam dedup
//! filter to chat.

use async_trait::async_trait;
use futures_util::StreamExt;
use livehost_core::dedup::DedupFilter;
use livehost_core::events::{ChatEvent, FollowEvent, GiftEvent, LiveEvent, LiveEventSource};
use livehost_core::{LiveHostError, Result};
use serde::Deserialize;
use std::time::Duration;
use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tokio::time::timeout;
use tokio_tungstenite::{connect_async, tungstenite::Message};

/// Connection timeout
const CONNECT_TIMEOUT: Duration = Duration::from_secs(10);

/// One event frame from the bridge
#[derive(Debug, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
enum BridgeFrame {
    Connected {
        room_id: String,
        #[serde(default)]
        viewer_count: u64,
    },
    Chat {
        user_id: String,
        username: String,
        #[serde(alias = "nickname")]
        display_name: String,
        #[serde(alias = "comment")]
        message: String,
    },
    Gift {
        user_id: String,
        username: String,
        #[serde(alias = "nickname")]
        display_name: String,
        gift_name: String,
        #[serde(default)]
        gift_count: u32,
        #[serde(default)]
        diamond_count: u32,
    },
    Follow {
        user_id: String,
        username: String,
        #[serde(alias = "nickname")]
        display_name: String,
    },
    Disconnected,
}

/// Live event source backed by a webcast bridge WebSocket endpoint.
///
/// Reconnection after a drop is deliberately not attempted here; the session
/// surfaces the `Disconnected` status and the operator (or a supervising
/// layer) decides.
pub struct BridgeLiveSource {
    endpoint: String,
    username: String,
    cooldown: Duration,
    task: Option<JoinHandle<()>>,
}

impl BridgeLiveSource {
    /// Create a source for `username`'s room via the given bridge endpoint
    /// (e.g. `ws://localhost:8912`)
    pub fn new(
        endpoint: impl Into<String>,
        username: impl Into<String>,
        cooldown: Duration,
    ) -> Self {
        Self {
            endpoint: endpoint.into(),
            username: username.into(),
            cooldown,
            task: None,
        }
    }

    fn map_frame(frame: BridgeFrame, dedup: &mut DedupFilter) -> Option<LiveEvent> {
        match frame {
            BridgeFrame::Connected {
                room_id,
                viewer_count,
            } => Some(LiveEvent::Connected {
                room_id,
                viewer_count,
            }),
            BridgeFrame::Chat {
                user_id,
                username,
                display_name,
                message,
            } => {
                let event = ChatEvent::new(user_id, username, display_name, message);
                if dedup.check(&event) {
                    tracing::info!("{}: {}", event.display_name, event.message);
                    Some(LiveEvent::Chat(event))
                } else {
                    None
                }
            }
            BridgeFrame::Gift {
                user_id,
                username,
                display_name,
                gift_name,
                gift_count,
                diamond_count,
            } => Some(LiveEvent::Gift(GiftEvent {
                user_id,
                username,
                display_name,
                gift_name,
                gift_count,
                diamond_count,
            })),
            BridgeFrame::Follow {
                user_id,
                username,
                display_name,
            } => Some(LiveEvent::Follow(FollowEvent {
                user_id,
                username,
                display_name,
            })),
            BridgeFrame::Disconnected => Some(LiveEvent::Disconnected),
        }
    }
}

#[async_trait]
impl LiveEventSource for BridgeLiveSource {
    fn name(&self) -> &str {
        "tiktok-bridge"
    }

    async fn connect(&mut self) -> Result<mpsc::Receiver<LiveEvent>> {
        let url = format!("{}/live/{}", self.endpoint.trim_end_matches('/'), self.username);
        tracing::info!("Connecting to webcast bridge: {}", url);

        let (ws, _) = timeout(CONNECT_TIMEOUT, connect_async(&url))
            .await
            .map_err(|_| LiveHostError::timeout("bridge connection timed out"))?
            .map_err(|e| LiveHostError::event(format!("bridge connect failed: {}", e)))?;

        let (tx, rx) = mpsc::channel(64);
        let cooldown = self.cooldown;

        let task = tokio::spawn(async move {
            let (_, mut read) = ws.split();
            let mut dedup = DedupFilter::new(cooldown);

            while let Some(frame) = read.next().await {
                match frame {
                    Ok(Message::Text(text)) => {
                        let parsed: BridgeFrame = match serde_json::from_str(&text) {
                            Ok(parsed) => parsed,
                            Err(e) => {
                                tracing::warn!("Unparseable bridge frame: {}", e);
                                continue;
                            }
                        };
                        if let Some(event) = Self::map_frame(parsed, &mut dedup) {
                            if tx.send(event).await.is_err() {
                                return;
                            }
                        }
                    }
                    Ok(Message::Close(_)) => break,
                    Ok(_) => continue,
                    Err(e) => {
                        let _ = tx.send(LiveEvent::Error(e.to_string())).await;
                        break;
                    }
                }
            }
            let _ = tx.send(LiveEvent::Disconnected).await;
        });

        self.task = Some(task);
        Ok(rx)
    }

    async fn disconnect(&mut self) -> Result<()> {
        if let Some(task) = self.task.take() {
            task.abort();
            tracing::info!("Disconnected from webcast bridge");
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn dedup() -> DedupFilter {
        DedupFilter::new(Duration::from_secs(5))
    }

    #[test]
    fn test_chat_frame_maps_and_dedups() {
        let mut filter = dedup();
        let frame = r#"{"type":"chat","user_id":"u1","username":"pembeli1","nickname":"Pembeli 1","comment":"halo kak"}"#;
        let parsed: BridgeFrame = serde_json::from_str(frame).unwrap();
        let event = BridgeLiveSource::map_frame(parsed, &mut filter);
        match event {
            Some(LiveEvent::Chat(chat)) => {
                assert_eq!(chat.display_name, "Pembeli 1");
                assert_eq!(chat.message, "halo kak");
            }
            other => panic!("unexpected mapping: {:?}", other),
        }

        // Same user, same message inside the window: dropped
        let parsed: BridgeFrame = serde_json::from_str(frame).unwrap();
        assert!(BridgeLiveSource::map_frame(parsed, &mut filter).is_none());
    }

    #[test]
    fn test_gift_frame_defaults_counts() {
        let frame = r#"{"type":"gift","user_id":"u1","username":"p1","nickname":"Pembeli 1","gift_name":"Rose"}"#;
        let parsed: BridgeFrame = serde_json::from_str(frame).unwrap();
        match BridgeLiveSource::map_frame(parsed, &mut dedup()) {
            Some(LiveEvent::Gift(gift)) => {
                assert_eq!(gift.gift_name, "Rose");
                assert_eq!(gift.gift_count, 0);
            }
            other => panic!("unexpected mapping: {:?}", other),
        }
    }

    #[test]
    fn test_connected_and_disconnected_frames() {
        let parsed: BridgeFrame =
            serde_json::from_str(r#"{"type":"connected","room_id":"r1","viewer_count":42}"#)
                .unwrap();
        assert!(matches!(
            BridgeLiveSource::map_frame(parsed, &mut dedup()),
            Some(LiveEvent::Connected { viewer_count: 42, .. })
        ));

        let parsed: BridgeFrame = serde_json::from_str(r#"{"type":"disconnected"}"#).unwrap();
        assert!(matches!(
            BridgeLiveSource::map_frame(parsed, &mut dedup()),
            Some(LiveEvent::Disconnected)
        ));
    }
}
