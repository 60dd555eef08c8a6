//! Live broadcast event types and the event source seam

use crate::Result;
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tokio::sync::mpsc;

/// A single viewer chat message from the live broadcast
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ChatEvent {
    /// Source-assigned message id
    pub id: String,
    /// Stable viewer id
    pub user_id: String,
    /// Viewer handle
    pub username: String,
    /// Viewer display name, used when addressing them in replies
    pub display_name: String,
    /// Message text
    pub message: String,
    /// When the event was received
    pub received_at: DateTime<Utc>,
}

impl ChatEvent {
    /// Build a chat event stamped with the current time
    pub fn new(
        user_id: impl Into<String>,
        username: impl Into<String>,
        display_name: impl Into<String>,
        message: impl Into<String>,
    ) -> Self {
        Self {
            id: uuid::Uuid::new_v4().to_string(),
            user_id: user_id.into(),
            username: username.into(),
            display_name: display_name.into(),
            message: message.into(),
            received_at: Utc::now(),
        }
    }
}

/// A gift sent by a viewer
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GiftEvent {
    /// Stable viewer id
    pub user_id: String,
    /// Viewer handle
    pub username: String,
    /// Viewer display name
    pub display_name: String,
    /// Gift name as reported by the source
    pub gift_name: String,
    /// Repeat count for combo gifts
    pub gift_count: u32,
    /// Diamond value reported by the source
    pub diamond_count: u32,
}

/// A new-follower event
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FollowEvent {
    /// Stable viewer id
    pub user_id: String,
    /// Viewer handle
    pub username: String,
    /// Viewer display name
    pub display_name: String,
}

/// Everything a live event source can emit
#[derive(Debug, Clone, Serialize, Deserialize)]
pub enum LiveEvent {
    /// Connection established
    Connected {
        /// Broadcast room identifier
        room_id: String,
        /// Viewer count at connect time
        viewer_count: u64,
    },
    /// Viewer chat message (already dedup-filtered by the source)
    Chat(ChatEvent),
    /// Viewer gift
    Gift(GiftEvent),
    /// New follower
    Follow(FollowEvent),
    /// Connection lost
    Disconnected,
    /// Source-level error
    Error(String),
}

/// Abstraction over a real or simulated live event feed.
///
/// `connect` hands back the receiving end of a channel; the source pushes
/// events from its own task and the session consumes them in a single loop,
/// so downstream state transitions stay deterministic.
#[async_trait]
pub trait LiveEventSource: Send + Sync {
    /// Source name, for logs
    fn name(&self) -> &str;

    /// Connect and start emitting events
    async fn connect(&mut self) -> Result<mpsc::Receiver<LiveEvent>>;

    /// Disconnect and stop emitting
    async fn disconnect(&mut self) -> Result<()>;
}
