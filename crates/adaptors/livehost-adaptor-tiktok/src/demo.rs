//! Simulated live room for local testing

use async_trait::async_trait;
use livehost_core::dedup::DedupFilter;
use livehost_core::events::{ChatEvent, LiveEvent, LiveEventSource};
use livehost_core::{LiveHostError, Result};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::mpsc;
use tokio::task::JoinHandle;

/// Scripted shopper messages, cycled by [`DemoHandle::next_scripted`]
const DEMO_MESSAGES: [(&str, &str, &str); 5] = [
    ("user1", "Pembeli 1", "halo kak, produk masih ready?"),
    ("user2", "Pembeli 2", "berapa harga nya kak?"),
    ("user3", "Pembeli 3", "ada diskon ga kak?"),
    ("user4", "Pembeli 4", "bisa cod ga kak?"),
    ("user5", "Pembeli 5", "warna apa aja yang ready?"),
];

struct DemoChat {
    user_id: String,
    username: String,
    display_name: String,
    message: String,
}

/// Injection handle for driving a connected [`DemoLiveSource`]
#[derive(Clone)]
pub struct DemoHandle {
    tx: mpsc::UnboundedSender<DemoChat>,
    cursor: Arc<AtomicUsize>,
}

impl DemoHandle {
    /// Inject a chat message as the given viewer
    pub fn chat(
        &self,
        username: impl Into<String>,
        display_name: impl Into<String>,
        message: impl Into<String>,
    ) {
        let username = username.into();
        let _ = self.tx.send(DemoChat {
            user_id: username.clone(),
            username,
            display_name: display_name.into(),
            message: message.into(),
        });
    }

    /// Inject the next message from the built-in script
    pub fn next_scripted(&self) {
        let i = self.cursor.fetch_add(1, Ordering::SeqCst) % DEMO_MESSAGES.len();
        let (username, display_name, message) = DEMO_MESSAGES[i];
        self.chat(username, display_name, message);
    }
}

/// Simulated event feed: emits a demo `Connected` event, then forwards
/// injected chats through the dedup filter.
pub struct DemoLiveSource {
    cooldown: Duration,
    inject_tx: mpsc::UnboundedSender<DemoChat>,
    inject_rx: Option<mpsc::UnboundedReceiver<DemoChat>>,
    cursor: Arc<AtomicUsize>,
    task: Option<JoinHandle<()>>,
}

impl DemoLiveSource {
    /// Create a demo source with the given dedup cooldown
    pub fn new(cooldown: Duration) -> Self {
        let (inject_tx, inject_rx) = mpsc::unbounded_channel();
        Self {
            cooldown,
            inject_tx,
            inject_rx: Some(inject_rx),
            cursor: Arc::new(AtomicUsize::new(0)),
            task: None,
        }
    }

    /// Handle for injecting chat into the simulated room
    pub fn handle(&self) -> DemoHandle {
        DemoHandle {
            tx: self.inject_tx.clone(),
            cursor: self.cursor.clone(),
        }
    }
}

impl Default for DemoLiveSource {
    fn default() -> Self {
        Self::new(Duration::from_secs(5))
    }
}

#[async_trait]
impl LiveEventSource for DemoLiveSource {
    fn name(&self) -> &str {
        "demo"
    }

    async fn connect(&mut self) -> Result<mpsc::Receiver<LiveEvent>> {
        let mut inject_rx = self
            .inject_rx
            .take()
            .ok_or_else(|| LiveHostError::event("demo source already connected"))?;

        let (tx, rx) = mpsc::channel(64);
        let cooldown = self.cooldown;

        let task = tokio::spawn(async move {
            let _ = tx
                .send(LiveEvent::Connected {
                    room_id: "demo".to_string(),
                    viewer_count: 100,
                })
                .await;

            let mut dedup = DedupFilter::new(cooldown);
            while let Some(chat) = inject_rx.recv().await {
                let event = ChatEvent::new(
                    chat.user_id,
                    chat.username,
                    chat.display_name,
                    chat.message,
                );
                if !dedup.check(&event) {
                    continue;
                }
                tracing::info!("{}: {}", event.display_name, event.message);
                if tx.send(LiveEvent::Chat(event)).await.is_err() {
                    break;
                }
            }
        });

        self.task = Some(task);
        tracing::info!("Demo mode active - inject messages to simulate chat");
        Ok(rx)
    }

    async fn disconnect(&mut self) -> Result<()> {
        if let Some(task) = self.task.take() {
            task.abort();
        }
        tracing::info!("Demo mode stopped");
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    async fn recv_chat(rx: &mut mpsc::Receiver<LiveEvent>) -> ChatEvent {
        loop {
            match rx.recv().await.expect("channel closed") {
                LiveEvent::Chat(chat) => return chat,
                _ => continue,
            }
        }
    }

    #[tokio::test]
    async fn test_connected_event_comes_first() {
        let mut source = DemoLiveSource::default();
        let mut rx = source.connect().await.unwrap();
        match rx.recv().await.unwrap() {
            LiveEvent::Connected { room_id, viewer_count } => {
                assert_eq!(room_id, "demo");
                assert_eq!(viewer_count, 100);
            }
            other => panic!("expected connected, got {:?}", other),
        }
        source.disconnect().await.unwrap();
    }

    #[tokio::test]
    async fn test_injected_chat_flows_through() {
        let mut source = DemoLiveSource::default();
        let handle = source.handle();
        let mut rx = source.connect().await.unwrap();

        handle.chat("u1", "Pembeli 1", "halo kak");
        let chat = recv_chat(&mut rx).await;
        assert_eq!(chat.message, "halo kak");
        assert_eq!(chat.display_name, "Pembeli 1");
        source.disconnect().await.unwrap();
    }

    #[tokio::test]
    async fn test_duplicate_chat_within_cooldown_is_dropped() {
        let mut source = DemoLiveSource::default();
        let handle = source.handle();
        let mut rx = source.connect().await.unwrap();

        handle.chat("u1", "Pembeli 1", "spam spam");
        handle.chat("u1", "Pembeli 1", "spam spam");
        handle.chat("u1", "Pembeli 1", "pesan lain");

        let first = recv_chat(&mut rx).await;
        assert_eq!(first.message, "spam spam");
        // The duplicate never arrives; the next message is the distinct one
        let second = recv_chat(&mut rx).await;
        assert_eq!(second.message, "pesan lain");
        source.disconnect().await.unwrap();
    }

    #[tokio::test]
    async fn test_scripted_messages_cycle() {
        let mut source = DemoLiveSource::default();
        let handle = source.handle();
        let mut rx = source.connect().await.unwrap();

        for _ in 0..DEMO_MESSAGES.len() {
            handle.next_scripted();
        }
        for (_, _, expected) in DEMO_MESSAGES {
            let chat = recv_chat(&mut rx).await;
            assert_eq!(chat.message, expected);
        }
        source.disconnect().await.unwrap();
    }

    #[tokio::test]
    async fn test_second_connect_is_rejected() {
        let mut source = DemoLiveSource::default();
        let _rx = source.connect().await.unwrap();
        assert!(source.connect().await.is_err());
    }
}
