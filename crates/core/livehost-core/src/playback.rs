//! Shared audio playback queue
//!
//! Every producer in the pipeline (chat replies, gift/follow acks, idle
//! filler) submits to this one queue; a single worker drains it so exactly
//! one asset plays at a time, in submission order.

use crate::synth::AudioAsset;
use crate::Result;
use async_trait::async_trait;
use std::path::Path;
use std::sync::atomic::{AtomicU64, AtomicUsize, Ordering};
use std::sync::Arc;
use tokio::sync::{broadcast, mpsc, Mutex};
use tokio::task::JoinHandle;

/// Device/file playback seam. `play` resolves when the asset has finished
/// playing (or failed).
#[async_trait]
pub trait AudioSink: Send + Sync {
    /// Play the file to completion
    async fn play(&self, path: &Path) -> Result<()>;
}

/// Playback outcome signal, one per played item
#[derive(Debug, Clone)]
pub enum PlaybackEvent {
    /// Item played to completion
    Complete(std::path::PathBuf),
    /// Item failed; the queue keeps draining
    Error {
        /// The failed asset
        path: std::path::PathBuf,
        /// Failure description
        message: String,
    },
}

struct QueueItem {
    asset: AudioAsset,
    epoch: u64,
}

/// FIFO playback queue with a single drain worker.
///
/// An explicit receive loop (not recursion) drains items. Items carry the
/// epoch they were submitted under; `clear` bumps the epoch, so everything
/// already queued is skipped when the worker reaches it while the in-flight
/// play finishes naturally.
pub struct PlaybackQueue {
    tx: mpsc::UnboundedSender<QueueItem>,
    events: broadcast::Sender<PlaybackEvent>,
    epoch: Arc<AtomicU64>,
    pending: Arc<AtomicUsize>,
    worker: Mutex<Option<JoinHandle<()>>>,
}

impl PlaybackQueue {
    /// Create a queue draining into the given sink
    pub fn new(sink: Arc<dyn AudioSink>) -> Self {
        let (tx, mut rx) = mpsc::unbounded_channel::<QueueItem>();
        let (events, _) = broadcast::channel(64);
        let epoch = Arc::new(AtomicU64::new(0));
        let pending = Arc::new(AtomicUsize::new(0));

        let worker_events = events.clone();
        let worker_epoch = epoch.clone();
        let worker_pending = pending.clone();
        let worker = tokio::spawn(async move {
            while let Some(item) = rx.recv().await {
                worker_pending.fetch_sub(1, Ordering::SeqCst);
                if item.epoch < worker_epoch.load(Ordering::SeqCst) {
                    tracing::debug!("Dropping cleared item: {}", item.asset.path.display());
                    continue;
                }

                let path = item.asset.path;
                tracing::info!("Playing: {}", path.display());
                match sink.play(&path).await {
                    Ok(()) => {
                        tracing::debug!("Playback complete: {}", path.display());
                        let _ = worker_events.send(PlaybackEvent::Complete(path));
                    }
                    Err(e) => {
                        tracing::error!("Playback error: {}", e);
                        let _ = worker_events.send(PlaybackEvent::Error {
                            path,
                            message: e.to_string(),
                        });
                    }
                }
            }
        });

        Self {
            tx,
            events,
            epoch,
            pending,
            worker: Mutex::new(Some(worker)),
        }
    }

    /// Append an asset to the queue. Playback starts as soon as the worker
    /// reaches it; ownership of the asset transfers to the queue.
    pub fn play(&self, asset: AudioAsset) {
        let item = QueueItem {
            asset,
            epoch: self.epoch.load(Ordering::SeqCst),
        };
        self.pending.fetch_add(1, Ordering::SeqCst);
        if self.tx.send(item).is_err() {
            self.pending.fetch_sub(1, Ordering::SeqCst);
            tracing::warn!("Playback queue is shut down; dropping asset");
        }
    }

    /// Drop all pending items. The currently playing asset, if any, finishes
    /// on its own.
    pub fn clear(&self) {
        self.epoch.fetch_add(1, Ordering::SeqCst);
    }

    /// Items submitted but not yet picked up by the worker
    pub fn queue_len(&self) -> usize {
        self.pending.load(Ordering::SeqCst)
    }

    /// Subscribe to per-item completion/error events
    pub fn subscribe(&self) -> broadcast::Receiver<PlaybackEvent> {
        self.events.subscribe()
    }

    /// Stop the drain worker. Pending items are abandoned.
    pub async fn shutdown(&self) {
        if let Some(worker) = self.worker.lock().await.take() {
            worker.abort();
        }
    }
}
