//! Idle-time filler audio scheduler
//!
//! Keeps the stream from going silent: once no chat activity has been seen
//! for the configured interval, the next filler track is submitted to the
//! shared playback queue.

use crate::catalog::CatalogStore;
use crate::config::IdlePlayMode;
use crate::playback::{PlaybackEvent, PlaybackQueue};
use crate::signals::{LogKind, SignalBus};
use crate::synth::AudioAsset;
use chrono::Utc;
use rand::Rng;
use serde_json::json;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;
use tokio::sync::broadcast;
use tokio::task::JoinHandle;
use tokio::time::Instant;

/// Scheduler tick; the silence check runs this often while running
const TICK: Duration = Duration::from_secs(1);

struct IdleShared {
    interval: Mutex<Duration>,
    play_mode: Mutex<IdlePlayMode>,
    last_activity: Mutex<Instant>,
    /// Set from the start of a submission until the submitted filler has
    /// finished playing; ticks in between do nothing, so a tick firing
    /// mid-submission cannot double-submit and no new filler is picked
    /// while one is still audible
    busy: AtomicBool,
    /// Round-robin cursor for sequential mode
    cursor: Mutex<usize>,
}

/// Periodic silence checker feeding filler audio into the playback queue.
///
/// State machine with two states, stopped and running. `start` spawns the
/// tick task, `stop` cancels it; `reset_idle_timer` is called for every chat
/// event that passes the dedup filter.
pub struct IdleAudioScheduler {
    store: Arc<dyn CatalogStore>,
    queue: Arc<PlaybackQueue>,
    signals: Arc<SignalBus>,
    shared: Arc<IdleShared>,
    task: Mutex<Option<JoinHandle<()>>>,
}

impl IdleAudioScheduler {
    /// Create a scheduler in the stopped state
    pub fn new(
        store: Arc<dyn CatalogStore>,
        queue: Arc<PlaybackQueue>,
        signals: Arc<SignalBus>,
        interval: Duration,
        play_mode: IdlePlayMode,
    ) -> Self {
        Self {
            store,
            queue,
            signals,
            shared: Arc::new(IdleShared {
                interval: Mutex::new(interval),
                play_mode: Mutex::new(play_mode),
                last_activity: Mutex::new(Instant::now()),
                busy: AtomicBool::new(false),
                cursor: Mutex::new(0),
            }),
            task: Mutex::new(None),
        }
    }

    /// Whether the tick task is running
    pub fn is_running(&self) -> bool {
        self.task
            .lock()
            .unwrap()
            .as_ref()
            .map(|t| !t.is_finished())
            .unwrap_or(false)
    }

    /// Transition stopped -> running. Records now as last activity and
    /// begins the periodic check. Restarting while running resets the timer.
    pub fn start(&self) {
        self.stop();
        *self.shared.last_activity.lock().unwrap() = Instant::now();
        self.shared.busy.store(false, Ordering::SeqCst);

        let store = self.store.clone();
        let queue = self.queue.clone();
        let signals = self.signals.clone();
        let shared = self.shared.clone();

        let handle = tokio::spawn(async move {
            let mut ticker = tokio::time::interval(TICK);
            ticker.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Delay);
            loop {
                ticker.tick().await;
                Self::check_and_submit(&store, &queue, &signals, &shared).await;
            }
        });

        *self.task.lock().unwrap() = Some(handle);
        let secs = self.shared.interval.lock().unwrap().as_secs();
        tracing::info!("Idle audio started (interval: {}s)", secs);
    }

    /// Transition running -> stopped, cancelling the periodic check
    pub fn stop(&self) {
        if let Some(task) = self.task.lock().unwrap().take() {
            task.abort();
            tracing::info!("Idle audio stopped");
        }
    }

    /// Update last activity without touching run state
    pub fn reset_idle_timer(&self) {
        *self.shared.last_activity.lock().unwrap() = Instant::now();
    }

    /// Change the silence threshold at runtime
    pub fn set_interval(&self, interval: Duration) {
        *self.shared.interval.lock().unwrap() = interval;
        tracing::info!("Idle audio interval set to {}s", interval.as_secs());
    }

    /// Change the selection order at runtime
    pub fn set_play_mode(&self, mode: IdlePlayMode) {
        *self.shared.play_mode.lock().unwrap() = mode;
        tracing::info!("Idle audio play mode set to {}", mode.as_str());
    }

    async fn check_and_submit(
        store: &Arc<dyn CatalogStore>,
        queue: &Arc<PlaybackQueue>,
        signals: &Arc<SignalBus>,
        shared: &Arc<IdleShared>,
    ) {
        // A previous submission is still in flight or still playing
        if shared.busy.swap(true, Ordering::SeqCst) {
            return;
        }

        let interval = *shared.interval.lock().unwrap();
        let idle_for = shared.last_activity.lock().unwrap().elapsed();
        if idle_for < interval {
            shared.busy.store(false, Ordering::SeqCst);
            return;
        }

        let tracks = store.active_idle_tracks().await;
        if tracks.is_empty() {
            shared.busy.store(false, Ordering::SeqCst);
            return;
        }

        let track = {
            let mode = *shared.play_mode.lock().unwrap();
            match mode {
                IdlePlayMode::Random => {
                    let i = rand::thread_rng().gen_range(0..tracks.len());
                    tracks[i].clone()
                }
                IdlePlayMode::Sequential => {
                    let mut cursor = shared.cursor.lock().unwrap();
                    let track = tracks[*cursor % tracks.len()].clone();
                    *cursor = cursor.wrapping_add(1);
                    track
                }
            }
        };

        tracing::info!("Playing idle audio: {}", track.title);
        signals.log(LogKind::IdleAudio, json!({ "message": format!("Playing: {}", track.title) }));

        // Subscribe before submitting so the completion event cannot be
        // missed
        let mut events = queue.subscribe();
        let submitted = track.path.clone();
        queue.play(AudioAsset {
            path: track.path,
            created_at: Utc::now(),
        });

        // Reset after submitting so intervals measure from the filler, not
        // compound across ticks
        *shared.last_activity.lock().unwrap() = Instant::now();

        // Stay busy until this track has finished playing
        let shared = shared.clone();
        tokio::spawn(async move {
            loop {
                match events.recv().await {
                    Ok(PlaybackEvent::Complete(path))
                    | Ok(PlaybackEvent::Error { path, .. })
                        if path == submitted =>
                    {
                        break
                    }
                    Ok(_) => continue,
                    Err(broadcast::error::RecvError::Lagged(_)) => continue,
                    Err(broadcast::error::RecvError::Closed) => break,
                }
            }
            shared.busy.store(false, Ordering::SeqCst);
        });
    }
}

impl Drop for IdleAudioScheduler {
    fn drop(&mut self) {
        if let Some(task) = self.task.lock().unwrap().take() {
            task.abort();
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::catalog::{IdleTrack, MemoryCatalogStore};
    use crate::playback::AudioSink;
    use crate::Result;
    use async_trait::async_trait;
    use std::path::{Path, PathBuf};
    use std::sync::Mutex as StdMutex;

    struct CountingSink {
        played: StdMutex<Vec<PathBuf>>,
    }

    #[async_trait]
    impl AudioSink for CountingSink {
        async fn play(&self, path: &Path) -> Result<()> {
            self.played.lock().unwrap().push(path.to_path_buf());
            Ok(())
        }
    }

    fn store_with_tracks(n: usize) -> Arc<MemoryCatalogStore> {
        Arc::new(MemoryCatalogStore {
            idle_tracks: (0..n)
                .map(|i| IdleTrack {
                    id: i as i64,
                    path: PathBuf::from(format!("idle/{}.mp3", i)),
                    title: format!("track {}", i),
                    enabled: true,
                })
                .collect(),
            ..Default::default()
        })
    }

    fn scheduler(
        store: Arc<MemoryCatalogStore>,
        interval: Duration,
        mode: IdlePlayMode,
    ) -> (IdleAudioScheduler, Arc<CountingSink>) {
        let sink = Arc::new(CountingSink {
            played: StdMutex::new(Vec::new()),
        });
        let queue = Arc::new(PlaybackQueue::new(sink.clone()));
        let signals = Arc::new(SignalBus::default());
        let scheduler = IdleAudioScheduler::new(store, queue, signals, interval, mode);
        (scheduler, sink)
    }

    #[tokio::test(start_paused = true)]
    async fn test_first_submission_waits_full_interval() {
        let (scheduler, sink) =
            scheduler(store_with_tracks(1), Duration::from_secs(30), IdlePlayMode::Sequential);
        scheduler.start();

        tokio::time::sleep(Duration::from_secs(29)).await;
        assert!(sink.played.lock().unwrap().is_empty());

        tokio::time::sleep(Duration::from_secs(2)).await;
        assert_eq!(sink.played.lock().unwrap().len(), 1);
        scheduler.stop();
    }

    #[tokio::test(start_paused = true)]
    async fn test_activity_reset_delays_submission() {
        let (scheduler, sink) =
            scheduler(store_with_tracks(1), Duration::from_secs(30), IdlePlayMode::Sequential);
        scheduler.start();

        tokio::time::sleep(Duration::from_secs(20)).await;
        scheduler.reset_idle_timer();

        // Would have fired at t=30 without the reset
        tokio::time::sleep(Duration::from_secs(15)).await;
        assert!(sink.played.lock().unwrap().is_empty());

        // Fires around t=50
        tokio::time::sleep(Duration::from_secs(16)).await;
        assert_eq!(sink.played.lock().unwrap().len(), 1);
        scheduler.stop();
    }

    #[tokio::test(start_paused = true)]
    async fn test_sequential_mode_round_robins() {
        let (scheduler, sink) =
            scheduler(store_with_tracks(2), Duration::from_secs(5), IdlePlayMode::Sequential);
        scheduler.start();

        tokio::time::sleep(Duration::from_secs(18)).await;
        scheduler.stop();

        let played = sink.played.lock().unwrap().clone();
        assert!(played.len() >= 3);
        assert_eq!(played[0], PathBuf::from("idle/0.mp3"));
        assert_eq!(played[1], PathBuf::from("idle/1.mp3"));
        assert_eq!(played[2], PathBuf::from("idle/0.mp3"));
    }

    #[tokio::test(start_paused = true)]
    async fn test_empty_track_list_skips_entirely() {
        let (scheduler, sink) =
            scheduler(store_with_tracks(0), Duration::from_secs(2), IdlePlayMode::Sequential);
        scheduler.start();

        tokio::time::sleep(Duration::from_secs(10)).await;
        assert!(sink.played.lock().unwrap().is_empty());
        scheduler.stop();
    }

    #[tokio::test(start_paused = true)]
    async fn test_stop_cancels_ticks() {
        let (scheduler, sink) =
            scheduler(store_with_tracks(1), Duration::from_secs(5), IdlePlayMode::Sequential);
        scheduler.start();
        assert!(scheduler.is_running());
        scheduler.stop();

        tokio::time::sleep(Duration::from_secs(20)).await;
        assert!(sink.played.lock().unwrap().is_empty());
        assert!(!scheduler.is_running());
    }

    #[tokio::test(start_paused = true)]
    async fn test_intervals_do_not_compound() {
        let (scheduler, sink) =
            scheduler(store_with_tracks(1), Duration::from_secs(10), IdlePlayMode::Sequential);
        scheduler.start();

        // ~35s of silence: submissions at ~10, ~20, ~30
        tokio::time::sleep(Duration::from_secs(36)).await;
        assert_eq!(sink.played.lock().unwrap().len(), 3);
        scheduler.stop();
    }
}
