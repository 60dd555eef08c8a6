//! Session orchestrator
//!
//! One `LiveSession` owns the whole pipeline for one run: event source,
//! chat queue, response generator, speech service, playback queue, idle
//! scheduler and signal bus. Created on start, disposed on stop — no
//! process-wide state, so restarts and tests get clean instances.

use crate::catalog::CatalogStore;
use crate::config::SessionConfig;
use crate::events::{ChatEvent, LiveEvent, LiveEventSource};
use crate::idle::IdleAudioScheduler;
use crate::playback::{AudioSink, PlaybackQueue};
use crate::responder::{CompletionProvider, ResponseGenerator};
use crate::scene::{SceneController, SceneTrigger};
use crate::signals::{LogKind, SignalBus};
use crate::synth::{SpeechEngine, SpeechService, UsageStats};
use crate::{LiveHostError, Result};
use serde_json::json;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::{mpsc, Mutex};
use tokio::task::JoinHandle;

/// Audio cleanup sweep cadence
const CLEANUP_TICK: Duration = Duration::from_secs(60);

enum ChatCommand {
    Event(ChatEvent),
    ClearHistory,
}

/// Collaborators shared by the session's worker tasks
struct SessionCtx {
    config: SessionConfig,
    store: Arc<dyn CatalogStore>,
    signals: Arc<SignalBus>,
    playback: Arc<PlaybackQueue>,
    idle: Arc<IdleAudioScheduler>,
    speech: Mutex<SpeechService>,
    scene: Option<Arc<dyn SceneController>>,
    provider: Arc<dyn CompletionProvider>,
}

/// A running (or stoppable) assistant session.
pub struct LiveSession {
    ctx: Arc<SessionCtx>,
    source: Mutex<Box<dyn LiveEventSource>>,
    chat_tx: Mutex<Option<mpsc::UnboundedSender<ChatCommand>>>,
    tasks: Mutex<Vec<JoinHandle<()>>>,
    running: AtomicBool,
}

impl LiveSession {
    /// Wire up a session from its collaborators. Nothing runs until
    /// [`start`](Self::start).
    pub fn new(
        config: SessionConfig,
        store: Arc<dyn CatalogStore>,
        source: Box<dyn LiveEventSource>,
        provider: Arc<dyn CompletionProvider>,
        engine: Arc<dyn SpeechEngine>,
        sink: Arc<dyn AudioSink>,
        scene: Option<Arc<dyn SceneController>>,
    ) -> Result<Self> {
        let signals = Arc::new(SignalBus::default());
        let playback = Arc::new(PlaybackQueue::new(sink));
        let speech = SpeechService::new(
            engine,
            config.speech_api_keys.clone(),
            config.voice_id.clone(),
            config.audio_dir.clone(),
        )?;
        let idle = Arc::new(IdleAudioScheduler::new(
            store.clone(),
            playback.clone(),
            signals.clone(),
            config.idle_interval,
            config.idle_play_mode,
        ));

        Ok(Self {
            ctx: Arc::new(SessionCtx {
                config,
                store,
                signals,
                playback,
                idle,
                speech: Mutex::new(speech),
                scene,
                provider,
            }),
            source: Mutex::new(source),
            chat_tx: Mutex::new(None),
            tasks: Mutex::new(Vec::new()),
            running: AtomicBool::new(false),
        })
    }

    /// Outward signal bus (status, structured logs, usage snapshots)
    pub fn signals(&self) -> Arc<SignalBus> {
        self.ctx.signals.clone()
    }

    /// Idle scheduler handle, for runtime setting changes
    pub fn idle(&self) -> Arc<IdleAudioScheduler> {
        self.ctx.idle.clone()
    }

    /// Whether the session is currently running
    pub fn is_running(&self) -> bool {
        self.running.load(Ordering::SeqCst)
    }

    /// Current synthesis usage snapshot
    pub async fn usage(&self) -> UsageStats {
        self.ctx.speech.lock().await.usage()
    }

    /// Drop conversation history and the recent-reply cache
    pub async fn clear_history(&self) {
        if let Some(tx) = self.chat_tx.lock().await.as_ref() {
            let _ = tx.send(ChatCommand::ClearHistory);
        }
    }

    /// Connect the event source and start the pipeline.
    pub async fn start(&self) -> Result<()> {
        if self.running.swap(true, Ordering::SeqCst) {
            return Err(LiveHostError::service("session already running"));
        }

        let events = match self.source.lock().await.connect().await {
            Ok(events) => events,
            Err(e) => {
                self.running.store(false, Ordering::SeqCst);
                return Err(e);
            }
        };

        let (chat_tx, chat_rx) = mpsc::unbounded_channel();
        *self.chat_tx.lock().await = Some(chat_tx.clone());

        let mut tasks = self.tasks.lock().await;
        tasks.push(tokio::spawn(self.ctx.clone().event_loop(events, chat_tx)));
        tasks.push(tokio::spawn(self.ctx.clone().chat_worker(chat_rx)));
        tasks.push(tokio::spawn(self.ctx.clone().cleanup_loop()));
        drop(tasks);

        self.ctx.signals.status(true);
        Ok(())
    }

    /// Stop the session: idle scheduler halts, the source disconnects,
    /// pending playback is cleared (the in-flight item finishes on its own)
    /// and the chat queue is abandoned. In-flight generation or synthesis
    /// calls are not interrupted.
    pub async fn stop(&self) {
        if !self.running.swap(false, Ordering::SeqCst) {
            return;
        }

        self.ctx.idle.stop();

        if let Err(e) = self.source.lock().await.disconnect().await {
            tracing::warn!("Event source disconnect failed: {}", e);
        }

        self.ctx.playback.clear();
        *self.chat_tx.lock().await = None;

        for task in self.tasks.lock().await.drain(..) {
            task.abort();
        }

        self.ctx
            .signals
            .log(LogKind::Status, json!({ "message": "Bot stopped" }));
        self.ctx.signals.status(false);
    }
}

impl SessionCtx {
    /// Dispatch incoming live events to the pipeline
    async fn event_loop(
        self: Arc<Self>,
        mut events: mpsc::Receiver<LiveEvent>,
        chat_tx: mpsc::UnboundedSender<ChatCommand>,
    ) {
        while let Some(event) = events.recv().await {
            match event {
                LiveEvent::Connected {
                    room_id,
                    viewer_count,
                } => {
                    self.signals.log(
                        LogKind::Status,
                        json!({
                            "message": "Connected to live stream",
                            "room_id": room_id,
                            "viewer_count": viewer_count,
                        }),
                    );
                    if self.config.idle_enabled {
                        self.idle.start();
                    }
                }
                LiveEvent::Chat(chat) => self.on_chat(chat, &chat_tx).await,
                LiveEvent::Gift(gift) => {
                    self.signals.log(LogKind::Gift, json!(gift));
                    let message = format!(
                        "Wah terima kasih banyak kak {} untuk {} nya! Love you kak!",
                        gift.display_name, gift.gift_name
                    );
                    self.clone().spawn_ack(message);
                }
                LiveEvent::Follow(follow) => {
                    self.signals.log(LogKind::Follow, json!(follow));
                    let message = format!(
                        "Terima kasih kak {} sudah follow! Selamat bergabung di live kita ya kak!",
                        follow.display_name
                    );
                    self.clone().spawn_ack(message);
                }
                LiveEvent::Disconnected => {
                    self.signals.log(
                        LogKind::Status,
                        json!({ "message": "Disconnected from live stream" }),
                    );
                }
                LiveEvent::Error(message) => {
                    self.signals.log(LogKind::Error, json!({ "message": message }));
                }
            }
        }
    }

    async fn on_chat(&self, chat: ChatEvent, chat_tx: &mpsc::UnboundedSender<ChatCommand>) {
        self.signals.log(LogKind::Chat, json!(chat));
        self.idle.reset_idle_timer();

        if !self.passes_keyword_gate(&chat.message).await {
            tracing::debug!("Chat skipped by keyword filter: {}", chat.message);
            return;
        }

        let _ = chat_tx.send(ChatCommand::Event(chat));
    }

    /// Keyword gate: when enabled with a non-empty keyword list, only
    /// messages containing at least one keyword pass. Settings are read per
    /// message so dashboard edits apply immediately.
    async fn passes_keyword_gate(&self, message: &str) -> bool {
        let enabled = self
            .store
            .setting("filter_enabled")
            .await
            .map(|v| v == "true")
            .unwrap_or(false);
        if !enabled {
            return true;
        }
        let Some(raw) = self.store.setting("filter_keywords").await else {
            return true;
        };
        let keywords: Vec<String> = raw
            .split(',')
            .map(|k| k.trim().to_lowercase())
            .filter(|k| !k.is_empty())
            .collect();
        if keywords.is_empty() {
            return true;
        }
        let message_lower = message.to_lowercase();
        keywords.iter().any(|k| message_lower.contains(k))
    }

    /// Gift/follow acknowledgements bypass the chat queue: synthesis starts
    /// immediately, so an ack can reach the playback queue ahead of a chat
    /// reply that arrived earlier. Ordering is only guaranteed by the
    /// playback FIFO itself.
    fn spawn_ack(self: Arc<Self>, message: String) {
        tokio::spawn(async move {
            let result = { self.speech.lock().await.synthesize(&message).await };
            match result {
                Ok(asset) => {
                    self.signals.usage(self.speech.lock().await.usage());
                    self.playback.play(asset);
                }
                Err(e) => {
                    self.signals
                        .log(LogKind::Error, json!({ "message": e.to_string() }));
                }
            }
        });
    }

    /// Serial chat processing: one event at a time, arrival order, pacing
    /// delay before each generation. Failures drop the event and the loop
    /// moves on.
    async fn chat_worker(self: Arc<Self>, mut rx: mpsc::UnboundedReceiver<ChatCommand>) {
        let mut generator =
            ResponseGenerator::new(self.provider.clone(), self.config.max_response_length);

        while let Some(command) = rx.recv().await {
            let chat = match command {
                ChatCommand::Event(chat) => chat,
                ChatCommand::ClearHistory => {
                    generator.clear_history();
                    continue;
                }
            };

            tokio::time::sleep(self.config.response_delay).await;

            let catalog = self.store.catalog().await;
            let response = generator.generate(&chat, &catalog).await;
            self.signals.log(
                LogKind::Response,
                json!({ "display_name": chat.display_name, "response": response }),
            );

            if let Some(scene) = &self.scene {
                if let Some(name) =
                    SceneTrigger::maybe_switch(&chat.message, &catalog, scene.as_ref()).await
                {
                    self.signals.log(
                        LogKind::Status,
                        json!({ "message": format!("Switched to scene: {}", name) }),
                    );
                }
            }

            let result = { self.speech.lock().await.synthesize(&response).await };
            match result {
                Ok(asset) => {
                    self.signals.usage(self.speech.lock().await.usage());
                    self.playback.play(asset);
                }
                Err(e) => {
                    self.signals
                        .log(LogKind::Error, json!({ "message": e.to_string() }));
                }
            }
        }
    }

    /// Age out played synthesis assets once a minute
    async fn cleanup_loop(self: Arc<Self>) {
        let mut ticker = tokio::time::interval(CLEANUP_TICK);
        ticker.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Delay);
        // First tick fires immediately; skip it so a restart does not reap
        // assets the previous session just queued
        ticker.tick().await;
        loop {
            ticker.tick().await;
            let result = {
                let speech = self.speech.lock().await;
                speech.cleanup_audio(self.config.audio_max_age).await
            };
            if let Err(e) = result {
                tracing::warn!("Audio cleanup failed: {}", e);
            }
        }
    }
}
