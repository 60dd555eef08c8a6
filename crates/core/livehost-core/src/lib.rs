//! LiveHost core pipeline
//!
//! Real-time orchestration for an AI co-host on live commerce streams:
//!
//! - Live event ingestion with spam dedup
//! - Serial chat-reply generation with pacing and rolling context
//! - Speech synthesis with credential failover and usage accounting
//! - A single shared playback queue (one asset at a time, FIFO)
//! - Idle-time filler audio
//! - Catalog-driven broadcast scene switching
//!
//! External services (completion, speech, live feed, scene control, catalog
//! storage) are consumed through traits; provider and adaptor crates supply
//! the real clients.
//!
//! # Example
//!
//! ```no_run
//! use livehost_core::prelude::*;
//! # use std::sync::Arc;
//! # async fn run(
//! #     store: Arc<dyn CatalogStore>,
//! #     source: Box<dyn LiveEventSource>,
//! #     provider: Arc<dyn CompletionProvider>,
//! #     engine: Arc<dyn SpeechEngine>,
//! #     sink: Arc<dyn AudioSink>,
//! # ) -> livehost_core::Result<()> {
//! let config = SessionConfig::from_env()?;
//! let session = Arc::new(LiveSession::new(
//!     config, store, source, provider, engine, sink, None,
//! )?);
//! session.start().await?;
//! # Ok(())
//! # }
//! ```

#![warn(missing_docs)]
#![warn(clippy::all)]

pub mod catalog;
pub mod config;
pub mod dedup;
pub mod error;
pub mod events;
pub mod idle;
pub mod memory;
pub mod numbers;
pub mod playback;
pub mod responder;
pub mod scene;
pub mod session;
pub mod signals;
pub mod synth;

pub use config::{load_env, get_env_bool, get_env_int, get_env_or, get_required_env};
pub use error::{LiveHostError, Result};

/// Commonly used types, one import away
pub mod prelude {
    pub use crate::catalog::{
        Catalog, CatalogStore, FileCatalogStore, IdleTrack, MemoryCatalogStore, Product, Promotion,
    };
    pub use crate::config::{IdlePlayMode, SessionConfig};
    pub use crate::dedup::DedupFilter;
    pub use crate::error::{LiveHostError, Result};
    pub use crate::events::{ChatEvent, FollowEvent, GiftEvent, LiveEvent, LiveEventSource};
    pub use crate::idle::IdleAudioScheduler;
    pub use crate::playback::{AudioSink, PlaybackEvent, PlaybackQueue};
    pub use crate::responder::{ChatMessage, CompletionParams, CompletionProvider, ResponseGenerator};
    pub use crate::scene::{SceneController, SceneTrigger};
    pub use crate::session::LiveSession;
    pub use crate::signals::{LogEntry, LogKind, SessionSignal, SignalBus};
    pub use crate::synth::{ApiKeyPool, AudioAsset, SpeechEngine, SpeechService, UsageStats};
}
