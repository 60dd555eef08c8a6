//! Speech synthesis with credential failover and usage accounting

use crate::{LiveHostError, Result};
use async_trait::async_trait;
use bytes::Bytes;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::VecDeque;
use std::path::{Path, PathBuf};
use std::time::Duration;

/// Usage-history entries retained for observability
const USAGE_HISTORY_LEN: usize = 50;

/// Hosted text-to-speech seam. The credential is passed per call so the
/// pool can rotate between attempts.
#[async_trait]
pub trait SpeechEngine: Send + Sync {
    /// Engine name, for logs
    fn name(&self) -> &str;

    /// Convert text to audio bytes using the given voice and credential
    async fn synthesize(&self, text: &str, voice_id: &str, api_key: &str) -> Result<Bytes>;
}

/// Ordered speech credentials with a cyclic cursor.
///
/// The cursor sticks to whichever key last succeeded, so a healthy key keeps
/// serving until it fails.
pub struct ApiKeyPool {
    keys: Vec<String>,
    cursor: usize,
}

impl ApiKeyPool {
    /// Create a pool; at least one key is required
    pub fn new(keys: Vec<String>) -> Result<Self> {
        if keys.is_empty() {
            return Err(LiveHostError::config("speech key pool requires at least one key"));
        }
        Ok(Self { keys, cursor: 0 })
    }

    /// Number of configured keys
    pub fn len(&self) -> usize {
        self.keys.len()
    }

    /// Whether only a single key is configured
    pub fn is_single(&self) -> bool {
        self.keys.len() == 1
    }

    /// Current key
    pub fn current(&self) -> &str {
        &self.keys[self.cursor]
    }

    /// Current cursor position
    pub fn cursor(&self) -> usize {
        self.cursor
    }

    /// Advance the cursor cyclically to the next key
    pub fn rotate(&mut self) {
        self.cursor = (self.cursor + 1) % self.keys.len();
    }
}

/// One usage-history entry
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct UsageEntry {
    /// Characters billed for the request
    pub characters: usize,
    /// Request completion time
    pub at: DateTime<Utc>,
}

/// Monotonic synthesis counters plus a bounded per-request history.
/// Observability only; never consulted by control flow.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct UsageStats {
    /// Characters synthesized over the life of the stats object
    pub total_characters: u64,
    /// Characters synthesized this session
    pub session_characters: u64,
    /// Successful request count
    pub request_count: u64,
    /// Characters in the most recent request
    pub last_request_chars: usize,
    /// Recent per-request character counts, newest last
    pub history: VecDeque<UsageEntry>,
}

impl UsageStats {
    /// Record one successful synthesis
    pub fn record(&mut self, characters: usize) {
        self.total_characters += characters as u64;
        self.session_characters += characters as u64;
        self.request_count += 1;
        self.last_request_chars = characters;
        self.history.push_back(UsageEntry {
            characters,
            at: Utc::now(),
        });
        while self.history.len() > USAGE_HISTORY_LEN {
            self.history.pop_front();
        }
    }

    /// Reset the per-session counter, keeping totals and history
    pub fn reset_session(&mut self) {
        self.session_characters = 0;
    }
}

/// A synthesized audio file, owned by its creator until handed to the
/// playback queue
#[derive(Debug, Clone)]
pub struct AudioAsset {
    /// File location
    pub path: PathBuf,
    /// Creation time, drives age-based cleanup
    pub created_at: DateTime<Utc>,
}

/// Speech synthesis front: key-pool failover, asset persistence and usage
/// accounting. This is the only retry point in the whole pipeline.
pub struct SpeechService {
    engine: std::sync::Arc<dyn SpeechEngine>,
    pool: ApiKeyPool,
    voice_id: String,
    audio_dir: PathBuf,
    stats: UsageStats,
}

impl SpeechService {
    /// Create a service writing assets under `audio_dir`
    pub fn new(
        engine: std::sync::Arc<dyn SpeechEngine>,
        keys: Vec<String>,
        voice_id: impl Into<String>,
        audio_dir: impl Into<PathBuf>,
    ) -> Result<Self> {
        Ok(Self {
            engine,
            pool: ApiKeyPool::new(keys)?,
            voice_id: voice_id.into(),
            audio_dir: audio_dir.into(),
            stats: UsageStats::default(),
        })
    }

    /// Current usage snapshot
    pub fn usage(&self) -> UsageStats {
        self.stats.clone()
    }

    /// Cursor position of the key pool (exposed for tests/diagnostics)
    pub fn key_cursor(&self) -> usize {
        self.pool.cursor()
    }

    /// Synthesize `text` into an audio file.
    ///
    /// Quota-class failures (401/429 or quota keywords) rotate to the next
    /// key and retry, bounded to one full cycle through the pool; the cycle
    /// ending back at the starting key without success surfaces the last
    /// error. Any other failure surfaces immediately without rotating.
    pub async fn synthesize(&mut self, text: &str) -> Result<AudioAsset> {
        let attempts = self.pool.len();
        let mut last_err: Option<LiveHostError> = None;

        for attempt in 0..attempts {
            let key = self.pool.current().to_string();
            match self.engine.synthesize(text, &self.voice_id, &key).await {
                Ok(audio) => {
                    let asset = self.persist(audio).await?;
                    self.stats.record(text.chars().count());
                    tracing::debug!(
                        "Synthesized {} chars to {} (key {})",
                        text.chars().count(),
                        asset.path.display(),
                        self.pool.cursor()
                    );
                    return Ok(asset);
                }
                Err(e) if e.is_quota_class() && !self.pool.is_single() => {
                    tracing::warn!(
                        "Speech key {} exhausted ({}); rotating ({}/{})",
                        self.pool.cursor(),
                        e,
                        attempt + 1,
                        attempts
                    );
                    self.pool.rotate();
                    last_err = Some(e);
                }
                Err(e) => return Err(e),
            }
        }

        Err(last_err.unwrap_or_else(|| {
            LiveHostError::provider("speech synthesis failed with no attempts made")
        }))
    }

    async fn persist(&self, audio: Bytes) -> Result<AudioAsset> {
        tokio::fs::create_dir_all(&self.audio_dir).await?;
        let filename = format!(
            "tts-{}-{}.mp3",
            Utc::now().timestamp_millis(),
            uuid::Uuid::new_v4().simple()
        );
        let path = self.audio_dir.join(filename);
        tokio::fs::write(&path, &audio).await?;
        Ok(AudioAsset {
            path,
            created_at: Utc::now(),
        })
    }

    /// Delete synthesized assets older than `max_age`. Returns how many
    /// files were removed; a missing audio directory is not an error.
    pub async fn cleanup_audio(&self, max_age: Duration) -> Result<usize> {
        let mut deleted = 0;
        let mut entries = match tokio::fs::read_dir(&self.audio_dir).await {
            Ok(entries) => entries,
            Err(_) => return Ok(0),
        };

        while let Ok(Some(entry)) = entries.next_entry().await {
            if !Self::is_tts_asset(&entry.path()) {
                continue;
            }
            let Ok(meta) = entry.metadata().await else { continue };
            let Ok(modified) = meta.modified() else { continue };
            let age = modified.elapsed().unwrap_or_default();
            if age > max_age {
                if tokio::fs::remove_file(entry.path()).await.is_ok() {
                    deleted += 1;
                }
            }
        }

        if deleted > 0 {
            tracing::debug!("Cleaned up {} old audio files", deleted);
        }
        Ok(deleted)
    }

    fn is_tts_asset(path: &Path) -> bool {
        path.file_name()
            .and_then(|n| n.to_str())
            .map(|n| n.starts_with("tts-"))
            .unwrap_or(false)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::{Arc, Mutex};

    /// Engine scripted with one outcome per key
    struct ScriptedEngine {
        outcomes: Mutex<std::collections::HashMap<String, &'static str>>,
        calls: AtomicUsize,
        keys_seen: Mutex<Vec<String>>,
    }

    impl ScriptedEngine {
        fn new(outcomes: &[(&str, &'static str)]) -> Self {
            Self {
                outcomes: Mutex::new(
                    outcomes
                        .iter()
                        .map(|(k, v)| (k.to_string(), *v))
                        .collect(),
                ),
                calls: AtomicUsize::new(0),
                keys_seen: Mutex::new(Vec::new()),
            }
        }
    }

    #[async_trait]
    impl SpeechEngine for ScriptedEngine {
        fn name(&self) -> &str {
            "scripted"
        }

        async fn synthesize(&self, _text: &str, _voice: &str, api_key: &str) -> Result<Bytes> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            self.keys_seen.lock().unwrap().push(api_key.to_string());
            match self.outcomes.lock().unwrap().get(api_key).copied() {
                Some("ok") => Ok(Bytes::from_static(b"audio")),
                Some("quota") => Err(LiveHostError::rate_limit("quota exceeded")),
                Some("auth") => Err(LiveHostError::auth("unauthorized")),
                _ => Err(LiveHostError::provider("connection reset")),
            }
        }
    }

    fn service(engine: Arc<ScriptedEngine>, keys: &[&str]) -> SpeechService {
        let dir = std::env::temp_dir().join(format!("livehost-test-{}", uuid::Uuid::new_v4()));
        SpeechService::new(
            engine,
            keys.iter().map(|k| k.to_string()).collect(),
            "voice-1",
            dir,
        )
        .unwrap()
    }

    #[test]
    fn test_pool_requires_a_key() {
        assert!(ApiKeyPool::new(vec![]).is_err());
    }

    #[test]
    fn test_pool_rotation_is_cyclic() {
        let mut pool = ApiKeyPool::new(vec!["a".into(), "b".into(), "c".into()]).unwrap();
        pool.rotate();
        pool.rotate();
        assert_eq!(pool.current(), "c");
        pool.rotate();
        assert_eq!(pool.current(), "a");
    }

    #[tokio::test]
    async fn test_failover_lands_on_working_key() {
        let engine = Arc::new(ScriptedEngine::new(&[
            ("k1", "quota"),
            ("k2", "auth"),
            ("k3", "ok"),
        ]));
        let mut svc = service(engine.clone(), &["k1", "k2", "k3"]);

        let asset = svc.synthesize("halo kak").await.unwrap();
        assert!(asset.path.exists());
        assert_eq!(engine.calls.load(Ordering::SeqCst), 3);
        // Cursor stays on the key that worked
        assert_eq!(svc.key_cursor(), 2);
    }

    #[tokio::test]
    async fn test_all_keys_exhausted_fails_after_exactly_one_cycle() {
        let engine = Arc::new(ScriptedEngine::new(&[
            ("k1", "quota"),
            ("k2", "quota"),
            ("k3", "quota"),
        ]));
        let mut svc = service(engine.clone(), &["k1", "k2", "k3"]);

        let err = svc.synthesize("halo kak").await.unwrap_err();
        assert!(err.is_quota_class());
        assert_eq!(engine.calls.load(Ordering::SeqCst), 3);
        assert_eq!(
            *engine.keys_seen.lock().unwrap(),
            vec!["k1".to_string(), "k2".to_string(), "k3".to_string()]
        );
    }

    #[tokio::test]
    async fn test_non_quota_failure_does_not_rotate() {
        let engine = Arc::new(ScriptedEngine::new(&[("k1", "network"), ("k2", "ok")]));
        let mut svc = service(engine.clone(), &["k1", "k2"]);

        assert!(svc.synthesize("halo").await.is_err());
        assert_eq!(engine.calls.load(Ordering::SeqCst), 1);
        assert_eq!(svc.key_cursor(), 0);
    }

    #[tokio::test]
    async fn test_single_key_quota_failure_surfaces_without_retry() {
        let engine = Arc::new(ScriptedEngine::new(&[("k1", "quota")]));
        let mut svc = service(engine.clone(), &["k1"]);

        assert!(svc.synthesize("halo").await.is_err());
        assert_eq!(engine.calls.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn test_usage_stats_recorded_on_success() {
        let engine = Arc::new(ScriptedEngine::new(&[("k1", "ok")]));
        let mut svc = service(engine, &["k1"]);

        svc.synthesize("halo kak").await.unwrap();
        svc.synthesize("oke").await.unwrap();

        let usage = svc.usage();
        assert_eq!(usage.request_count, 2);
        assert_eq!(usage.total_characters, 8 + 3);
        assert_eq!(usage.last_request_chars, 3);
        assert_eq!(usage.history.len(), 2);
    }

    #[test]
    fn test_usage_history_bounded() {
        let mut stats = UsageStats::default();
        for i in 0..(USAGE_HISTORY_LEN + 10) {
            stats.record(i);
        }
        assert_eq!(stats.history.len(), USAGE_HISTORY_LEN);
        assert_eq!(stats.request_count, (USAGE_HISTORY_LEN + 10) as u64);
    }

    #[tokio::test]
    async fn test_cleanup_removes_only_old_assets() {
        let engine = Arc::new(ScriptedEngine::new(&[("k1", "ok")]));
        let mut svc = service(engine, &["k1"]);
        svc.synthesize("halo").await.unwrap();

        // Fresh file survives a generous age bound
        assert_eq!(svc.cleanup_audio(Duration::from_secs(60)).await.unwrap(), 0);
        // Zero age bound reaps it
        assert_eq!(svc.cleanup_audio(Duration::ZERO).await.unwrap(), 1);
    }
}
