//! Configuration management and environment variable loading

use crate::{LiveHostError, Result};
use std::env;
use std::path::PathBuf;
use std::time::Duration;

/// Load environment variables from a .env file in the current directory or a
/// parent directory. Safe to call multiple times.
pub fn load_env() -> Result<()> {
    match dotenvy::dotenv() {
        Ok(path) => {
            tracing::info!("Loaded environment from: {}", path.display());
            Ok(())
        }
        Err(dotenvy::Error::LineParse(line, pos)) => Err(LiveHostError::config(format!(
            "Failed to parse .env file at line {}, position {}",
            line, pos
        ))),
        Err(dotenvy::Error::Io(_)) => {
            tracing::warn!("No .env file found - using system environment variables only");
            Ok(())
        }
        Err(e) => Err(LiveHostError::config(format!(
            "Failed to load .env file: {}",
            e
        ))),
    }
}

/// Get required environment variable
///
/// Returns an error if the variable is not set
pub fn get_required_env(key: &str) -> Result<String> {
    env::var(key).map_err(|_| {
        LiveHostError::config(format!(
            "Required environment variable '{}' is not set. \
             Check your .env file or system environment.",
            key
        ))
    })
}

/// Get optional environment variable with default
pub fn get_env_or(key: &str, default: &str) -> String {
    env::var(key).unwrap_or_else(|_| default.to_string())
}

/// Get environment variable as boolean
pub fn get_env_bool(key: &str, default: bool) -> bool {
    env::var(key)
        .ok()
        .and_then(|v| match v.to_lowercase().as_str() {
            "true" | "1" | "yes" | "on" => Some(true),
            "false" | "0" | "no" | "off" => Some(false),
            _ => None,
        })
        .unwrap_or(default)
}

/// Get environment variable as integer
pub fn get_env_int<T>(key: &str, default: T) -> T
where
    T: std::str::FromStr,
{
    env::var(key)
        .ok()
        .and_then(|v| v.parse().ok())
        .unwrap_or(default)
}

/// Idle filler play order
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum IdlePlayMode {
    /// Round-robin over the active filler list
    Sequential,
    /// Uniform random pick
    Random,
}

impl IdlePlayMode {
    /// Parse from a settings string; anything but "random" is sequential
    pub fn parse(s: &str) -> Self {
        if s.eq_ignore_ascii_case("random") {
            Self::Random
        } else {
            Self::Sequential
        }
    }

    /// Get mode as string
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Sequential => "sequential",
            Self::Random => "random",
        }
    }
}

/// All session tunables, gathered once at start
#[derive(Debug, Clone)]
pub struct SessionConfig {
    /// Pacing delay before each reply generation
    pub response_delay: Duration,
    /// Hard cap on generated reply length, in characters
    pub max_response_length: usize,
    /// Cooldown window for the (user, message) dedup filter
    pub dedup_cooldown: Duration,
    /// Speech service credentials, tried in order
    pub speech_api_keys: Vec<String>,
    /// Speech service voice identifier
    pub voice_id: String,
    /// Completion service credential
    pub completion_api_key: String,
    /// Directory where synthesized audio assets are written
    pub audio_dir: PathBuf,
    /// Synthesized assets older than this are eligible for cleanup
    pub audio_max_age: Duration,
    /// Whether the idle filler scheduler starts with the session
    pub idle_enabled: bool,
    /// Silence threshold before filler audio plays
    pub idle_interval: Duration,
    /// Filler selection order
    pub idle_play_mode: IdlePlayMode,
}

impl SessionConfig {
    /// Build a config from the environment, using the same variable names as
    /// the dashboard settings surface. Keys may be a comma-separated list to
    /// enable pool failover.
    pub fn from_env() -> Result<Self> {
        let speech_api_keys: Vec<String> = get_required_env("ELEVENLABS_API_KEY")?
            .split(',')
            .map(|k| k.trim().to_string())
            .filter(|k| !k.is_empty())
            .collect();
        if speech_api_keys.is_empty() {
            return Err(LiveHostError::config(
                "ELEVENLABS_API_KEY is set but contains no usable keys",
            ));
        }

        Ok(Self {
            response_delay: Duration::from_millis(get_env_int("RESPONSE_DELAY_MS", 2000u64)),
            max_response_length: get_env_int("MAX_RESPONSE_LENGTH", 1000usize),
            dedup_cooldown: Duration::from_millis(get_env_int("DEDUP_COOLDOWN_MS", 5000u64)),
            speech_api_keys,
            voice_id: get_env_or("ELEVENLABS_VOICE_ID", "pNInz6obpgDQGcFmaJgB"),
            completion_api_key: get_required_env("GROQ_API_KEY")?,
            audio_dir: PathBuf::from(get_env_or("AUDIO_DIR", "audio")),
            audio_max_age: Duration::from_millis(get_env_int("AUDIO_MAX_AGE_MS", 300_000u64)),
            idle_enabled: get_env_bool("IDLE_AUDIO_ENABLED", false),
            idle_interval: Duration::from_secs(get_env_int("IDLE_AUDIO_INTERVAL_SECS", 30u64)),
            idle_play_mode: IdlePlayMode::parse(&get_env_or("IDLE_AUDIO_PLAY_MODE", "sequential")),
        })
    }
}

impl Default for SessionConfig {
    fn default() -> Self {
        Self {
            response_delay: Duration::from_millis(2000),
            max_response_length: 1000,
            dedup_cooldown: Duration::from_secs(5),
            speech_api_keys: Vec::new(),
            voice_id: "pNInz6obpgDQGcFmaJgB".to_string(),
            completion_api_key: String::new(),
            audio_dir: PathBuf::from("audio"),
            audio_max_age: Duration::from_secs(300),
            idle_enabled: false,
            idle_interval: Duration::from_secs(30),
            idle_play_mode: IdlePlayMode::Sequential,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_get_env_or_returns_default() {
        assert_eq!(get_env_or("LIVEHOST_DEFINITELY_UNSET", "fallback"), "fallback");
    }

    #[test]
    fn test_get_env_bool_parsing() {
        env::set_var("LIVEHOST_TEST_BOOL", "yes");
        assert!(get_env_bool("LIVEHOST_TEST_BOOL", false));
        env::set_var("LIVEHOST_TEST_BOOL", "off");
        assert!(!get_env_bool("LIVEHOST_TEST_BOOL", true));
        env::remove_var("LIVEHOST_TEST_BOOL");
        assert!(get_env_bool("LIVEHOST_TEST_BOOL", true));
    }

    #[test]
    fn test_idle_play_mode_parse() {
        assert_eq!(IdlePlayMode::parse("random"), IdlePlayMode::Random);
        assert_eq!(IdlePlayMode::parse("RANDOM"), IdlePlayMode::Random);
        assert_eq!(IdlePlayMode::parse("sequential"), IdlePlayMode::Sequential);
        assert_eq!(IdlePlayMode::parse("garbage"), IdlePlayMode::Sequential);
    }

    #[test]
    fn test_default_config_matches_dashboard_defaults() {
        let cfg = SessionConfig::default();
        assert_eq!(cfg.response_delay, Duration::from_millis(2000));
        assert_eq!(cfg.dedup_cooldown, Duration::from_secs(5));
        assert_eq!(cfg.idle_interval, Duration::from_secs(30));
        assert_eq!(cfg.idle_play_mode, IdlePlayMode::Sequential);
    }
}
