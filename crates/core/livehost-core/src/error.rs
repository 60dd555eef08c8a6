//! Error types for the LiveHost core

use thiserror::Error;

/// Main error type for LiveHost operations
#[derive(Debug, Error)]
pub enum LiveHostError {
    /// Configuration error
    #[error("Configuration error: {0}")]
    Config(String),

    /// Network/HTTP error
    #[error("Network error: {0}")]
    Network(#[from] reqwest::Error),

    /// Serialization/deserialization error
    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    /// IO error
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// External provider error (completion or speech service)
    #[error("Provider error: {0}")]
    Provider(String),

    /// Authentication/authorization error
    #[error("Auth error: {0}")]
    Auth(String),

    /// Rate limit / quota error
    #[error("Rate limit exceeded: {0}")]
    RateLimit(String),

    /// Live event source error
    #[error("Event error: {0}")]
    Event(String),

    /// Scene control error
    #[error("Scene error: {0}")]
    Scene(String),

    /// Audio playback error
    #[error("Playback error: {0}")]
    Playback(String),

    /// Service-level error (session lifecycle, queue wiring)
    #[error("Service error: {0}")]
    Service(String),

    /// Not found error (generic)
    #[error("Not found: {0}")]
    NotFound(String),

    /// Timeout error
    #[error("Timeout: {0}")]
    Timeout(String),

    /// Generic error with context
    #[error("{0}")]
    Other(String),
}

/// Convenient Result type using LiveHostError
pub type Result<T> = std::result::Result<T, LiveHostError>;

/// Message keywords that mark a failure as quota/credit exhaustion even when
/// the service did not return a clean 401/429 status.
const QUOTA_KEYWORDS: [&str; 6] = [
    "quota",
    "limit",
    "exceeded",
    "credits",
    "unauthorized",
    "insufficient",
];

impl LiveHostError {
    /// Create a configuration error
    pub fn config(msg: impl Into<String>) -> Self {
        LiveHostError::Config(msg.into())
    }

    /// Create a provider error
    pub fn provider(msg: impl Into<String>) -> Self {
        LiveHostError::Provider(msg.into())
    }

    /// Create an auth error
    pub fn auth(msg: impl Into<String>) -> Self {
        LiveHostError::Auth(msg.into())
    }

    /// Create a rate limit error
    pub fn rate_limit(msg: impl Into<String>) -> Self {
        LiveHostError::RateLimit(msg.into())
    }

    /// Create an event error
    pub fn event(msg: impl Into<String>) -> Self {
        LiveHostError::Event(msg.into())
    }

    /// Create a scene error
    pub fn scene(msg: impl Into<String>) -> Self {
        LiveHostError::Scene(msg.into())
    }

    /// Create a playback error
    pub fn playback(msg: impl Into<String>) -> Self {
        LiveHostError::Playback(msg.into())
    }

    /// Create a service error
    pub fn service(msg: impl Into<String>) -> Self {
        LiveHostError::Service(msg.into())
    }

    /// Create a not found error
    pub fn not_found(msg: impl Into<String>) -> Self {
        LiveHostError::NotFound(msg.into())
    }

    /// Create a timeout error
    pub fn timeout(msg: impl Into<String>) -> Self {
        LiveHostError::Timeout(msg.into())
    }

    /// Create a generic error
    pub fn other(msg: impl Into<String>) -> Self {
        LiveHostError::Other(msg.into())
    }

    /// Whether this failure indicates exhausted credits, a hit rate limit or
    /// a rejected credential — the class of errors the speech key pool
    /// responds to by rotating to the next key. Everything else surfaces
    /// immediately without rotation.
    pub fn is_quota_class(&self) -> bool {
        match self {
            LiveHostError::Auth(_) | LiveHostError::RateLimit(_) => true,
            other => {
                let msg = other.to_string().to_lowercase();
                QUOTA_KEYWORDS.iter().any(|kw| msg.contains(kw))
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_creation() {
        let err = LiveHostError::provider("model unavailable");
        assert_eq!(err.to_string(), "Provider error: model unavailable");

        let err = LiveHostError::scene("no such scene");
        assert_eq!(err.to_string(), "Scene error: no such scene");
    }

    #[test]
    fn test_quota_classification_by_variant() {
        assert!(LiveHostError::auth("bad key").is_quota_class());
        assert!(LiveHostError::rate_limit("slow down").is_quota_class());
        assert!(!LiveHostError::playback("device gone").is_quota_class());
    }

    #[test]
    fn test_quota_classification_by_keyword() {
        assert!(LiveHostError::provider("character quota exhausted").is_quota_class());
        assert!(LiveHostError::other("Insufficient credits remaining").is_quota_class());
        assert!(!LiveHostError::provider("connection reset by peer").is_quota_class());
    }

    #[test]
    fn test_result_type() {
        fn returns_result() -> Result<i32> {
            Ok(42)
        }

        assert_eq!(returns_result().unwrap(), 42);
    }
}
