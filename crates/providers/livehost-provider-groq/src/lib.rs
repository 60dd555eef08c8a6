//! Groq completion provider for LiveHost
//!
//! Groq exposes an OpenAI-compatible chat-completions endpoint; the default
//! model is the one the assistant was tuned against.

#![warn(missing_docs)]
#![warn(clippy::all)]

use async_trait::async_trait;
use livehost_core::responder::{ChatMessage, CompletionParams, CompletionProvider};
use livehost_core::{LiveHostError, Result};
use reqwest::Client;
use serde::{Deserialize, Serialize};
use std::sync::OnceLock;

/// Groq API base URL
const GROQ_API_BASE: &str = "https://api.groq.com/openai/v1";

/// Default chat model
const DEFAULT_MODEL: &str = "llama-3.3-70b-versatile";

/// Shared HTTP client for connection pooling
static HTTP_CLIENT: OnceLock<Client> = OnceLock::new();

/// Get or initialize the shared HTTP client
fn get_http_client() -> Client {
    HTTP_CLIENT
        .get_or_init(|| {
            Client::builder()
                .timeout(std::time::Duration::from_secs(60))
                .build()
                .expect("Failed to create HTTP client")
        })
        .clone()
}

#[derive(Debug, Serialize)]
struct GroqRequest<'a> {
    model: &'a str,
    messages: &'a [ChatMessage],
    max_tokens: u32,
    temperature: f32,
    top_p: f32,
}

#[derive(Debug, Deserialize)]
struct GroqResponse {
    choices: Vec<GroqChoice>,
}

#[derive(Debug, Deserialize)]
struct GroqChoice {
    message: GroqResponseMessage,
}

#[derive(Debug, Deserialize)]
struct GroqResponseMessage {
    content: Option<String>,
}

/// Groq chat-completion client
pub struct GroqClient {
    client: Client,
    api_key: String,
    base_url: String,
}

impl GroqClient {
    /// Create a new Groq client with the shared connection pool
    pub fn new(api_key: impl Into<String>) -> Self {
        Self {
            client: get_http_client(),
            api_key: api_key.into(),
            base_url: GROQ_API_BASE.to_string(),
        }
    }

    /// Create a client against a custom base URL (tests, proxies)
    pub fn with_base_url(api_key: impl Into<String>, base_url: impl Into<String>) -> Self {
        Self {
            client: get_http_client(),
            api_key: api_key.into(),
            base_url: base_url.into(),
        }
    }
}

#[async_trait]
impl CompletionProvider for GroqClient {
    fn name(&self) -> &str {
        "groq"
    }

    async fn complete(
        &self,
        messages: &[ChatMessage],
        params: &CompletionParams,
    ) -> Result<String> {
        let model = params.model.as_deref().unwrap_or(DEFAULT_MODEL);
        let request = GroqRequest {
            model,
            messages,
            max_tokens: params.max_tokens,
            temperature: params.temperature,
            top_p: params.top_p,
        };

        tracing::debug!(
            "Groq completion request: model={}, messages={}",
            model,
            messages.len()
        );

        let response = self
            .client
            .post(format!("{}/chat/completions", self.base_url))
            .header("Authorization", format!("Bearer {}", self.api_key))
            .header("Content-Type", "application/json")
            .json(&request)
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            let error_text = response.text().await.unwrap_or_default();
            return Err(match status.as_u16() {
                401 => LiveHostError::auth(error_text),
                429 => LiveHostError::rate_limit(error_text),
                _ => LiveHostError::provider(format!("Groq API error ({}): {}", status, error_text)),
            });
        }

        let body: GroqResponse = response.json().await?;
        let content = body
            .choices
            .into_iter()
            .next()
            .and_then(|c| c.message.content)
            .unwrap_or_default();

        if content.is_empty() {
            return Err(LiveHostError::provider("Groq returned an empty completion"));
        }

        Ok(content)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_request_serialization_shape() {
        let messages = vec![
            ChatMessage::system("aturan"),
            ChatMessage::user("halo kak"),
        ];
        let request = GroqRequest {
            model: DEFAULT_MODEL,
            messages: &messages,
            max_tokens: 300,
            temperature: 0.8,
            top_p: 0.9,
        };

        let json = serde_json::to_value(&request).unwrap();
        assert_eq!(json["model"], "llama-3.3-70b-versatile");
        assert_eq!(json["messages"][0]["role"], "system");
        assert_eq!(json["messages"][1]["content"], "halo kak");
        assert_eq!(json["max_tokens"], 300);
    }

    #[test]
    fn test_response_parsing() {
        let json = r#"{
            "choices": [
                {"message": {"role": "assistant", "content": "Oke kak!"}}
            ]
        }"#;
        let parsed: GroqResponse = serde_json::from_str(json).unwrap();
        assert_eq!(
            parsed.choices[0].message.content.as_deref(),
            Some("Oke kak!")
        );
    }

    #[test]
    fn test_client_uses_groq_base_by_default() {
        let client = GroqClient::new("gsk-test");
        assert_eq!(client.base_url, GROQ_API_BASE);
        assert_eq!(client.name(), "groq");
    }
}
