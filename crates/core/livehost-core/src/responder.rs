//! Reply generation against the hosted completion service

use crate::catalog::Catalog;
use crate::events::ChatEvent;
use crate::memory::{ConversationHistory, RecentReplies, Role};
use crate::numbers::price_to_words;
use crate::Result;
use async_trait::async_trait;
use rand::seq::SliceRandom;

/// One message in a completion request
#[derive(Debug, Clone, serde::Serialize, serde::Deserialize)]
pub struct ChatMessage {
    /// Wire role: system / user / assistant
    pub role: String,
    /// Message content
    pub content: String,
}

impl ChatMessage {
    /// Build a system message
    pub fn system(content: impl Into<String>) -> Self {
        Self {
            role: "system".to_string(),
            content: content.into(),
        }
    }

    /// Build a user message
    pub fn user(content: impl Into<String>) -> Self {
        Self {
            role: "user".to_string(),
            content: content.into(),
        }
    }

    /// Build an assistant message
    pub fn assistant(content: impl Into<String>) -> Self {
        Self {
            role: "assistant".to_string(),
            content: content.into(),
        }
    }
}

/// Model parameters for one completion call
#[derive(Debug, Clone)]
pub struct CompletionParams {
    /// Model identifier; None uses the provider default
    pub model: Option<String>,
    /// Sampling temperature
    pub temperature: f32,
    /// Nucleus sampling cutoff
    pub top_p: f32,
    /// Output token cap
    pub max_tokens: u32,
}

impl Default for CompletionParams {
    fn default() -> Self {
        Self {
            model: None,
            temperature: 0.8,
            top_p: 0.9,
            max_tokens: 300,
        }
    }
}

/// Hosted completion service seam
#[async_trait]
pub trait CompletionProvider: Send + Sync {
    /// Provider name, for logs
    fn name(&self) -> &str;

    /// Run one completion over the given messages
    async fn complete(&self, messages: &[ChatMessage], params: &CompletionParams)
        -> Result<String>;
}

/// Style directives mixed into the prompt to keep phrasing varied
const STYLE_SEEDS: [&str; 4] = [
    "Balas dengan gaya energik",
    "Balas dengan gaya santai",
    "Balas singkat dan friendly",
    "Langsung jelaskan dengan antusias",
];

/// How many prior replies the anti-repetition hint names
const REPETITION_HINT_COUNT: usize = 3;

/// Builds completion requests from chat events plus rolling context and
/// returns the generated reply text.
///
/// Carries the session's conversation history and recent-reply cache; one
/// generator instance serves the whole session, driven serially by the chat
/// queue.
pub struct ResponseGenerator {
    provider: std::sync::Arc<dyn CompletionProvider>,
    params: CompletionParams,
    max_response_length: usize,
    history: ConversationHistory,
    recent_replies: RecentReplies,
}

impl ResponseGenerator {
    /// Create a generator over the given provider
    pub fn new(
        provider: std::sync::Arc<dyn CompletionProvider>,
        max_response_length: usize,
    ) -> Self {
        Self {
            provider,
            params: CompletionParams::default(),
            max_response_length,
            history: ConversationHistory::default(),
            recent_replies: RecentReplies::default(),
        }
    }

    /// Override the default model parameters
    pub fn with_params(mut self, params: CompletionParams) -> Self {
        self.params = params;
        self
    }

    /// Render the system instruction for the current catalog
    fn system_prompt(catalog: &Catalog) -> String {
        let product_list = catalog
            .products
            .iter()
            .filter(|p| !p.name.trim().is_empty())
            .enumerate()
            .map(|(i, p)| {
                let description = if p.description.is_empty() {
                    "produk unggulan"
                } else {
                    &p.description
                };
                format!(
                    "{}. {} - {} ({}, stok: {})",
                    i + 1,
                    p.name,
                    price_to_words(p.price),
                    description,
                    p.stock
                )
            })
            .collect::<Vec<_>>()
            .join("\n");

        let promo_list = if catalog.promotions.is_empty() {
            "Tidak ada promo".to_string()
        } else {
            catalog
                .promotions
                .iter()
                .map(|p| format!("- Kode \"{}\": {}", p.code, p.description))
                .collect::<Vec<_>>()
                .join("\n")
        };

        format!(
            "Kamu adalah sales live streaming untuk \"{store}\".\n\
             \n\
             ATURAN WAJIB:\n\
             - Sebut nama user dengan \"kak [nama]\"\n\
             - TANPA emoji\n\
             - Respons HARUS berbeda setiap kali\n\
             \n\
             LARANGAN MUTLAK:\n\
             - DILARANG KERAS bertanya balik kepada user\n\
             - DILARANG minta klarifikasi apapun\n\
             - JIKA user tanya produk, LANGSUNG JELASKAN!\n\
             \n\
             SAAT USER TANYA PRODUK (spill, produk, harga):\n\
             Langsung berikan nama produk, harga dalam kata (seratus ribu, bukan 100.000),\n\
             deskripsi singkat, lalu ajak beli.\n\
             \n\
             === PRODUK TERSEDIA ===\n\
             {products}\n\
             \n\
             === PROMO ===\n\
             {promos}",
            store = catalog.store_name,
            products = if product_list.is_empty() {
                "Belum ada produk"
            } else {
                &product_list
            },
            promos = promo_list,
        )
    }

    /// Assemble the full message list for one chat event
    fn build_messages(&self, event: &ChatEvent, catalog: &Catalog) -> Vec<ChatMessage> {
        let mut messages = vec![ChatMessage::system(Self::system_prompt(catalog))];

        for turn in self.history.turns() {
            messages.push(match turn.role {
                Role::User => ChatMessage::user(turn.content.clone()),
                Role::Assistant => ChatMessage::assistant(turn.content.clone()),
            });
        }

        let variation_hint = if self.recent_replies.is_empty() {
            String::new()
        } else {
            format!(
                "\n\n[PENTING: Jangan gunakan respons seperti: \"{}\" - buat yang BERBEDA!]",
                self.recent_replies.last_n(REPETITION_HINT_COUNT).join("\", \"")
            )
        };

        let seed = STYLE_SEEDS
            .choose(&mut rand::thread_rng())
            .copied()
            .unwrap_or(STYLE_SEEDS[0]);

        messages.push(ChatMessage::user(format!(
            "{} bilang: \"{}\"{}\n\n[Style: {}]",
            event.display_name, event.message, variation_hint, seed
        )));

        messages
    }

    /// Generate a reply for one chat event.
    ///
    /// One completion call, no retry. A failed call degrades to a fixed
    /// apology addressed to the viewer; the failure never escapes this
    /// method.
    pub async fn generate(&mut self, event: &ChatEvent, catalog: &Catalog) -> String {
        let messages = self.build_messages(event, catalog);

        match self.provider.complete(&messages, &self.params).await {
            Ok(response) => {
                let mut reply = response.trim().to_string();
                if reply.chars().count() > self.max_response_length {
                    reply = reply.chars().take(self.max_response_length).collect();
                }

                self.history.push_exchange(
                    format!("{}: {}", event.display_name, event.message),
                    reply.clone(),
                );
                self.recent_replies.push(reply.clone());

                tracing::info!("AI response: {}", reply);
                reply
            }
            Err(e) => {
                tracing::error!("Completion failed ({}): {}", self.provider.name(), e);
                format!("Halo kak {}! Maaf ya, coba tanya lagi ya kak~", event.display_name)
            }
        }
    }

    /// Clear conversation history and the recent-reply cache
    pub fn clear_history(&mut self) {
        self.history.clear();
        self.recent_replies.clear();
    }
}
