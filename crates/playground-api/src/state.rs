//! Application state shared by the CLI and the HTTP server.

use std::sync::Arc;

use chrono::{DateTime, Utc};
use dashmap::DashMap;
use uuid::Uuid;

use playground_core::chat::chatbot::TokenLimitedChatbot;
use playground_core::llm::box_backend::BoxChatBackend;
use playground_core::llm::token_budget::TokenBudget;
use playground_infra::llm::create_backend;
use playground_types::config::PlaygroundConfig;

/// Shared application state.
///
/// The backend handle is shared read-only by every session; each session
/// owns its own [`TokenLimitedChatbot`].
#[derive(Clone)]
pub struct AppState {
    pub config: Arc<PlaygroundConfig>,
    pub backend: Arc<BoxChatBackend>,
    /// Open WebSocket sessions and when they started.
    pub sessions: Arc<DashMap<Uuid, DateTime<Utc>>>,
}

impl AppState {
    /// Wire the configured OpenAI-compatible backend.
    pub fn new(config: PlaygroundConfig) -> Self {
        let backend = create_backend(&config.backend);
        Self::with_backend(config, backend)
    }

    pub fn with_backend(config: PlaygroundConfig, backend: BoxChatBackend) -> Self {
        Self {
            config: Arc::new(config),
            backend: Arc::new(backend),
            sessions: Arc::new(DashMap::new()),
        }
    }

    /// Start a fresh chat session with the configured system prompt.
    ///
    /// The budget also leaves room in the model's context for the reply.
    pub fn new_chatbot(&self) -> TokenLimitedChatbot {
        let chat = &self.config.chat;
        let budget = TokenBudget::for_backend(
            chat.max_memory_tokens,
            chat.max_new_tokens,
            self.backend.capabilities(),
        );
        TokenLimitedChatbot::new(self.backend.clone(), chat.system_prompt.clone(), budget)
            .with_max_new_tokens(chat.max_new_tokens)
    }
}
