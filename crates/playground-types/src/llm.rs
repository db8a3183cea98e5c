//! Inference request types for the Playground chat service.
//!
//! These types model the data shapes exchanged with an inference backend:
//! chat messages, generation requests, and backend capabilities.

use serde::{Deserialize, Serialize};

/// Default number of new tokens a backend may generate per reply.
pub const DEFAULT_MAX_NEW_TOKENS: u32 = 128;

/// Role of a message in a chat transcript.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum MessageRole {
    System,
    User,
    Assistant,
}

/// A single message in a chat transcript.
///
/// Messages are never edited after creation; history changes only by
/// appending or evicting whole messages.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Message {
    pub role: MessageRole,
    pub content: String,
}

impl Message {
    pub fn system(content: impl Into<String>) -> Self {
        Self {
            role: MessageRole::System,
            content: content.into(),
        }
    }

    pub fn user(content: impl Into<String>) -> Self {
        Self {
            role: MessageRole::User,
            content: content.into(),
        }
    }

    pub fn assistant(content: impl Into<String>) -> Self {
        Self {
            role: MessageRole::Assistant,
            content: content.into(),
        }
    }
}

/// Request to a backend for a reply to a full transcript.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GenerationRequest {
    pub messages: Vec<Message>,
    #[serde(default = "default_max_new_tokens")]
    pub max_new_tokens: u32,
}

fn default_max_new_tokens() -> u32 {
    DEFAULT_MAX_NEW_TOKENS
}

impl GenerationRequest {
    pub fn new(messages: Vec<Message>, max_new_tokens: u32) -> Self {
        Self {
            messages,
            max_new_tokens,
        }
    }
}

/// Capabilities of an inference backend.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BackendCapabilities {
    /// Whether `stream` yields incremental chunks (otherwise callers
    /// should prefer a single `generate` call).
    pub streaming: bool,
    /// Maximum prompt + completion length the model accepts.
    pub max_context_tokens: u32,
}

impl Default for BackendCapabilities {
    fn default() -> Self {
        // Qwen2-0.5B-Instruct context length.
        Self {
            streaming: true,
            max_context_tokens: 32_768,
        }
    }
}
