//! Service configuration types for the Playground chat service.
//!
//! `PlaygroundConfig` represents the top-level `playground.toml`. Every
//! section and field has a default, so an empty file (or no file) yields a
//! working configuration pointed at a local inference server.

use std::fmt;

use serde::{Deserialize, Serialize};

use crate::error::ConfigError;
use crate::llm::{BackendCapabilities, DEFAULT_MAX_NEW_TOKENS};

/// System prompt installed at the head of every new chat session.
pub const DEFAULT_SYSTEM_PROMPT: &str =
    "You are a concise AI assistant. Limit responses to 1-2 sentences.";

/// Default token budget for a session's chat history.
pub const DEFAULT_MAX_MEMORY_TOKENS: u32 = 512;

/// Top-level configuration.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct PlaygroundConfig {
    #[serde(default)]
    pub server: ServerConfig,
    #[serde(default)]
    pub chat: ChatConfig,
    #[serde(default)]
    pub backend: BackendConfig,
}

impl PlaygroundConfig {
    /// Reject values no session could run with.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.chat.max_new_tokens == 0 {
            return Err(ConfigError::Invalid(
                "chat.max_new_tokens must be greater than zero".to_string(),
            ));
        }
        if self.chat.system_prompt.trim().is_empty() {
            return Err(ConfigError::Invalid(
                "chat.system_prompt must not be empty".to_string(),
            ));
        }
        if self.backend.base_url.trim().is_empty() {
            return Err(ConfigError::Invalid(
                "backend.base_url must not be empty".to_string(),
            ));
        }
        Ok(())
    }
}

/// HTTP listener settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ServerConfig {
    #[serde(default = "default_host")]
    pub host: String,
    #[serde(default = "default_port")]
    pub port: u16,
}

fn default_host() -> String {
    "127.0.0.1".to_string()
}

fn default_port() -> u16 {
    8080
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: default_host(),
            port: default_port(),
        }
    }
}

/// Per-session chat memory settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ChatConfig {
    #[serde(default = "default_system_prompt")]
    pub system_prompt: String,
    /// Token budget for history + pending user message.
    #[serde(default = "default_max_memory_tokens")]
    pub max_memory_tokens: u32,
    #[serde(default = "default_max_new_tokens")]
    pub max_new_tokens: u32,
}

fn default_system_prompt() -> String {
    DEFAULT_SYSTEM_PROMPT.to_string()
}

fn default_max_memory_tokens() -> u32 {
    DEFAULT_MAX_MEMORY_TOKENS
}

fn default_max_new_tokens() -> u32 {
    DEFAULT_MAX_NEW_TOKENS
}

impl Default for ChatConfig {
    fn default() -> Self {
        Self {
            system_prompt: default_system_prompt(),
            max_memory_tokens: default_max_memory_tokens(),
            max_new_tokens: default_max_new_tokens(),
        }
    }
}

/// How a backend counts the tokens of a transcript.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TokenCounting {
    /// Ask the inference server to apply the chat template and tokenize.
    #[default]
    Server,
    /// Character-based estimate, no network round trip.
    Estimate,
}

impl fmt::Display for TokenCounting {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            TokenCounting::Server => write!(f, "server"),
            TokenCounting::Estimate => write!(f, "estimate"),
        }
    }
}

/// Connection settings for the OpenAI-compatible inference server.
///
/// `Debug` is implemented by hand so the API key never reaches a log line.
#[derive(Clone, Serialize, Deserialize)]
pub struct BackendConfig {
    /// Human-readable backend name used in logs and spans.
    #[serde(default = "default_backend_name")]
    pub name: String,
    /// Base URL of the chat completions API, including the `/v1` suffix.
    #[serde(default = "default_base_url")]
    pub base_url: String,
    #[serde(default = "default_model")]
    pub model: String,
    /// API key; local servers usually accept any value.
    #[serde(default)]
    pub api_key: Option<String>,
    /// Tokenize endpoint override. Derived from `base_url` when absent.
    #[serde(default)]
    pub tokenize_url: Option<String>,
    #[serde(default)]
    pub token_counting: TokenCounting,
    #[serde(default)]
    pub temperature: Option<f64>,
    #[serde(default = "default_streaming")]
    pub streaming: bool,
    #[serde(default = "default_max_context_tokens")]
    pub max_context_tokens: u32,
}

impl fmt::Debug for BackendConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("BackendConfig")
            .field("name", &self.name)
            .field("base_url", &self.base_url)
            .field("model", &self.model)
            .field("api_key", &self.api_key.as_ref().map(|_| "[REDACTED]"))
            .field("tokenize_url", &self.tokenize_url)
            .field("token_counting", &self.token_counting)
            .field("temperature", &self.temperature)
            .field("streaming", &self.streaming)
            .field("max_context_tokens", &self.max_context_tokens)
            .finish()
    }
}

fn default_backend_name() -> String {
    "qwen2".to_string()
}

fn default_base_url() -> String {
    "http://localhost:8000/v1".to_string()
}

fn default_model() -> String {
    "Qwen/Qwen2-0.5B-Instruct".to_string()
}

fn default_streaming() -> bool {
    true
}

fn default_max_context_tokens() -> u32 {
    BackendCapabilities::default().max_context_tokens
}

impl Default for BackendConfig {
    fn default() -> Self {
        Self {
            name: default_backend_name(),
            base_url: default_base_url(),
            model: default_model(),
            api_key: None,
            tokenize_url: None,
            token_counting: TokenCounting::default(),
            temperature: None,
            streaming: default_streaming(),
            max_context_tokens: default_max_context_tokens(),
        }
    }
}

impl BackendConfig {
    pub fn capabilities(&self) -> BackendCapabilities {
        BackendCapabilities {
            streaming: self.streaming,
            max_context_tokens: self.max_context_tokens,
        }
    }

    /// Resolve the tokenize endpoint.
    ///
    /// vLLM serves `/tokenize` at the server root, next to `/v1`.
    pub fn resolved_tokenize_url(&self) -> String {
        if let Some(ref url) = self.tokenize_url {
            return url.clone();
        }
        let base = self.base_url.trim_end_matches('/');
        let root = base.strip_suffix("/v1").unwrap_or(base);
        format!("{root}/tokenize")
    }
}
