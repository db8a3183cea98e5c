//! Token counting for OpenAI-compatible inference servers.
//!
//! The chat completions protocol has no token counting endpoint, so the
//! backend either asks the server's `/tokenize` route (vLLM) to apply the
//! model's chat template with a generation prompt and report the count, or
//! falls back to a character estimate.

use secrecy::{ExposeSecret, SecretString};
use serde::{Deserialize, Serialize};

use playground_types::error::ChatError;
use playground_types::llm::Message;

/// Characters of role/template markup assumed per message when estimating.
const ESTIMATE_MESSAGE_OVERHEAD_CHARS: usize = 10;

#[derive(Serialize)]
struct TokenizeRequest<'a> {
    model: &'a str,
    messages: &'a [Message],
    add_generation_prompt: bool,
}

#[derive(Deserialize)]
struct TokenizeResponse {
    count: u32,
}

/// Strategy used by the backend to count transcript tokens.
///
/// Does not derive Debug: the server variant holds the API key.
pub enum TokenCounter {
    Server {
        http: reqwest::Client,
        url: String,
        model: String,
        api_key: SecretString,
    },
    Estimate,
}

impl TokenCounter {
    pub fn server(url: String, model: String, api_key: SecretString) -> Self {
        TokenCounter::Server {
            http: reqwest::Client::new(),
            url,
            model,
            api_key,
        }
    }

    pub async fn count(&self, messages: &[Message]) -> Result<u32, ChatError> {
        match self {
            TokenCounter::Server {
                http,
                url,
                model,
                api_key,
            } => count_remote(http, url, model, api_key, messages).await,
            TokenCounter::Estimate => Ok(estimate_tokens(messages)),
        }
    }
}

async fn count_remote(
    http: &reqwest::Client,
    url: &str,
    model: &str,
    api_key: &SecretString,
    messages: &[Message],
) -> Result<u32, ChatError> {
    let body = TokenizeRequest {
        model,
        messages,
        add_generation_prompt: true,
    };

    let response = http
        .post(url)
        .bearer_auth(api_key.expose_secret())
        .json(&body)
        .send()
        .await
        .map_err(|e| {
            if e.is_connect() || e.is_timeout() {
                ChatError::Unavailable(e.to_string())
            } else {
                ChatError::Tokenization(e.to_string())
            }
        })?;

    let status = response.status();
    if !status.is_success() {
        let text = response.text().await.unwrap_or_default();
        return Err(ChatError::Tokenization(format!(
            "tokenize endpoint returned {status}: {text}"
        )));
    }

    let parsed: TokenizeResponse = response
        .json()
        .await
        .map_err(|e| ChatError::Tokenization(format!("invalid tokenize response: {e}")))?;
    Ok(parsed.count)
}

/// Character-based estimate: ~4 chars per token, plus per-message overhead
/// for the chat template's role markers.
pub fn estimate_tokens(messages: &[Message]) -> u32 {
    let total_chars: usize = messages
        .iter()
        .map(|m| m.content.chars().count() + ESTIMATE_MESSAGE_OVERHEAD_CHARS)
        .sum();
    (total_chars as f64 / 4.0).ceil() as u32
}
