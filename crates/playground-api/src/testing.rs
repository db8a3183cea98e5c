//! In-memory backend for state, router and WebSocket tests.

use playground_core::llm::backend::{ChatBackend, ChunkStream};
use playground_types::error::ChatError;
use playground_types::llm::{BackendCapabilities, GenerationRequest, Message, MessageRole};

/// Replies `echo: <last user message>`. Counts one token per word.
#[derive(Default)]
pub(crate) struct EchoBackend {
    pub capabilities: BackendCapabilities,
    /// Fail every generation with this message.
    pub fail_with: Option<String>,
}

impl EchoBackend {
    fn reply_for(&self, messages: &[Message]) -> Result<String, ChatError> {
        if let Some(ref msg) = self.fail_with {
            return Err(ChatError::Generation(msg.clone()));
        }
        let last_user = messages
            .iter()
            .rev()
            .find(|m| m.role == MessageRole::User)
            .map(|m| m.content.as_str())
            .unwrap_or_default();
        Ok(format!("echo: {last_user}"))
    }
}

impl ChatBackend for EchoBackend {
    fn name(&self) -> &str {
        "echo"
    }

    fn capabilities(&self) -> &BackendCapabilities {
        &self.capabilities
    }

    async fn count_tokens(&self, messages: &[Message]) -> Result<u32, ChatError> {
        Ok(messages
            .iter()
            .map(|m| m.content.split_whitespace().count() as u32)
            .sum())
    }

    async fn generate(&self, request: &GenerationRequest) -> Result<String, ChatError> {
        self.reply_for(&request.messages)
    }

    fn stream(&self, request: GenerationRequest) -> ChunkStream {
        let chunks: Vec<Result<String, ChatError>> = match self.reply_for(&request.messages) {
            Ok(text) => text.split_inclusive(' ').map(|c| Ok(c.to_string())).collect(),
            Err(e) => vec![Err(e)],
        };
        Box::pin(futures_util::stream::iter(chunks))
    }
}
