//! Token budget for a chat session's history.
//!
//! The budget is soft: the chat manager evicts old turns to get under it,
//! but never evicts the system prompt or the pending user message to do so.

use playground_types::llm::BackendCapabilities;

/// Maximum number of tokens a candidate transcript may occupy before the
/// chat manager starts evicting the oldest turns.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TokenBudget {
    max_memory_tokens: u32,
}

impl TokenBudget {
    pub fn new(max_memory_tokens: u32) -> Self {
        Self { max_memory_tokens }
    }

    /// Derive a budget that also leaves room for the reply.
    ///
    /// The configured budget is kept unless the model's context window
    /// minus `max_new_tokens` is smaller, in which case that is used.
    pub fn for_backend(
        configured: u32,
        max_new_tokens: u32,
        caps: &BackendCapabilities,
    ) -> Self {
        let window = caps.max_context_tokens.saturating_sub(max_new_tokens);
        Self::new(configured.min(window))
    }

    pub fn max_memory_tokens(&self) -> u32 {
        self.max_memory_tokens
    }

    /// Whether a transcript of `tokens` tokens is over budget.
    pub fn exceeds(&self, tokens: u32) -> bool {
        tokens > self.max_memory_tokens
    }
}
