//! ChatBackend trait definition.
//!
//! This is the core abstraction every inference engine implements. Uses
//! RPITIT for `count_tokens` and `generate`, and `Pin<Box<dyn Stream>>` for
//! `stream` (streams need to be object-safe for the BoxChatBackend wrapper).

use std::pin::Pin;

use futures_util::Stream;

use playground_types::error::ChatError;
use playground_types::llm::{BackendCapabilities, GenerationRequest, Message};

/// A boxed stream of reply text chunks.
///
/// Finite and not restartable. Concatenating every `Ok` chunk yields the
/// full reply.
pub type ChunkStream = Pin<Box<dyn Stream<Item = Result<String, ChatError>> + Send + 'static>>;

/// Trait for inference backends (a causal language model plus its tokenizer).
///
/// Token counting must apply the same prompt construction (chat template,
/// generation prompt) the backend uses when generating, so that the budget
/// checked by the chat manager matches what the model actually sees.
///
/// Implementations live in playground-infra.
pub trait ChatBackend: Send + Sync {
    /// Human-readable backend name (e.g., "qwen2").
    fn name(&self) -> &str;

    /// What this backend supports.
    fn capabilities(&self) -> &BackendCapabilities;

    /// Count the prompt tokens for a transcript. Pure: no side effects.
    fn count_tokens(
        &self,
        messages: &[Message],
    ) -> impl std::future::Future<Output = Result<u32, ChatError>> + Send;

    /// Generate a single textual reply to the full transcript.
    fn generate(
        &self,
        request: &GenerationRequest,
    ) -> impl std::future::Future<Output = Result<String, ChatError>> + Send;

    /// Generate a reply as a stream of text chunks.
    fn stream(&self, request: GenerationRequest) -> ChunkStream;
}
