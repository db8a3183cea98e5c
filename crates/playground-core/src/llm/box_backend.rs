//! BoxChatBackend -- object-safe dynamic dispatch wrapper for ChatBackend.
//!
//! 1. Define an object-safe `ChatBackendDyn` trait with boxed futures
//! 2. Blanket-impl `ChatBackendDyn` for all `T: ChatBackend`
//! 3. `BoxChatBackend` wraps `Box<dyn ChatBackendDyn>` and delegates

use std::future::Future;
use std::pin::Pin;

use playground_types::error::ChatError;
use playground_types::llm::{BackendCapabilities, GenerationRequest, Message};

use super::backend::{ChatBackend, ChunkStream};

/// Object-safe version of [`ChatBackend`] with boxed futures.
pub trait ChatBackendDyn: Send + Sync {
    fn name(&self) -> &str;

    fn capabilities(&self) -> &BackendCapabilities;

    fn count_tokens_boxed<'a>(
        &'a self,
        messages: &'a [Message],
    ) -> Pin<Box<dyn Future<Output = Result<u32, ChatError>> + Send + 'a>>;

    fn generate_boxed<'a>(
        &'a self,
        request: &'a GenerationRequest,
    ) -> Pin<Box<dyn Future<Output = Result<String, ChatError>> + Send + 'a>>;

    fn stream_boxed(&self, request: GenerationRequest) -> ChunkStream;
}

impl<T: ChatBackend> ChatBackendDyn for T {
    fn name(&self) -> &str {
        ChatBackend::name(self)
    }

    fn capabilities(&self) -> &BackendCapabilities {
        ChatBackend::capabilities(self)
    }

    fn count_tokens_boxed<'a>(
        &'a self,
        messages: &'a [Message],
    ) -> Pin<Box<dyn Future<Output = Result<u32, ChatError>> + Send + 'a>> {
        Box::pin(self.count_tokens(messages))
    }

    fn generate_boxed<'a>(
        &'a self,
        request: &'a GenerationRequest,
    ) -> Pin<Box<dyn Future<Output = Result<String, ChatError>> + Send + 'a>> {
        Box::pin(self.generate(request))
    }

    fn stream_boxed(&self, request: GenerationRequest) -> ChunkStream {
        self.stream(request)
    }
}

/// Type-erased chat backend for runtime backend selection.
///
/// Since `ChatBackend` uses RPITIT it cannot be a trait object directly;
/// `BoxChatBackend` exposes the same methods and delegates to the inner
/// `ChatBackendDyn` trait object.
pub struct BoxChatBackend {
    inner: Box<dyn ChatBackendDyn + Send + Sync>,
}

impl BoxChatBackend {
    /// Wrap a concrete `ChatBackend` in a type-erased box.
    pub fn new<T: ChatBackend + 'static>(backend: T) -> Self {
        Self {
            inner: Box::new(backend),
        }
    }

    pub fn name(&self) -> &str {
        self.inner.name()
    }

    pub fn capabilities(&self) -> &BackendCapabilities {
        self.inner.capabilities()
    }

    pub async fn count_tokens(&self, messages: &[Message]) -> Result<u32, ChatError> {
        self.inner.count_tokens_boxed(messages).await
    }

    pub async fn generate(&self, request: &GenerationRequest) -> Result<String, ChatError> {
        self.inner.generate_boxed(request).await
    }

    pub fn stream(&self, request: GenerationRequest) -> ChunkStream {
        self.inner.stream_boxed(request)
    }
}
