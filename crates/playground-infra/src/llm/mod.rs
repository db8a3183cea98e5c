//! Chat backend implementations.
//!
//! Contains the OpenAI-compatible implementation of the [`ChatBackend`]
//! trait defined in `playground-core`, a factory ([`create_backend`]) that
//! builds it from [`BackendConfig`], and a connection probe
//! ([`test_backend_connection`]) run at server startup.
//!
//! [`ChatBackend`]: playground_core::llm::backend::ChatBackend

pub mod openai_compat;

use playground_core::llm::box_backend::BoxChatBackend;
use playground_types::config::BackendConfig;
use playground_types::error::ChatError;
use playground_types::llm::{GenerationRequest, Message};

use self::openai_compat::OpenAiCompatibleBackend;

/// Create a [`BoxChatBackend`] from a [`BackendConfig`].
pub fn create_backend(config: &BackendConfig) -> BoxChatBackend {
    tracing::debug!(
        backend = %config.name,
        base_url = %config.base_url,
        model = %config.model,
        token_counting = %config.token_counting,
        "Creating chat backend"
    );
    BoxChatBackend::new(OpenAiCompatibleBackend::new(config))
}

/// Verify the backend answers by counting and generating for a one-word
/// transcript with a minimal token budget.
pub async fn test_backend_connection(backend: &BoxChatBackend) -> Result<(), ChatError> {
    let messages = vec![Message::user("Hello")];
    backend.count_tokens(&messages).await?;
    backend
        .generate(&GenerationRequest::new(messages, 1))
        .await?;
    Ok(())
}
