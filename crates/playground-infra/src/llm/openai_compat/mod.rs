//! OpenAI-compatible inference server backend.
//!
//! Talks to any server exposing `/v1/chat/completions` (vLLM, llama.cpp
//! server, TGI, Ollama). The server owns the model weights and its chat
//! template; this client only ships transcripts and reads replies.
//!
//! Uses [`async_openai`] for type-safe request/response handling and
//! built-in SSE streaming.

pub mod streaming;
pub mod tokenize;

use std::time::Duration;

use async_openai::config::OpenAIConfig;
use async_openai::types::chat::{
    ChatCompletionRequestAssistantMessage, ChatCompletionRequestAssistantMessageContent,
    ChatCompletionRequestMessage, ChatCompletionRequestSystemMessage,
    ChatCompletionRequestSystemMessageContent, ChatCompletionRequestUserMessage,
    ChatCompletionRequestUserMessageContent, CreateChatCompletionRequest,
};
use async_openai::Client;
use futures_util::StreamExt;
use secrecy::SecretString;

use playground_core::llm::backend::{ChatBackend, ChunkStream};
use playground_types::config::{BackendConfig, TokenCounting};
use playground_types::error::ChatError;
use playground_types::llm::{BackendCapabilities, GenerationRequest, Message, MessageRole};

use self::streaming::map_openai_stream;
use self::tokenize::TokenCounter;

/// Placeholder key for local servers started without `--api-key`.
const UNAUTHENTICATED_API_KEY: &str = "EMPTY";

/// Chat backend for an OpenAI-compatible inference server.
///
/// Does NOT derive Debug: the `async_openai::Client` and the token counter
/// both hold the API key.
pub struct OpenAiCompatibleBackend {
    client: Client<OpenAIConfig>,
    name: String,
    model: String,
    temperature: Option<f64>,
    capabilities: BackendCapabilities,
    token_counter: TokenCounter,
}

impl OpenAiCompatibleBackend {
    pub fn new(config: &BackendConfig) -> Self {
        let api_key = config
            .api_key
            .clone()
            .unwrap_or_else(|| UNAUTHENTICATED_API_KEY.to_string());

        let openai_config = OpenAIConfig::new()
            .with_api_key(&api_key)
            .with_api_base(&config.base_url);

        let token_counter = match config.token_counting {
            TokenCounting::Server => TokenCounter::server(
                config.resolved_tokenize_url(),
                config.model.clone(),
                SecretString::from(api_key),
            ),
            TokenCounting::Estimate => TokenCounter::Estimate,
        };

        // A failed turn is reported to the user straight away. The client's
        // default backoff would replay 5xx and 429 responses for minutes.
        let no_retry = backoff::ExponentialBackoffBuilder::new()
            .with_max_elapsed_time(Some(Duration::ZERO))
            .build();

        Self {
            client: Client::with_config(openai_config).with_backoff(no_retry),
            name: config.name.clone(),
            model: config.model.clone(),
            temperature: config.temperature,
            capabilities: config.capabilities(),
            token_counter,
        }
    }

    pub fn model(&self) -> &str {
        &self.model
    }

    fn build_request(&self, request: &GenerationRequest, stream: bool) -> CreateChatCompletionRequest {
        let messages = request.messages.iter().map(to_openai_message).collect();

        let mut req = CreateChatCompletionRequest {
            model: self.model.clone(),
            messages,
            max_completion_tokens: Some(request.max_new_tokens),
            temperature: self.temperature.map(|t| t as f32),
            ..Default::default()
        };

        if stream {
            req.stream = Some(true);
        }

        req
    }
}

fn to_openai_message(msg: &Message) -> ChatCompletionRequestMessage {
    match msg.role {
        MessageRole::System => {
            ChatCompletionRequestMessage::System(ChatCompletionRequestSystemMessage {
                content: ChatCompletionRequestSystemMessageContent::Text(msg.content.clone()),
                name: None,
            })
        }
        MessageRole::User => ChatCompletionRequestMessage::User(ChatCompletionRequestUserMessage {
            content: ChatCompletionRequestUserMessageContent::Text(msg.content.clone()),
            name: None,
        }),
        MessageRole::Assistant => {
            #[allow(deprecated)]
            ChatCompletionRequestMessage::Assistant(ChatCompletionRequestAssistantMessage {
                content: Some(ChatCompletionRequestAssistantMessageContent::Text(
                    msg.content.clone(),
                )),
                refusal: None,
                name: None,
                audio: None,
                tool_calls: None,
                function_call: None,
            })
        }
    }
}

impl ChatBackend for OpenAiCompatibleBackend {
    fn name(&self) -> &str {
        &self.name
    }

    fn capabilities(&self) -> &BackendCapabilities {
        &self.capabilities
    }

    async fn count_tokens(&self, messages: &[Message]) -> Result<u32, ChatError> {
        self.token_counter.count(messages).await
    }

    async fn generate(&self, request: &GenerationRequest) -> Result<String, ChatError> {
        let oai_request = self.build_request(request, false);

        let response = self
            .client
            .chat()
            .create(oai_request)
            .await
            .map_err(map_openai_error)?;

        Ok(response
            .choices
            .first()
            .and_then(|c| c.message.content.clone())
            .unwrap_or_default())
    }

    fn stream(&self, request: GenerationRequest) -> ChunkStream {
        let oai_request = self.build_request(&request, true);

        // Clone the client for the 'static stream
        let client = self.client.clone();

        Box::pin(async_stream::try_stream! {
            let oai_stream = client
                .chat()
                .create_stream(oai_request)
                .await
                .map_err(map_openai_error)?;

            let mut inner = map_openai_stream(oai_stream);

            while let Some(chunk) = inner.next().await {
                match chunk {
                    Ok(text) => yield text,
                    Err(e) => Err(e)?,
                }
            }
        })
    }
}

/// Map an `async_openai::error::OpenAIError` to a [`ChatError`].
///
/// Transport failures that never reached the server are `Unavailable`;
/// everything the server answered with is a `Generation` failure.
fn map_openai_error(err: async_openai::error::OpenAIError) -> ChatError {
    use async_openai::error::OpenAIError;

    match &err {
        OpenAIError::ApiError(api_err) => {
            let code = api_err.code.as_deref().unwrap_or("");
            if code == "context_length_exceeded"
                || api_err.message.contains("maximum context length")
            {
                ChatError::Generation(format!("context length exceeded: {}", api_err.message))
            } else {
                ChatError::Generation(api_err.message.clone())
            }
        }
        OpenAIError::Reqwest(reqwest_err) => {
            if reqwest_err.is_connect() || reqwest_err.is_timeout() {
                ChatError::Unavailable(err.to_string())
            } else {
                ChatError::Generation(err.to_string())
            }
        }
        OpenAIError::JSONDeserialize(_, content) => {
            ChatError::Generation(format!("failed to parse response: {content}"))
        }
        OpenAIError::StreamError(stream_err) => ChatError::Generation(stream_err.to_string()),
        _ => ChatError::Generation(err.to_string()),
    }
}
