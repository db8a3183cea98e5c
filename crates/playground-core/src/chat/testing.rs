//! Scripted in-memory backend shared by the chat tests.
//!
//! Counts one token per whitespace-separated word, so test fixtures can
//! state their sizes directly ("a 5-token system prompt").

use std::collections::VecDeque;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex};

use playground_types::error::ChatError;
use playground_types::llm::{BackendCapabilities, GenerationRequest, Message};

use crate::llm::backend::{ChatBackend, ChunkStream};
use crate::llm::box_backend::BoxChatBackend;

#[derive(Default)]
pub(crate) struct Script {
    replies: Mutex<VecDeque<Result<String, ChatError>>>,
    prompts: Mutex<Vec<Vec<Message>>>,
    max_new_tokens: Mutex<Vec<u32>>,
    fail_tokenize: AtomicBool,
}

impl Script {
    pub fn push_reply(&self, reply: impl Into<String>) {
        self.replies.lock().unwrap().push_back(Ok(reply.into()));
    }

    pub fn push_error(&self, error: ChatError) {
        self.replies.lock().unwrap().push_back(Err(error));
    }

    pub fn fail_tokenize(&self, fail: bool) {
        self.fail_tokenize.store(fail, Ordering::SeqCst);
    }

    /// Every transcript handed to `generate` or `stream`, in call order.
    pub fn prompts(&self) -> Vec<Vec<Message>> {
        self.prompts.lock().unwrap().clone()
    }

    /// The `max_new_tokens` limit of every generation request, in call order.
    pub fn max_new_tokens(&self) -> Vec<u32> {
        self.max_new_tokens.lock().unwrap().clone()
    }

    fn next_reply(&self, request: &GenerationRequest) -> Result<String, ChatError> {
        self.prompts.lock().unwrap().push(request.messages.clone());
        self.max_new_tokens.lock().unwrap().push(request.max_new_tokens);
        self.replies
            .lock()
            .unwrap()
            .pop_front()
            .unwrap_or_else(|| Ok("ok".to_string()))
    }
}

pub(crate) struct ScriptedBackend {
    script: Arc<Script>,
    capabilities: BackendCapabilities,
}

pub(crate) fn scripted_backend() -> (Arc<BoxChatBackend>, Arc<Script>) {
    let script = Arc::new(Script::default());
    let backend = ScriptedBackend {
        script: script.clone(),
        capabilities: BackendCapabilities::default(),
    };
    (Arc::new(BoxChatBackend::new(backend)), script)
}

/// `n` space-separated copies of `word`, i.e. an `n`-token message body.
pub(crate) fn words(n: usize, word: &str) -> String {
    vec![word; n].join(" ")
}

pub(crate) fn count_words(messages: &[Message]) -> u32 {
    messages
        .iter()
        .map(|m| m.content.split_whitespace().count() as u32)
        .sum()
}

impl ChatBackend for ScriptedBackend {
    fn name(&self) -> &str {
        "scripted"
    }

    fn capabilities(&self) -> &BackendCapabilities {
        &self.capabilities
    }

    async fn count_tokens(&self, messages: &[Message]) -> Result<u32, ChatError> {
        if self.script.fail_tokenize.load(Ordering::SeqCst) {
            return Err(ChatError::Tokenization("template rejected".to_string()));
        }
        Ok(count_words(messages))
    }

    async fn generate(&self, request: &GenerationRequest) -> Result<String, ChatError> {
        self.script.next_reply(request)
    }

    /// Streams the reply one word at a time. A scripted error is delivered
    /// after one partial chunk.
    fn stream(&self, request: GenerationRequest) -> ChunkStream {
        let chunks: Vec<Result<String, ChatError>> =
            match self.script.next_reply(&request) {
                Ok(text) => text.split_inclusive(' ').map(|c| Ok(c.to_string())).collect(),
                Err(e) => vec![Ok("partial ".to_string()), Err(e)],
            };
        Box::pin(futures_util::stream::iter(chunks))
    }
}
