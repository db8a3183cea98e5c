//! Token-budgeted chat memory.
//!
//! `TokenLimitedChatbot` owns one session's transcript. Before each turn it
//! evicts the oldest non-system messages until the transcript plus the new
//! user message fits the token budget, generates a reply through the
//! backend, and only then commits the exchange to history.
//!
//! The budget is soft. When only the system prompt and the pending user
//! message remain and they still exceed the budget, generation proceeds
//! anyway rather than failing the turn.

use std::sync::Arc;

use tracing::{debug, info_span, Instrument};

use playground_types::error::ChatError;
use playground_types::llm::{GenerationRequest, Message, DEFAULT_MAX_NEW_TOKENS};

use crate::llm::box_backend::BoxChatBackend;
use crate::llm::token_budget::TokenBudget;

use super::stream::ReplyStream;

/// One chat session's history, bounded by a token budget.
///
/// `history[0]` is always the system prompt passed to [`Self::new`]; it is
/// never evicted. The history only changes when a turn completes
/// successfully, so a failed or cancelled turn leaves it exactly as it was.
pub struct TokenLimitedChatbot {
    backend: Arc<BoxChatBackend>,
    history: Vec<Message>,
    budget: TokenBudget,
    max_new_tokens: u32,
}

impl TokenLimitedChatbot {
    /// Start a session whose history holds only the system prompt.
    pub fn new(
        backend: Arc<BoxChatBackend>,
        system_prompt: impl Into<String>,
        budget: TokenBudget,
    ) -> Self {
        Self {
            backend,
            history: vec![Message::system(system_prompt)],
            budget,
            max_new_tokens: DEFAULT_MAX_NEW_TOKENS,
        }
    }

    pub fn with_max_new_tokens(mut self, max_new_tokens: u32) -> Self {
        self.max_new_tokens = max_new_tokens;
        self
    }

    pub fn history(&self) -> &[Message] {
        &self.history
    }

    pub fn system_prompt(&self) -> &Message {
        &self.history[0]
    }

    pub fn budget(&self) -> TokenBudget {
        self.budget
    }

    pub fn max_memory_tokens(&self) -> u32 {
        self.budget.max_memory_tokens()
    }

    pub fn max_new_tokens(&self) -> u32 {
        self.max_new_tokens
    }

    pub fn backend(&self) -> &BoxChatBackend {
        &self.backend
    }

    /// Drop every turn, keeping the system prompt.
    pub fn reset(&mut self) {
        self.history.truncate(1);
    }

    /// Count tokens the way the backend will see them.
    pub async fn token_count(&self, messages: &[Message]) -> Result<u32, ChatError> {
        self.backend.count_tokens(messages).await
    }

    /// Build the candidate transcript for `user_message`.
    ///
    /// Works on a copy of the history: evicts the oldest non-system message
    /// while the candidate is over budget and more than the system prompt
    /// remains. Committed history is not touched.
    pub async fn prepare_history(&self, user_message: &str) -> Result<Vec<Message>, ChatError> {
        let pending = Message::user(user_message);
        let mut kept = self.history.clone();
        let mut candidate = with_pending(&kept, &pending);
        let mut tokens = self.token_count(&candidate).await?;
        let mut evicted = 0usize;

        while self.budget.exceeds(tokens) && kept.len() > 1 {
            kept.remove(1);
            evicted += 1;
            candidate = with_pending(&kept, &pending);
            tokens = self.token_count(&candidate).await?;
        }

        if evicted > 0 {
            debug!(
                evicted,
                tokens,
                budget = self.budget.max_memory_tokens(),
                "Evicted oldest messages to fit token budget"
            );
        }
        if self.budget.exceeds(tokens) {
            debug!(
                tokens,
                budget = self.budget.max_memory_tokens(),
                "System prompt and user message alone exceed budget; generating anyway"
            );
        }

        Ok(candidate)
    }

    /// Run one turn and return the reply.
    ///
    /// On any backend error the history is left unchanged and the error is
    /// returned; the session remains usable.
    pub async fn chat(&mut self, user_message: &str) -> Result<String, ChatError> {
        let candidate = self.prepare_history(user_message).await?;
        let request = GenerationRequest::new(candidate, self.max_new_tokens);

        let span = info_span!(
            "gen_ai.chat",
            gen_ai.system = self.backend.name(),
            gen_ai.request.max_tokens = request.max_new_tokens,
            gen_ai.request.stream = false,
            gen_ai.prompt.messages = request.messages.len(),
        );
        let reply = self.backend.generate(&request).instrument(span).await?;

        self.commit(request.messages, reply.clone());
        Ok(reply)
    }

    /// Run one turn, yielding the reply as text chunks.
    ///
    /// The exchange is committed when the returned stream finishes. If a
    /// chunk fails or the stream is dropped early, the turn is discarded.
    pub async fn chat_stream(&mut self, user_message: &str) -> Result<ReplyStream<'_>, ChatError> {
        let candidate = self.prepare_history(user_message).await?;

        let span = info_span!(
            "gen_ai.chat",
            gen_ai.system = self.backend.name(),
            gen_ai.request.max_tokens = self.max_new_tokens,
            gen_ai.request.stream = true,
            gen_ai.prompt.messages = candidate.len(),
        );
        let chunks = self
            .backend
            .stream(GenerationRequest::new(candidate.clone(), self.max_new_tokens));

        Ok(ReplyStream::new(self, candidate, chunks, span))
    }

    pub(crate) fn commit(&mut self, mut candidate: Vec<Message>, reply: String) {
        candidate.push(Message::assistant(reply));
        self.history = candidate;
    }
}

fn with_pending(history: &[Message], pending: &Message) -> Vec<Message> {
    let mut candidate = Vec::with_capacity(history.len() + 1);
    candidate.extend_from_slice(history);
    candidate.push(pending.clone());
    candidate
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::chat::testing::{count_words, scripted_backend, words};
    use playground_types::llm::MessageRole;

    const SYSTEM: &str = "you are a helpful bot";

    fn chatbot(budget: u32) -> (TokenLimitedChatbot, std::sync::Arc<crate::chat::testing::Script>) {
        let (backend, script) = scripted_backend();
        (TokenLimitedChatbot::new(backend, SYSTEM, TokenBudget::new(budget)), script)
    }

    #[test]
    fn test_new_session_holds_only_system_prompt() {
        let (bot, _) = chatbot(512);
        assert_eq!(bot.history().len(), 1);
        assert_eq!(bot.system_prompt(), &Message::system(SYSTEM));
        assert_eq!(bot.max_new_tokens(), DEFAULT_MAX_NEW_TOKENS);
        assert_eq!(bot.max_memory_tokens(), 512);
    }

    #[tokio::test]
    async fn test_chat_appends_user_and_assistant() {
        let (mut bot, script) = chatbot(512);
        script.push_reply("Hi there!");

        let reply = bot.chat("Hello!").await.unwrap();

        assert_eq!(reply, "Hi there!");
        assert_eq!(
            bot.history(),
            &[
                Message::system(SYSTEM),
                Message::user("Hello!"),
                Message::assistant("Hi there!"),
            ]
        );
        assert_eq!(
            script.prompts(),
            vec![vec![Message::system(SYSTEM), Message::user("Hello!")]]
        );
    }

    #[tokio::test]
    async fn test_max_new_tokens_forwarded() {
        let (backend, script) = scripted_backend();
        let mut bot = TokenLimitedChatbot::new(backend, SYSTEM, TokenBudget::new(512))
            .with_max_new_tokens(64);
        assert_eq!(bot.max_new_tokens(), 64);

        bot.chat("Hello!").await.unwrap();

        assert_eq!(script.max_new_tokens(), vec![64]);
    }

    #[tokio::test]
    async fn test_budget_keeps_only_most_recent_turn() {
        // 5-token system prompt, 8-token turns and replies, 20-token budget.
        let (mut bot, script) = chatbot(20);

        for turn in 1..=3 {
            script.push_reply(words(8, &format!("reply{turn}")));
            bot.chat(&words(8, &format!("user{turn}"))).await.unwrap();
        }

        let history = bot.history();
        assert_eq!(history.len(), 3);
        assert_eq!(history[0], Message::system(SYSTEM));
        assert_eq!(history[1], Message::user(words(8, "user3")));
        assert_eq!(history[2], Message::assistant(words(8, "reply3")));

        // The third prompt carried only the system prompt and the new turn.
        let prompts = script.prompts();
        assert_eq!(prompts[2], vec![Message::system(SYSTEM), Message::user(words(8, "user3"))]);
    }

    #[tokio::test]
    async fn test_budget_keeps_several_turns_when_they_fit() {
        let (mut bot, script) = chatbot(30);

        for turn in 1..=4 {
            script.push_reply(words(3, &format!("r{turn}")));
            bot.chat(&words(3, &format!("u{turn}"))).await.unwrap();
        }

        // 5 + 4 turns * 6 = 29 fits in 30 tokens.
        assert_eq!(bot.history().len(), 9);
        assert!(count_words(bot.history()) <= 30);
    }

    #[tokio::test]
    async fn test_system_prompt_never_evicted() {
        let (mut bot, script) = chatbot(12);

        for turn in 0..10usize {
            script.push_reply(words(turn % 4 + 1, "r"));
            bot.chat(&words(turn % 5 + 1, "u")).await.unwrap();
            assert_eq!(bot.history()[0], Message::system(SYSTEM));
            assert_eq!(bot.history()[0].role, MessageRole::System);
        }
    }

    #[tokio::test]
    async fn test_candidate_within_budget_or_only_system_prompt_left() {
        let (mut bot, script) = chatbot(15);

        for size in [2usize, 7, 1, 9, 4, 12, 3] {
            let user = words(size, "u");
            let candidate = bot.prepare_history(&user).await.unwrap();
            let kept_history = &candidate[..candidate.len() - 1];
            assert!(count_words(&candidate) <= 15 || kept_history.len() == 1);

            script.push_reply(words(size, "r"));
            bot.chat(&user).await.unwrap();
        }
    }

    #[tokio::test]
    async fn test_truncation_is_idempotent_on_compliant_transcript() {
        let (mut bot, script) = chatbot(100);
        script.push_reply("short answer");
        bot.chat("short question").await.unwrap();

        let first = bot.prepare_history("next").await.unwrap();
        let second = bot.prepare_history("next").await.unwrap();

        let mut expected = bot.history().to_vec();
        expected.push(Message::user("next"));
        assert_eq!(first, expected);
        assert_eq!(first, second);
    }

    #[tokio::test]
    async fn test_prepare_history_does_not_mutate_history() {
        let (mut bot, script) = chatbot(10);
        script.push_reply(words(3, "r"));
        bot.chat(&words(2, "u")).await.unwrap();
        let before = bot.history().to_vec();

        let candidate = bot.prepare_history(&words(8, "big")).await.unwrap();

        assert_eq!(candidate.len(), 2);
        assert_eq!(bot.history(), before.as_slice());
    }

    #[tokio::test]
    async fn test_generation_error_leaves_history_unchanged() {
        let (mut bot, script) = chatbot(20);
        script.push_reply(words(8, "r1"));
        bot.chat(&words(8, "u1")).await.unwrap();
        let before = bot.history().to_vec();

        // Over budget, so the turn would evict; it must not stick on failure.
        script.push_error(ChatError::Generation("out of memory".to_string()));
        let err = bot.chat(&words(8, "u2")).await.unwrap_err();

        assert!(matches!(err, ChatError::Generation(_)));
        assert_eq!(bot.history(), before.as_slice());

        // The session stays usable.
        script.push_reply("recovered");
        assert_eq!(bot.chat("again").await.unwrap(), "recovered");
    }

    #[tokio::test]
    async fn test_tokenization_error_leaves_history_unchanged() {
        let (mut bot, script) = chatbot(512);
        script.fail_tokenize(true);

        let err = bot.chat("hello").await.unwrap_err();

        assert!(matches!(err, ChatError::Tokenization(_)));
        assert_eq!(bot.history().len(), 1);
        assert!(script.prompts().is_empty());
    }

    #[tokio::test]
    async fn test_unsatisfiable_budget_still_generates() {
        // System prompt alone (5 tokens) is over a 3-token budget.
        let (mut bot, script) = chatbot(3);
        script.push_reply("still here");

        let reply = bot.chat("a message that is too long").await.unwrap();

        assert_eq!(reply, "still here");
        assert_eq!(bot.history().len(), 3);
        assert_eq!(
            script.prompts()[0],
            vec![Message::system(SYSTEM), Message::user("a message that is too long")]
        );
    }

    #[tokio::test]
    async fn test_empty_user_message() {
        let (mut bot, script) = chatbot(5);
        script.push_reply("");

        let reply = bot.chat("").await.unwrap();

        assert_eq!(reply, "");
        assert_eq!(bot.history()[1], Message::user(""));
        assert_eq!(bot.history()[2], Message::assistant(""));
    }

    #[tokio::test]
    async fn test_reset_keeps_system_prompt() {
        let (mut bot, _) = chatbot(512);
        bot.chat("one").await.unwrap();
        bot.chat("two").await.unwrap();
        assert_eq!(bot.history().len(), 5);

        bot.reset();

        assert_eq!(bot.history(), &[Message::system(SYSTEM)]);
    }
}
