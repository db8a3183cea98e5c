//! Streaming reply for a single chat turn.
//!
//! [`ReplyStream`] forwards the backend's text chunks to the caller while
//! accumulating them. When the backend stream ends cleanly the full reply is
//! committed to the chatbot's history. A failed chunk, or dropping the stream
//! before it ends (e.g. the client disconnected), discards the turn: the
//! history stays exactly as it was before the call.

use std::pin::Pin;
use std::task::{Context, Poll};

use futures_util::Stream;
use tracing::debug;

use playground_types::error::ChatError;
use playground_types::llm::Message;

use crate::llm::backend::ChunkStream;

use super::chatbot::TokenLimitedChatbot;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum ReplyState {
    Streaming,
    Committed,
    Failed,
}

/// Text chunks of one reply, committed to history on completion.
///
/// Holds the chatbot mutably for its whole lifetime, so no other turn can
/// start on the same session until this one finishes or is dropped.
pub struct ReplyStream<'a> {
    chatbot: &'a mut TokenLimitedChatbot,
    candidate: Vec<Message>,
    inner: ChunkStream,
    reply: String,
    state: ReplyState,
    span: tracing::Span,
}

impl<'a> ReplyStream<'a> {
    pub(crate) fn new(
        chatbot: &'a mut TokenLimitedChatbot,
        candidate: Vec<Message>,
        inner: ChunkStream,
        span: tracing::Span,
    ) -> Self {
        Self {
            chatbot,
            candidate,
            inner,
            reply: String::new(),
            state: ReplyState::Streaming,
            span,
        }
    }

    /// Text received so far.
    pub fn reply(&self) -> &str {
        &self.reply
    }

    /// Whether the turn has been written to history.
    pub fn is_committed(&self) -> bool {
        self.state == ReplyState::Committed
    }
}

impl Stream for ReplyStream<'_> {
    type Item = Result<String, ChatError>;

    fn poll_next(self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Option<Self::Item>> {
        let this = self.get_mut();
        if this.state != ReplyState::Streaming {
            return Poll::Ready(None);
        }

        let _enter = this.span.enter();
        match this.inner.as_mut().poll_next(cx) {
            Poll::Ready(Some(Ok(chunk))) => {
                this.reply.push_str(&chunk);
                Poll::Ready(Some(Ok(chunk)))
            }
            Poll::Ready(Some(Err(e))) => {
                this.state = ReplyState::Failed;
                debug!(error = %e, received = this.reply.len(), "Reply stream failed; turn discarded");
                Poll::Ready(Some(Err(e)))
            }
            Poll::Ready(None) => {
                let candidate = std::mem::take(&mut this.candidate);
                let reply = std::mem::take(&mut this.reply);
                this.chatbot.commit(candidate, reply);
                this.state = ReplyState::Committed;
                Poll::Ready(None)
            }
            Poll::Pending => Poll::Pending,
        }
    }
}

impl Drop for ReplyStream<'_> {
    fn drop(&mut self) {
        if self.state == ReplyState::Streaming {
            debug!(
                received = self.reply.len(),
                "Reply stream dropped before completion; turn discarded"
            );
        }
    }
}
