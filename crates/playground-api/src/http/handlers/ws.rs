//! WebSocket chat endpoint.
//!
//! `/chat` upgrades to a WebSocket and gives the connection its own
//! token-budgeted chat session. Protocol, one text frame per user message:
//!
//! - `exit` / `quit` (any case): the server answers `Goodbye!` and closes
//!   normally.
//! - anything else: the reply is sent as one text frame per generated chunk
//!   when the backend streams, otherwise as a single frame.
//!
//! Binary, ping and pong frames are ignored. A backend failure ends the
//! session with close code 1011; the failed turn is not recorded.

use std::fmt::Display;

use axum::extract::ws::{close_code, CloseFrame, Message, Utf8Bytes, WebSocket, WebSocketUpgrade};
use axum::extract::ws::rejection::WebSocketUpgradeRejection;
use axum::extract::State;
use axum::response::Response;
use futures_util::{Sink, SinkExt, Stream, StreamExt};
use tracing::Instrument;
use uuid::Uuid;

use playground_core::chat::chatbot::TokenLimitedChatbot;
use playground_core::chat::{is_exit_command, FAREWELL};
use playground_types::error::ChatError;

use crate::http::error::AppError;
use crate::state::AppState;

/// How a chat session ended.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SessionEnd {
    /// The client sent `exit` or `quit`.
    Exit,
    /// The client went away.
    Disconnected,
    /// The backend failed and the socket was closed with 1011.
    Failed,
}

enum TurnError {
    Chat(ChatError),
    Send(String),
}

/// GET /chat - Upgrade to a WebSocket chat session.
pub async fn chat_ws(
    ws: Result<WebSocketUpgrade, WebSocketUpgradeRejection>,
    State(state): State<AppState>,
) -> Result<Response, AppError> {
    let ws = ws.map_err(|rejection| AppError::UpgradeRequired(rejection.body_text()))?;
    Ok(ws.on_upgrade(move |socket| handle_socket(socket, state)))
}

async fn handle_socket(socket: WebSocket, state: AppState) {
    let session_id = Uuid::now_v7();
    state.sessions.insert(session_id, chrono::Utc::now());

    let span = tracing::info_span!("chat_session", %session_id);
    let (sender, receiver) = socket.split();
    let mut chatbot = state.new_chatbot();

    let end = async {
        tracing::info!("Chat session opened");
        run_session(&mut chatbot, sender, receiver).await
    }
    .instrument(span.clone())
    .await;

    state.sessions.remove(&session_id);
    span.in_scope(|| {
        tracing::info!(
            end = ?end,
            turns = (chatbot.history().len() - 1) / 2,
            "Chat session closed"
        );
    });
}

/// Drive one chat session until the client exits, disconnects or the
/// backend fails.
pub async fn run_session<S, R>(
    chatbot: &mut TokenLimitedChatbot,
    mut sender: S,
    mut receiver: R,
) -> SessionEnd
where
    S: Sink<Message> + Unpin,
    S::Error: Display,
    R: Stream<Item = Result<Message, axum::Error>> + Unpin,
{
    loop {
        let text = match receiver.next().await {
            Some(Ok(Message::Text(text))) => text,
            Some(Ok(Message::Close(_))) | None => {
                tracing::info!("Client disconnected");
                return SessionEnd::Disconnected;
            }
            Some(Err(err)) => {
                tracing::info!(error = %err, "Client disconnected");
                return SessionEnd::Disconnected;
            }
            // Ignore binary, ping, pong protocol frames (handled by axum/tungstenite)
            Some(Ok(_)) => continue,
        };

        if is_exit_command(text.as_str()) {
            let _ = sender.send(Message::Text(FAREWELL.into())).await;
            let _ = sender.send(close_frame(close_code::NORMAL, "")).await;
            return SessionEnd::Exit;
        }

        match send_reply(chatbot, text.as_str(), &mut sender).await {
            Ok(()) => {}
            Err(TurnError::Send(err)) => {
                tracing::info!(error = %err, "Client disconnected during reply");
                return SessionEnd::Disconnected;
            }
            Err(TurnError::Chat(err)) => {
                tracing::error!(error = %err, "Chat turn failed; closing session");
                let _ = sender.send(close_frame(close_code::ERROR, "internal error")).await;
                return SessionEnd::Failed;
            }
        }
    }
}

async fn send_reply<S>(
    chatbot: &mut TokenLimitedChatbot,
    text: &str,
    sender: &mut S,
) -> Result<(), TurnError>
where
    S: Sink<Message> + Unpin,
    S::Error: Display,
{
    if chatbot.backend().capabilities().streaming {
        let mut stream = chatbot.chat_stream(text).await.map_err(TurnError::Chat)?;
        while let Some(chunk) = stream.next().await {
            let chunk = chunk.map_err(TurnError::Chat)?;
            sender
                .send(Message::Text(chunk.into()))
                .await
                .map_err(|e| TurnError::Send(e.to_string()))?;
        }
    } else {
        let reply = chatbot.chat(text).await.map_err(TurnError::Chat)?;
        sender
            .send(Message::Text(reply.into()))
            .await
            .map_err(|e| TurnError::Send(e.to_string()))?;
    }
    Ok(())
}

fn close_frame(code: u16, reason: &'static str) -> Message {
    Message::Close(Some(CloseFrame {
        code,
        reason: Utf8Bytes::from_static(reason),
    }))
}

#[cfg(test)]
mod tests {
    use std::pin::Pin;
    use std::sync::Arc;
    use std::task::{Context, Poll};

    use super::*;
    use crate::testing::EchoBackend;
    use playground_core::llm::box_backend::BoxChatBackend;
    use playground_core::llm::token_budget::TokenBudget;
    use playground_types::llm::{BackendCapabilities, Message as ChatMessage};

    const SYSTEM: &str = "be brief";

    fn chatbot(backend: EchoBackend) -> TokenLimitedChatbot {
        TokenLimitedChatbot::new(
            Arc::new(BoxChatBackend::new(backend)),
            SYSTEM,
            TokenBudget::new(512),
        )
    }

    fn frames(texts: &[&str]) -> impl Stream<Item = Result<Message, axum::Error>> + Unpin {
        let frames: Vec<Result<Message, axum::Error>> = texts
            .iter()
            .map(|t| Ok(Message::Text((*t).into())))
            .collect();
        futures_util::stream::iter(frames)
    }

    fn text(t: &str) -> Message {
        Message::Text(t.into())
    }

    /// Accepts `capacity` frames, then fails every send like a closed socket.
    struct FailingSink {
        sent: Vec<Message>,
        capacity: usize,
    }

    impl Sink<Message> for FailingSink {
        type Error = String;

        fn poll_ready(self: Pin<&mut Self>, _: &mut Context<'_>) -> Poll<Result<(), String>> {
            Poll::Ready(Ok(()))
        }

        fn start_send(self: Pin<&mut Self>, item: Message) -> Result<(), String> {
            let this = self.get_mut();
            if this.sent.len() >= this.capacity {
                return Err("connection reset by peer".to_string());
            }
            this.sent.push(item);
            Ok(())
        }

        fn poll_flush(self: Pin<&mut Self>, _: &mut Context<'_>) -> Poll<Result<(), String>> {
            Poll::Ready(Ok(()))
        }

        fn poll_close(self: Pin<&mut Self>, _: &mut Context<'_>) -> Poll<Result<(), String>> {
            Poll::Ready(Ok(()))
        }
    }

    #[tokio::test]
    async fn test_streams_reply_chunks_then_says_goodbye() {
        let mut bot = chatbot(EchoBackend::default());
        let mut sent: Vec<Message> = Vec::new();

        let end = run_session(&mut bot, &mut sent, frames(&["hello there", "Quit"])).await;

        assert_eq!(end, SessionEnd::Exit);
        assert_eq!(
            sent,
            vec![
                text("echo: "),
                text("hello "),
                text("there"),
                text("Goodbye!"),
                close_frame(close_code::NORMAL, ""),
            ]
        );
        assert_eq!(
            bot.history(),
            &[
                ChatMessage::system(SYSTEM),
                ChatMessage::user("hello there"),
                ChatMessage::assistant("echo: hello there"),
            ]
        );
    }

    #[tokio::test]
    async fn test_non_streaming_backend_sends_single_frame() {
        let mut bot = chatbot(EchoBackend {
            capabilities: BackendCapabilities {
                streaming: false,
                ..BackendCapabilities::default()
            },
            ..EchoBackend::default()
        });
        let mut sent: Vec<Message> = Vec::new();

        run_session(&mut bot, &mut sent, frames(&["hello there", "exit"])).await;

        assert_eq!(sent[0], text("echo: hello there"));
        assert_eq!(sent[1], text("Goodbye!"));
        assert_eq!(bot.history().len(), 3);
    }

    #[tokio::test]
    async fn test_backend_failure_closes_with_internal_error() {
        let mut bot = chatbot(EchoBackend {
            fail_with: Some("model crashed".to_string()),
            ..EchoBackend::default()
        });
        let mut sent: Vec<Message> = Vec::new();

        let end = run_session(&mut bot, &mut sent, frames(&["hello", "never read"])).await;

        assert_eq!(end, SessionEnd::Failed);
        assert_eq!(sent, vec![close_frame(close_code::ERROR, "internal error")]);
        assert_eq!(bot.history(), &[ChatMessage::system(SYSTEM)]);
    }

    #[tokio::test]
    async fn test_disconnect_ends_session_and_ignores_control_frames() {
        let mut bot = chatbot(EchoBackend::default());
        let mut sent: Vec<Message> = Vec::new();
        let incoming: Vec<Result<Message, axum::Error>> = vec![
            Ok(Message::Binary(vec![1, 2, 3].into())),
            Ok(Message::Ping(Vec::new().into())),
            Ok(text("hi")),
        ];

        let end = run_session(&mut bot, &mut sent, futures_util::stream::iter(incoming)).await;

        assert_eq!(end, SessionEnd::Disconnected);
        assert_eq!(sent, vec![text("echo: "), text("hi")]);
    }

    #[tokio::test]
    async fn test_close_frame_from_client_is_disconnect() {
        let mut bot = chatbot(EchoBackend::default());
        let mut sent: Vec<Message> = Vec::new();
        let incoming: Vec<Result<Message, axum::Error>> = vec![Ok(Message::Close(None))];

        let end = run_session(&mut bot, &mut sent, futures_util::stream::iter(incoming)).await;

        assert_eq!(end, SessionEnd::Disconnected);
        assert!(sent.is_empty());
    }

    #[tokio::test]
    async fn test_client_gone_mid_reply_discards_turn() {
        let mut bot = chatbot(EchoBackend::default());
        let mut sink = FailingSink {
            sent: Vec::new(),
            capacity: 1,
        };

        let end = run_session(&mut bot, &mut sink, frames(&["hello there", "never read"])).await;

        assert_eq!(end, SessionEnd::Disconnected);
        assert_eq!(sink.sent, vec![text("echo: ")]);
        assert_eq!(bot.history(), &[ChatMessage::system(SYSTEM)]);
    }
}
