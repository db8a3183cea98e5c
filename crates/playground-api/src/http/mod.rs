//! HTTP layer: welcome and health routes plus the `/chat` WebSocket, with
//! CORS, request tracing and a JSON error envelope.

pub mod error;
pub mod handlers;
pub mod router;
