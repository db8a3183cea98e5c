//! Inference backend abstractions.
//!
//! - `ChatBackend`: RPITIT trait for concrete backend implementations
//! - `BoxChatBackend`: Object-safe wrapper for dynamic dispatch
//! - `TokenBudget`: Soft token limit for a session's chat history

pub mod backend;
pub mod box_backend;
pub mod token_budget;
