//! Shared domain types for the Playground chat service.
//!
//! This crate contains the types passed between the chat manager, the
//! inference backends, and the HTTP layer: messages, generation requests,
//! backend capabilities, configuration, and their error types.
//!
//! Zero infrastructure dependencies -- only serde and thiserror.

pub mod config;
pub mod error;
pub mod llm;
