//! Infrastructure layer for the Playground chat service.
//!
//! Contains the concrete implementation of the `ChatBackend` trait defined
//! in `playground-core` (an OpenAI-compatible inference server client) and
//! the TOML configuration loader.

pub mod config;
pub mod llm;
