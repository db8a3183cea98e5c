//! Business logic and backend trait definitions for the Playground chat service.
//!
//! This crate defines the `ChatBackend` port that the infrastructure layer
//! implements, and the token-budgeted chat memory manager built on top of it.
//! It depends only on `playground-types` -- never on `playground-infra` or
//! any HTTP crate.

pub mod chat;
pub mod llm;
