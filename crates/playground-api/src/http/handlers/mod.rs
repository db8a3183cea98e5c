//! Route handlers.

pub mod root;
pub mod ws;
