//! Observability setup for the Playground chat service.

pub mod tracing_setup;
