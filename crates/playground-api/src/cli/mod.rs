//! CLI command definitions for the `playground` binary.
//!
//! Uses clap derive macros for argument parsing.

pub mod chat;

use std::path::PathBuf;

use clap::{Parser, Subcommand};

/// Token-budgeted chat playground for a local instruction-tuned model.
#[derive(Parser)]
#[command(name = "playground", version, about, long_about = None)]
#[command(propagate_version = true)]
pub struct Cli {
    /// Config file. Defaults to `playground.toml` in the working directory,
    /// which may be absent.
    #[arg(long, global = true, env = "PLAYGROUND_CONFIG")]
    pub config: Option<PathBuf>,

    /// Suppress all output except errors.
    #[arg(long, global = true)]
    pub quiet: bool,

    /// Detailed output (-v for debug, -vv for trace).
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    pub verbose: u8,

    /// Export tracing spans as OpenTelemetry to stdout.
    #[arg(long, global = true)]
    pub otel: bool,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Start the HTTP server with the WebSocket chat endpoint.
    Serve {
        /// Host to bind to (overrides config).
        #[arg(long)]
        host: Option<String>,

        /// Port to listen on (overrides config).
        #[arg(long)]
        port: Option<u16>,
    },

    /// Chat with the model in the terminal.
    Chat,
}
