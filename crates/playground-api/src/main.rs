//! Playground chat service entry point.
//!
//! Binary name: `playground`
//!
//! Parses CLI arguments, loads configuration, wires the chat backend, then
//! either starts the WebSocket server or runs an interactive terminal chat.

mod cli;
mod http;
mod state;
#[cfg(test)]
mod testing;

use std::path::PathBuf;

use clap::Parser;

use playground_infra::config::{load_config, DEFAULT_CONFIG_FILE};
use playground_infra::llm::test_backend_connection;
use playground_observe::tracing_setup::{init_tracing, shutdown_tracing};

use cli::{Cli, Commands};
use state::AppState;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    // Set up tracing based on verbosity
    let filter = match cli.verbose {
        0 if cli.quiet => "error",
        0 => "warn,playground=info",
        1 => "info,playground=debug",
        _ => "trace",
    };
    init_tracing(filter, cli.otel).map_err(|e| anyhow::anyhow!("Failed to initialize tracing: {e}"))?;

    // An explicitly named config file must exist; the default one is optional.
    let (config_path, required) = match cli.config {
        Some(path) => (path, true),
        None => (PathBuf::from(DEFAULT_CONFIG_FILE), false),
    };
    let mut config = load_config(&config_path, required).await?;

    let result = match cli.command {
        Commands::Serve { host, port } => {
            if let Some(host) = host {
                config.server.host = host;
            }
            if let Some(port) = port {
                config.server.port = port;
            }
            serve(AppState::new(config)).await
        }
        Commands::Chat => cli::chat::run_chat(&AppState::new(config)).await,
    };

    shutdown_tracing();
    result
}

async fn serve(state: AppState) -> anyhow::Result<()> {
    if let Err(e) = test_backend_connection(&state.backend).await {
        tracing::warn!(
            backend = %state.backend.name(),
            base_url = %state.config.backend.base_url,
            error = %e,
            "Chat backend is not responding; chats will fail until it is up"
        );
    }

    let addr = format!("{}:{}", state.config.server.host, state.config.server.port);
    let listener = tokio::net::TcpListener::bind(&addr).await?;

    println!(
        "  {} Playground API listening on {}",
        console::style("⚡").bold(),
        console::style(format!("http://{addr}")).cyan()
    );
    println!(
        "  {}",
        console::style(format!("WebSocket chat at ws://{addr}/chat")).dim()
    );
    println!("  {}", console::style("Press Ctrl+C to stop").dim());

    let router = http::router::build_router(state);

    axum::serve(listener, router)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    println!("\n  Server stopped.");
    Ok(())
}

/// Wait for Ctrl+C or SIGTERM for graceful shutdown.
async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = tokio::signal::ctrl_c().await {
            tracing::error!("Failed to install Ctrl+C handler: {e}");
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate()) {
            Ok(mut signal) => {
                signal.recv().await;
            }
            Err(e) => {
                tracing::error!("Failed to install SIGTERM handler: {e}");
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {},
        _ = terminate => {},
    }
}
