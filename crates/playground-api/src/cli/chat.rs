//! Interactive terminal chat.
//!
//! One session per invocation: reads lines with `rustyline_async`, runs each
//! through the token-budgeted chatbot, and prints the full reply. `exit` or
//! `quit` ends the session. A failed turn is reported and the session stays
//! usable with its history unchanged.

use std::time::Duration;

use console::style;
use rustyline_async::{Readline, ReadlineEvent};

use playground_core::chat::{is_exit_command, FAREWELL};

use crate::state::AppState;

pub async fn run_chat(state: &AppState) -> anyhow::Result<()> {
    let mut chatbot = state.new_chatbot();

    println!();
    println!(
        "  {} Welcome to the Playground chat ({})! Type 'exit' or 'quit' to end the session.",
        style("*").cyan().bold(),
        style(&state.config.backend.model).cyan()
    );
    println!();

    let prompt = format!("  {} ", style("You:").green().bold());
    let (mut rl, _writer) =
        Readline::new(prompt).map_err(|e| anyhow::anyhow!("Failed to initialize input: {e}"))?;

    loop {
        let text = match rl.readline().await {
            Ok(ReadlineEvent::Line(line)) => line.trim().to_string(),
            Ok(ReadlineEvent::Interrupted) => {
                println!("\n  {}", style("Type 'exit' or 'quit' to leave.").dim());
                continue;
            }
            Ok(ReadlineEvent::Eof) | Err(_) => {
                println!("  {}", style(FAREWELL).dim());
                break;
            }
        };

        if is_exit_command(&text) {
            println!("  {}", style(FAREWELL).dim());
            break;
        }
        rl.add_history_entry(text.clone());

        let spinner = indicatif::ProgressBar::new_spinner();
        spinner.set_message("Thinking...");
        spinner.enable_steady_tick(Duration::from_millis(80));

        let result = chatbot.chat(&text).await;
        spinner.finish_and_clear();

        match result {
            Ok(reply) => println!("  {} {}\n", style("Bot:").cyan().bold(), reply.trim()),
            Err(e) => {
                tracing::debug!(error = %e, "Chat turn failed");
                eprintln!("  {} {e}\n", style("!").red().bold());
            }
        }
    }

    Ok(())
}
