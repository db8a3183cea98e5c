//! Token-budgeted chat sessions.

pub mod chatbot;
pub mod stream;

#[cfg(test)]
pub(crate) mod testing;

/// Reply sent when a session ends on request.
pub const FAREWELL: &str = "Goodbye!";

/// Whether `input` asks to end the session (`exit` or `quit`, any case).
pub fn is_exit_command(input: &str) -> bool {
    let input = input.trim();
    input.eq_ignore_ascii_case("exit") || input.eq_ignore_ascii_case("quit")
}
