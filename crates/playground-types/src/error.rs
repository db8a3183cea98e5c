use thiserror::Error;

/// Errors from chat backend operations.
///
/// Every variant is terminal for the call that produced it: the chat
/// manager leaves its history untouched and the session stays usable.
#[derive(Debug, Error)]
pub enum ChatError {
    #[error("tokenization failed: {0}")]
    Tokenization(String),

    #[error("generation failed: {0}")]
    Generation(String),

    #[error("backend unavailable: {0}")]
    Unavailable(String),
}

/// Errors from loading the service configuration.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("failed to read config file '{path}': {message}")]
    Read { path: String, message: String },

    #[error("failed to parse config file '{path}': {message}")]
    Parse { path: String, message: String },

    #[error("invalid configuration: {0}")]
    Invalid(String),
}
