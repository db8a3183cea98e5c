//! Configuration loader.
//!
//! Reads `playground.toml` and deserializes it into [`PlaygroundConfig`].
//! A missing file falls back to defaults unless the caller marked it as
//! required; a file that exists but cannot be read or parsed is an error.

use std::path::Path;

use playground_types::config::PlaygroundConfig;
use playground_types::error::ConfigError;

/// Default config file name, resolved against the working directory.
pub const DEFAULT_CONFIG_FILE: &str = "playground.toml";

/// Load and validate configuration from `path`.
///
/// - Missing file and `required == false`: returns [`PlaygroundConfig::default()`].
/// - Missing file and `required == true`: returns [`ConfigError::Read`].
/// - Unreadable or malformed file: returns an error either way.
pub async fn load_config(path: &Path, required: bool) -> Result<PlaygroundConfig, ConfigError> {
    let content = match tokio::fs::read_to_string(path).await {
        Ok(content) => content,
        Err(err) if err.kind() == std::io::ErrorKind::NotFound && !required => {
            tracing::debug!("No config file at {}, using defaults", path.display());
            return Ok(PlaygroundConfig::default());
        }
        Err(err) => {
            return Err(ConfigError::Read {
                path: path.display().to_string(),
                message: err.to_string(),
            });
        }
    };

    let config = toml::from_str::<PlaygroundConfig>(&content).map_err(|err| ConfigError::Parse {
        path: path.display().to_string(),
        message: err.to_string(),
    })?;
    config.validate()?;

    tracing::debug!(
        path = %path.display(),
        model = %config.backend.model,
        max_memory_tokens = config.chat.max_memory_tokens,
        "Loaded configuration"
    );
    Ok(config)
}
