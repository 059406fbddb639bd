//! Core error types for the supervisor.

use std::path::PathBuf;
use thiserror::Error;

/// Core error type for configuration and path handling.
#[derive(Error, Debug)]
pub enum CoreError {
    /// Configuration file is malformed or contains invalid values
    #[error("Configuration error: {0}")]
    Config(String),

    /// Required bot settings are absent from both the env file and the environment
    #[error("Missing required configuration: {} (expected in {} or the environment)", missing.join(", "), env_file.display())]
    MissingConfiguration {
        missing: Vec<String>,
        env_file: PathBuf,
    },

    /// IO error
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// JSON serialization/deserialization error
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// Path error (e.g., project directory not resolvable)
    #[error("Path error: {0}")]
    Path(String),
}

/// Result type alias using CoreError.
pub type CoreResult<T> = Result<T, CoreError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn missing_configuration_lists_keys_and_source() {
        let err = CoreError::MissingConfiguration {
            missing: vec!["BOT_TOKEN".into(), "ALLOWED_CHAT_ID".into()],
            env_file: PathBuf::from("/srv/bot/.env"),
        };
        let text = err.to_string();
        assert!(text.contains("BOT_TOKEN, ALLOWED_CHAT_ID"));
        assert!(text.contains("/srv/bot/.env"));
    }
}
