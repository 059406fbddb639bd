use std::path::PathBuf;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum LaunchError {
    /// The bot's configuration source lacks required keys.
    #[error("bot configuration missing {} (looked in {} and the environment)", missing.join(", "), env_file.display())]
    ConfigMissing {
        missing: Vec<String>,
        env_file: PathBuf,
    },

    /// The interpreter is not installed.
    #[error("interpreter `{program}` not found on PATH")]
    InterpreterMissing { program: String },

    /// The OS refused to start the process.
    #[error("failed to spawn `{program}`: {source}")]
    Spawn {
        program: String,
        #[source]
        source: std::io::Error,
    },

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

pub type LaunchResult<T> = Result<T, LaunchError>;
