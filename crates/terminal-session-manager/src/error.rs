//! Error types for session management.

use thiserror::Error;

#[derive(Error, Debug)]
pub enum SessionError {
    /// The multiplexer binary is not installed.
    #[error("{program} is not installed or not on PATH")]
    MultiplexerUnavailable { program: String },

    /// The multiplexer refused to create the session.
    #[error("failed to create session {name:?}: {detail}")]
    CreationFailed { name: String, detail: String },

    /// Any other multiplexer command failed.
    #[error("`{command}` failed: {detail}")]
    CommandFailed { command: String, detail: String },

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

pub type SessionResult<T> = Result<T, SessionError>;
