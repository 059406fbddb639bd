use thiserror::Error;

#[derive(Error, Debug)]
pub enum AutostartError {
    /// The operation needs root.
    #[error("{action} requires root privileges")]
    Permission { action: String },

    /// A required OS tool is not installed.
    #[error("`{program}` is not installed or not on PATH")]
    MissingDependency { program: String },

    /// An OS tool ran but reported failure.
    #[error("`{command}` failed: {detail}")]
    CommandFailed { command: String, detail: String },

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

pub type AutostartResult<T> = Result<T, AutostartError>;
