//! Instance guard for the supervised bot.
//!
//! Decides whether the bot is already running before a launch, and serializes
//! concurrent supervisors so two of them cannot both see "not running".

mod lock;
mod pid_file;
mod registry;

use thiserror::Error;

pub use lock::LaunchLock;
pub use pid_file::{cleanup_pid_file, read_pid_file, write_pid_file, PidFileRegistry};
pub use registry::{check_instance, InstanceCheck, ProcessRegistry, ProcessTableRegistry};

/// Errors from instance detection.
#[derive(Error, Debug)]
pub enum GuardError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
    #[error("PID file error: {0}")]
    PidFile(String),
    #[error("launch lock {path} is held by another supervisor")]
    LockBusy { path: String },
}

pub type GuardResult<T> = Result<T, GuardError>;
