//! Ensuring sessions and attaching capture pipes.

use crate::{CaptureCommand, Multiplexer, SessionError, SessionResult};
use std::path::{Path, PathBuf};
use tracing::{debug, info};

/// Whether a capture pipe is attached, and where it writes.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CaptureStatus {
    Detached,
    Attached { log_path: PathBuf },
}

/// A live multiplexer session.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SessionHandle {
    pub name: String,
    pub working_dir: PathBuf,
    /// True when this call created the session.
    pub created: bool,
    pub capture: CaptureStatus,
}

impl SessionHandle {
    pub fn is_capturing(&self) -> bool {
        matches!(self.capture, CaptureStatus::Attached { .. })
    }
}

pub struct SessionManager<'a> {
    mux: &'a dyn Multiplexer,
}

impl<'a> SessionManager<'a> {
    pub fn new(mux: &'a dyn Multiplexer) -> Self {
        Self { mux }
    }

    /// Return the session `name`, creating it detached in `working_dir` if it
    /// does not exist. The session runs a plain shell, never the bot.
    pub fn ensure_session(&self, name: &str, working_dir: &Path) -> SessionResult<SessionHandle> {
        let name = name.trim();
        if name.is_empty() {
            return Err(SessionError::CreationFailed {
                name: name.to_string(),
                detail: "session name is empty".to_string(),
            });
        }

        if !self.mux.is_available() {
            return Err(SessionError::MultiplexerUnavailable {
                program: self.mux.program().to_string(),
            });
        }

        if self.mux.has_session(name)? {
            debug!(session = %name, "session already exists");
            return Ok(SessionHandle {
                name: name.to_string(),
                working_dir: working_dir.to_path_buf(),
                created: false,
                capture: CaptureStatus::Detached,
            });
        }

        if let Err(err) = self.mux.new_session(name, working_dir) {
            // Another invocation may have created it between the check and now.
            if self.mux.has_session(name)? {
                debug!(session = %name, error = %err, "session appeared concurrently");
                return Ok(SessionHandle {
                    name: name.to_string(),
                    working_dir: working_dir.to_path_buf(),
                    created: false,
                    capture: CaptureStatus::Detached,
                });
            }
            return Err(err);
        }

        if !self.mux.has_session(name)? {
            return Err(SessionError::CreationFailed {
                name: name.to_string(),
                detail: "session not found after creation".to_string(),
            });
        }

        info!(session = %name, working_dir = %working_dir.display(), "created session");
        Ok(SessionHandle {
            name: name.to_string(),
            working_dir: working_dir.to_path_buf(),
            created: true,
            capture: CaptureStatus::Detached,
        })
    }

    /// Replace any capture pipe on `session` with `command`, which appends to
    /// `log_path`.
    pub fn attach_capture(
        &self,
        session: &mut SessionHandle,
        command: &CaptureCommand,
        log_path: &Path,
    ) -> SessionResult<()> {
        self.mux.stop_pipe(&session.name)?;

        if let Some(parent) = log_path.parent() {
            std::fs::create_dir_all(parent)?;
        }

        self.mux.pipe_pane(&session.name, &command.render())?;
        session.capture = CaptureStatus::Attached {
            log_path: log_path.to_path_buf(),
        };

        info!(session = %session.name, log_path = %log_path.display(), "capture attached");
        Ok(())
    }

    /// Whether `name` currently exists. A missing multiplexer reads as absent.
    pub fn session_exists(&self, name: &str) -> bool {
        self.mux.is_available() && self.mux.has_session(name).unwrap_or(false)
    }
}
