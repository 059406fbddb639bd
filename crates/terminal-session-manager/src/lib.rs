//! # Terminal Session Manager
//!
//! Keeps a named, detached terminal-multiplexer session alive for the bot to
//! drive and mirrors its output through the escape-sequence filter into a log.
//!
//! The multiplexer sits behind [`Multiplexer`]; [`TmuxMultiplexer`] shells out
//! to `tmux`.

mod capture;
mod error;
mod multiplexer;
mod resolve;
mod session;

pub use capture::CaptureCommand;
pub use error::{SessionError, SessionResult};
pub use multiplexer::{Multiplexer, TmuxMultiplexer};
pub use resolve::{resolve_session_name, NameSource, ResolvedSession};
pub use session::{CaptureStatus, SessionHandle, SessionManager};
