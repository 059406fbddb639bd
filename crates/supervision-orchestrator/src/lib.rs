//! Supervision orchestrator.
//!
//! Every trigger (manual run, boot scheduler, service manager) goes through
//! [`Supervisor::run_launch`]: resolve the session, ensure it, attach capture,
//! then check-and-launch under the launch lock.

mod error;
mod supervisor;

pub use error::{SupervisorError, SupervisorResult};
pub use supervisor::{
    wait_foreground, LaunchOutcome, LaunchRequest, StatusReport, StopReport, Supervisor,
};
