//! # Autostart Registrar
//!
//! Installs one of two persistence strategies that run the supervisor after a
//! host restart:
//!
//! - a systemd service unit with `Restart=always`
//! - an `@reboot` crontab entry invoking a wrapper script
//!
//! Registration never starts the bot itself.

mod cron;
mod error;
mod registration;
mod systemd;
mod unit_file;

pub use cron::{CrontabStore, JobState, ScheduledJob, SystemCrontab, WrapperScript};
pub use error::{AutostartError, AutostartResult};
pub use registration::{
    is_elevated, ActivationOutcome, AutostartHost, AutostartRegistration, AutostartStatus,
    DeactivationOutcome, Registrar, Variant,
};
pub use systemd::{ServiceManager, ServiceState, Systemctl, SYSTEM_UNIT_DIR};
pub use unit_file::{RestartPolicy, ServiceUnit, UnitFile};
