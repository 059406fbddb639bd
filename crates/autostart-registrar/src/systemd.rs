//! systemd control.

use crate::{AutostartError, AutostartResult};
use std::fmt;
use std::process::{Command, Output, Stdio};
use tracing::debug;

/// Directory system units are installed into.
pub const SYSTEM_UNIT_DIR: &str = "/etc/systemd/system";

/// Lifecycle of the service-manager variant.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub enum ServiceState {
    NotInstalled,
    Installed,
    Enabled,
    Running,
}

impl fmt::Display for ServiceState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::NotInstalled => write!(f, "not installed"),
            Self::Installed => write!(f, "installed"),
            Self::Enabled => write!(f, "enabled"),
            Self::Running => write!(f, "running"),
        }
    }
}

/// Operations needed from the init system.
pub trait ServiceManager {
    fn is_available(&self) -> bool;
    fn daemon_reload(&self) -> AutostartResult<()>;
    fn enable(&self, unit: &str) -> AutostartResult<()>;
    fn disable(&self, unit: &str) -> AutostartResult<()>;
    fn start(&self, unit: &str) -> AutostartResult<()>;
    fn is_enabled(&self, unit: &str) -> bool;
    fn is_active(&self, unit: &str) -> bool;
}

/// `systemctl` on the system bus.
#[derive(Debug, Clone)]
pub struct Systemctl {
    program: String,
}

impl Default for Systemctl {
    fn default() -> Self {
        Self::new()
    }
}

impl Systemctl {
    pub fn new() -> Self {
        Self {
            program: "systemctl".to_string(),
        }
    }

    fn run(&self, args: &[&str]) -> AutostartResult<Output> {
        debug!(args = ?args, "running systemctl");
        Command::new(&self.program)
            .args(args)
            .stdin(Stdio::null())
            .output()
            .map_err(|err| {
                if err.kind() == std::io::ErrorKind::NotFound {
                    AutostartError::MissingDependency {
                        program: self.program.clone(),
                    }
                } else {
                    AutostartError::Io(err)
                }
            })
    }

    fn run_checked(&self, args: &[&str]) -> AutostartResult<()> {
        let output = self.run(args)?;
        if output.status.success() {
            return Ok(());
        }
        let stderr = String::from_utf8_lossy(&output.stderr).trim().to_string();
        Err(AutostartError::CommandFailed {
            command: format!("{} {}", self.program, args.join(" ")),
            detail: if stderr.is_empty() {
                format!("exited with {}", output.status)
            } else {
                stderr
            },
        })
    }

    fn query(&self, verb: &str, unit: &str) -> bool {
        self.run(&[verb, "--quiet", unit])
            .map(|o| o.status.success())
            .unwrap_or(false)
    }
}

impl ServiceManager for Systemctl {
    fn is_available(&self) -> bool {
        self.run(&["--version"])
            .map(|o| o.status.success())
            .unwrap_or(false)
    }

    fn daemon_reload(&self) -> AutostartResult<()> {
        self.run_checked(&["daemon-reload"])
    }

    fn enable(&self, unit: &str) -> AutostartResult<()> {
        self.run_checked(&["enable", unit])
    }

    fn disable(&self, unit: &str) -> AutostartResult<()> {
        self.run_checked(&["disable", unit])
    }

    fn start(&self, unit: &str) -> AutostartResult<()> {
        self.run_checked(&["start", unit])
    }

    fn is_enabled(&self, unit: &str) -> bool {
        self.query("is-enabled", unit)
    }

    fn is_active(&self, unit: &str) -> bool {
        self.query("is-active", unit)
    }
}
