//! Process registries.

use crate::GuardResult;
use sysinfo::{ProcessRefreshKind, ProcessStatus, RefreshKind, System, UpdateKind};
use tracing::debug;

/// Tracks whether the supervised process is alive.
pub trait ProcessRegistry {
    /// PIDs of live processes matching `pattern`.
    fn running_pids(&self, pattern: &str) -> GuardResult<Vec<u32>>;

    fn is_running(&self, pattern: &str) -> GuardResult<bool> {
        Ok(!self.running_pids(pattern)?.is_empty())
    }

    /// Called after a successful launch.
    fn record_start(&self, pid: u32) -> GuardResult<()>;

    /// Called when the launched process is known to have exited.
    fn record_stop(&self, pid: u32) -> GuardResult<()>;
}

/// Result of a guard check before launching.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum InstanceCheck {
    /// Nothing matches, safe to launch.
    Available,
    /// Matching processes exist; launching would duplicate them.
    AlreadyRunning { pids: Vec<u32> },
}

/// Query `registry` for `pattern`.
pub fn check_instance(registry: &dyn ProcessRegistry, pattern: &str) -> GuardResult<InstanceCheck> {
    let pids = registry.running_pids(pattern)?;
    if pids.is_empty() {
        Ok(InstanceCheck::Available)
    } else {
        Ok(InstanceCheck::AlreadyRunning { pids })
    }
}

/// Scans the live process table for command lines containing the pattern.
/// The scanning process itself never matches.
#[derive(Debug, Default, Clone)]
pub struct ProcessTableRegistry;

impl ProcessTableRegistry {
    pub fn new() -> Self {
        Self
    }
}

impl ProcessRegistry for ProcessTableRegistry {
    fn running_pids(&self, pattern: &str) -> GuardResult<Vec<u32>> {
        let own_pid = std::process::id();
        let system = System::new_with_specifics(RefreshKind::new().with_processes(cmd_refresh()));

        let mut pids: Vec<u32> = system
            .processes()
            .iter()
            .filter(|(pid, process)| {
                pid.as_u32() != own_pid
                    && process.status() != ProcessStatus::Zombie
                    && command_line_matches(process.cmd(), pattern)
            })
            .map(|(pid, _)| pid.as_u32())
            .collect();
        pids.sort_unstable();

        debug!(pattern, matches = pids.len(), "scanned process table");
        Ok(pids)
    }

    fn record_start(&self, pid: u32) -> GuardResult<()> {
        debug!(pid, "process table registry needs no start record");
        Ok(())
    }

    fn record_stop(&self, pid: u32) -> GuardResult<()> {
        debug!(pid, "process table registry needs no stop record");
        Ok(())
    }
}

/// Command lines are not loaded by a default refresh, and matching needs them.
pub(crate) fn cmd_refresh() -> ProcessRefreshKind {
    ProcessRefreshKind::new().with_cmd(UpdateKind::Always)
}

pub(crate) fn command_line_matches(cmd: &[String], pattern: &str) -> bool {
    !pattern.is_empty() && !cmd.is_empty() && cmd.join(" ").contains(pattern)
}
