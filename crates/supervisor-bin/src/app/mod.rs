//! Subcommand implementations.

mod autostart;
mod filter;
mod launch;
mod lifecycle;
mod session;

pub use autostart::{autostart_install, autostart_remove, autostart_status};
pub use filter::filter;
pub use launch::launch;
pub use lifecycle::{status, stop};
pub use session::{session_ensure, session_name};

use crate::error::CliResult;
use anyhow::Context as _;
use clap::ValueEnum;
use instance_guard::{PidFileRegistry, ProcessRegistry, ProcessTableRegistry};
use std::path::PathBuf;
use supervision_orchestrator::Supervisor;
use supervisor_config_and_utils::{BotEnv, Config, Paths};
use terminal_session_manager::Multiplexer;

/// Instance detection strategy.
#[derive(ValueEnum, Clone, Copy, Debug, PartialEq, Eq)]
pub enum RegistryKind {
    /// Scan the process table for the bot's command line
    ProcessTable,
    /// Trust data/bot.pid, checking the recorded process is alive
    PidFile,
}

/// Everything a subcommand needs about the project.
pub struct AppContext {
    pub paths: Paths,
    pub config: Config,
    registry_kind: RegistryKind,
}

impl AppContext {
    pub fn new(paths: Paths, config: Config, registry_kind: RegistryKind) -> Self {
        Self {
            paths,
            config,
            registry_kind,
        }
    }

    pub fn registry(&self) -> Box<dyn ProcessRegistry> {
        match self.registry_kind {
            RegistryKind::ProcessTable => Box::new(ProcessTableRegistry::new()),
            RegistryKind::PidFile => Box::new(PidFileRegistry::new(self.paths.pid_file())),
        }
    }

    /// Bot environment: process variables over `.env`.
    pub fn bot_env(&self) -> CliResult<BotEnv> {
        Ok(BotEnv::load(&self.paths.env_file())?)
    }

    pub fn supervisor<'a>(
        &'a self,
        mux: &'a dyn Multiplexer,
        registry: &'a dyn ProcessRegistry,
    ) -> CliResult<Supervisor<'a>> {
        Ok(Supervisor::new(
            &self.paths,
            &self.config,
            mux,
            registry,
            supervisor_exe()?,
        ))
    }
}

/// Absolute path of the running binary, used in capture pipes and autostart entries.
pub fn supervisor_exe() -> CliResult<PathBuf> {
    let exe = std::env::current_exe().context("could not determine the supervisor executable path")?;
    Ok(exe)
}
