//! Supervisor configuration.
//!
//! Loaded from `data/supervisor.json` when present, otherwise defaults, and
//! then overridden from `BOT_SUPERVISOR_*` environment variables.

use crate::{CoreError, CoreResult, Paths};
use serde::{Deserialize, Serialize};
use std::path::Path;

/// Default log level.
pub const DEFAULT_LOG_LEVEL: &str = "info";

/// Terminal session used when nothing else names one.
pub const DEFAULT_SESSION_NAME: &str = "claude";

const DEFAULT_INTERPRETER: &str = "python3";
const DEFAULT_ENTRYPOINT: &str = "bot.py";
const DEFAULT_SERVICE_NAME: &str = "bot-supervisor";
const DEFAULT_MAX_LOG_BYTES: u64 = 10 * 1024 * 1024;
const DEFAULT_LOG_BACKUPS: u32 = 5;
const DEFAULT_RESTART_DELAY_SECS: u64 = 10;

/// An additional sanitization rule appended after the built-in escape filters.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SanitizeRuleConfig {
    pub pattern: String,
    #[serde(default)]
    pub replacement: String,
}

/// Main supervisor configuration.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    /// Log level (trace, debug, info, warn, error).
    pub log_level: String,
    /// Program used to run the bot entrypoint.
    pub interpreter: String,
    /// Bot entrypoint, relative to the project directory.
    pub entrypoint: String,
    /// Command-line substring identifying a running bot. Defaults to the entrypoint.
    pub process_pattern: Option<String>,
    /// Terminal session name used when no override, state or env value exists.
    pub default_session: String,
    /// Bot stdout/stderr logs larger than this are rotated at launch.
    pub max_log_bytes: u64,
    /// Number of rotated log generations to keep.
    pub log_backups: u32,
    /// Service-manager unit name (without the `.service` suffix).
    pub service_name: String,
    /// Fixed delay before the service manager restarts the supervisor.
    pub restart_delay_secs: u64,
    /// Activating one autostart variant deactivates the other.
    pub exclusive_autostart: bool,
    /// Extra escape-sequence rules applied after the built-in ones.
    pub extra_sanitize_rules: Vec<SanitizeRuleConfig>,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            log_level: DEFAULT_LOG_LEVEL.to_string(),
            interpreter: DEFAULT_INTERPRETER.to_string(),
            entrypoint: DEFAULT_ENTRYPOINT.to_string(),
            process_pattern: None,
            default_session: DEFAULT_SESSION_NAME.to_string(),
            max_log_bytes: DEFAULT_MAX_LOG_BYTES,
            log_backups: DEFAULT_LOG_BACKUPS,
            service_name: DEFAULT_SERVICE_NAME.to_string(),
            restart_delay_secs: DEFAULT_RESTART_DELAY_SECS,
            exclusive_autostart: false,
            extra_sanitize_rules: Vec::new(),
        }
    }
}

impl Config {
    /// Load configuration for a project, falling back to defaults.
    pub fn load(paths: &Paths) -> CoreResult<Self> {
        let config_path = paths.config_file();

        let mut config = if config_path.exists() {
            Self::load_from_file(&config_path)?
        } else {
            Self::default()
        };

        config.apply_env_overrides(|key| std::env::var(key).ok());
        config.validate()?;
        Ok(config)
    }

    /// Load configuration from a specific file.
    pub fn load_from_file(path: &Path) -> CoreResult<Self> {
        let content = std::fs::read_to_string(path)?;
        let config: Config = serde_json::from_str(&content)?;
        Ok(config)
    }

    /// Save configuration to the project's config file.
    pub fn save(&self, paths: &Paths) -> CoreResult<()> {
        paths.ensure_dirs()?;
        let content = serde_json::to_string_pretty(self)?;
        std::fs::write(paths.config_file(), content)?;
        Ok(())
    }

    /// Override fields from `BOT_SUPERVISOR_*` variables resolved through `lookup`.
    pub fn apply_env_overrides<F>(&mut self, lookup: F)
    where
        F: Fn(&str) -> Option<String>,
    {
        let get = |key: &str| lookup(key).map(|v| v.trim().to_string()).filter(|v| !v.is_empty());

        if let Some(level) = get("BOT_SUPERVISOR_LOG_LEVEL") {
            self.log_level = level;
        }
        if let Some(interpreter) = get("BOT_SUPERVISOR_INTERPRETER") {
            self.interpreter = interpreter;
        }
        if let Some(entrypoint) = get("BOT_SUPERVISOR_ENTRYPOINT") {
            self.entrypoint = entrypoint;
        }
        if let Some(pattern) = get("BOT_SUPERVISOR_PROCESS_PATTERN") {
            self.process_pattern = Some(pattern);
        }
        if let Some(service) = get("BOT_SUPERVISOR_SERVICE_NAME") {
            self.service_name = service;
        }
    }

    /// Reject values that would make later stages misbehave.
    pub fn validate(&self) -> CoreResult<()> {
        if self.interpreter.trim().is_empty() {
            return Err(CoreError::Config("interpreter must not be empty".into()));
        }
        if self.entrypoint.trim().is_empty() {
            return Err(CoreError::Config("entrypoint must not be empty".into()));
        }
        if self.process_pattern().trim().is_empty() {
            return Err(CoreError::Config("process_pattern must not be empty".into()));
        }
        if self.service_name.contains('/') || self.service_name.trim().is_empty() {
            return Err(CoreError::Config(format!(
                "invalid service name: {:?}",
                self.service_name
            )));
        }
        Ok(())
    }

    /// Pattern the instance guard matches against process command lines.
    pub fn process_pattern(&self) -> &str {
        self.process_pattern.as_deref().unwrap_or(&self.entrypoint)
    }
}
