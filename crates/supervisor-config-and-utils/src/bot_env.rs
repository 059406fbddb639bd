//! The bot's configuration environment.
//!
//! The bot reads its credentials from a `.env` file in the project directory.
//! The supervisor materializes that file on top of its own environment before
//! launching, with variables already set in the process taking precedence.
//! Content is never interpreted here beyond checking required keys exist.

use crate::{CoreError, CoreResult};
use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use tracing::warn;

/// Keys the bot cannot start without.
pub const REQUIRED_KEYS: &[&str] = &["BOT_TOKEN", "ALLOWED_CHAT_ID"];

/// Terminal session name configured for the bot.
pub const SESSION_KEY: &str = "TMUX_SESSION";

/// Terminal transcript path configured for the bot.
pub const LOG_FILE_KEY: &str = "LOG_FILE";

/// Materialized environment for the supervised bot.
#[derive(Debug, Clone, Default)]
pub struct BotEnv {
    vars: BTreeMap<String, String>,
    env_file: PathBuf,
    file_present: bool,
}

impl BotEnv {
    /// Load `env_file` merged under the current process environment.
    pub fn load(env_file: &Path) -> CoreResult<Self> {
        Self::load_with(env_file, std::env::vars())
    }

    /// Load `env_file` merged under an explicit set of process variables.
    pub fn load_with<I>(env_file: &Path, process_vars: I) -> CoreResult<Self>
    where
        I: IntoIterator<Item = (String, String)>,
    {
        let mut vars: BTreeMap<String, String> = process_vars.into_iter().collect();

        let file_present = env_file.is_file();
        if file_present {
            for (key, value) in read_env_file(env_file)? {
                vars.entry(key).or_insert(value);
            }
        }

        Ok(Self {
            vars,
            env_file: env_file.to_path_buf(),
            file_present,
        })
    }

    /// Fail with [`CoreError::MissingConfiguration`] unless every required key
    /// has a non-empty value.
    pub fn require(&self) -> CoreResult<()> {
        let missing: Vec<String> = REQUIRED_KEYS
            .iter()
            .filter(|key| self.get(key).is_none())
            .map(|key| key.to_string())
            .collect();

        if missing.is_empty() {
            Ok(())
        } else {
            Err(CoreError::MissingConfiguration {
                missing,
                env_file: self.env_file.clone(),
            })
        }
    }

    /// Non-empty, trimmed value for `key`.
    pub fn get(&self, key: &str) -> Option<&str> {
        self.vars
            .get(key)
            .map(|v| v.trim())
            .filter(|v| !v.is_empty())
    }

    /// Set or replace a variable passed to the bot.
    pub fn set(&mut self, key: impl Into<String>, value: impl Into<String>) {
        self.vars.insert(key.into(), value.into());
    }

    /// Terminal session named by the environment, if any.
    pub fn session_name(&self) -> Option<&str> {
        self.get(SESSION_KEY)
    }

    /// Terminal log path named by the environment, if any.
    pub fn log_file(&self) -> Option<&str> {
        self.get(LOG_FILE_KEY)
    }

    /// Whether the `.env` file existed when loaded.
    pub fn file_present(&self) -> bool {
        self.file_present
    }

    /// All variables, in key order.
    pub fn vars(&self) -> &BTreeMap<String, String> {
        &self.vars
    }
}

/// Read `KEY=VALUE` entries with dotenv syntax. Malformed lines are skipped
/// with a warning.
pub fn read_env_file(env_file: &Path) -> CoreResult<Vec<(String, String)>> {
    let entries = dotenvy::from_path_iter(env_file).map_err(|e| {
        CoreError::Config(format!("could not read {}: {e}", env_file.display()))
    })?;

    Ok(entries
        .filter_map(|entry| match entry {
            Ok(pair) => Some(pair),
            Err(err) => {
                warn!(env_file = %env_file.display(), error = %err, "skipping malformed .env entry");
                None
            }
        })
        .collect())
}
