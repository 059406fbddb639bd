//! Core configuration and utilities shared by every supervisor crate.

mod bot_env;
mod config;
mod dependency;
mod error;
mod logging;
mod paths;
mod shell;
mod state;

pub use bot_env::{read_env_file, BotEnv, LOG_FILE_KEY, REQUIRED_KEYS, SESSION_KEY};
pub use config::{Config, SanitizeRuleConfig, DEFAULT_LOG_LEVEL, DEFAULT_SESSION_NAME};
pub use dependency::{check_dependency, install_hint, DependencyInfo};
pub use error::{CoreError, CoreResult};
pub use logging::{init_logging, parse_level, LogConfig};
pub use paths::Paths;
pub use shell::{find_in_path, shell_escape};
pub use state::{LastLaunch, StateRecord};
