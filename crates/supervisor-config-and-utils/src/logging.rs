//! Logging initialization for the supervisor.
//!
//! Every invocation writes structured JSONL to `logs/supervisor.jsonl` under
//! the project directory through the observability package.

pub use observability::LogConfig;

use std::path::Path;

/// Initialize logging for one supervisor component.
///
/// `log_path` is the JSONL file to append to; `None` logs to stderr only.
/// `also_stderr` is false for the capture filter, whose stderr tmux discards.
///
/// ```ignore
/// init_logging("supervisor", "info", Some(&paths.supervisor_log()), true);
/// tracing::info!("supervisor started");
/// ```
pub fn init_logging(service_name: &str, level: &str, log_path: Option<&Path>, also_stderr: bool) {
    observability::init_with_config(LogConfig {
        service_name: service_name.into(),
        default_level: parse_level(level).to_string().to_ascii_lowercase(),
        log_path: log_path.map(Path::to_path_buf),
        also_stderr,
    });
}

/// Parse a log level string into a tracing Level.
pub fn parse_level(level: &str) -> tracing::Level {
    match level.trim().to_lowercase().as_str() {
        "trace" => tracing::Level::TRACE,
        "debug" => tracing::Level::DEBUG,
        "info" => tracing::Level::INFO,
        "warn" | "warning" => tracing::Level::WARN,
        "error" => tracing::Level::ERROR,
        _ => tracing::Level::INFO,
    }
}
