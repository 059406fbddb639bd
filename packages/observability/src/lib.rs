//! # Observability
//!
//! Structured logging for the bot supervisor.
//!
//! Every supervisor invocation (manual, boot scheduler, service manager, or
//! the capture filter running under the terminal multiplexer) calls
//! [`init_with_config`] once and then logs through the standard `tracing`
//! macros. Events are written as JSONL to a single append-only file under the
//! project's `logs/` directory, so concurrent invocations interleave whole
//! lines instead of corrupting each other.
//!
//! ```rust,ignore
//! observability::init_with_config(observability::LogConfig {
//!     service_name: "supervisor".into(),
//!     default_level: "debug".into(),
//!     log_path: Some("logs/supervisor.jsonl".into()),
//!     also_stderr: true,
//! });
//! tracing::info!(session = "claude", "session ready");
//! ```

mod file_writer;
mod json_layer;
mod redact;

use std::path::PathBuf;

pub use file_writer::CentralLogWriter;
pub use json_layer::LogEntry;

/// Configuration for the logging system.
#[derive(Debug, Clone)]
pub struct LogConfig {
    /// Name of the emitting component (e.g., "supervisor", "capture-filter").
    /// Included in every log line for filtering.
    pub service_name: String,

    /// Default log level filter (e.g., "debug", "info", "warn").
    /// Can be overridden by `RUST_LOG` environment variable.
    pub default_level: String,

    /// JSONL file to append to. When `None`, only stderr output is installed.
    pub log_path: Option<PathBuf>,

    /// Also emit compact human-readable logs to stderr.
    pub also_stderr: bool,
}

impl Default for LogConfig {
    fn default() -> Self {
        Self {
            service_name: "unknown".into(),
            default_level: "info".into(),
            log_path: None,
            also_stderr: true,
        }
    }
}

/// Initialize logging with default settings and no log file.
pub fn init(service_name: &str) {
    init_with_config(LogConfig {
        service_name: service_name.into(),
        ..Default::default()
    });
}

/// Initialize logging with custom configuration.
///
/// If the log file cannot be opened, logging falls back to stderr only and a
/// warning is emitted; a broken log directory must never stop the supervisor.
/// Calling this twice in one process is a no-op for the second call.
pub fn init_with_config(config: LogConfig) {
    use tracing_subscriber::layer::SubscriberExt;
    use tracing_subscriber::util::SubscriberInitExt;
    use tracing_subscriber::{EnvFilter, Layer};

    let make_filter = |level: &str| {
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(level))
    };

    let mut open_error = None;
    let json_layer = match &config.log_path {
        Some(path) => match CentralLogWriter::new(path) {
            Ok(writer) => Some(
                json_layer::JsonLayer::new(
                    config.service_name.clone(),
                    file_writer::WriterFactory::new(writer),
                )
                .with_filter(make_filter(&config.default_level)),
            ),
            Err(err) => {
                open_error = Some((path.clone(), err));
                None
            }
        },
        None => None,
    };

    let stderr_layer = if config.also_stderr || json_layer.is_none() {
        Some(
            tracing_subscriber::fmt::layer()
                .with_target(true)
                .with_file(false)
                .with_line_number(false)
                .compact()
                .with_writer(std::io::stderr)
                .with_ansi(false)
                .with_filter(make_filter(&config.default_level)),
        )
    } else {
        None
    };

    let installed = tracing_subscriber::registry()
        .with(json_layer)
        .with(stderr_layer)
        .try_init()
        .is_ok();

    if !installed {
        return;
    }

    match (open_error, &config.log_path) {
        (Some((path, err)), _) => tracing::warn!(
            log_path = %path.display(),
            error = %err,
            "could not open log file, logging to stderr only"
        ),
        (None, Some(path)) => tracing::debug!(
            service = %config.service_name,
            log_path = %path.display(),
            "observability initialized"
        ),
        (None, None) => {}
    }
}

/// Re-export tracing macros for convenience.
pub use tracing::{debug, error, info, instrument, trace, warn};

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config() {
        let config = LogConfig::default();
        assert_eq!(config.service_name, "unknown");
        assert_eq!(config.default_level, "info");
        assert!(config.log_path.is_none());
        assert!(config.also_stderr);
    }
}
