//! Error types for the escape-sequence filter.

use thiserror::Error;

/// Errors from building or running the filter.
#[derive(Error, Debug)]
pub enum FilterError {
    /// A configured sanitization pattern is not a valid regular expression.
    #[error("invalid sanitization rule {pattern:?}: {source}")]
    InvalidRule {
        pattern: String,
        #[source]
        source: regex::Error,
    },

    /// Reading the pane stream or writing the log failed.
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

pub type FilterResult<T> = Result<T, FilterError>;
