//! # Escape-Sequence Filter
//!
//! Turns the raw byte stream a terminal pane produces into text fit for a log
//! file. The filter is a streaming transform: it works line by line with a
//! bounded carry for unterminated lines and never holds a whole session.
//!
//! ```ignore
//! let rules = RuleSet::builtin();
//! let sink = open_append_sink(Path::new("logs/claude_terminal.log"))?;
//! let mut filter = StreamFilter::new(rules, sink);
//! pump(tokio::io::stdin(), &mut filter).await?;
//! filter.finish()?;
//! ```

mod error;
mod rules;
mod stream;

pub use error::{FilterError, FilterResult};
pub use rules::{RuleSet, SanitizeRule};
pub use stream::{open_append_sink, pump, StreamFilter, MAX_CARRY_BYTES};
