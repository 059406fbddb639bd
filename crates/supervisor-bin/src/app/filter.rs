use super::AppContext;
use crate::error::CliResult;
use anyhow::Context as _;
use escape_sequence_filter::{open_append_sink, pump, RuleSet, StreamFilter};
use std::path::Path;
use tracing::{debug, info};

/// Capture pipe body: stdin through the rule set, appended to `output`.
pub async fn filter(ctx: &AppContext, output: &Path) -> CliResult<u8> {
    let rules = RuleSet::builtin().with_extra(
        ctx.config
            .extra_sanitize_rules
            .iter()
            .map(|rule| (rule.pattern.as_str(), rule.replacement.as_str())),
    )?;
    debug!(rules = rules.len(), "capture filter rules loaded");

    let output = ctx.paths.absolutize(output);
    let sink = open_append_sink(&output)
        .with_context(|| format!("could not open {} for append", output.display()))?;

    let mut stream = StreamFilter::new(rules, sink);
    let bytes = pump(tokio::io::stdin(), &mut stream).await?;
    let lines = stream.lines_written();
    stream.finish()?;

    info!(output = %output.display(), bytes, lines, "capture stream closed");
    Ok(0)
}
