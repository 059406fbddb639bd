//! Ordered sanitization rules.

use crate::{FilterError, FilterResult};
use regex::Regex;
use std::borrow::Cow;

/// Upper bound on passes over one line. Built-in rules only ever delete, so
/// they settle after a few passes; the cap only matters for configured rules
/// whose replacement reintroduces a match.
const MAX_PASSES: usize = 16;

/// A single `pattern -> replacement` rewrite.
#[derive(Debug, Clone)]
pub struct SanitizeRule {
    name: String,
    regex: Regex,
    replacement: String,
}

impl SanitizeRule {
    pub fn new(name: impl Into<String>, pattern: &str, replacement: impl Into<String>) -> FilterResult<Self> {
        let regex = Regex::new(pattern).map_err(|source| FilterError::InvalidRule {
            pattern: pattern.to_string(),
            source,
        })?;
        Ok(Self {
            name: name.into(),
            regex,
            replacement: replacement.into(),
        })
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    fn apply<'a>(&self, text: &'a str) -> Cow<'a, str> {
        // NoExpand: replacements are literal, `$` has no meaning in config.
        self.regex
            .replace_all(text, regex::NoExpand(self.replacement.as_str()))
    }
}

/// Rules applied in order, repeated until the text stops changing.
#[derive(Debug, Clone)]
pub struct RuleSet {
    rules: Vec<SanitizeRule>,
}

impl RuleSet {
    /// The three built-in terminal rules.
    pub fn builtin() -> Self {
        let specs: [(&str, &str); 3] = [
            // SGR and generic CSI: ESC [ 31 m, ESC [ 2 J, ESC [ 1;5 H
            ("csi", r"\x1b\[[0-9;]*[a-zA-Z]"),
            ("erase", r"\x1b\[[0-9]*[JK]"),
            // Bracketed paste toggles, also seen with the ESC already eaten
            ("bracketed-paste", r"\x1b?\[\?2004[lh]"),
        ];

        let rules: Vec<SanitizeRule> = specs
            .iter()
            .filter_map(|(name, pattern)| SanitizeRule::new(*name, pattern, "").ok())
            .collect();
        debug_assert_eq!(rules.len(), specs.len(), "a built-in pattern failed to compile");

        Self { rules }
    }

    /// Append configured `(pattern, replacement)` rules after the current ones.
    pub fn with_extra<I, P, R>(mut self, extra: I) -> FilterResult<Self>
    where
        I: IntoIterator<Item = (P, R)>,
        P: AsRef<str>,
        R: Into<String>,
    {
        for (idx, (pattern, replacement)) in extra.into_iter().enumerate() {
            let rule = SanitizeRule::new(format!("extra-{idx}"), pattern.as_ref(), replacement)?;
            self.rules.push(rule);
        }
        Ok(self)
    }

    pub fn len(&self) -> usize {
        self.rules.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rules.is_empty()
    }

    pub fn rules(&self) -> &[SanitizeRule] {
        &self.rules
    }

    /// Sanitize one piece of text.
    pub fn apply<'a>(&self, text: &'a str) -> Cow<'a, str> {
        let mut current: Cow<'a, str> = Cow::Borrowed(text);

        for _ in 0..MAX_PASSES {
            let mut changed = false;
            for rule in &self.rules {
                let next = match rule.apply(&current) {
                    Cow::Borrowed(_) => continue,
                    Cow::Owned(next) => next,
                };
                if next != *current {
                    changed = true;
                    current = Cow::Owned(next);
                }
            }
            if !changed {
                return current;
            }
        }

        tracing::debug!(rules = self.rules.len(), "sanitization did not settle, keeping last pass");
        current
    }
}

impl Default for RuleSet {
    fn default() -> Self {
        Self::builtin()
    }
}
