//! Session name precedence.

use std::fmt;

/// Where the resolved session name came from.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NameSource {
    Override,
    State,
    Environment,
    Default,
}

impl fmt::Display for NameSource {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            NameSource::Override => "override",
            NameSource::State => "state",
            NameSource::Environment => "environment",
            NameSource::Default => "default",
        };
        f.write_str(s)
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ResolvedSession {
    pub name: String,
    pub source: NameSource,
}

/// Pick the session name: runtime override, then persisted state, then the
/// environment, then `default`. Blank candidates are skipped.
pub fn resolve_session_name(
    override_name: Option<&str>,
    state_name: Option<&str>,
    env_name: Option<&str>,
    default: &str,
) -> ResolvedSession {
    let candidates = [
        (override_name, NameSource::Override),
        (state_name, NameSource::State),
        (env_name, NameSource::Environment),
    ];

    candidates
        .into_iter()
        .find_map(|(name, source)| {
            name.map(str::trim)
                .filter(|n| !n.is_empty())
                .map(|n| ResolvedSession {
                    name: n.to_string(),
                    source,
                })
        })
        .unwrap_or_else(|| ResolvedSession {
            name: default.to_string(),
            source: NameSource::Default,
        })
}
