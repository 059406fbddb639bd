//! Secret redaction for structured log fields.
//!
//! The supervisor handles the bot's credential environment, so a careless
//! `debug!(env = ?env)` must not put a token into the log file.

use serde_json::Value;
use std::collections::HashMap;

const REDACTED: &str = "[REDACTED]";

const DENYLIST_KEYS: &[&str] = &["token", "secret", "password", "api_key", "authorization"];

pub(crate) fn redact_fields(fields: HashMap<String, Value>) -> HashMap<String, Value> {
    fields
        .into_iter()
        .map(|(key, value)| {
            let value = redact_value(&key, value);
            (key, value)
        })
        .collect()
}

fn redact_value(key: &str, value: Value) -> Value {
    if is_sensitive_key(key) {
        return Value::String(REDACTED.to_string());
    }

    match value {
        Value::String(s) if looks_like_secret(&s) => Value::String(REDACTED.to_string()),
        Value::Array(items) => Value::Array(
            items
                .into_iter()
                .map(|item| redact_value(key, item))
                .collect(),
        ),
        Value::Object(map) => Value::Object(
            map.into_iter()
                .map(|(k, v)| {
                    let v = redact_value(&k, v);
                    (k, v)
                })
                .collect(),
        ),
        other => other,
    }
}

fn is_sensitive_key(key: &str) -> bool {
    let lower = key.to_ascii_lowercase();
    DENYLIST_KEYS.iter().any(|entry| lower.contains(entry))
}

fn looks_like_secret(raw: &str) -> bool {
    raw.to_ascii_lowercase().starts_with("bearer ") || is_bot_token(raw) || is_long_base64(raw)
}

/// Messaging-API bot tokens look like `<digits>:<35+ url-safe chars>`.
fn is_bot_token(value: &str) -> bool {
    match value.split_once(':') {
        Some((id, secret)) => {
            !id.is_empty()
                && id.chars().all(|c| c.is_ascii_digit())
                && secret.len() >= 30
                && secret
                    .chars()
                    .all(|c| c.is_ascii_alphanumeric() || c == '_' || c == '-')
        }
        None => false,
    }
}

fn is_long_base64(value: &str) -> bool {
    value.len() > 48
        && value
            .chars()
            .all(|c| c.is_ascii_alphanumeric() || c == '+' || c == '/' || c == '=' || c == '_')
}

#[cfg(test)]
mod tests {
    use super::*;

    fn single(key: &str, value: Value) -> Value {
        let mut fields = HashMap::new();
        fields.insert(key.to_string(), value);
        redact_fields(fields).remove(key).unwrap()
    }

    #[test]
    fn redacts_sensitive_keys() {
        assert_eq!(single("bot_token", Value::from("abc")), Value::from(REDACTED));
        assert_eq!(single("API_KEY", Value::from("abc")), Value::from(REDACTED));
    }

    #[test]
    fn redacts_bot_token_values_under_any_key() {
        let token = "123456789:AAHfiqksKZ8WmR2zSjiQ7_v4TMAKdiHm9T0";
        assert_eq!(single("line", Value::from(token)), Value::from(REDACTED));
    }

    #[test]
    fn keeps_ordinary_values() {
        assert_eq!(single("session", Value::from("claude")), Value::from("claude"));
        assert_eq!(single("pid", Value::from(4242)), Value::from(4242));
        assert_eq!(
            single("time", Value::from("12:30")),
            Value::from("12:30"),
            "short colon-separated values are not tokens"
        );
    }

    #[test]
    fn redacts_nested_objects() {
        let nested = serde_json::json!({ "env": { "BOT_TOKEN": "x", "HOME": "/root" } });
        let redacted = single("context", nested);
        assert_eq!(redacted["env"]["BOT_TOKEN"], Value::from(REDACTED));
        assert_eq!(redacted["env"]["HOME"], Value::from("/root"));
    }
}
