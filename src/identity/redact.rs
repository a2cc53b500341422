//! Sensitive value redaction for abstracted property bags.

use serde_json::Value;

use crate::source::PropertyBag;

/// Placeholder written in place of a sensitive value
pub const REDACTED: &str = "[REDACTED]";

/// Key fragments marking a value as sensitive, compared after lowercasing and
/// dropping `_`, `-` and `.`
const SENSITIVE_KEY_FRAGMENTS: &[&str] = &[
    "password",
    "secret",
    "token",
    "connectionstring",
    "accesskey",
    "primarykey",
    "secondarykey",
    "privatekey",
    "sharedkey",
    "sastoken",
    "sasurl",
    "credential",
    "apikey",
    "instrumentationkey",
];

fn normalize_key(key: &str) -> String {
    key.chars()
        .filter(|c| !matches!(c, '_' | '-' | '.'))
        .flat_map(char::to_lowercase)
        .collect()
}

/// Whether a property key holds a sensitive value
pub fn is_sensitive_key(key: &str) -> bool {
    let normalized = normalize_key(key);
    SENSITIVE_KEY_FRAGMENTS
        .iter()
        .any(|fragment| normalized.contains(fragment))
}

/// Whether a value is the redaction placeholder
pub fn is_redacted(value: &Value) -> bool {
    value.as_str() == Some(REDACTED)
}

/// Copy of the bag with every sensitive value replaced, at any depth
pub fn redact_properties(properties: &PropertyBag) -> PropertyBag {
    properties
        .iter()
        .map(|(key, value)| {
            let redacted = if is_sensitive_key(key) && !value.is_null() {
                Value::String(REDACTED.to_string())
            } else {
                redact_value(value)
            };
            (key.clone(), redacted)
        })
        .collect()
}

fn redact_value(value: &Value) -> Value {
    match value {
        Value::Object(map) => Value::Object(redact_properties(map)),
        Value::Array(items) => Value::Array(items.iter().map(redact_value).collect()),
        other => other.clone(),
    }
}
