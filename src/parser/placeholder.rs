//! Placeholder tokens.
//!
//! A placeholder is a JSON string whose whole content is `{name}`. Only string
//! nodes in value position count; object keys never do.

use std::sync::OnceLock;

use regex::Regex;
use serde_json::Value;

const PLACEHOLDER_PATTERN: &str = r"^\{([^{}]+)\}$";

static PLACEHOLDER_REGEX: OnceLock<Regex> = OnceLock::new();

fn placeholder_regex() -> &'static Regex {
    PLACEHOLDER_REGEX.get_or_init(|| {
        Regex::new(PLACEHOLDER_PATTERN).expect("placeholder pattern is a valid regex")
    })
}

/// Returns the placeholder name if `text` is exactly `{name}`.
///
/// ```
/// use iotsim::parser::placeholder_name;
///
/// assert_eq!(placeholder_name("{id}"), Some("id"));
/// assert_eq!(placeholder_name("id"), None);
/// assert_eq!(placeholder_name("prefix {id}"), None);
/// ```
pub fn placeholder_name(text: &str) -> Option<&str> {
    placeholder_regex()
        .captures(text)
        .and_then(|caps| caps.get(1))
        .map(|m| m.as_str())
}

/// True iff any string in value position of `json` is a placeholder.
pub fn contains_placeholders(json: &Value) -> bool {
    match json {
        Value::String(s) => placeholder_name(s).is_some(),
        Value::Object(map) => map.values().any(contains_placeholders),
        Value::Array(items) => items.iter().any(contains_placeholders),
        Value::Number(_) | Value::Bool(_) | Value::Null => false,
    }
}

/// Text variant of [`contains_placeholders`].
///
/// # Errors
///
/// Fails if `json` is not a JSON document.
pub fn contains_placeholders_str(json: &str) -> Result<bool, serde_json::Error> {
    let parsed: Value = serde_json::from_str(json)?;
    Ok(contains_placeholders(&parsed))
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_placeholder_name() {
        assert_eq!(placeholder_name("{state}"), Some("state"));
        assert_eq!(placeholder_name("{device_id}"), Some("device_id"));
        assert_eq!(placeholder_name("{}"), None);
        assert_eq!(placeholder_name("{a}{b}"), None);
        assert_eq!(placeholder_name(" {a}"), None);
        assert_eq!(placeholder_name("running"), None);
    }

    #[test]
    fn test_detects_param_in_json() {
        let found = contains_placeholders_str(
            r#"{"device_uuid": "e788e700-7e13-4a12-852e-cbfd830dfc2d", "response": "{running}", "state": "idle", "name": 4}"#,
        )
        .unwrap();
        assert!(found);
    }

    #[test]
    fn test_detects_no_param_in_json() {
        let found = contains_placeholders_str(
            r#"{"device_uuid": "e788e700-7e13-4a12-852e-cbfd830dfc2d", "response": "starting", "state": "idle", "name": 4}"#,
        )
        .unwrap();
        assert!(!found);
    }

    #[test]
    fn test_detects_nested_and_array_params() {
        assert!(contains_placeholders(&json!({"data": {"id": "{id}"}})));
        assert!(contains_placeholders(&json!({"items": [1, "{x}"]})));
    }

    #[test]
    fn test_keys_are_not_placeholders() {
        assert!(!contains_placeholders(&json!({"{id}": 1})));
    }

    #[test]
    fn test_invalid_json_is_an_error() {
        assert!(contains_placeholders_str("{'single': 'quotes'}").is_err());
    }
}
