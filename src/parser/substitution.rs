//! Template substitution.
//!
//! Walks the template tree and swaps every placeholder string that has a
//! binding for the bound value. The result is built as a tree, so it is
//! always valid JSON; there is no text-level search and replace.

use serde_json::Value;
use tracing::{debug, info};

use super::error::SubstitutionError;
use super::matcher::ParamBinding;
use super::placeholder::placeholder_name;

/// Returns `template` with every bound placeholder replaced.
///
/// Placeholders without a binding are left as they are, so one template can
/// serve devices that bind only a subset of names.
///
/// ```
/// use iotsim::parser::{substitute, JsonValue, ParamBinding};
/// use serde_json::json;
///
/// let binding: ParamBinding = [("x", JsonValue::from("v"))].into_iter().collect();
/// let out = substitute(&json!({"a": "{x}", "b": "{y}"}), &binding);
/// assert_eq!(out, json!({"a": "v", "b": "{y}"}));
/// ```
#[must_use]
pub fn substitute(template: &Value, bindings: &ParamBinding) -> Value {
    let mut replaced = 0usize;
    let result = substitute_node(template, bindings, &mut replaced);
    debug!("Substituted {} placeholder occurrence(s) using {}", replaced, bindings);
    result
}

/// Parses `template` and substitutes into it.
///
/// # Errors
///
/// [`SubstitutionError::InvalidTemplate`] if the template is not JSON.
pub fn substitute_str(template: &str, bindings: &ParamBinding) -> Result<Value, SubstitutionError> {
    let parsed: Value = serde_json::from_str(template)?;
    let result = substitute(&parsed, bindings);
    info!("Updated json message: {}", result);
    Ok(result)
}

fn substitute_node(node: &Value, bindings: &ParamBinding, replaced: &mut usize) -> Value {
    match node {
        Value::String(s) => match placeholder_name(s).and_then(|name| bindings.get(name)) {
            Some(value) => {
                *replaced += 1;
                value.to_json()
            }
            None => node.clone(),
        },
        Value::Object(map) => Value::Object(
            map.iter()
                .map(|(key, value)| (key.clone(), substitute_node(value, bindings, replaced)))
                .collect(),
        ),
        Value::Array(items) => Value::Array(
            items
                .iter()
                .map(|item| substitute_node(item, bindings, replaced))
                .collect(),
        ),
        Value::Number(_) | Value::Bool(_) | Value::Null => node.clone(),
    }
}
