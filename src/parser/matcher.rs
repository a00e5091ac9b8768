//! Mask matching and parameter extraction.
//!
//! The mask drives the walk: every node in the mask is checked against the
//! node at the same position in the subject. Literal values must be equal,
//! placeholder strings capture whatever the subject holds there. Extra
//! subject structure is tolerated unless strict mode is requested.
//!
//! ```text
//! mask     {"uuid": "{id}", "data": {"running": "{state}", "reason": "update"}}
//! subject  {"uuid": "af23", "data": {"running": true,      "reason": "update"}}
//!                    │                          │
//! binding  id = "af23" (string)        state = true (boolean)
//! ```

use std::collections::btree_map::{self, BTreeMap};
use std::fmt;

use serde_json::{Map, Value};
use tracing::{debug, warn};

use super::error::MatchError;
use super::json_value::JsonValue;
use super::placeholder::placeholder_name;

/// Placeholder name to captured value, for one match.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ParamBinding {
    params: BTreeMap<String, JsonValue>,
}

impl ParamBinding {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    pub fn get(&self, name: &str) -> Option<&JsonValue> {
        self.params.get(name)
    }

    pub fn len(&self) -> usize {
        self.params.len()
    }

    pub fn is_empty(&self) -> bool {
        self.params.is_empty()
    }

    pub fn iter(&self) -> btree_map::Iter<'_, String, JsonValue> {
        self.params.iter()
    }

    /// Binds `name`. A second binding of the same name replaces the first.
    pub fn insert(&mut self, name: impl Into<String>, value: JsonValue) {
        let name = name.into();
        if let Some(previous) = self.params.get(&name) {
            if previous != &value {
                warn!(
                    "Placeholder {{{}}} bound twice with different values ({} then {}), keeping the last",
                    name, previous, value
                );
            }
        }
        self.params.insert(name, value);
    }

    fn merge(&mut self, other: ParamBinding) {
        for (name, value) in other.params {
            self.insert(name, value);
        }
    }
}

impl<'a> IntoIterator for &'a ParamBinding {
    type Item = (&'a String, &'a JsonValue);
    type IntoIter = btree_map::Iter<'a, String, JsonValue>;

    fn into_iter(self) -> Self::IntoIter {
        self.iter()
    }
}

impl<K: Into<String>> FromIterator<(K, JsonValue)> for ParamBinding {
    fn from_iter<I: IntoIterator<Item = (K, JsonValue)>>(iter: I) -> Self {
        let mut binding = Self::new();
        for (name, value) in iter {
            binding.insert(name, value);
        }
        binding
    }
}

impl fmt::Display for ParamBinding {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{{")?;
        for (i, (name, value)) in self.params.iter().enumerate() {
            if i > 0 {
                write!(f, ", ")?;
            }
            write!(f, "{name}={value}")?;
        }
        write!(f, "}}")
    }
}

/// Matches `subject` against `mask` and returns the captured parameters.
///
/// In strict mode object key sets and array lengths must be identical. In
/// non-strict mode the subject may carry extra keys and trailing array
/// elements.
///
/// # Errors
///
/// Returns the first disagreement found, with the JSON path where it occurred.
///
/// # Examples
///
/// ```
/// use iotsim::parser::{match_mask, JsonValue};
/// use serde_json::json;
///
/// let binding = match_mask(&json!({"id": "{x}"}), &json!({"id": 17}), true).unwrap();
/// assert_eq!(binding.get("x"), Some(&JsonValue::from(17_i64)));
/// ```
pub fn match_mask(mask: &Value, subject: &Value, strict: bool) -> Result<ParamBinding, MatchError> {
    let mut path = String::from("$");
    let binding = match_node(mask, subject, strict, &mut path)?;
    debug!("Mask matched, extracted {}", binding);
    Ok(binding)
}

/// Text variant of [`match_mask`].
///
/// # Errors
///
/// [`MatchError::InvalidJson`] if either text does not parse, otherwise as
/// [`match_mask`].
pub fn match_mask_str(mask: &str, subject: &str, strict: bool) -> Result<ParamBinding, MatchError> {
    let mask: Value = serde_json::from_str(mask)
        .map_err(|source| MatchError::InvalidJson { what: "mask", source })?;
    let subject: Value = serde_json::from_str(subject)
        .map_err(|source| MatchError::InvalidJson { what: "subject", source })?;
    match_mask(&mask, &subject, strict)
}

fn match_node(
    mask: &Value,
    subject: &Value,
    strict: bool,
    path: &mut String,
) -> Result<ParamBinding, MatchError> {
    match (mask, subject) {
        (Value::Object(mask_map), Value::Object(subject_map)) => {
            match_object(mask_map, subject_map, strict, path)
        }
        (Value::Array(mask_items), Value::Array(subject_items)) => {
            match_array(mask_items, subject_items, strict, path)
        }
        _ => match_scalar(mask, subject, path),
    }
}

fn match_object(
    mask: &Map<String, Value>,
    subject: &Map<String, Value>,
    strict: bool,
    path: &mut String,
) -> Result<ParamBinding, MatchError> {
    if strict && (mask.len() != subject.len() || mask.keys().any(|k| !subject.contains_key(k))) {
        return Err(MatchError::StructureMismatch {
            path: path.clone(),
            reason: format!(
                "key sets differ: mask {:?}, subject {:?}",
                mask.keys().collect::<Vec<_>>(),
                subject.keys().collect::<Vec<_>>()
            ),
        });
    }

    let mut binding = ParamBinding::new();
    for (key, mask_value) in mask {
        let Some(subject_value) = subject.get(key) else {
            return Err(MatchError::StructureMismatch {
                path: path.clone(),
                reason: format!("subject has no key {key:?}"),
            });
        };
        let len = path.len();
        path.push('.');
        path.push_str(key);
        let nested = match_node(mask_value, subject_value, strict, path);
        path.truncate(len);
        binding.merge(nested?);
    }
    Ok(binding)
}

fn match_array(
    mask: &[Value],
    subject: &[Value],
    strict: bool,
    path: &mut String,
) -> Result<ParamBinding, MatchError> {
    if (strict && mask.len() != subject.len()) || subject.len() < mask.len() {
        return Err(MatchError::ArrayLengthMismatch {
            path: path.clone(),
            mask: mask.len(),
            subject: subject.len(),
        });
    }

    let mut binding = ParamBinding::new();
    for (index, (mask_item, subject_item)) in mask.iter().zip(subject).enumerate() {
        let len = path.len();
        path.push_str(&format!("[{index}]"));
        let nested = match_node(mask_item, subject_item, strict, path);
        path.truncate(len);
        binding.merge(nested?);
    }
    Ok(binding)
}

fn match_scalar(mask: &Value, subject: &Value, path: &str) -> Result<ParamBinding, MatchError> {
    let mut binding = ParamBinding::new();

    if let Some(name) = mask.as_str().and_then(placeholder_name) {
        let value = JsonValue::classify(subject).map_err(|source| {
            MatchError::UnrecognizedValueKind {
                path: path.to_string(),
                source,
            }
        })?;
        debug!("Bound {{{}}} at {} to {} {}", name, path, value.kind(), value);
        binding.insert(name, value);
        return Ok(binding);
    }

    if mask == subject {
        Ok(binding)
    } else {
        Err(MatchError::ValueMismatch {
            path: path.to_string(),
            expected: mask.to_string(),
            actual: subject.to_string(),
        })
    }
}
