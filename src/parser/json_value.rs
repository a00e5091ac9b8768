//! Typed JSON values captured from a subject document.
//!
//! A bound parameter has to remember what it was in the triggering message so
//! that it is written back with the same type: a string stays quoted, a number
//! or boolean stays bare, and containers keep their structure.

use std::fmt;

use serde_json::{Map, Number, Value};

use super::error::ValueKindError;

/// The kind tag of a [`JsonValue`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum JsonValueKind {
    String,
    Number,
    Boolean,
    Object,
    Array,
}

impl fmt::Display for JsonValueKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::String => "string",
            Self::Number => "number",
            Self::Boolean => "boolean",
            Self::Object => "object",
            Self::Array => "array",
        };
        write!(f, "{name}")
    }
}

/// A bindable JSON value with its kind decided once, at classification time.
///
/// # Examples
///
/// ```
/// use iotsim::parser::{JsonValue, JsonValueKind};
/// use serde_json::json;
///
/// let value = JsonValue::classify(&json!(17)).unwrap();
/// assert_eq!(value.kind(), JsonValueKind::Number);
/// assert_eq!(value.to_string(), "17");
///
/// let value = JsonValue::classify(&json!("abc")).unwrap();
/// assert_eq!(value.to_string(), "\"abc\"");
///
/// assert!(JsonValue::classify(&json!(null)).is_err());
/// ```
#[derive(Debug, Clone, PartialEq)]
pub enum JsonValue {
    String(String),
    Number(Number),
    Boolean(bool),
    Object(Map<String, Value>),
    Array(Vec<Value>),
}

impl JsonValue {
    /// Classifies a decoded JSON node.
    ///
    /// # Errors
    ///
    /// Returns [`ValueKindError::UnrecognizedValueKind`] for `null`, which has
    /// no kind a template could be re-typed with.
    pub fn classify(value: &Value) -> Result<Self, ValueKindError> {
        match value {
            Value::String(s) => Ok(Self::String(s.clone())),
            Value::Number(n) => Ok(Self::Number(n.clone())),
            Value::Bool(b) => Ok(Self::Boolean(*b)),
            Value::Object(map) => Ok(Self::Object(map.clone())),
            Value::Array(items) => Ok(Self::Array(items.clone())),
            Value::Null => Err(ValueKindError::UnrecognizedValueKind { found: "null" }),
        }
    }

    pub const fn kind(&self) -> JsonValueKind {
        match self {
            Self::String(_) => JsonValueKind::String,
            Self::Number(_) => JsonValueKind::Number,
            Self::Boolean(_) => JsonValueKind::Boolean,
            Self::Object(_) => JsonValueKind::Object,
            Self::Array(_) => JsonValueKind::Array,
        }
    }

    /// Returns the value as a structured JSON node, ready to be spliced into
    /// a template tree.
    #[must_use]
    pub fn to_json(&self) -> Value {
        self.clone().into()
    }
}

impl From<JsonValue> for Value {
    fn from(value: JsonValue) -> Self {
        match value {
            JsonValue::String(s) => Value::String(s),
            JsonValue::Number(n) => Value::Number(n),
            JsonValue::Boolean(b) => Value::Bool(b),
            JsonValue::Object(map) => Value::Object(map),
            JsonValue::Array(items) => Value::Array(items),
        }
    }
}

impl TryFrom<&Value> for JsonValue {
    type Error = ValueKindError;

    fn try_from(value: &Value) -> Result<Self, Self::Error> {
        Self::classify(value)
    }
}

/// Renders JSON-legal text: strings quoted and escaped, everything else bare.
impl fmt::Display for JsonValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.to_json())
    }
}

impl From<&str> for JsonValue {
    fn from(v: &str) -> Self {
        Self::String(v.to_string())
    }
}

impl From<String> for JsonValue {
    fn from(v: String) -> Self {
        Self::String(v)
    }
}

impl From<bool> for JsonValue {
    fn from(v: bool) -> Self {
        Self::Boolean(v)
    }
}

impl From<i64> for JsonValue {
    fn from(v: i64) -> Self {
        Self::Number(Number::from(v))
    }
}
