//! Error definitions for mask matching and template substitution

use thiserror::Error;

/// A JSON node that cannot be carried as a bound parameter
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ValueKindError {
    /// Only strings, numbers, booleans, objects and arrays can be bound
    #[error("Unrecognized JSON value kind: {found}")]
    UnrecognizedValueKind { found: &'static str },
}

/// Reasons a subject document does not fit a mask
///
/// The correlation gate treats every variant as "no match". Callers that ask
/// for strict extraction explicitly get the precise cause back.
#[derive(Debug, Error)]
pub enum MatchError {
    /// Object key sets differ (strict mode) or a mask key is absent
    #[error("Structure mismatch at {path}: {reason}")]
    StructureMismatch { path: String, reason: String },

    /// Array lengths are incompatible
    #[error("Array length mismatch at {path}: mask has {mask}, subject has {subject}")]
    ArrayLengthMismatch {
        path: String,
        mask: usize,
        subject: usize,
    },

    /// A literal mask value differs from the subject
    #[error("Value mismatch at {path}: expected {expected}, found {actual}")]
    ValueMismatch {
        path: String,
        expected: String,
        actual: String,
    },

    /// A placeholder landed on a value that cannot be bound
    #[error("Cannot bind parameter at {path}: {source}")]
    UnrecognizedValueKind {
        path: String,
        #[source]
        source: ValueKindError,
    },

    /// Mask or subject text is not JSON
    #[error("Invalid JSON in {what}: {source}")]
    InvalidJson {
        what: &'static str,
        #[source]
        source: serde_json::Error,
    },
}

/// Failures while producing an outgoing payload from a template
#[derive(Debug, Error)]
pub enum SubstitutionError {
    /// The template text does not parse as JSON
    #[error("Invalid template: {0}")]
    InvalidTemplate(#[from] serde_json::Error),
}
