//! # Masked-JSON parser
//!
//! Pure, stateless building blocks of the correlation engine:
//!
//! ```text
//! parser/
//! ├── json_value.rs    - Typed values captured from a subject
//! ├── placeholder.rs   - `{name}` tokens and detection
//! ├── matcher.rs       - Mask vs. subject matching, parameter extraction
//! ├── substitution.rs  - Filling a template with extracted parameters
//! └── error.rs         - Error types
//! ```
//!
//! Nothing here holds state or locks, so every function can be called from
//! any number of device workers at once.

pub mod error;
pub mod json_value;
pub mod matcher;
pub mod placeholder;
pub mod substitution;

pub use error::{MatchError, SubstitutionError, ValueKindError};
pub use json_value::{JsonValue, JsonValueKind};
pub use matcher::{match_mask, match_mask_str, ParamBinding};
pub use placeholder::{contains_placeholders, contains_placeholders_str, placeholder_name};
pub use substitution::{substitute, substitute_str};
