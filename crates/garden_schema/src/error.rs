//! Errors raised while validating a value against a [`crate::Schema`].

/// A single validation failure, anchored to a JSON-Pointer-style path
/// (e.g. `/services/db/port`) into the value that was validated.
#[derive(Debug, Clone, thiserror::Error)]
pub enum SchemaError {
    /// A required field was missing after defaults were applied.
    #[error("{path}: missing required field")]
    MissingRequired {
        /// Path to the object whose property is missing.
        path: String,
    },

    /// A value's JSON type did not match the schema's expected kind.
    #[error("{path}: expected {expected}, found {found}")]
    TypeMismatch {
        /// Path to the offending value.
        path: String,
        /// The schema kind that was expected, e.g. `"string"`.
        expected: &'static str,
        /// A human-readable description of the value's actual type.
        found: &'static str,
    },

    /// A value was not one of the schema's `allowed` set.
    #[error("{path}: value is not one of the allowed values")]
    NotAllowed {
        /// Path to the offending value.
        path: String,
    },

    /// A string value did not match the schema's `pattern`.
    #[error("{path}: value does not match pattern '{pattern}'")]
    PatternMismatch {
        /// Path to the offending value.
        path: String,
        /// The regular expression the value failed to match.
        pattern: String,
    },
}

impl SchemaError {
    /// The JSON-Pointer-style path this error is anchored to.
    #[must_use]
    pub fn path(&self) -> &str {
        match self {
            Self::MissingRequired { path }
            | Self::TypeMismatch { path, .. }
            | Self::NotAllowed { path }
            | Self::PatternMismatch { path, .. } => path,
        }
    }
}
