//! Error types for Synheart Shim

use thiserror::Error;

/// Errors that can occur while mapping provider responses
#[derive(Debug, Error)]
pub enum MappingError {
    #[error("Missing required field: {path}")]
    MissingRequiredField { path: String },

    #[error("Type mismatch at {path}: expected {expected}")]
    TypeMismatch { path: String, expected: &'static str },

    #[error("Unsupported {kind} unit: {code}")]
    UnsupportedUnit { kind: &'static str, code: String },

    #[error("Invalid timestamp in {field}: {reason}")]
    InvalidTimestamp { field: String, reason: String },

    #[error("Invalid JSON: {0}")]
    JsonError(#[from] serde_json::Error),

    #[error("Parse error: {0}")]
    ParseError(String),

    #[error("Unknown category '{category}' for provider '{provider}'")]
    UnknownCategory { provider: String, category: String },
}

impl MappingError {
    pub(crate) fn missing(path: &str) -> Self {
        MappingError::MissingRequiredField {
            path: path.to_string(),
        }
    }

    pub(crate) fn mismatch(path: &str, expected: &'static str) -> Self {
        MappingError::TypeMismatch {
            path: path.to_string(),
            expected,
        }
    }

    pub(crate) fn timestamp(field: &str, reason: impl Into<String>) -> Self {
        MappingError::InvalidTimestamp {
            field: field.to_string(),
            reason: reason.into(),
        }
    }

    /// Whether this error aborts the whole batch instead of skipping a record.
    ///
    /// Only unknown unit codes and unknown categories are fatal.
    pub fn is_fatal(&self) -> bool {
        matches!(
            self,
            MappingError::UnsupportedUnit { .. } | MappingError::UnknownCategory { .. }
        )
    }
}
