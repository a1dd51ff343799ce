//! Error types for Strata

use strata_types::{Keypath, SchemaViolation};
use thiserror::Error;

/// Main error type for Strata operations
#[derive(Error, Debug)]
pub enum StrataError {
    /// Malformed variable override syntax
    #[error("Parse error: {0}")]
    Parse(String),

    /// A template expression failed to resolve
    #[error("Render error at '{keypath}': {message}")]
    Render { keypath: Keypath, message: String },

    /// Structural problem not caught by schema validation
    #[error("Configuration error: {0}")]
    Configuration(String),

    /// Schema violation detected while building an entity from a mapping
    #[error("Validation error at '{path}': expected {expected}, found {found}")]
    Validation {
        path: Keypath,
        expected: String,
        found: String,
    },

    /// No adapter registered for a type key
    #[error("Adapter not found: {0}")]
    Lookup(String),

    /// File system error
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// JSON serialization/deserialization error
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

impl StrataError {
    /// Render failure at the given keypath
    pub fn render(keypath: Keypath, message: impl Into<String>) -> Self {
        StrataError::Render {
            keypath,
            message: message.into(),
        }
    }

    /// Validation failure at the given field path
    pub fn validation(
        path: Keypath,
        expected: impl Into<String>,
        found: impl Into<String>,
    ) -> Self {
        StrataError::Validation {
            path,
            expected: expected.into(),
            found: found.into(),
        }
    }

    /// Location the error points at, for render and validation failures
    pub fn location(&self) -> Option<&Keypath> {
        match self {
            StrataError::Render { keypath, .. } => Some(keypath),
            StrataError::Validation { path, .. } => Some(path),
            _ => None,
        }
    }

    /// Re-root render and validation locations below the mapping key `key`
    pub fn nested_under(self, key: &str) -> Self {
        let prefix = Keypath::from_keys([key]);
        match self {
            StrataError::Render { keypath, message } => StrataError::Render {
                keypath: keypath.prefixed(&prefix),
                message,
            },
            StrataError::Validation {
                path,
                expected,
                found,
            } => StrataError::Validation {
                path: path.prefixed(&prefix),
                expected,
                found,
            },
            other => other,
        }
    }

    /// Returns true if the error was caused by the supplied configuration
    /// rather than by the environment
    pub fn is_user_error(&self) -> bool {
        matches!(
            self,
            StrataError::Parse(_)
                | StrataError::Render { .. }
                | StrataError::Configuration(_)
                | StrataError::Validation { .. }
                | StrataError::Lookup(_)
        )
    }

    /// Process exit code used by the CLI
    pub fn exit_code(&self) -> i32 {
        match self {
            StrataError::Parse(_) => 2,
            StrataError::Render { .. } | StrataError::Configuration(_) => 3,
            StrataError::Validation { .. } => 4,
            StrataError::Lookup(_) => 5,
            StrataError::Io(_) | StrataError::Json(_) => 1,
        }
    }
}

impl From<SchemaViolation> for StrataError {
    fn from(violation: SchemaViolation) -> Self {
        StrataError::Validation {
            path: violation.path,
            expected: violation.expected,
            found: violation.found,
        }
    }
}

/// Result type alias using StrataError
pub type Result<T> = std::result::Result<T, StrataError>;
