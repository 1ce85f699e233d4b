//! Error types for cfgmirror operations

use thiserror::Error;

/// Configuration store errors.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum StorageError {
    #[error("Config key not found: {key}")]
    NotFound { key: String },

    #[error("Config store unavailable: {reason}")]
    Unavailable { reason: String },

    #[error("Config query failed: {reason}")]
    QueryFailed { reason: String },

    #[error("Write failed for {key}: {reason}")]
    WriteFailed { key: String, reason: String },

    #[error("Storage lock poisoned")]
    LockPoisoned,
}

/// Validation errors raised at the write boundary.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum ValidationError {
    #[error("Required field missing: {field}")]
    RequiredFieldMissing { field: String },

    #[error("Invalid value for {field}: {reason}")]
    InvalidValue { field: String, reason: String },

    #[error("Type mismatch for {key}: expected {expected}, got {value:?}")]
    TypeMismatch {
        key: String,
        expected: String,
        value: String,
    },
}

/// Configuration errors.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum ConfigError {
    #[error("Missing required configuration field: {field}")]
    MissingRequired { field: String },

    #[error("Invalid value for {field}: {value} - {reason}")]
    InvalidValue {
        field: String,
        value: String,
        reason: String,
    },
}

/// Master error type for all cfgmirror errors.
#[derive(Debug, Clone, Error)]
pub enum MirrorError {
    #[error("Storage error: {0}")]
    Storage(#[from] StorageError),

    #[error("Validation error: {0}")]
    Validation(#[from] ValidationError),

    #[error("Config error: {0}")]
    Config(#[from] ConfigError),
}

impl MirrorError {
    /// True for the not-found condition, which is distinct from unavailability.
    pub fn is_not_found(&self) -> bool {
        matches!(self, MirrorError::Storage(StorageError::NotFound { .. }))
    }

    /// True when the store could not be reached or queried.
    pub fn is_unavailable(&self) -> bool {
        matches!(
            self,
            MirrorError::Storage(StorageError::Unavailable { .. })
                | MirrorError::Storage(StorageError::QueryFailed { .. })
        )
    }

    /// Shorthand for `StorageError::NotFound`.
    pub fn not_found(key: impl Into<String>) -> Self {
        StorageError::NotFound { key: key.into() }.into()
    }

    /// Shorthand for `StorageError::Unavailable`.
    pub fn unavailable(reason: impl Into<String>) -> Self {
        StorageError::Unavailable {
            reason: reason.into(),
        }
        .into()
    }
}

/// Result type alias for cfgmirror operations.
pub type MirrorResult<T> = Result<T, MirrorError>;

// =============================================================================
// TESTS
// =============================================================================
