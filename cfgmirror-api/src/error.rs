//! Error Types for the cfgmirror service
//!
//! This module defines error handling for the host-facing layer:
//! - ApiError struct for structured error responses
//! - ErrorCode enum for categorizing errors
//! - Conversion from the mirror's error taxonomy
//!
//! Every error carries the HTTP-equivalent status a transport layer should
//! use, so hosts can map them without inspecting messages.

use cfgmirror_core::{ConfigError, MirrorError, StorageError, ValidationError};
use serde::{Deserialize, Serialize};
use std::fmt;

// ============================================================================
// ERROR CODE ENUM
// ============================================================================

/// Error codes for service responses.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ErrorCode {
    // ========================================================================
    // Validation Errors (400)
    // ========================================================================
    /// Request contains invalid input data
    InvalidInput,

    /// Required field is missing from request
    MissingField,

    /// Value does not match the kind expected for its key
    InvalidFormat,

    /// Batch exceeds the accepted size
    TooManyItems,

    // ========================================================================
    // Not Found Errors (404)
    // ========================================================================
    /// Requested configuration key does not exist
    ConfigNotFound,

    // ========================================================================
    // Server Errors (500, 503)
    // ========================================================================
    /// Internal server error
    InternalError,

    /// Database operation failed
    DatabaseError,

    /// Configuration store is unreachable
    ServiceUnavailable,

    /// Service configuration is invalid
    MisconfiguredService,
}

impl ErrorCode {
    /// Get the HTTP-equivalent status code for this error code.
    pub fn status_code(&self) -> u16 {
        match self {
            ErrorCode::InvalidInput
            | ErrorCode::MissingField
            | ErrorCode::InvalidFormat
            | ErrorCode::TooManyItems => 400,

            ErrorCode::ConfigNotFound => 404,

            ErrorCode::ServiceUnavailable => 503,

            ErrorCode::InternalError
            | ErrorCode::DatabaseError
            | ErrorCode::MisconfiguredService => 500,
        }
    }

    /// Get a default message for this error code.
    pub fn default_message(&self) -> &'static str {
        match self {
            ErrorCode::InvalidInput => "Invalid input data",
            ErrorCode::MissingField => "Required field is missing",
            ErrorCode::InvalidFormat => "Value has the wrong format for its key",
            ErrorCode::TooManyItems => "Too many items in batch",
            ErrorCode::ConfigNotFound => "Configuration key not found",
            ErrorCode::InternalError => "Internal server error",
            ErrorCode::DatabaseError => "Database operation failed",
            ErrorCode::ServiceUnavailable => "Configuration store is unavailable",
            ErrorCode::MisconfiguredService => "Service configuration is invalid",
        }
    }

    /// True for the 4xx family.
    pub fn is_client_error(&self) -> bool {
        (400..500).contains(&self.status_code())
    }
}

impl fmt::Display for ErrorCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:?}", self)
    }
}

// ============================================================================
// API ERROR STRUCT
// ============================================================================

/// Structured error returned by [`crate::SettingsService`] operations.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, thiserror::Error)]
#[error("{code}: {message}")]
pub struct ApiError {
    /// Error code categorizing the error
    pub code: ErrorCode,

    /// Human-readable error message
    pub message: String,

    /// Optional additional details (offending key, expected kind, ...)
    #[serde(skip_serializing_if = "Option::is_none")]
    pub details: Option<serde_json::Value>,
}

impl ApiError {
    /// Create a new API error with the given code and message.
    pub fn new(code: ErrorCode, message: impl Into<String>) -> Self {
        Self {
            code,
            message: message.into(),
            details: None,
        }
    }

    /// Create a new API error with the given code, using the default message.
    pub fn from_code(code: ErrorCode) -> Self {
        Self {
            code,
            message: code.default_message().to_string(),
            details: None,
        }
    }

    /// Add additional details to the error.
    pub fn with_details(mut self, details: serde_json::Value) -> Self {
        self.details = Some(details);
        self
    }

    /// Get the HTTP-equivalent status code for this error.
    pub fn status_code(&self) -> u16 {
        self.code.status_code()
    }

    // ========================================================================
    // Convenience constructors for common errors
    // ========================================================================

    pub fn invalid_input(message: impl Into<String>) -> Self {
        Self::new(ErrorCode::InvalidInput, message)
    }

    /// Create a MissingField error.
    pub fn missing_field(field: &str) -> Self {
        Self::new(
            ErrorCode::MissingField,
            format!("Required field '{}' is missing", field),
        )
    }

    /// Create a TooManyItems error.
    pub fn too_many_items(count: usize, max: usize) -> Self {
        Self::new(
            ErrorCode::TooManyItems,
            format!("Batch of {} items exceeds the limit of {}", count, max),
        )
    }

    /// Create a ConfigNotFound error for `key`.
    pub fn config_not_found(key: &str) -> Self {
        Self::new(
            ErrorCode::ConfigNotFound,
            format!("Configuration key '{}' not found", key),
        )
        .with_details(serde_json::json!({ "key": key }))
    }

    pub fn internal_error(message: impl Into<String>) -> Self {
        Self::new(ErrorCode::InternalError, message)
    }

    pub fn database_error(message: impl Into<String>) -> Self {
        Self::new(ErrorCode::DatabaseError, message)
    }
}

// ============================================================================
// CONVERSIONS
// ============================================================================

impl From<ValidationError> for ApiError {
    fn from(err: ValidationError) -> Self {
        match err {
            ValidationError::RequiredFieldMissing { field } => ApiError::missing_field(&field),
            ValidationError::InvalidValue { field, reason } => {
                ApiError::invalid_input(format!("Invalid value for {}: {}", field, reason))
                    .with_details(serde_json::json!({ "field": field }))
            }
            ValidationError::TypeMismatch {
                key,
                expected,
                value,
            } => ApiError::new(
                ErrorCode::InvalidFormat,
                format!("Value for {} must be a {}", key, expected),
            )
            .with_details(serde_json::json!({
                "key": key,
                "expected": expected,
                "value": value,
            })),
        }
    }
}

/// Convert from the mirror's error taxonomy.
///
/// Not-found and unavailability stay distinct: the first is a 404, the
/// second a 503. Store failure details are logged, not returned.
impl From<MirrorError> for ApiError {
    fn from(err: MirrorError) -> Self {
        match err {
            MirrorError::Storage(StorageError::NotFound { key }) => ApiError::config_not_found(&key),
            MirrorError::Storage(
                e @ (StorageError::Unavailable { .. } | StorageError::QueryFailed { .. }),
            ) => {
                tracing::error!(error = %e, "Configuration store unavailable");
                ApiError::from_code(ErrorCode::ServiceUnavailable)
            }
            MirrorError::Storage(e @ StorageError::WriteFailed { .. }) => {
                tracing::error!(error = %e, "Configuration write failed");
                ApiError::from_code(ErrorCode::DatabaseError)
            }
            MirrorError::Storage(StorageError::LockPoisoned) => {
                tracing::error!("Configuration store lock poisoned");
                ApiError::from_code(ErrorCode::InternalError)
            }
            MirrorError::Validation(e) => e.into(),
            MirrorError::Config(e) => {
                let field = match &e {
                    ConfigError::MissingRequired { field } => field.clone(),
                    ConfigError::InvalidValue { field, .. } => field.clone(),
                };
                ApiError::new(ErrorCode::MisconfiguredService, e.to_string())
                    .with_details(serde_json::json!({ "field": field }))
            }
        }
    }
}

/// Convert from serde_json::Error to ApiError.
impl From<serde_json::Error> for ApiError {
    fn from(err: serde_json::Error) -> Self {
        tracing::error!("JSON serialization error: {:?}", err);
        ApiError::invalid_input(format!("Invalid JSON: {}", err))
    }
}

// ============================================================================
// RESULT TYPE ALIAS
// ============================================================================

/// Result type alias for service operations.
pub type ApiResult<T> = Result<T, ApiError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_code_status_mapping() {
        assert_eq!(ErrorCode::InvalidInput.status_code(), 400);
        assert_eq!(ErrorCode::InvalidFormat.status_code(), 400);
        assert_eq!(ErrorCode::ConfigNotFound.status_code(), 404);
        assert_eq!(ErrorCode::InternalError.status_code(), 500);
        assert_eq!(ErrorCode::DatabaseError.status_code(), 500);
        assert_eq!(ErrorCode::ServiceUnavailable.status_code(), 503);
        assert!(ErrorCode::MissingField.is_client_error());
        assert!(!ErrorCode::ServiceUnavailable.is_client_error());
    }

    #[test]
    fn test_not_found_is_distinct_from_unavailable() {
        let not_found: ApiError = MirrorError::not_found("APP_NAME").into();
        assert_eq!(not_found.code, ErrorCode::ConfigNotFound);
        assert_eq!(not_found.status_code(), 404);
        assert!(not_found.message.contains("APP_NAME"));

        let unavailable: ApiError = MirrorError::unavailable("connection refused").into();
        assert_eq!(unavailable.code, ErrorCode::ServiceUnavailable);
        assert_eq!(unavailable.status_code(), 503);
        assert!(!unavailable.message.contains("connection refused"));

        let query_failed: ApiError = MirrorError::from(StorageError::QueryFailed {
            reason: "syntax".to_string(),
        })
        .into();
        assert_eq!(query_failed.status_code(), 503);
    }

    #[test]
    fn test_write_failure_maps_to_database_error() {
        let err: ApiError = MirrorError::from(StorageError::WriteFailed {
            key: "APP_NAME".to_string(),
            reason: "constraint".to_string(),
        })
        .into();
        assert_eq!(err.code, ErrorCode::DatabaseError);
        assert_eq!(err.status_code(), 500);
    }

    #[test]
    fn test_type_mismatch_carries_details() {
        let err: ApiError = MirrorError::from(ValidationError::TypeMismatch {
            key: "MAX_FILE_SIZE".to_string(),
            expected: "number".to_string(),
            value: "big".to_string(),
        })
        .into();
        assert_eq!(err.code, ErrorCode::InvalidFormat);
        assert_eq!(err.status_code(), 400);
        let details = err.details.unwrap();
        assert_eq!(details["key"], "MAX_FILE_SIZE");
        assert_eq!(details["expected"], "number");
    }

    #[test]
    fn test_config_error_maps_to_misconfigured() {
        let err: ApiError = MirrorError::from(ConfigError::InvalidValue {
            field: "refresh_interval".to_string(),
            value: "0".to_string(),
            reason: "must be positive".to_string(),
        })
        .into();
        assert_eq!(err.code, ErrorCode::MisconfiguredService);
        assert_eq!(err.details.unwrap()["field"], "refresh_interval");
    }

    #[test]
    fn test_error_serialization() -> Result<(), serde_json::Error> {
        let err = ApiError::config_not_found("APP_NAME");
        let json = serde_json::to_string(&err)?;

        assert!(json.contains("CONFIG_NOT_FOUND"));
        assert!(json.contains("APP_NAME"));

        let deserialized: ApiError = serde_json::from_str(&json)?;
        assert_eq!(deserialized, err);
        Ok(())
    }

    #[test]
    fn test_error_display() {
        let err = ApiError::database_error("Connection failed");
        let display = format!("{}", err);

        assert!(display.contains("DatabaseError"));
        assert!(display.contains("Connection failed"));
    }
}
