//! Value-kind conventions for configuration values
//!
//! Values are stored as text. Their intended shape comes from the declared
//! `type` when it names a kind, otherwise from key-naming conventions. This
//! is a soft convention: the mirror stores whatever it is given, and only
//! the write boundary calls [`validate_value`].

use once_cell::sync::Lazy;
use regex::Regex;
use serde::{Deserialize, Serialize};

use crate::ValidationError;

static NUMBER_PATTERN: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^\d+$").expect("number pattern is valid"));

const NUMERIC_MARKERS: &[&str] = &["MINUTES", "HOURS", "SIZE", "LENGTH", "LIMIT", "DAYS"];
const BOOLEAN_MARKERS: &[&str] = &["ENABLED", "MODE"];
const JSON_SUFFIXES: &[&str] = &["_SETTINGS", "_BOUNDARY", "_CONFIG", "_JSON"];

/// Interpretation of a configuration value.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ValueKind {
    String,
    Number,
    Boolean,
    Json,
}

impl ValueKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            ValueKind::String => "string",
            ValueKind::Number => "number",
            ValueKind::Boolean => "boolean",
            ValueKind::Json => "json",
        }
    }

    /// Parse a declared type name. Free-form categories yield `None`.
    pub fn from_declared(declared: &str) -> Option<Self> {
        match declared.trim().to_ascii_lowercase().as_str() {
            "string" | "text" => Some(ValueKind::String),
            "number" | "integer" | "int" => Some(ValueKind::Number),
            "boolean" | "bool" => Some(ValueKind::Boolean),
            "json" | "object" => Some(ValueKind::Json),
            _ => None,
        }
    }

    /// Infer the kind from key-naming conventions alone.
    pub fn infer_from_key(key: &str) -> Self {
        let upper = key.to_ascii_uppercase();
        if JSON_SUFFIXES.iter().any(|suffix| upper.ends_with(suffix)) {
            ValueKind::Json
        } else if BOOLEAN_MARKERS.iter().any(|marker| upper.contains(marker)) {
            ValueKind::Boolean
        } else if NUMERIC_MARKERS.iter().any(|marker| upper.contains(marker)) {
            ValueKind::Number
        } else {
            ValueKind::String
        }
    }

    /// Declared type wins when it names a kind; otherwise fall back to the key.
    pub fn for_key(key: &str, declared: Option<&str>) -> Self {
        declared
            .and_then(Self::from_declared)
            .unwrap_or_else(|| Self::infer_from_key(key))
    }

    /// Check a value against this kind.
    pub fn accepts(&self, value: &str) -> bool {
        match self {
            ValueKind::String => true,
            ValueKind::Number => NUMBER_PATTERN.is_match(value),
            ValueKind::Boolean => value == "true" || value == "false",
            ValueKind::Json => serde_json::from_str::<serde_json::Value>(value).is_ok(),
        }
    }
}

impl std::fmt::Display for ValueKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Validate a value for the write boundary, naming the offending key and kind.
pub fn validate_value(key: &str, value: &str, declared: Option<&str>) -> Result<(), ValidationError> {
    if key.trim().is_empty() {
        return Err(ValidationError::RequiredFieldMissing {
            field: "key".to_string(),
        });
    }
    let kind = ValueKind::for_key(key, declared);
    if kind.accepts(value) {
        Ok(())
    } else {
        Err(ValidationError::TypeMismatch {
            key: key.to_string(),
            expected: kind.to_string(),
            value: value.to_string(),
        })
    }
}
