//! Configuration entities
//!
//! Persisted records, their in-memory projection, and the wire shapes
//! returned by the public settings read path.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Timestamp type using UTC timezone.
pub type Timestamp = DateTime<Utc>;

// ============================================================================
// PERSISTED RECORDS
// ============================================================================

/// A row of the persisted configuration table.
///
/// `value` is opaque text; callers interpret it by convention (see
/// [`crate::ValueKind`]). Inactive rows are soft-deleted and never mirrored.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ConfigRecord {
    pub key: String,
    pub value: String,
    #[serde(rename = "type")]
    pub config_type: Option<String>,
    pub description: Option<String>,
    pub is_active: bool,
    pub updated_at: Timestamp,
}

impl ConfigRecord {
    /// Build an active record stamped with the current time.
    pub fn new(key: impl Into<String>, value: impl Into<String>) -> Self {
        Self {
            key: key.into(),
            value: value.into(),
            config_type: None,
            description: None,
            is_active: true,
            updated_at: Utc::now(),
        }
    }

    /// Set the type.
    pub fn with_type(mut self, config_type: impl Into<String>) -> Self {
        self.config_type = Some(config_type.into());
        self
    }

    /// Set the description.
    pub fn with_description(mut self, description: impl Into<String>) -> Self {
        self.description = Some(description.into());
        self
    }

    /// Mark the record inactive.
    pub fn inactive(mut self) -> Self {
        self.is_active = false;
        self
    }

    /// Project this record into a cache entry.
    pub fn to_entry(&self) -> CacheEntry {
        CacheEntry {
            value: self.value.clone(),
            config_type: self.config_type.clone(),
            description: self.description.clone(),
            updated_at: self.updated_at,
        }
    }
}

/// In-memory snapshot of an active [`ConfigRecord`], keyed by `key`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CacheEntry {
    pub value: String,
    #[serde(rename = "type")]
    pub config_type: Option<String>,
    pub description: Option<String>,
    pub updated_at: Timestamp,
}

impl CacheEntry {
    /// Rebuild a record shape from a cached entry. Cached entries are always active.
    pub fn to_record(&self, key: &str) -> ConfigRecord {
        ConfigRecord {
            key: key.to_string(),
            value: self.value.clone(),
            config_type: self.config_type.clone(),
            description: self.description.clone(),
            is_active: true,
            updated_at: self.updated_at,
        }
    }
}

// ============================================================================
// WRITE PAYLOADS
// ============================================================================

/// Payload for a single upsert.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NewConfig {
    pub key: String,
    pub value: String,
    #[serde(rename = "type", default, skip_serializing_if = "Option::is_none")]
    pub config_type: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
}

impl NewConfig {
    pub fn new(key: impl Into<String>, value: impl Into<String>) -> Self {
        Self {
            key: key.into(),
            value: value.into(),
            config_type: None,
            description: None,
        }
    }

    /// Set the type.
    pub fn with_type(mut self, config_type: impl Into<String>) -> Self {
        self.config_type = Some(config_type.into());
        self
    }

    /// Set the description.
    pub fn with_description(mut self, description: impl Into<String>) -> Self {
        self.description = Some(description.into());
        self
    }
}

/// Result of a successful upsert.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UpsertOutcome {
    pub record: ConfigRecord,
    /// True when no row (active or inactive) existed for the key beforehand.
    pub created: bool,
}

/// Per-key failure reported by a bulk update.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BulkUpdateError {
    pub key: String,
    pub error: String,
}

/// Outcome of a best-effort bulk update.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct BulkUpdateReport {
    pub updated: Vec<String>,
    pub created: Vec<String>,
    pub errors: Vec<BulkUpdateError>,
}

impl BulkUpdateReport {
    /// Number of entries that were persisted.
    pub fn applied(&self) -> usize {
        self.updated.len() + self.created.len()
    }

    pub fn has_errors(&self) -> bool {
        !self.errors.is_empty()
    }
}

// ============================================================================
// LOOKUP ROWS
// ============================================================================

/// A row of the complaint type lookup table.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ComplaintTypeRecord {
    pub id: Uuid,
    pub code: String,
    pub name: String,
    pub description: Option<String>,
    pub is_active: bool,
}

// ============================================================================
// PUBLIC SETTINGS SHAPES
// ============================================================================

/// Uniform entry shape served by the public settings read path.
///
/// Live rows and hardcoded defaults both serialize to this shape so consumers
/// can only tell them apart by the response metadata.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PublicEntry {
    pub key: String,
    pub value: String,
    pub description: Option<String>,
    #[serde(rename = "type")]
    pub entry_type: Option<String>,
    pub enabled: bool,
}

impl From<&ConfigRecord> for PublicEntry {
    fn from(record: &ConfigRecord) -> Self {
        Self {
            key: record.key.clone(),
            value: record.value.clone(),
            description: record.description.clone(),
            entry_type: record.config_type.clone(),
            enabled: record.is_active,
        }
    }
}

impl From<&ComplaintTypeRecord> for PublicEntry {
    fn from(record: &ComplaintTypeRecord) -> Self {
        Self {
            key: record.code.clone(),
            value: record.name.clone(),
            description: record.description.clone(),
            entry_type: Some(COMPLAINT_TYPE_ENTRY_TYPE.to_string()),
            enabled: record.is_active,
        }
    }
}

/// `type` tag carried by complaint type entries.
pub const COMPLAINT_TYPE_ENTRY_TYPE: &str = "complaint_type";

/// Which degradation tier produced a public settings response.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SettingsSource {
    /// Live rows from the configuration store.
    Database,
    /// Store answered the probe but a data query failed.
    DefaultsFallback,
    /// Store did not answer the probe.
    Defaults,
}

impl SettingsSource {
    pub fn as_str(&self) -> &'static str {
        match self {
            SettingsSource::Database => "database",
            SettingsSource::DefaultsFallback => "defaults_fallback",
            SettingsSource::Defaults => "defaults",
        }
    }
}

impl std::fmt::Display for SettingsSource {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Provenance metadata attached to every public settings response.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SettingsMeta {
    pub source: SettingsSource,
    pub database_available: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

/// Response of the public settings read path.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PublicSettings {
    pub config: Vec<PublicEntry>,
    pub complaint_types: Vec<PublicEntry>,
    pub meta: SettingsMeta,
}

impl PublicSettings {
    /// Drop the error detail, for anonymous callers.
    pub fn redacted(mut self) -> Self {
        self.meta.error = None;
        self
    }

    /// Look up a config entry value by key.
    pub fn config_value(&self, key: &str) -> Option<&str> {
        self.config
            .iter()
            .find(|entry| entry.key == key)
            .map(|entry| entry.value.as_str())
    }
}
