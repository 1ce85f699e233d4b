//! cfgmirror Core - Configuration Types
//!
//! Data model, error taxonomy, legacy query shapes, and value conventions
//! shared by the storage backends, the configuration mirror, and the host
//! service. This crate performs no I/O.

pub mod config;
pub mod entities;
pub mod error;
pub mod filter;
pub mod health;
pub mod value_kind;

pub use config::{MirrorConfig, DEFAULT_REFRESH_INTERVAL_MS, DEVELOPMENT_REFRESH_INTERVAL_MS};
pub use entities::{
    BulkUpdateError, BulkUpdateReport, CacheEntry, ComplaintTypeRecord, ConfigRecord, NewConfig,
    PublicEntry, PublicSettings, SettingsMeta, SettingsSource, Timestamp, UpsertOutcome,
    COMPLAINT_TYPE_ENTRY_TYPE,
};
pub use error::{ConfigError, MirrorError, MirrorResult, StorageError, ValidationError};
pub use filter::{
    matches_where, sort_records, CacheableWhere, ConfigFilter, ConfigQuery,
    KeyFilter, OrderBy, SortDirection, SortField,
};
pub use health::{Component, HealthCheck, HealthDetail, HealthStatus, MirrorVitals};
pub use value_kind::{validate_value, ValueKind};
