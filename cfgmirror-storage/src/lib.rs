//! cfgmirror Storage - Configuration Stores and the Configuration Mirror
//!
//! Defines the store abstraction ([`ConfigStore`], [`ComplaintTypeSource`]),
//! its PostgreSQL and in-memory implementations, and the [`cache`] module
//! tree: the in-memory mirror with its reload scheduler, write path, query
//! facade and tiered fallback for public settings.

pub mod cache;
pub mod mock;
pub mod postgres;
pub mod store;

pub use cache::{
    default_complaint_types, default_config_entries, default_value, keys, AppConfig,
    ConfigMirror, DefaultSetting, EmailConfig, FallbackProvider, MatchType, MirrorStats,
    RefreshMetrics, RefreshMetricsSnapshot, RefreshOutcome, DEFAULT_COMPLAINT_TYPES,
    DEFAULT_SETTINGS,
};
pub use mock::MockConfigStore;
pub use postgres::{PgConfigStore, SCHEMA_SQL};
pub use store::{ComplaintTypeSource, ConfigStore};
