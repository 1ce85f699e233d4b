//! The configuration mirror and its read/write/degradation surfaces.
//!
//! - [`mirror`]: lifecycle, shared state, stats and health
//! - [`refresh`]: single-flight reloads and the periodic reload task
//! - [`writer`]: store-first writes applied to the map immediately
//! - [`query`]: map-served reads and the legacy query adapter
//! - [`fallback`]: tiered public settings
//! - [`defaults`]: the hardcoded default dataset

pub mod defaults;
pub mod fallback;
pub mod mirror;
pub mod query;
pub mod refresh;
mod writer;

pub use defaults::{
    default_complaint_types, default_config_entries, default_value, keys, DefaultSetting,
    DEFAULT_COMPLAINT_TYPES, DEFAULT_SETTINGS,
};
pub use fallback::FallbackProvider;
pub use mirror::{ConfigMirror, MirrorStats};
pub use query::{AppConfig, EmailConfig, MatchType};
pub use refresh::{RefreshMetrics, RefreshMetricsSnapshot, RefreshOutcome};
