//! cfgmirror API - Settings Service Layer
//!
//! Host-facing layer over the configuration mirror: the [`SettingsService`]
//! facade with write-boundary validation and audience-aware public settings,
//! structured [`ApiError`]s carrying HTTP-equivalent statuses, environment
//! configuration, and tracing initialization for the `cfgmirror` binary.

pub mod config;
pub mod constants;
pub mod error;
pub mod service;
pub mod telemetry;

// Re-export commonly used types
pub use config::{DbConfig, ServiceConfig};
pub use error::{ApiError, ApiResult, ErrorCode};
pub use service::{Audience, SettingsService};
pub use telemetry::{init_tracing, LogFormat, TelemetryConfig};
