//! Tracing Subscriber Initialization
//!
//! Installs a `tracing-subscriber` registry with an env filter and either a
//! JSON or a human-readable formatter. Library crates only emit events; the
//! binary calls [`init_tracing`] once at startup.

use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

use crate::constants::{DEFAULT_LOG_FILTER, SERVICE_NAME};
use crate::error::{ApiError, ApiResult};

/// Output format of the log formatter.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LogFormat {
    Json,
    Pretty,
}

impl LogFormat {
    /// Parse `json` or `pretty`. Anything else yields `None`.
    pub fn parse(value: &str) -> Option<Self> {
        match value.trim().to_ascii_lowercase().as_str() {
            "json" => Some(LogFormat::Json),
            "pretty" | "text" => Some(LogFormat::Pretty),
            _ => None,
        }
    }
}

/// Telemetry configuration from environment variables.
#[derive(Debug, Clone)]
pub struct TelemetryConfig {
    /// Filter directives in `RUST_LOG` syntax (e.g., "info,cfgmirror_storage=debug")
    pub filter: String,
    /// Formatter selection
    pub format: LogFormat,
    /// Service name attached to the startup event
    pub service_name: String,
    /// Service version
    pub service_version: String,
}

impl Default for TelemetryConfig {
    fn default() -> Self {
        Self {
            filter: std::env::var("CFGMIRROR_LOG")
                .unwrap_or_else(|_| DEFAULT_LOG_FILTER.to_string()),
            format: std::env::var("CFGMIRROR_LOG_FORMAT")
                .ok()
                .and_then(|s| LogFormat::parse(&s))
                .unwrap_or(LogFormat::Json),
            service_name: SERVICE_NAME.to_string(),
            service_version: env!("CARGO_PKG_VERSION").to_string(),
        }
    }
}

/// Initialize the global tracing subscriber.
///
/// Fails if the filter directives do not parse or a subscriber is
/// already installed.
pub fn init_tracing(config: &TelemetryConfig) -> ApiResult<()> {
    let env_filter = EnvFilter::try_new(&config.filter).map_err(|e| {
        ApiError::invalid_input(format!("Invalid log filter '{}': {}", config.filter, e))
    })?;

    let registry = tracing_subscriber::registry().with(env_filter);
    let result = match config.format {
        LogFormat::Json => registry
            .with(tracing_subscriber::fmt::layer().json())
            .try_init(),
        LogFormat::Pretty => registry
            .with(tracing_subscriber::fmt::layer().pretty())
            .try_init(),
    };
    result.map_err(|e| ApiError::internal_error(format!("Failed to init subscriber: {}", e)))?;

    tracing::info!(
        service_name = config.service_name,
        service_version = config.service_version,
        filter = config.filter,
        format = ?config.format,
        "Telemetry initialized"
    );

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    struct EnvVarGuard {
        key: &'static str,
        original: Option<String>,
    }

    impl EnvVarGuard {
        fn set(key: &'static str, value: Option<&str>) -> Self {
            let original = std::env::var(key).ok();
            match value {
                Some(v) => std::env::set_var(key, v),
                None => std::env::remove_var(key),
            }
            Self { key, original }
        }
    }

    impl Drop for EnvVarGuard {
        fn drop(&mut self) {
            match self.original.as_deref() {
                Some(v) => std::env::set_var(self.key, v),
                None => std::env::remove_var(self.key),
            }
        }
    }

    #[test]
    fn test_telemetry_config_from_env() {
        let _filter = EnvVarGuard::set("CFGMIRROR_LOG", None);
        let _format = EnvVarGuard::set("CFGMIRROR_LOG_FORMAT", None);
        let config = TelemetryConfig::default();
        assert_eq!(config.filter, DEFAULT_LOG_FILTER);
        assert_eq!(config.format, LogFormat::Json);
        assert_eq!(config.service_name, "cfgmirror");

        let _filter = EnvVarGuard::set("CFGMIRROR_LOG", Some("debug"));
        let _format = EnvVarGuard::set("CFGMIRROR_LOG_FORMAT", Some("pretty"));
        let config = TelemetryConfig::default();
        assert_eq!(config.filter, "debug");
        assert_eq!(config.format, LogFormat::Pretty);
    }

    #[test]
    fn test_log_format_parse() {
        assert_eq!(LogFormat::parse("JSON"), Some(LogFormat::Json));
        assert_eq!(LogFormat::parse(" pretty "), Some(LogFormat::Pretty));
        assert_eq!(LogFormat::parse("xml"), None);
    }

    #[test]
    fn test_invalid_filter_is_rejected() {
        let config = TelemetryConfig {
            filter: "cfgmirror=notalevel".to_string(),
            ..TelemetryConfig::default()
        };
        let err = init_tracing(&config).unwrap_err();
        assert_eq!(err.code, crate::error::ErrorCode::InvalidInput);
    }
}
