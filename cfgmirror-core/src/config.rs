//! Mirror configuration
//!
//! Loaded from environment variables with defaults suitable for production.

use std::time::Duration;

use crate::{ConfigError, MirrorResult};

/// Default interval between scheduled reloads (5 minutes).
pub const DEFAULT_REFRESH_INTERVAL_MS: u64 = 5 * 60 * 1000;

/// Refresh interval used by [`MirrorConfig::development`].
pub const DEVELOPMENT_REFRESH_INTERVAL_MS: u64 = 10 * 1000;

/// Configuration for the configuration mirror.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MirrorConfig {
    /// Interval between scheduled reloads.
    pub refresh_interval: Duration,
    /// Whether `initialize()` starts the scheduled reload task.
    pub auto_refresh: bool,
}

impl Default for MirrorConfig {
    fn default() -> Self {
        Self {
            refresh_interval: Duration::from_millis(DEFAULT_REFRESH_INTERVAL_MS),
            auto_refresh: true,
        }
    }
}

impl MirrorConfig {
    pub fn new() -> Self {
        Self::default()
    }

    /// Create MirrorConfig from environment variables.
    ///
    /// # Environment Variables
    /// - `CFGMIRROR_REFRESH_INTERVAL_MS`: Scheduled reload interval (default: 300000)
    /// - `CFGMIRROR_AUTO_REFRESH`: Whether to run scheduled reloads (default: true)
    pub fn from_env() -> Self {
        let refresh_interval = Duration::from_millis(
            std::env::var("CFGMIRROR_REFRESH_INTERVAL_MS")
                .ok()
                .and_then(|s| s.parse().ok())
                .unwrap_or(DEFAULT_REFRESH_INTERVAL_MS),
        );

        let auto_refresh = std::env::var("CFGMIRROR_AUTO_REFRESH")
            .ok()
            .map(|s| s.to_lowercase() != "false")
            .unwrap_or(true);

        Self {
            refresh_interval,
            auto_refresh,
        }
    }

    /// Short interval for local development.
    pub fn development() -> Self {
        Self {
            refresh_interval: Duration::from_millis(DEVELOPMENT_REFRESH_INTERVAL_MS),
            auto_refresh: true,
        }
    }

    /// Set the refresh interval.
    pub fn with_refresh_interval(mut self, interval: Duration) -> Self {
        self.refresh_interval = interval;
        self
    }

    /// Enable or disable scheduled reloads.
    pub fn with_auto_refresh(mut self, enabled: bool) -> Self {
        self.auto_refresh = enabled;
        self
    }

    pub fn refresh_interval_ms(&self) -> u64 {
        self.refresh_interval.as_millis() as u64
    }

    /// Validate the configuration.
    pub fn validate(&self) -> MirrorResult<()> {
        if self.refresh_interval.is_zero() {
            return Err(ConfigError::InvalidValue {
                field: "refresh_interval".to_string(),
                value: "0".to_string(),
                reason: "refresh_interval must be greater than 0".to_string(),
            }
            .into());
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_config_default() {
        let config = MirrorConfig::default();
        assert_eq!(config.refresh_interval, Duration::from_secs(300));
        assert_eq!(config.refresh_interval_ms(), DEFAULT_REFRESH_INTERVAL_MS);
        assert!(config.auto_refresh);
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_config_development() {
        let config = MirrorConfig::development();
        assert_eq!(config.refresh_interval, Duration::from_secs(10));
    }

    #[test]
    fn test_config_builder() {
        let config = MirrorConfig::new()
            .with_refresh_interval(Duration::from_millis(250))
            .with_auto_refresh(false);
        assert_eq!(config.refresh_interval_ms(), 250);
        assert!(!config.auto_refresh);
    }

    #[test]
    fn test_zero_interval_rejected() {
        let config = MirrorConfig::new().with_refresh_interval(Duration::ZERO);
        assert!(config.validate().is_err());
    }
}
