//! Service Configuration Module
//!
//! Database pool settings plus the aggregate [`ServiceConfig`] the binary
//! boots from. Everything is loaded from environment variables with
//! defaults suitable for local development.

use std::time::Duration;

use cfgmirror_core::MirrorConfig;
use deadpool_postgres::{Config, ManagerConfig, Pool, RecyclingMethod, Runtime};
use tokio_postgres::NoTls;

use crate::constants::{
    DEFAULT_DB_HOST, DEFAULT_DB_NAME, DEFAULT_DB_POOL_SIZE, DEFAULT_DB_PORT,
    DEFAULT_DB_TIMEOUT_SECS, DEFAULT_DB_USER,
};
use crate::error::{ApiError, ApiResult};
use crate::telemetry::TelemetryConfig;

// ============================================================================
// CONNECTION POOL CONFIGURATION
// ============================================================================

/// Database connection pool configuration.
#[derive(Debug, Clone)]
pub struct DbConfig {
    /// PostgreSQL host
    pub host: String,
    /// PostgreSQL port
    pub port: u16,
    /// Database name
    pub dbname: String,
    /// Database user
    pub user: String,
    /// Database password
    pub password: String,
    /// Maximum pool size
    pub max_size: usize,
    /// Connection timeout
    pub timeout: Duration,
}

impl Default for DbConfig {
    fn default() -> Self {
        Self {
            host: DEFAULT_DB_HOST.to_string(),
            port: DEFAULT_DB_PORT,
            dbname: DEFAULT_DB_NAME.to_string(),
            user: DEFAULT_DB_USER.to_string(),
            password: String::new(),
            max_size: DEFAULT_DB_POOL_SIZE,
            timeout: Duration::from_secs(DEFAULT_DB_TIMEOUT_SECS),
        }
    }
}

impl DbConfig {
    /// Create a new database configuration from environment variables.
    ///
    /// # Environment Variables
    /// - `CFGMIRROR_DB_HOST`, `CFGMIRROR_DB_PORT`, `CFGMIRROR_DB_NAME`
    /// - `CFGMIRROR_DB_USER`, `CFGMIRROR_DB_PASSWORD`
    /// - `CFGMIRROR_DB_POOL_SIZE`, `CFGMIRROR_DB_TIMEOUT` (seconds)
    pub fn from_env() -> Self {
        Self {
            host: std::env::var("CFGMIRROR_DB_HOST").unwrap_or_else(|_| DEFAULT_DB_HOST.to_string()),
            port: std::env::var("CFGMIRROR_DB_PORT")
                .ok()
                .and_then(|s| s.parse().ok())
                .unwrap_or(DEFAULT_DB_PORT),
            dbname: std::env::var("CFGMIRROR_DB_NAME").unwrap_or_else(|_| DEFAULT_DB_NAME.to_string()),
            user: std::env::var("CFGMIRROR_DB_USER").unwrap_or_else(|_| DEFAULT_DB_USER.to_string()),
            password: std::env::var("CFGMIRROR_DB_PASSWORD").unwrap_or_default(),
            max_size: std::env::var("CFGMIRROR_DB_POOL_SIZE")
                .ok()
                .and_then(|s| s.parse().ok())
                .unwrap_or(DEFAULT_DB_POOL_SIZE),
            timeout: Duration::from_secs(
                std::env::var("CFGMIRROR_DB_TIMEOUT")
                    .ok()
                    .and_then(|s| s.parse().ok())
                    .unwrap_or(DEFAULT_DB_TIMEOUT_SECS),
            ),
        }
    }

    /// Create a connection pool from this configuration.
    ///
    /// No connection is opened here; the first checkout does that.
    pub fn create_pool(&self) -> ApiResult<Pool> {
        let mut cfg = Config::new();
        cfg.host = Some(self.host.clone());
        cfg.port = Some(self.port);
        cfg.dbname = Some(self.dbname.clone());
        cfg.user = Some(self.user.clone());
        cfg.password = Some(self.password.clone());
        cfg.connect_timeout = Some(self.timeout);

        cfg.manager = Some(ManagerConfig {
            recycling_method: RecyclingMethod::Fast,
        });
        cfg.pool = Some(deadpool_postgres::PoolConfig::new(self.max_size));

        let pool = cfg
            .create_pool(Some(Runtime::Tokio1), NoTls)
            .map_err(|e| ApiError::database_error(format!("Failed to create pool: {}", e)))?;

        Ok(pool)
    }
}

// ============================================================================
// SERVICE CONFIGURATION
// ============================================================================

/// Everything the `cfgmirror` binary needs to boot.
#[derive(Debug, Clone)]
pub struct ServiceConfig {
    pub db: DbConfig,
    pub mirror: MirrorConfig,
    pub telemetry: TelemetryConfig,
}

impl ServiceConfig {
    /// Load every section from the environment.
    pub fn from_env() -> Self {
        Self {
            db: DbConfig::from_env(),
            mirror: MirrorConfig::from_env(),
            telemetry: TelemetryConfig::default(),
        }
    }

    /// Validate the sections that can be checked without I/O.
    pub fn validate(&self) -> ApiResult<()> {
        self.mirror.validate()?;
        if self.db.max_size == 0 {
            return Err(ApiError::new(
                crate::error::ErrorCode::MisconfiguredService,
                "CFGMIRROR_DB_POOL_SIZE must be greater than 0",
            ));
        }
        Ok(())
    }
}
