//! Constants for the cfgmirror service
//!
//! Defaults for the host process. Environment variables override them; see
//! [`crate::config`] and [`crate::telemetry`].

// ============================================================================
// DATABASE
// ============================================================================

/// Default PostgreSQL host
pub const DEFAULT_DB_HOST: &str = "localhost";

/// Default PostgreSQL port
pub const DEFAULT_DB_PORT: u16 = 5432;

/// Default database name
pub const DEFAULT_DB_NAME: &str = "complaints";

/// Default database user
pub const DEFAULT_DB_USER: &str = "postgres";

/// Default maximum pool size
pub const DEFAULT_DB_POOL_SIZE: usize = 8;

/// Default connection timeout in seconds
pub const DEFAULT_DB_TIMEOUT_SECS: u64 = 30;

// ============================================================================
// LOGGING
// ============================================================================

/// Default log filter when `CFGMIRROR_LOG` is unset
pub const DEFAULT_LOG_FILTER: &str = "info";

/// Service name attached to the startup log line
pub const SERVICE_NAME: &str = "cfgmirror";

// ============================================================================
// WRITE BOUNDARY
// ============================================================================

/// Maximum number of entries accepted by a single bulk update
pub const MAX_BULK_ITEMS: usize = 500;
