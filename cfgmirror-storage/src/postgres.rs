//! PostgreSQL configuration store backed by a deadpool-postgres pool.
//!
//! The default test run covers the paths that never reach a server: key
//! validation and the mapping of connection failures to
//! [`StorageError::Unavailable`]. Column-to-field row mapping needs a live
//! database and runs under the `db-tests` feature.

use async_trait::async_trait;
use cfgmirror_core::{
    sort_records, ComplaintTypeRecord, ConfigQuery, ConfigRecord, MirrorError, MirrorResult,
    NewConfig, StorageError, UpsertOutcome,
};
use deadpool_postgres::{Object, Pool};
use tokio_postgres::Row;

use crate::store::{ComplaintTypeSource, ConfigStore};

/// Tables used by [`PgConfigStore`].
pub const SCHEMA_SQL: &str = r#"
CREATE TABLE IF NOT EXISTS system_config (
    key         TEXT PRIMARY KEY,
    value       TEXT NOT NULL,
    type        TEXT,
    description TEXT,
    is_active   BOOLEAN NOT NULL DEFAULT TRUE,
    updated_at  TIMESTAMPTZ NOT NULL DEFAULT now()
);

CREATE INDEX IF NOT EXISTS system_config_active_idx ON system_config (is_active);

CREATE TABLE IF NOT EXISTS complaint_types (
    id          UUID PRIMARY KEY,
    code        TEXT NOT NULL UNIQUE,
    name        TEXT NOT NULL,
    description TEXT,
    is_active   BOOLEAN NOT NULL DEFAULT TRUE
);
"#;

const FIND_ACTIVE_SQL: &str = "SELECT key, value, type, description, is_active, updated_at \
     FROM system_config WHERE is_active ORDER BY key";

const FIND_ALL_SQL: &str = "SELECT key, value, type, description, is_active, updated_at \
     FROM system_config ORDER BY key";

const FIND_BY_KEY_SQL: &str = "SELECT key, value, type, description, is_active, updated_at \
     FROM system_config WHERE key = $1";

const SOFT_DELETE_SQL: &str = "UPDATE system_config SET is_active = FALSE, updated_at = now() \
     WHERE key = $1 \
     RETURNING key, value, type, description, is_active, updated_at";

const UPSERT_SQL: &str = "INSERT INTO system_config (key, value, type, description, is_active, updated_at) \
     VALUES ($1, $2, $3, $4, TRUE, now()) \
     ON CONFLICT (key) DO UPDATE SET \
         value = EXCLUDED.value, \
         type = COALESCE(EXCLUDED.type, system_config.type), \
         description = COALESCE(EXCLUDED.description, system_config.description), \
         is_active = TRUE, \
         updated_at = now() \
     RETURNING key, value, type, description, is_active, updated_at, (xmax = 0) AS inserted";

/// Configuration store over the `system_config` and `complaint_types` tables.
#[derive(Clone)]
pub struct PgConfigStore {
    pool: Pool,
}

impl std::fmt::Debug for PgConfigStore {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let status = self.pool.status();
        f.debug_struct("PgConfigStore")
            .field("pool_size", &status.size)
            .field("pool_available", &status.available)
            .finish()
    }
}

impl PgConfigStore {
    pub fn new(pool: Pool) -> Self {
        Self { pool }
    }

    /// Current pool size, for observability.
    pub fn pool_size(&self) -> usize {
        self.pool.status().size
    }

    /// Create the tables if they do not exist.
    pub async fn ensure_schema(&self) -> MirrorResult<()> {
        let conn = self.get_conn().await?;
        conn.batch_execute(SCHEMA_SQL).await.map_err(query_failed)?;
        tracing::debug!("Configuration schema ensured");
        Ok(())
    }

    async fn get_conn(&self) -> MirrorResult<Object> {
        self.pool
            .get()
            .await
            .map_err(|e| MirrorError::unavailable(format!("connection pool: {e}")))
    }

    async fn upsert_row(&self, config: &NewConfig) -> MirrorResult<(ConfigRecord, bool)> {
        if config.key.trim().is_empty() {
            return Err(StorageError::WriteFailed {
                key: config.key.clone(),
                reason: "key must not be empty".to_string(),
            }
            .into());
        }

        let conn = self.get_conn().await?;
        let row = conn
            .query_one(
                UPSERT_SQL,
                &[
                    &config.key,
                    &config.value,
                    &config.config_type,
                    &config.description,
                ],
            )
            .await
            .map_err(|e| write_failed(&config.key, e))?;

        let record = record_from_row(&row)?;
        let inserted: bool = row.try_get("inserted").map_err(query_failed)?;
        Ok((record, inserted))
    }
}

fn query_failed(e: tokio_postgres::Error) -> MirrorError {
    StorageError::QueryFailed {
        reason: e.to_string(),
    }
    .into()
}

fn write_failed(key: &str, e: tokio_postgres::Error) -> MirrorError {
    StorageError::WriteFailed {
        key: key.to_string(),
        reason: e.to_string(),
    }
    .into()
}

fn record_from_row(row: &Row) -> MirrorResult<ConfigRecord> {
    Ok(ConfigRecord {
        key: row.try_get("key").map_err(query_failed)?,
        value: row.try_get("value").map_err(query_failed)?,
        config_type: row.try_get("type").map_err(query_failed)?,
        description: row.try_get("description").map_err(query_failed)?,
        is_active: row.try_get("is_active").map_err(query_failed)?,
        updated_at: row.try_get("updated_at").map_err(query_failed)?,
    })
}

fn complaint_type_from_row(row: &Row) -> MirrorResult<ComplaintTypeRecord> {
    Ok(ComplaintTypeRecord {
        id: row.try_get("id").map_err(query_failed)?,
        code: row.try_get("code").map_err(query_failed)?,
        name: row.try_get("name").map_err(query_failed)?,
        description: row.try_get("description").map_err(query_failed)?,
        is_active: row.try_get("is_active").map_err(query_failed)?,
    })
}

#[async_trait]
impl ConfigStore for PgConfigStore {
    async fn probe(&self) -> MirrorResult<()> {
        let conn = self.get_conn().await?;
        conn.query_one("SELECT 1", &[])
            .await
            .map_err(|e| MirrorError::unavailable(e.to_string()))?;
        Ok(())
    }

    async fn find_active(&self) -> MirrorResult<Vec<ConfigRecord>> {
        let conn = self.get_conn().await?;
        let rows = conn
            .query(FIND_ACTIVE_SQL, &[])
            .await
            .map_err(query_failed)?;
        rows.iter().map(record_from_row).collect()
    }

    async fn find_by_key(&self, key: &str) -> MirrorResult<Option<ConfigRecord>> {
        let conn = self.get_conn().await?;
        let row = conn
            .query_opt(FIND_BY_KEY_SQL, &[&key])
            .await
            .map_err(query_failed)?;
        row.as_ref().map(record_from_row).transpose()
    }

    async fn upsert(&self, config: &NewConfig) -> MirrorResult<ConfigRecord> {
        let (record, _) = self.upsert_row(config).await?;
        Ok(record)
    }

    async fn soft_delete(&self, key: &str) -> MirrorResult<ConfigRecord> {
        let conn = self.get_conn().await?;
        let row = conn
            .query_opt(SOFT_DELETE_SQL, &[&key])
            .await
            .map_err(|e| write_failed(key, e))?;

        match row {
            Some(row) => record_from_row(&row),
            None => Err(MirrorError::not_found(key)),
        }
    }

    async fn find_many(&self, query: &ConfigQuery) -> MirrorResult<Vec<ConfigRecord>> {
        // Where clauses arrive as JSON; evaluate them in process so every
        // backend answers forwarded queries the same way.
        let conn = self.get_conn().await?;
        let rows = conn
            .query(FIND_ALL_SQL, &[])
            .await
            .map_err(query_failed)?;

        let mut records = Vec::with_capacity(rows.len());
        for row in &rows {
            let record = record_from_row(row)?;
            if query.matches_record(&record) {
                records.push(record);
            }
        }
        sort_records(&mut records, &query.order_by);
        Ok(records)
    }

    async fn bulk_upsert(&self, configs: &[NewConfig]) -> Vec<MirrorResult<UpsertOutcome>> {
        let mut outcomes = Vec::with_capacity(configs.len());
        for config in configs {
            let outcome = self
                .upsert_row(config)
                .await
                .map(|(record, created)| UpsertOutcome { record, created });
            outcomes.push(outcome);
        }
        outcomes
    }
}

#[async_trait]
impl ComplaintTypeSource for PgConfigStore {
    async fn find_active_complaint_types(&self) -> MirrorResult<Vec<ComplaintTypeRecord>> {
        let conn = self.get_conn().await?;
        let rows = conn
            .query(
                "SELECT id, code, name, description, is_active FROM complaint_types \
                 WHERE is_active ORDER BY name",
                &[],
            )
            .await
            .map_err(query_failed)?;
        rows.iter().map(complaint_type_from_row).collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_schema_declares_both_tables() {
        assert!(SCHEMA_SQL.contains("CREATE TABLE IF NOT EXISTS system_config"));
        assert!(SCHEMA_SQL.contains("CREATE TABLE IF NOT EXISTS complaint_types"));
        assert!(SCHEMA_SQL.contains("key         TEXT PRIMARY KEY"));
    }

    #[test]
    fn test_upsert_reactivates_and_reports_insert() {
        assert!(UPSERT_SQL.contains("ON CONFLICT (key) DO UPDATE"));
        assert!(UPSERT_SQL.contains("is_active = TRUE"));
        assert!(UPSERT_SQL.contains("(xmax = 0) AS inserted"));
    }

    /// A store whose pool points at a port nothing listens on.
    fn unreachable_store() -> PgConfigStore {
        use deadpool_postgres::{Config, Runtime};
        use tokio_postgres::NoTls;

        let mut cfg = Config::new();
        cfg.host = Some("127.0.0.1".to_string());
        cfg.port = Some(1);
        cfg.dbname = Some("cfgmirror".to_string());
        cfg.user = Some("postgres".to_string());
        cfg.connect_timeout = Some(std::time::Duration::from_secs(2));
        let pool = cfg.create_pool(Some(Runtime::Tokio1), NoTls).unwrap();
        PgConfigStore::new(pool)
    }

    #[tokio::test]
    async fn test_unreachable_server_is_unavailable() {
        let store = unreachable_store();
        assert!(store.probe().await.unwrap_err().is_unavailable());
        assert!(store.find_active().await.unwrap_err().is_unavailable());
        assert!(store
            .find_active_complaint_types()
            .await
            .unwrap_err()
            .is_unavailable());
    }

    #[tokio::test]
    async fn test_bulk_upsert_reports_each_entry() {
        let store = unreachable_store();
        let outcomes = store
            .bulk_upsert(&[NewConfig::new("  ", "x"), NewConfig::new("APP_NAME", "Portal")])
            .await;
        assert_eq!(outcomes.len(), 2);
        assert!(matches!(
            outcomes[0],
            Err(MirrorError::Storage(StorageError::WriteFailed { .. }))
        ));
        assert!(outcomes[1].as_ref().unwrap_err().is_unavailable());
    }
}
