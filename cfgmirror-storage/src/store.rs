//! Async store traits for the persisted configuration table.
//!
//! [`ConfigStore`] is the authoritative source the mirror reloads from and
//! writes through. [`ComplaintTypeSource`] is the secondary lookup table read
//! by the public settings path.

use async_trait::async_trait;
use cfgmirror_core::{
    ComplaintTypeRecord, ConfigQuery, ConfigRecord, MirrorError, MirrorResult, NewConfig,
    UpsertOutcome,
};

/// Async store trait for the configuration table.
///
/// Implementations must keep `key` unique and implement soft delete by
/// flipping `is_active`; inactive rows stay in the table.
#[async_trait]
pub trait ConfigStore: Send + Sync {
    /// Trivial round trip used to decide whether the store is reachable.
    async fn probe(&self) -> MirrorResult<()>;

    /// All rows with `is_active = true`.
    async fn find_active(&self) -> MirrorResult<Vec<ConfigRecord>>;

    /// A single row by key, active or not.
    async fn find_by_key(&self, key: &str) -> MirrorResult<Option<ConfigRecord>>;

    /// Insert or update keyed on `key`. Updating an inactive row reactivates it.
    async fn upsert(&self, config: &NewConfig) -> MirrorResult<ConfigRecord>;

    /// Mark a row inactive. Absent keys yield `StorageError::NotFound`.
    async fn soft_delete(&self, key: &str) -> MirrorResult<ConfigRecord>;

    /// Evaluate a legacy query directly against the table.
    async fn find_many(&self, query: &ConfigQuery) -> MirrorResult<Vec<ConfigRecord>>;

    /// Apply each entry as an independent upsert, reporting created vs updated.
    ///
    /// A failure on one entry never aborts the others.
    async fn bulk_upsert(&self, configs: &[NewConfig]) -> Vec<MirrorResult<UpsertOutcome>> {
        let mut outcomes = Vec::with_capacity(configs.len());
        for config in configs {
            let outcome = async {
                let existing = self.find_by_key(&config.key).await?;
                let record = self.upsert(config).await?;
                Ok::<_, MirrorError>(UpsertOutcome {
                    record,
                    created: existing.is_none(),
                })
            }
            .await;
            outcomes.push(outcome);
        }
        outcomes
    }
}

/// Async source for the complaint type lookup table.
#[async_trait]
pub trait ComplaintTypeSource: Send + Sync {
    /// All complaint types with `is_active = true`.
    async fn find_active_complaint_types(&self) -> MirrorResult<Vec<ComplaintTypeRecord>>;
}
