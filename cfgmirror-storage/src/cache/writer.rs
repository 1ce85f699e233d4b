//! WriteCoordinator: persist to the store first, then update the map.
//!
//! A completed write is visible to the next read without waiting for a
//! reload. A failed write leaves the map untouched.

use cfgmirror_core::{BulkUpdateError, BulkUpdateReport, ConfigRecord, MirrorResult, NewConfig};

use super::mirror::{ConfigMirror, MapChange};
use super::refresh::RefreshOutcome;
use crate::store::ConfigStore;

impl<S: ConfigStore + 'static> ConfigMirror<S> {
    /// Upsert one key and mirror the stored row immediately.
    pub async fn set(&self, config: &NewConfig) -> MirrorResult<ConfigRecord> {
        let record = self.inner.store.upsert(config).await?;
        self.apply_change(MapChange::from_record(&record));
        tracing::info!(key = %record.key, "Configuration value set");
        Ok(record)
    }

    /// Soft-delete one key and drop it from the map.
    ///
    /// Deleting a key the store does not know is a not-found error.
    pub async fn delete(&self, key: &str) -> MirrorResult<ConfigRecord> {
        let record = self.inner.store.soft_delete(key).await?;
        self.apply_change(MapChange::Remove(record.key.clone()));
        tracing::info!(key = %key, "Configuration value deleted");
        Ok(record)
    }

    /// Best-effort batch upsert.
    ///
    /// Every entry is attempted independently; failures are reported per key
    /// and do not abort the rest. Successful entries are mirrored right away,
    /// then one reload runs for the whole batch. A failing reload is logged
    /// and does not affect the report.
    pub async fn bulk_update(&self, configs: &[NewConfig]) -> BulkUpdateReport {
        let outcomes = self.inner.store.bulk_upsert(configs).await;
        let mut report = BulkUpdateReport::default();

        for (config, outcome) in configs.iter().zip(outcomes) {
            match outcome {
                Ok(outcome) => {
                    self.apply_change(MapChange::from_record(&outcome.record));
                    if outcome.created {
                        report.created.push(outcome.record.key);
                    } else {
                        report.updated.push(outcome.record.key);
                    }
                }
                Err(e) => {
                    tracing::warn!(key = %config.key, error = %e, "Bulk update entry failed");
                    report.errors.push(BulkUpdateError {
                        key: config.key.clone(),
                        error: e.to_string(),
                    });
                }
            }
        }

        tracing::info!(
            updated = report.updated.len(),
            created = report.created.len(),
            failed = report.errors.len(),
            "Bulk configuration update applied"
        );

        match self.force_refresh().await {
            Ok(RefreshOutcome::Refreshed { .. }) | Ok(RefreshOutcome::Discarded) => {}
            Ok(RefreshOutcome::Skipped) => {
                tracing::debug!("Post-bulk reload skipped, in-flight reload will replay the batch");
            }
            Err(e) => {
                tracing::error!(error = %e, "Reload after bulk update failed");
            }
        }

        report
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::mock::MockConfigStore;
    use cfgmirror_core::MirrorConfig;
    use std::sync::Arc;

    async fn initialized(
        records: Vec<ConfigRecord>,
    ) -> (Arc<MockConfigStore>, ConfigMirror<MockConfigStore>) {
        let store = Arc::new(MockConfigStore::with_records(records));
        let mirror = ConfigMirror::new(
            store.clone(),
            MirrorConfig::default().with_auto_refresh(false),
        );
        mirror.initialize().await.unwrap();
        (store, mirror)
    }

    #[tokio::test]
    async fn test_set_is_visible_immediately() {
        let (store, mirror) = initialized(vec![ConfigRecord::new("APP_NAME", "Old")]).await;

        mirror.set(&NewConfig::new("APP_NAME", "X")).await.unwrap();
        assert_eq!(mirror.get("APP_NAME", "-"), "X");
        // No reload was needed.
        assert_eq!(store.find_active_calls(), 1);
    }

    #[tokio::test]
    async fn test_set_new_key_with_metadata() {
        let (_, mirror) = initialized(vec![]).await;
        mirror
            .set(
                &NewConfig::new("MAX_FILE_SIZE", "10485760")
                    .with_type("number")
                    .with_description("Upload limit"),
            )
            .await
            .unwrap();

        let entry = mirror.get_config("MAX_FILE_SIZE").unwrap();
        assert_eq!(entry.config_type.as_deref(), Some("number"));
        assert_eq!(entry.description.as_deref(), Some("Upload limit"));
    }

    #[tokio::test]
    async fn test_failed_set_leaves_map_unchanged() {
        let (store, mirror) = initialized(vec![ConfigRecord::new("APP_NAME", "Old")]).await;
        store.fail_writes(true);

        assert!(mirror.set(&NewConfig::new("APP_NAME", "X")).await.is_err());
        assert_eq!(mirror.get("APP_NAME", "-"), "Old");
    }

    #[tokio::test]
    async fn test_delete_removes_from_map_but_not_store() {
        let (store, mirror) = initialized(vec![
            ConfigRecord::new("TEST_KEY", "1"),
            ConfigRecord::new("KEEP", "2"),
        ])
        .await;

        let deleted = mirror.delete("TEST_KEY").await.unwrap();
        assert!(!deleted.is_active);
        assert!(!mirror.has("TEST_KEY"));
        assert!(!mirror.get_all().contains_key("TEST_KEY"));
        assert!(mirror.has("KEEP"));

        let raw = store.raw_record("TEST_KEY").unwrap();
        assert!(!raw.is_active);
    }

    #[tokio::test]
    async fn test_delete_absent_key_is_not_found() {
        let (_, mirror) = initialized(vec![]).await;
        let err = mirror.delete("MISSING").await.unwrap_err();
        assert!(err.is_not_found());
        assert!(!err.is_unavailable());
    }

    #[tokio::test]
    async fn test_failed_delete_keeps_entry() {
        let (store, mirror) = initialized(vec![ConfigRecord::new("TEST_KEY", "1")]).await;
        store.fail_writes(true);
        assert!(mirror.delete("TEST_KEY").await.is_err());
        assert!(mirror.has("TEST_KEY"));
    }

    #[tokio::test]
    async fn test_set_after_delete_reactivates() {
        let (_, mirror) = initialized(vec![ConfigRecord::new("TEST_KEY", "1")]).await;
        mirror.delete("TEST_KEY").await.unwrap();
        mirror.set(&NewConfig::new("TEST_KEY", "2")).await.unwrap();
        assert_eq!(mirror.get("TEST_KEY", "-"), "2");
    }

    #[tokio::test]
    async fn test_bulk_partial_failure() {
        let (store, mirror) = initialized(vec![]).await;

        let report = mirror
            .bulk_update(&[NewConfig::new("A", "1"), NewConfig::new("", "oops")])
            .await;

        assert_eq!(report.created, vec!["A".to_string()]);
        assert!(report.updated.is_empty());
        assert_eq!(report.errors.len(), 1);
        assert_eq!(report.errors[0].key, "");
        assert_eq!(mirror.get("A", "-"), "1");
        // One reload for the whole batch.
        assert_eq!(store.find_active_calls(), 2);
    }

    #[tokio::test]
    async fn test_bulk_reports_updated_and_created() {
        let (_, mirror) = initialized(vec![ConfigRecord::new("A", "0")]).await;
        let report = mirror
            .bulk_update(&[NewConfig::new("A", "1"), NewConfig::new("B", "2")])
            .await;

        assert_eq!(report.updated, vec!["A".to_string()]);
        assert_eq!(report.created, vec!["B".to_string()]);
        assert_eq!(report.applied(), 2);
        assert_eq!(mirror.get("A", "-"), "1");
        assert_eq!(mirror.get("B", "-"), "2");
    }

    #[tokio::test]
    async fn test_bulk_survives_failed_reload() {
        let (store, mirror) = initialized(vec![]).await;
        store.fail_writes_for("B");

        let report = mirror
            .bulk_update(&[NewConfig::new("A", "1"), NewConfig::new("B", "2")])
            .await;
        assert_eq!(report.applied(), 1);
        assert_eq!(report.errors[0].key, "B");

        store.fail_full_reads(true);
        let report = mirror.bulk_update(&[NewConfig::new("C", "3")]).await;
        assert_eq!(report.created, vec!["C".to_string()]);
        assert!(report.errors.is_empty());
        assert_eq!(mirror.get("C", "-"), "3");
        assert_eq!(mirror.stats().refresh.failed, 1);
        assert_eq!(mirror.get("A", "-"), "1");
    }
}
