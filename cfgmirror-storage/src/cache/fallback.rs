//! FallbackProvider: tiered degradation for the public settings read path.
//!
//! Each request walks the tiers from scratch and never consults the mirror,
//! so it keeps answering before the mirror is initialized and while the
//! store is down. There are no retries here.
//!
//! ```text
//! PROBE --fail--> DEFAULTS
//!   |
//!   ok
//!   v
//! QUERY --config rows fail--> DEFAULTS_FALLBACK
//!   |
//!   ok (complaint types may be empty if their query failed)
//!   v
//! LIVE
//! ```

use std::sync::Arc;
use std::time::Instant;

use cfgmirror_core::{HealthCheck, PublicEntry, PublicSettings, SettingsMeta, SettingsSource};

use super::defaults::{default_complaint_types, default_config_entries};
use crate::store::{ComplaintTypeSource, ConfigStore};

/// Serves public settings from the store, degrading to the default dataset.
#[derive(Debug)]
pub struct FallbackProvider<S> {
    store: Arc<S>,
}

impl<S> Clone for FallbackProvider<S> {
    fn clone(&self) -> Self {
        Self {
            store: Arc::clone(&self.store),
        }
    }
}

impl<S> FallbackProvider<S> {
    pub fn new(store: Arc<S>) -> Self {
        Self { store }
    }

    /// The default dataset tagged with `source`.
    pub fn defaults(source: SettingsSource, error: Option<String>) -> PublicSettings {
        PublicSettings {
            config: default_config_entries(),
            complaint_types: default_complaint_types(),
            meta: SettingsMeta {
                source,
                database_available: false,
                error,
            },
        }
    }
}

impl<S: ConfigStore + ComplaintTypeSource> FallbackProvider<S> {
    /// Resolve the public settings. Never fails; the tier is in `meta`.
    ///
    /// The `defaults_fallback` tier carries the underlying error message.
    /// Callers serving anonymous users should drop it with
    /// [`PublicSettings::redacted`].
    pub async fn public_settings(&self) -> PublicSettings {
        if let Err(e) = self.store.probe().await {
            tracing::warn!(error = %e, "Config store unreachable, serving default settings");
            return Self::defaults(SettingsSource::Defaults, None);
        }

        let (records, complaint_types) = tokio::join!(
            self.store.find_active(),
            self.store.find_active_complaint_types()
        );

        let records = match records {
            Ok(records) => records,
            Err(e) => {
                tracing::warn!(error = %e, "Config query failed, serving default settings");
                return Self::defaults(SettingsSource::DefaultsFallback, Some(e.to_string()));
            }
        };

        let complaint_types = match complaint_types {
            Ok(rows) => rows
                .iter()
                .filter(|row| row.is_active)
                .map(PublicEntry::from)
                .collect(),
            Err(e) => {
                tracing::warn!(error = %e, "Complaint type query failed, serving them empty");
                Vec::new()
            }
        };

        let mut config: Vec<PublicEntry> = records
            .iter()
            .filter(|record| record.is_active)
            .map(PublicEntry::from)
            .collect();
        config.sort_by(|a, b| a.key.cmp(&b.key));

        PublicSettings {
            config,
            complaint_types,
            meta: SettingsMeta {
                source: SettingsSource::Database,
                database_available: true,
                error: None,
            },
        }
    }

    /// Probe the store and report its latency.
    pub async fn probe_health(&self) -> HealthCheck {
        let started = Instant::now();
        let result = self.store.probe().await;
        let elapsed_ms = started.elapsed().as_millis() as u64;
        HealthCheck::store(result.map_err(|e| e.to_string()), elapsed_ms)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::mock::MockConfigStore;
    use cfgmirror_core::{
        Component, ComplaintTypeRecord, ConfigRecord, HealthStatus, NewConfig,
        COMPLAINT_TYPE_ENTRY_TYPE,
    };
    use uuid::Uuid;

    fn complaint_type(code: &str, name: &str) -> ComplaintTypeRecord {
        ComplaintTypeRecord {
            id: Uuid::now_v7(),
            code: code.to_string(),
            name: name.to_string(),
            description: None,
            is_active: true,
        }
    }

    fn provider() -> (Arc<MockConfigStore>, FallbackProvider<MockConfigStore>) {
        let store = Arc::new(MockConfigStore::with_records([
            ConfigRecord::new("APP_NAME", "Live Portal").with_type("string"),
            ConfigRecord::new("OLD", "x").inactive(),
        ]));
        store.set_complaint_types(vec![
            complaint_type("WATER_SUPPLY", "Water"),
            ComplaintTypeRecord {
                is_active: false,
                ..complaint_type("RETIRED", "Retired")
            },
        ]);
        (store.clone(), FallbackProvider::new(store))
    }

    #[tokio::test]
    async fn test_probe_failure_serves_defaults_without_error() {
        let (store, provider) = provider();
        store.fail_probe(true);

        let settings = provider.public_settings().await;
        assert_eq!(settings.meta.source, SettingsSource::Defaults);
        assert!(!settings.meta.database_available);
        assert!(settings.meta.error.is_none());
        assert_eq!(settings.config, default_config_entries());
        assert_eq!(settings.complaint_types, default_complaint_types());

        let json = serde_json::to_value(&settings).unwrap();
        assert!(json["meta"].get("error").is_none());
    }

    #[tokio::test]
    async fn test_query_failure_serves_defaults_with_error() {
        let (store, provider) = provider();
        store.fail_reads(true);

        let settings = provider.public_settings().await;
        assert_eq!(settings.meta.source, SettingsSource::DefaultsFallback);
        assert!(!settings.meta.database_available);
        assert!(settings.meta.error.as_deref().unwrap().contains("simulated"));
        assert_eq!(settings.config, default_config_entries());
    }

    #[tokio::test]
    async fn test_secondary_failure_keeps_primary_data() {
        let (store, provider) = provider();
        store.fail_complaint_types(true);

        let settings = provider.public_settings().await;
        assert_eq!(settings.meta.source, SettingsSource::Database);
        assert!(settings.meta.database_available);
        assert_eq!(settings.config_value("APP_NAME"), Some("Live Portal"));
        assert!(settings.complaint_types.is_empty());
    }

    #[tokio::test]
    async fn test_full_success_serves_live_values() {
        let (store, provider) = provider();
        store.upsert(&NewConfig::new("APP_NAME", "Just Written")).await.unwrap();

        let settings = provider.public_settings().await;
        assert_eq!(settings.meta.source, SettingsSource::Database);
        assert!(settings.meta.database_available);
        assert!(settings.meta.error.is_none());
        assert_eq!(settings.config_value("APP_NAME"), Some("Just Written"));
        assert!(settings.config_value("OLD").is_none());

        assert_eq!(settings.complaint_types.len(), 1);
        let water = &settings.complaint_types[0];
        assert_eq!(water.key, "WATER_SUPPLY");
        assert_eq!(water.entry_type.as_deref(), Some(COMPLAINT_TYPE_ENTRY_TYPE));
    }

    #[tokio::test]
    async fn test_redacted_drops_error() {
        let (store, provider) = provider();
        store.fail_reads(true);
        let settings = provider.public_settings().await.redacted();
        assert_eq!(settings.meta.source, SettingsSource::DefaultsFallback);
        assert!(settings.meta.error.is_none());
    }

    #[tokio::test]
    async fn test_each_request_reevaluates_tiers() {
        let (store, provider) = provider();
        store.go_offline();
        assert_eq!(provider.public_settings().await.meta.source, SettingsSource::Defaults);
        store.go_online();
        assert_eq!(provider.public_settings().await.meta.source, SettingsSource::Database);
    }

    #[tokio::test]
    async fn test_probe_health() {
        let (store, provider) = provider();
        assert!(provider.probe_health().await.is_healthy());

        store.fail_probe(true);
        let health = provider.probe_health().await;
        assert_eq!(health.status, HealthStatus::Unhealthy);
        assert_eq!(health.component(), Component::ConfigStore);
        assert!(health.probe_ms().is_some());
        assert!(health.message.is_some());
    }
}
