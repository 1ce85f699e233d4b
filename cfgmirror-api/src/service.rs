//! SettingsService: the host-facing facade over one configuration mirror.
//!
//! The service owns exactly one [`ConfigMirror`] and one
//! [`FallbackProvider`] over the same store. It validates values at the
//! write boundary, translates mirror errors into [`ApiError`]s, and decides
//! how much of the public settings metadata each audience may see.

use std::sync::Arc;

use cfgmirror_core::{
    validate_value, BulkUpdateError, BulkUpdateReport, CacheEntry, ConfigRecord, HealthCheck,
    MirrorConfig, NewConfig, PublicSettings,
};
use cfgmirror_storage::{
    AppConfig, ComplaintTypeSource, ConfigMirror, ConfigStore, EmailConfig, FallbackProvider,
    MirrorStats, RefreshOutcome,
};
use serde_json::Value;

use crate::constants::MAX_BULK_ITEMS;
use crate::error::{ApiError, ApiResult};

/// Who is asking for the public settings.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Audience {
    /// Unauthenticated callers; degradation detail is withheld.
    Anonymous,
    /// Operators; the full metadata including the failure reason.
    Admin,
}

/// Facade over one mirror and its fallback provider.
pub struct SettingsService<S> {
    mirror: ConfigMirror<S>,
    fallback: FallbackProvider<S>,
}

impl<S> Clone for SettingsService<S> {
    fn clone(&self) -> Self {
        Self {
            mirror: self.mirror.clone(),
            fallback: self.fallback.clone(),
        }
    }
}

impl<S> std::fmt::Debug for SettingsService<S> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SettingsService")
            .field("mirror", &self.mirror)
            .finish_non_exhaustive()
    }
}

impl<S> SettingsService<S> {
    pub fn new(store: Arc<S>, config: MirrorConfig) -> Self {
        Self {
            mirror: ConfigMirror::new(Arc::clone(&store), config),
            fallback: FallbackProvider::new(store),
        }
    }

    /// The underlying mirror.
    pub fn mirror(&self) -> &ConfigMirror<S> {
        &self.mirror
    }

    pub fn stats(&self) -> MirrorStats {
        self.mirror.stats()
    }

    /// Stop the scheduler and clear the mirror.
    pub fn destroy(&self) {
        self.mirror.destroy();
    }

    /// Cached entry for `key`, or `ConfigNotFound`.
    pub fn get(&self, key: &str) -> ApiResult<CacheEntry> {
        self.mirror
            .get_config(key)
            .ok_or_else(|| ApiError::config_not_found(key))
    }

    /// Cached value for `key`, or `default`.
    pub fn value_or(&self, key: &str, default: &str) -> String {
        self.mirror.get(key, default)
    }

    pub fn app_config(&self) -> AppConfig {
        self.mirror.app_config()
    }

    pub fn email_config(&self) -> EmailConfig {
        self.mirror.email_config()
    }
}

impl<S: ConfigStore + 'static> SettingsService<S> {
    /// Initial load. A failure here is fatal at boot.
    pub async fn initialize(&self) -> ApiResult<()> {
        self.mirror.initialize().await?;
        Ok(())
    }

    /// Validate and persist one value, then mirror it.
    pub async fn set(&self, config: NewConfig) -> ApiResult<ConfigRecord> {
        validate_value(&config.key, &config.value, config.config_type.as_deref())?;
        let record = self.mirror.set(&config).await?;
        Ok(record)
    }

    /// Validate every entry, persist the valid ones, and report per key.
    ///
    /// Entries that fail validation are reported alongside store failures
    /// and never reach the store.
    pub async fn bulk_update(&self, configs: Vec<NewConfig>) -> ApiResult<BulkUpdateReport> {
        if configs.len() > MAX_BULK_ITEMS {
            return Err(ApiError::too_many_items(configs.len(), MAX_BULK_ITEMS));
        }

        let mut rejected = Vec::new();
        let valid: Vec<NewConfig> = configs
            .into_iter()
            .filter(|config| {
                match validate_value(&config.key, &config.value, config.config_type.as_deref()) {
                    Ok(()) => true,
                    Err(e) => {
                        rejected.push(BulkUpdateError {
                            key: config.key.clone(),
                            error: e.to_string(),
                        });
                        false
                    }
                }
            })
            .collect();

        if !rejected.is_empty() {
            tracing::warn!(rejected = rejected.len(), "Bulk update entries failed validation");
        }

        let mut report = if valid.is_empty() {
            BulkUpdateReport::default()
        } else {
            self.mirror.bulk_update(&valid).await
        };
        rejected.append(&mut report.errors);
        report.errors = rejected;
        Ok(report)
    }

    /// Soft-delete `key`. A missing key is `ConfigNotFound`.
    pub async fn delete(&self, key: &str) -> ApiResult<ConfigRecord> {
        let record = self.mirror.delete(key).await?;
        Ok(record)
    }

    /// Legacy relational query.
    pub async fn find_many(&self, query: &Value) -> ApiResult<Vec<ConfigRecord>> {
        let records = self.mirror.find_many_json(query).await?;
        Ok(records)
    }

    /// Reload now. Returns [`RefreshOutcome::Skipped`] without touching the
    /// store when another reload is already in flight.
    pub async fn refresh(&self) -> ApiResult<RefreshOutcome> {
        let outcome = self.mirror.force_refresh().await?;
        Ok(outcome)
    }
}

impl<S: ConfigStore + ComplaintTypeSource> SettingsService<S> {
    /// Public settings for `audience`. Never fails; the tier is in `meta`.
    pub async fn public_settings(&self, audience: Audience) -> PublicSettings {
        let settings = self.fallback.public_settings().await;
        match audience {
            Audience::Anonymous => settings.redacted(),
            Audience::Admin => settings,
        }
    }

    /// Health of the mirror and of the store probe.
    pub async fn health(&self) -> Vec<HealthCheck> {
        vec![self.mirror.health(), self.fallback.probe_health().await]
    }
}
