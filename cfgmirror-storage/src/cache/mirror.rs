//! CacheCore: the in-memory mirror of active configuration rows.
//!
//! The mirror is an explicitly constructed service object. The host process
//! builds one, calls [`ConfigMirror::initialize`] at startup and
//! [`ConfigMirror::destroy`] at shutdown, and hands clones to whatever needs
//! configuration reads. Clones share the same state.

use std::collections::HashMap;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex, MutexGuard, RwLock, RwLockReadGuard, RwLockWriteGuard};

use cfgmirror_core::{
    CacheEntry, ConfigRecord, HealthCheck, MirrorConfig, MirrorResult, MirrorVitals, Timestamp,
};
use chrono::Utc;
use serde::{Deserialize, Serialize};

use super::refresh::{RefreshMetrics, RefreshMetricsSnapshot, RefreshOutcome, RefreshTask};
use crate::store::ConfigStore;

// ============================================================================
// STATE
// ============================================================================

/// A targeted change to the mirrored map.
#[derive(Debug, Clone)]
pub(crate) enum MapChange {
    Upsert(String, CacheEntry),
    Remove(String),
}

impl MapChange {
    /// Mirror a persisted record: active rows are upserted, inactive ones removed.
    pub(crate) fn from_record(record: &ConfigRecord) -> Self {
        if record.is_active {
            MapChange::Upsert(record.key.clone(), record.to_entry())
        } else {
            MapChange::Remove(record.key.clone())
        }
    }

    pub(crate) fn apply_to(self, entries: &mut HashMap<String, CacheEntry>) {
        match self {
            MapChange::Upsert(key, entry) => {
                entries.insert(key, entry);
            }
            MapChange::Remove(key) => {
                entries.remove(&key);
            }
        }
    }
}

pub(crate) struct CacheState {
    pub(crate) entries: HashMap<String, CacheEntry>,
    pub(crate) initialized: bool,
    pub(crate) last_updated: Option<Timestamp>,
    /// Changes applied while a reload is building its replacement map.
    /// `Some` only while a reload is in flight.
    pub(crate) journal: Option<Vec<MapChange>>,
}

impl CacheState {
    fn empty() -> Self {
        Self {
            entries: HashMap::new(),
            initialized: false,
            last_updated: None,
            journal: None,
        }
    }

    /// Apply a change to the live map, recording it for replay if a reload is running.
    pub(crate) fn apply(&mut self, change: MapChange) {
        if let Some(journal) = self.journal.as_mut() {
            journal.push(change.clone());
        }
        change.apply_to(&mut self.entries);
    }
}

pub(crate) struct MirrorInner<S> {
    pub(crate) store: Arc<S>,
    pub(crate) config: MirrorConfig,
    pub(crate) state: RwLock<CacheState>,
    /// Held for the duration of a reload. Only one reload runs at a time.
    pub(crate) reload_gate: tokio::sync::Mutex<()>,
    /// Bumped by `destroy()`; reloads started under an older epoch are discarded.
    pub(crate) epoch: AtomicU64,
    pub(crate) metrics: RefreshMetrics,
    pub(crate) task: Mutex<Option<RefreshTask>>,
}

impl<S> MirrorInner<S> {
    pub(crate) fn read_state(&self) -> RwLockReadGuard<'_, CacheState> {
        self.state.read().unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    pub(crate) fn write_state(&self) -> RwLockWriteGuard<'_, CacheState> {
        self.state.write().unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    pub(crate) fn task_slot(&self) -> MutexGuard<'_, Option<RefreshTask>> {
        self.task.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }
}

// ============================================================================
// MIRROR
// ============================================================================

/// In-memory mirror of the active rows of a [`ConfigStore`].
///
/// Reads are synchronous and never touch the store. Writes go to the store
/// first and then to the map (see the `writer` module). A periodic task
/// reloads the whole map (see the `refresh` module).
pub struct ConfigMirror<S> {
    pub(crate) inner: Arc<MirrorInner<S>>,
}

impl<S> Clone for ConfigMirror<S> {
    fn clone(&self) -> Self {
        Self {
            inner: Arc::clone(&self.inner),
        }
    }
}

impl<S> std::fmt::Debug for ConfigMirror<S> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let state = self.inner.read_state();
        f.debug_struct("ConfigMirror")
            .field("initialized", &state.initialized)
            .field("config_count", &state.entries.len())
            .field("last_updated", &state.last_updated)
            .field("config", &self.inner.config)
            .finish()
    }
}

impl<S> ConfigMirror<S> {
    /// Create an uninitialized mirror over `store`.
    pub fn new(store: Arc<S>, config: MirrorConfig) -> Self {
        Self {
            inner: Arc::new(MirrorInner {
                store,
                config,
                state: RwLock::new(CacheState::empty()),
                reload_gate: tokio::sync::Mutex::new(()),
                epoch: AtomicU64::new(0),
                metrics: RefreshMetrics::new(),
                task: Mutex::new(None),
            }),
        }
    }

    /// Create an uninitialized mirror with the default configuration.
    pub fn with_defaults(store: Arc<S>) -> Self {
        Self::new(store, MirrorConfig::default())
    }

    /// The backing store.
    pub fn store(&self) -> &Arc<S> {
        &self.inner.store
    }

    pub fn config(&self) -> &MirrorConfig {
        &self.inner.config
    }

    pub fn is_initialized(&self) -> bool {
        self.inner.read_state().initialized
    }

    /// Time of the last successful full reload.
    pub fn last_updated(&self) -> Option<Timestamp> {
        self.inner.read_state().last_updated
    }

    /// Number of mirrored entries.
    pub fn len(&self) -> usize {
        self.inner.read_state().entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Observability snapshot. No side effects.
    pub fn stats(&self) -> MirrorStats {
        let (is_initialized, config_count, last_updated) = {
            let state = self.inner.read_state();
            (state.initialized, state.entries.len(), state.last_updated)
        };
        MirrorStats {
            is_initialized,
            config_count,
            last_updated,
            refresh_interval_ms: self.inner.config.refresh_interval_ms(),
            has_auto_refresh: self.is_auto_refreshing(),
            refresh: self.inner.metrics.snapshot(),
        }
    }

    /// Health of the mirror, graded from its current vitals.
    pub fn health(&self) -> HealthCheck {
        let stats = self.stats();
        HealthCheck::mirror(MirrorVitals {
            initialized: stats.is_initialized,
            config_count: stats.config_count,
            last_reload_age_ms: stats
                .last_updated
                .map(|at| (Utc::now() - at).num_milliseconds().max(0) as u64),
            refresh_interval_ms: stats.refresh_interval_ms,
            failed_refreshes: stats.refresh.failed,
        })
    }

    /// Stop the scheduler, clear the map and mark the mirror uninitialized.
    ///
    /// Idempotent. A reload still in flight when this runs is discarded.
    pub fn destroy(&self) {
        self.stop_auto_refresh();

        let had_entries = {
            let mut state = self.inner.write_state();
            self.inner.epoch.fetch_add(1, Ordering::SeqCst);
            let had_entries = !state.entries.is_empty() || state.initialized;
            *state = CacheState::empty();
            had_entries
        };

        if had_entries {
            tracing::info!("Configuration mirror destroyed");
        }
    }

    /// Apply a targeted change to the live map.
    pub(crate) fn apply_change(&self, change: MapChange) {
        self.inner.write_state().apply(change);
    }
}

impl<S: ConfigStore + 'static> ConfigMirror<S> {
    /// Perform the first full load, mark the mirror initialized and start
    /// the scheduled reload task when `auto_refresh` is enabled.
    ///
    /// A failing first load is returned to the caller, which should treat it
    /// as fatal at boot, as is an invalid [`MirrorConfig`]. Calling this on
    /// an initialized mirror is a no-op.
    pub async fn initialize(&self) -> MirrorResult<()> {
        if self.is_initialized() {
            tracing::debug!("Configuration mirror already initialized");
            return Ok(());
        }

        if let Err(e) = self.inner.config.validate() {
            tracing::error!(error = %e, "Invalid mirror configuration");
            return Err(e);
        }

        let outcome = match self.reload_exclusive().await {
            Ok(outcome) => outcome,
            Err(e) => {
                tracing::error!(error = %e, "Initial configuration load failed");
                return Err(e);
            }
        };

        let RefreshOutcome::Refreshed { count } = outcome else {
            tracing::warn!("Configuration mirror destroyed during initialization");
            return Ok(());
        };

        self.inner.write_state().initialized = true;
        tracing::info!(
            config_count = count,
            refresh_interval_ms = self.inner.config.refresh_interval_ms(),
            auto_refresh = self.inner.config.auto_refresh,
            "Configuration mirror initialized"
        );

        if self.inner.config.auto_refresh {
            self.start_auto_refresh();
        }
        Ok(())
    }
}

/// Snapshot returned by [`ConfigMirror::stats`].
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MirrorStats {
    pub is_initialized: bool,
    pub config_count: usize,
    pub last_updated: Option<Timestamp>,
    pub refresh_interval_ms: u64,
    pub has_auto_refresh: bool,
    pub refresh: RefreshMetricsSnapshot,
}

// ============================================================================
// TESTS
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use crate::mock::MockConfigStore;
    use cfgmirror_core::{ConfigRecord, HealthStatus, MirrorError};
    use std::time::Duration;

    fn mirror_over(records: Vec<ConfigRecord>) -> (Arc<MockConfigStore>, ConfigMirror<MockConfigStore>) {
        let store = Arc::new(MockConfigStore::with_records(records));
        let config = MirrorConfig::default().with_auto_refresh(false);
        (store.clone(), ConfigMirror::new(store, config))
    }

    #[tokio::test]
    async fn test_initialize_loads_active_rows() {
        let (_, mirror) = mirror_over(vec![
            ConfigRecord::new("APP_NAME", "Portal"),
            ConfigRecord::new("OLD_KEY", "x").inactive(),
        ]);
        mirror.initialize().await.unwrap();

        let stats = mirror.stats();
        assert!(stats.is_initialized);
        assert_eq!(stats.config_count, 1);
        assert!(stats.last_updated.is_some());
        assert!(!stats.has_auto_refresh);
        assert_eq!(stats.refresh.completed, 1);
    }

    #[tokio::test]
    async fn test_initialize_rejects_zero_interval() {
        let store = Arc::new(MockConfigStore::with_records(vec![ConfigRecord::new(
            "APP_NAME", "Portal",
        )]));
        let config = MirrorConfig::default().with_refresh_interval(Duration::ZERO);
        let mirror = ConfigMirror::new(store.clone(), config);

        let err = mirror.initialize().await.unwrap_err();
        assert!(matches!(err, MirrorError::Config(_)));
        assert!(!mirror.is_initialized());
        assert!(!mirror.is_auto_refreshing());
        assert_eq!(store.find_active_calls(), 0);

        mirror.start_auto_refresh();
        assert!(!mirror.is_auto_refreshing());
    }

    #[tokio::test]
    async fn test_initialize_failure_is_fatal() {
        let (store, mirror) = mirror_over(vec![ConfigRecord::new("APP_NAME", "Portal")]);
        store.go_offline();

        let err = mirror.initialize().await.unwrap_err();
        assert!(err.is_unavailable());
        assert!(!mirror.is_initialized());
        assert_eq!(mirror.stats().refresh.failed, 1);
    }

    #[tokio::test]
    async fn test_initialize_twice_is_noop() {
        let (store, mirror) = mirror_over(vec![ConfigRecord::new("APP_NAME", "Portal")]);
        mirror.initialize().await.unwrap();
        mirror.initialize().await.unwrap();
        assert_eq!(store.find_active_calls(), 1);
    }

    #[tokio::test]
    async fn test_destroy_is_idempotent() {
        let (_, mirror) = mirror_over(vec![ConfigRecord::new("APP_NAME", "Portal")]);
        mirror.initialize().await.unwrap();

        mirror.destroy();
        mirror.destroy();

        let stats = mirror.stats();
        assert!(!stats.is_initialized);
        assert_eq!(stats.config_count, 0);
        assert!(stats.last_updated.is_none());
    }

    #[tokio::test]
    async fn test_destroy_before_initialize() {
        let (_, mirror) = mirror_over(vec![]);
        mirror.destroy();
        assert!(!mirror.is_initialized());
        assert!(mirror.is_empty());
    }

    #[tokio::test]
    async fn test_reinitialize_after_destroy() {
        let (_, mirror) = mirror_over(vec![ConfigRecord::new("APP_NAME", "Portal")]);
        mirror.initialize().await.unwrap();
        mirror.destroy();
        mirror.initialize().await.unwrap();
        assert!(mirror.is_initialized());
        assert_eq!(mirror.len(), 1);
    }

    #[tokio::test]
    async fn test_health_tracks_lifecycle() {
        let (_, mirror) = mirror_over(vec![ConfigRecord::new("APP_NAME", "Portal")]);
        assert_eq!(mirror.health().status, HealthStatus::Unhealthy);

        mirror.initialize().await.unwrap();
        let health = mirror.health();
        assert!(health.is_healthy());
        let vitals = health.vitals().unwrap();
        assert_eq!(vitals.config_count, 1);
        assert_eq!(vitals.failed_refreshes, 0);
        assert!(vitals.last_reload_age_ms.is_some());
    }

    #[test]
    fn test_map_change_from_record() {
        let mut entries = HashMap::new();
        MapChange::from_record(&ConfigRecord::new("A", "1")).apply_to(&mut entries);
        assert!(entries.contains_key("A"));
        MapChange::from_record(&ConfigRecord::new("A", "1").inactive()).apply_to(&mut entries);
        assert!(entries.is_empty());
    }

    #[test]
    fn test_stats_serialize_camel_case() {
        let (_, mirror) = mirror_over(vec![]);
        let json = serde_json::to_value(mirror.stats()).unwrap();
        assert_eq!(json["isInitialized"], false);
        assert_eq!(json["configCount"], 0);
        assert_eq!(json["refreshIntervalMs"], 300_000);
        assert_eq!(json["hasAutoRefresh"], false);
    }
}
