//! RefreshScheduler: single-flight full reloads and the periodic reload task.
//!
//! A reload reads every active row from the store, builds a replacement map
//! off to the side and swaps it in under one write lock, so readers never see
//! a half-populated map. Changes applied by the write path while the reload
//! is building are journaled and replayed onto the replacement before the
//! swap.

use std::collections::HashMap;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Weak;
use std::time::Duration;

use cfgmirror_core::{CacheEntry, MirrorResult};
use chrono::Utc;
use serde::{Deserialize, Serialize};
use tokio::sync::watch;
use tokio::task::JoinHandle;
use tokio::time::{interval, MissedTickBehavior};

use super::mirror::{ConfigMirror, MirrorInner};
use crate::store::ConfigStore;

// ============================================================================
// OUTCOMES AND METRICS
// ============================================================================

/// Result of a reload request.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum RefreshOutcome {
    /// The map was replaced and now holds `count` entries.
    Refreshed { count: usize },
    /// Another reload was already in flight; this request was dropped.
    Skipped,
    /// The mirror was destroyed while the reload ran; its result was thrown away.
    Discarded,
}

/// Reload counters since the mirror was created.
#[derive(Debug, Default)]
pub struct RefreshMetrics {
    pub completed: AtomicU64,
    pub failed: AtomicU64,
    /// Triggers dropped by the single-flight guard.
    pub skipped: AtomicU64,
    pub discarded: AtomicU64,
}

impl RefreshMetrics {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn snapshot(&self) -> RefreshMetricsSnapshot {
        RefreshMetricsSnapshot {
            completed: self.completed.load(Ordering::Relaxed),
            failed: self.failed.load(Ordering::Relaxed),
            skipped: self.skipped.load(Ordering::Relaxed),
            discarded: self.discarded.load(Ordering::Relaxed),
        }
    }
}

/// Point-in-time copy of [`RefreshMetrics`].
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct RefreshMetricsSnapshot {
    pub completed: u64,
    pub failed: u64,
    pub skipped: u64,
    pub discarded: u64,
}

/// Handle on the running periodic reload task.
pub(crate) struct RefreshTask {
    handle: JoinHandle<()>,
    shutdown_tx: watch::Sender<bool>,
}

/// Clears the replay journal when a reload ends, however it ends.
struct JournalGuard<'a, S> {
    inner: &'a MirrorInner<S>,
}

impl<'a, S> JournalGuard<'a, S> {
    fn open(inner: &'a MirrorInner<S>) -> Self {
        inner.write_state().journal = Some(Vec::new());
        Self { inner }
    }
}

impl<S> Drop for JournalGuard<'_, S> {
    fn drop(&mut self) {
        self.inner.write_state().journal = None;
    }
}

// ============================================================================
// RELOADS
// ============================================================================

impl<S: ConfigStore + 'static> ConfigMirror<S> {
    /// Reload the whole map from the store.
    ///
    /// Returns [`RefreshOutcome::Skipped`] without touching the store when a
    /// reload is already in flight. Store errors propagate and leave the
    /// current map untouched.
    pub async fn refresh_cache(&self) -> MirrorResult<RefreshOutcome> {
        let Ok(gate) = self.inner.reload_gate.try_lock() else {
            self.inner.metrics.skipped.fetch_add(1, Ordering::Relaxed);
            tracing::debug!("Reload already in flight, skipping");
            return Ok(RefreshOutcome::Skipped);
        };
        let outcome = self.reload().await;
        drop(gate);
        outcome
    }

    /// Out-of-band reload, subject to the same single-flight rule.
    pub async fn force_refresh(&self) -> MirrorResult<RefreshOutcome> {
        tracing::debug!("Forced reload requested");
        self.refresh_cache().await
    }

    /// Reload, waiting for any in-flight reload to finish first.
    pub(crate) async fn reload_exclusive(&self) -> MirrorResult<RefreshOutcome> {
        let gate = self.inner.reload_gate.lock().await;
        let outcome = self.reload().await;
        drop(gate);
        outcome
    }

    /// Caller must hold the reload gate.
    async fn reload(&self) -> MirrorResult<RefreshOutcome> {
        let inner = &self.inner;
        let epoch = inner.epoch.load(Ordering::SeqCst);
        let _journal = JournalGuard::open(inner);

        let records = match inner.store.find_active().await {
            Ok(records) => records,
            Err(e) => {
                inner.metrics.failed.fetch_add(1, Ordering::Relaxed);
                return Err(e);
            }
        };

        let mut replacement: HashMap<String, CacheEntry> = records
            .iter()
            .filter(|record| record.is_active)
            .map(|record| (record.key.clone(), record.to_entry()))
            .collect();

        let (count, replayed) = {
            let mut state = inner.write_state();
            if inner.epoch.load(Ordering::SeqCst) != epoch {
                inner.metrics.discarded.fetch_add(1, Ordering::Relaxed);
                tracing::debug!("Mirror destroyed during reload, discarding result");
                return Ok(RefreshOutcome::Discarded);
            }

            let journal = state.journal.take().unwrap_or_default();
            let replayed = journal.len();
            for change in journal {
                change.apply_to(&mut replacement);
            }

            let count = replacement.len();
            state.entries = replacement;
            state.last_updated = Some(Utc::now());
            (count, replayed)
        };

        inner.metrics.completed.fetch_add(1, Ordering::Relaxed);
        tracing::debug!(
            config_count = count,
            replayed_writes = replayed,
            "Configuration mirror reloaded"
        );
        Ok(RefreshOutcome::Refreshed { count })
    }

    /// One scheduled tick. Failures are logged and the stale map is kept.
    async fn scheduled_refresh(&self) {
        match self.refresh_cache().await {
            Ok(RefreshOutcome::Refreshed { count }) => {
                tracing::debug!(config_count = count, "Scheduled reload completed");
            }
            Ok(RefreshOutcome::Skipped) => {
                tracing::debug!("Scheduled reload skipped, previous reload still running");
            }
            Ok(RefreshOutcome::Discarded) => {}
            Err(e) => {
                tracing::error!(
                    error = %e,
                    config_count = self.len(),
                    "Scheduled reload failed, keeping previous configuration"
                );
            }
        }
    }

    /// Start the periodic reload task. No-op if it is already running.
    ///
    /// Must be called from within a Tokio runtime with a non-zero
    /// `refresh_interval`; otherwise a warning is logged and no task is
    /// started.
    pub fn start_auto_refresh(&self) {
        let mut slot = self.inner.task_slot();
        if slot.as_ref().is_some_and(|task| !task.handle.is_finished()) {
            return;
        }

        if let Err(e) = self.inner.config.validate() {
            tracing::warn!(error = %e, "Scheduled reloads not started");
            return;
        }

        let runtime = match tokio::runtime::Handle::try_current() {
            Ok(runtime) => runtime,
            Err(e) => {
                tracing::warn!(error = %e, "No Tokio runtime, scheduled reloads not started");
                return;
            }
        };

        let (shutdown_tx, shutdown_rx) = watch::channel(false);
        let period = self.inner.config.refresh_interval;
        let handle = runtime.spawn(refresh_loop(
            std::sync::Arc::downgrade(&self.inner),
            period,
            shutdown_rx,
        ));
        *slot = Some(RefreshTask {
            handle,
            shutdown_tx,
        });
    }
}

impl<S> ConfigMirror<S> {
    /// Stop the periodic reload task. No-op if it is not running.
    pub fn stop_auto_refresh(&self) {
        let task = self.inner.task_slot().take();
        if let Some(task) = task {
            let _ = task.shutdown_tx.send(true);
            tracing::debug!("Scheduled reloads stopped");
        }
    }

    /// Whether the periodic reload task is running.
    pub fn is_auto_refreshing(&self) -> bool {
        self.inner
            .task_slot()
            .as_ref()
            .is_some_and(|task| !task.handle.is_finished())
    }
}

/// Periodic reload loop. Ends on shutdown or once every mirror handle is dropped.
async fn refresh_loop<S: ConfigStore + 'static>(
    inner: Weak<MirrorInner<S>>,
    period: Duration,
    mut shutdown_rx: watch::Receiver<bool>,
) {
    let mut ticker = interval(period);
    ticker.set_missed_tick_behavior(MissedTickBehavior::Skip);
    // The first tick completes immediately; the initial load already ran.
    ticker.tick().await;

    tracing::info!(
        refresh_interval_ms = period.as_millis() as u64,
        "Scheduled configuration reloads started"
    );

    loop {
        tokio::select! {
            changed = shutdown_rx.changed() => {
                if changed.is_err() || *shutdown_rx.borrow() {
                    break;
                }
            }

            _ = ticker.tick() => {
                let Some(inner) = inner.upgrade() else {
                    break;
                };
                ConfigMirror { inner }.scheduled_refresh().await;
            }
        }
    }

    tracing::info!("Scheduled configuration reloads stopped");
}

// ============================================================================
// TESTS
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use crate::mock::MockConfigStore;
    use cfgmirror_core::{ConfigRecord, MirrorConfig, NewConfig};
    use std::sync::Arc;

    fn mirror_over(
        records: Vec<ConfigRecord>,
        config: MirrorConfig,
    ) -> (Arc<MockConfigStore>, ConfigMirror<MockConfigStore>) {
        let store = Arc::new(MockConfigStore::with_records(records));
        (store.clone(), ConfigMirror::new(store, config))
    }

    fn manual() -> MirrorConfig {
        MirrorConfig::default().with_auto_refresh(false)
    }

    #[tokio::test]
    async fn test_refresh_picks_up_store_changes() {
        let (store, mirror) = mirror_over(vec![ConfigRecord::new("APP_NAME", "One")], manual());
        mirror.initialize().await.unwrap();

        store.insert_records([ConfigRecord::new("APP_NAME", "Two"), ConfigRecord::new("NEW", "x")]);
        assert_eq!(mirror.get("APP_NAME", "-"), "One");

        let outcome = mirror.refresh_cache().await.unwrap();
        assert_eq!(outcome, RefreshOutcome::Refreshed { count: 2 });
        assert_eq!(mirror.get("APP_NAME", "-"), "Two");
    }

    #[tokio::test]
    async fn test_refresh_drops_deactivated_rows() {
        let (store, mirror) = mirror_over(vec![ConfigRecord::new("GONE", "1")], manual());
        mirror.initialize().await.unwrap();

        store.insert_records([ConfigRecord::new("GONE", "1").inactive()]);
        mirror.refresh_cache().await.unwrap();
        assert!(!mirror.has("GONE"));
    }

    #[tokio::test]
    async fn test_failed_refresh_keeps_stale_map() {
        let (store, mirror) = mirror_over(vec![ConfigRecord::new("APP_NAME", "One")], manual());
        mirror.initialize().await.unwrap();
        let before = mirror.last_updated();

        store.fail_reads(true);
        assert!(mirror.refresh_cache().await.is_err());
        assert_eq!(mirror.get("APP_NAME", "-"), "One");
        assert_eq!(mirror.last_updated(), before);
        assert_eq!(mirror.stats().refresh.failed, 1);
    }

    #[tokio::test(start_paused = true)]
    async fn test_single_flight_skips_overlapping_reload() {
        let (store, mirror) = mirror_over(vec![ConfigRecord::new("A", "1")], manual());
        store.set_latency(Duration::from_millis(100));

        let first = {
            let mirror = mirror.clone();
            tokio::spawn(async move { mirror.refresh_cache().await })
        };
        tokio::task::yield_now().await;

        let second = mirror.force_refresh().await.unwrap();
        assert_eq!(second, RefreshOutcome::Skipped);

        let first = first.await.unwrap().unwrap();
        assert_eq!(first, RefreshOutcome::Refreshed { count: 1 });
        assert_eq!(store.find_active_calls(), 1);
        assert_eq!(mirror.stats().refresh.skipped, 1);
    }

    #[tokio::test(start_paused = true)]
    async fn test_write_during_reload_survives_swap() {
        let (store, mirror) = mirror_over(vec![ConfigRecord::new("APP_NAME", "Old")], manual());
        mirror.initialize().await.unwrap();
        store.set_latency(Duration::from_millis(100));

        let reload = {
            let mirror = mirror.clone();
            tokio::spawn(async move { mirror.refresh_cache().await })
        };
        tokio::task::yield_now().await;

        store.set_latency(Duration::ZERO);
        mirror.set(&NewConfig::new("APP_NAME", "New")).await.unwrap();
        reload.await.unwrap().unwrap();

        assert_eq!(mirror.get("APP_NAME", "-"), "New");
    }

    #[tokio::test(start_paused = true)]
    async fn test_delete_during_reload_survives_swap() {
        let (store, mirror) = mirror_over(vec![ConfigRecord::new("TEST_KEY", "1")], manual());
        mirror.initialize().await.unwrap();
        store.set_latency(Duration::from_millis(100));

        let reload = {
            let mirror = mirror.clone();
            tokio::spawn(async move { mirror.refresh_cache().await })
        };
        tokio::task::yield_now().await;

        store.set_latency(Duration::ZERO);
        mirror.delete("TEST_KEY").await.unwrap();
        reload.await.unwrap().unwrap();

        assert!(!mirror.has("TEST_KEY"));
    }

    #[tokio::test(start_paused = true)]
    async fn test_reload_finishing_after_destroy_is_discarded() {
        let (store, mirror) = mirror_over(vec![ConfigRecord::new("A", "1")], manual());
        store.set_latency(Duration::from_millis(100));

        let reload = {
            let mirror = mirror.clone();
            tokio::spawn(async move { mirror.refresh_cache().await })
        };
        tokio::task::yield_now().await;
        mirror.destroy();

        let outcome = reload.await.unwrap().unwrap();
        assert_eq!(outcome, RefreshOutcome::Discarded);
        assert_eq!(mirror.stats().config_count, 0);
    }

    #[tokio::test(start_paused = true)]
    async fn test_scheduler_reloads_on_interval() {
        let config = MirrorConfig::default().with_refresh_interval(Duration::from_secs(60));
        let (store, mirror) = mirror_over(vec![ConfigRecord::new("APP_NAME", "One")], config);
        mirror.initialize().await.unwrap();
        assert!(mirror.is_auto_refreshing());
        assert_eq!(store.find_active_calls(), 1);

        store.insert_records([ConfigRecord::new("APP_NAME", "Two")]);
        tokio::time::sleep(Duration::from_secs(61)).await;

        assert_eq!(mirror.get("APP_NAME", "-"), "Two");
        assert_eq!(store.find_active_calls(), 2);
        mirror.destroy();
    }

    #[tokio::test(start_paused = true)]
    async fn test_scheduler_survives_store_outage() {
        let config = MirrorConfig::default().with_refresh_interval(Duration::from_secs(60));
        let (store, mirror) = mirror_over(vec![ConfigRecord::new("APP_NAME", "One")], config);
        mirror.initialize().await.unwrap();

        store.fail_reads(true);
        tokio::time::sleep(Duration::from_secs(61)).await;
        assert_eq!(mirror.get("APP_NAME", "-"), "One");
        assert_eq!(mirror.stats().refresh.failed, 1);

        store.fail_reads(false);
        store.insert_records([ConfigRecord::new("APP_NAME", "Two")]);
        tokio::time::sleep(Duration::from_secs(60)).await;
        assert_eq!(mirror.get("APP_NAME", "-"), "Two");
        assert!(mirror.is_auto_refreshing());
        mirror.destroy();
    }

    #[tokio::test(start_paused = true)]
    async fn test_stop_auto_refresh_halts_reloads() {
        let config = MirrorConfig::default().with_refresh_interval(Duration::from_secs(60));
        let (store, mirror) = mirror_over(vec![], config);
        mirror.initialize().await.unwrap();

        mirror.stop_auto_refresh();
        assert!(!mirror.is_auto_refreshing());
        tokio::time::sleep(Duration::from_secs(180)).await;
        assert_eq!(store.find_active_calls(), 1);
    }
}
