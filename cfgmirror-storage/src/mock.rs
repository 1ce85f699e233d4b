//! In-memory configuration store for tests and local development.
//!
//! Mirrors the semantics of the PostgreSQL store (unique keys, soft delete,
//! reactivating upserts) and lets tests inject failures and latency per
//! operation family.

use std::collections::{HashMap, HashSet};
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::{Arc, RwLock};
use std::time::Duration;

use async_trait::async_trait;
use cfgmirror_core::{
    sort_records, ComplaintTypeRecord, ConfigQuery, ConfigRecord, MirrorError, MirrorResult,
    NewConfig, StorageError,
};
use chrono::Utc;

use crate::store::{ComplaintTypeSource, ConfigStore};

/// Mock configuration store for testing.
#[derive(Debug, Clone, Default)]
pub struct MockConfigStore {
    records: Arc<RwLock<HashMap<String, ConfigRecord>>>,
    complaint_types: Arc<RwLock<Vec<ComplaintTypeRecord>>>,
    faults: Arc<Faults>,
}

#[derive(Debug, Default)]
struct Faults {
    probe: AtomicBool,
    reads: AtomicBool,
    full_reads: AtomicBool,
    writes: AtomicBool,
    complaint_types: AtomicBool,
    failing_keys: RwLock<HashSet<String>>,
    latency_ms: AtomicU64,
    find_active_calls: AtomicU64,
}

impl MockConfigStore {
    /// Create a new, empty mock store.
    pub fn new() -> Self {
        Self::default()
    }

    /// Create a mock store holding the given records.
    pub fn with_records(records: impl IntoIterator<Item = ConfigRecord>) -> Self {
        let store = Self::new();
        store.insert_records(records);
        store
    }

    /// Insert or overwrite records directly, bypassing the store contract.
    pub fn insert_records(&self, records: impl IntoIterator<Item = ConfigRecord>) {
        if let Ok(mut map) = self.records.write() {
            for record in records {
                map.insert(record.key.clone(), record);
            }
        }
    }

    /// Replace the complaint type lookup rows.
    pub fn set_complaint_types(&self, rows: Vec<ComplaintTypeRecord>) {
        if let Ok(mut types) = self.complaint_types.write() {
            *types = rows;
        }
    }

    /// Raw access to a row, including inactive ones.
    pub fn raw_record(&self, key: &str) -> Option<ConfigRecord> {
        self.records.read().ok()?.get(key).cloned()
    }

    /// Number of rows, active or not.
    pub fn record_count(&self) -> usize {
        self.records.read().map(|map| map.len()).unwrap_or(0)
    }

    /// Number of active rows.
    pub fn active_count(&self) -> usize {
        self.records
            .read()
            .map(|map| map.values().filter(|r| r.is_active).count())
            .unwrap_or(0)
    }

    /// How many times `find_active` has been called.
    pub fn find_active_calls(&self) -> u64 {
        self.faults.find_active_calls.load(Ordering::SeqCst)
    }

    /// Make `probe` fail.
    pub fn fail_probe(&self, fail: bool) {
        self.faults.probe.store(fail, Ordering::SeqCst);
    }

    /// Make `find_active`, `find_by_key` and `find_many` fail.
    pub fn fail_reads(&self, fail: bool) {
        self.faults.reads.store(fail, Ordering::SeqCst);
    }

    /// Make only `find_active` fail, leaving single-key reads working.
    pub fn fail_full_reads(&self, fail: bool) {
        self.faults.full_reads.store(fail, Ordering::SeqCst);
    }

    /// Make every write fail.
    pub fn fail_writes(&self, fail: bool) {
        self.faults.writes.store(fail, Ordering::SeqCst);
    }

    /// Make writes to one key fail.
    pub fn fail_writes_for(&self, key: impl Into<String>) {
        if let Ok(mut keys) = self.faults.failing_keys.write() {
            keys.insert(key.into());
        }
    }

    /// Make the complaint type query fail.
    pub fn fail_complaint_types(&self, fail: bool) {
        self.faults.complaint_types.store(fail, Ordering::SeqCst);
    }

    /// Simulate everything at once being unreachable.
    pub fn go_offline(&self) {
        self.fail_probe(true);
        self.fail_reads(true);
        self.fail_writes(true);
        self.fail_complaint_types(true);
    }

    /// Clear every injected failure.
    pub fn go_online(&self) {
        self.fail_probe(false);
        self.fail_reads(false);
        self.fail_full_reads(false);
        self.fail_writes(false);
        self.fail_complaint_types(false);
        if let Ok(mut keys) = self.faults.failing_keys.write() {
            keys.clear();
        }
    }

    /// Delay every store round trip.
    pub fn set_latency(&self, latency: Duration) {
        self.faults
            .latency_ms
            .store(latency.as_millis() as u64, Ordering::SeqCst);
    }

    async fn round_trip(&self) {
        let millis = self.faults.latency_ms.load(Ordering::SeqCst);
        if millis > 0 {
            tokio::time::sleep(Duration::from_millis(millis)).await;
        }
    }

    fn check_reads(&self) -> MirrorResult<()> {
        if self.faults.reads.load(Ordering::SeqCst) {
            return Err(StorageError::QueryFailed {
                reason: "simulated read failure".to_string(),
            }
            .into());
        }
        Ok(())
    }

    fn check_write(&self, key: &str) -> MirrorResult<()> {
        let key_fails = self
            .faults
            .failing_keys
            .read()
            .map(|keys| keys.contains(key))
            .unwrap_or(false);
        if self.faults.writes.load(Ordering::SeqCst) || key_fails {
            return Err(StorageError::WriteFailed {
                key: key.to_string(),
                reason: "simulated write failure".to_string(),
            }
            .into());
        }
        Ok(())
    }

    fn read_map(
        &self,
    ) -> MirrorResult<std::sync::RwLockReadGuard<'_, HashMap<String, ConfigRecord>>> {
        self.records
            .read()
            .map_err(|_| MirrorError::from(StorageError::LockPoisoned))
    }

    fn write_map(
        &self,
    ) -> MirrorResult<std::sync::RwLockWriteGuard<'_, HashMap<String, ConfigRecord>>> {
        self.records
            .write()
            .map_err(|_| MirrorError::from(StorageError::LockPoisoned))
    }
}

#[async_trait]
impl ConfigStore for MockConfigStore {
    async fn probe(&self) -> MirrorResult<()> {
        self.round_trip().await;
        if self.faults.probe.load(Ordering::SeqCst) {
            return Err(MirrorError::unavailable("simulated probe failure"));
        }
        Ok(())
    }

    async fn find_active(&self) -> MirrorResult<Vec<ConfigRecord>> {
        self.faults.find_active_calls.fetch_add(1, Ordering::SeqCst);
        self.check_reads()?;
        if self.faults.full_reads.load(Ordering::SeqCst) {
            return Err(MirrorError::unavailable("simulated full read failure"));
        }
        // Snapshot at query time; the latency models the trip back.
        let rows: Vec<ConfigRecord> = self
            .read_map()?
            .values()
            .filter(|r| r.is_active)
            .cloned()
            .collect();
        self.round_trip().await;
        Ok(rows)
    }

    async fn find_by_key(&self, key: &str) -> MirrorResult<Option<ConfigRecord>> {
        self.round_trip().await;
        self.check_reads()?;
        Ok(self.read_map()?.get(key).cloned())
    }

    async fn upsert(&self, config: &NewConfig) -> MirrorResult<ConfigRecord> {
        self.round_trip().await;
        if config.key.trim().is_empty() {
            return Err(StorageError::WriteFailed {
                key: config.key.clone(),
                reason: "key must not be empty".to_string(),
            }
            .into());
        }
        self.check_write(&config.key)?;

        let mut map = self.write_map()?;
        let record = match map.get(&config.key) {
            Some(existing) => ConfigRecord {
                key: config.key.clone(),
                value: config.value.clone(),
                config_type: config.config_type.clone().or_else(|| existing.config_type.clone()),
                description: config
                    .description
                    .clone()
                    .or_else(|| existing.description.clone()),
                is_active: true,
                updated_at: Utc::now(),
            },
            None => ConfigRecord {
                key: config.key.clone(),
                value: config.value.clone(),
                config_type: config.config_type.clone(),
                description: config.description.clone(),
                is_active: true,
                updated_at: Utc::now(),
            },
        };
        map.insert(record.key.clone(), record.clone());
        Ok(record)
    }

    async fn soft_delete(&self, key: &str) -> MirrorResult<ConfigRecord> {
        self.round_trip().await;
        self.check_write(key)?;

        let mut map = self.write_map()?;
        let record = map.get_mut(key).ok_or_else(|| MirrorError::not_found(key))?;
        record.is_active = false;
        record.updated_at = Utc::now();
        Ok(record.clone())
    }

    async fn find_many(&self, query: &ConfigQuery) -> MirrorResult<Vec<ConfigRecord>> {
        self.round_trip().await;
        self.check_reads()?;
        let mut rows: Vec<ConfigRecord> = self
            .read_map()?
            .values()
            .filter(|record| query.matches_record(record))
            .cloned()
            .collect();
        rows.sort_by(|a, b| a.key.cmp(&b.key));
        sort_records(&mut rows, &query.order_by);
        Ok(rows)
    }
}

#[async_trait]
impl ComplaintTypeSource for MockConfigStore {
    async fn find_active_complaint_types(&self) -> MirrorResult<Vec<ComplaintTypeRecord>> {
        self.round_trip().await;
        if self.faults.complaint_types.load(Ordering::SeqCst) {
            return Err(StorageError::QueryFailed {
                reason: "simulated complaint type failure".to_string(),
            }
            .into());
        }
        let rows = self
            .complaint_types
            .read()
            .map_err(|_| MirrorError::from(StorageError::LockPoisoned))?;
        Ok(rows.iter().filter(|row| row.is_active).cloned().collect())
    }
}

// ============================================================================
// TESTS
// ============================================================================
