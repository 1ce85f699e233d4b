//! cfgmirror Test Utilities
//!
//! Centralized test infrastructure for the cfgmirror workspace:
//! - Proptest generators for configuration records and payloads
//! - Fixtures for seeded stores and initialized mirrors
//! - Custom assertions for tier and error checks

// Re-export the mock store from its source crate
pub use cfgmirror_storage::MockConfigStore;

// Re-export core types for convenience
pub use cfgmirror_core::{
    ComplaintTypeRecord, ConfigRecord, MirrorConfig, MirrorError, MirrorResult, NewConfig,
    PublicSettings, SettingsSource, StorageError, ValueKind,
};

// ============================================================================
// PROPTEST GENERATORS
// ============================================================================

pub mod generators {
    //! Proptest strategies for configuration data.

    use super::*;
    use proptest::prelude::*;

    /// Upper-snake-case configuration key.
    pub fn arb_key() -> impl Strategy<Value = String> {
        "[A-Z]{1,8}(_[A-Z]{1,8}){0,3}"
    }

    /// Key whose name implies a value kind.
    pub fn arb_key_of_kind(kind: ValueKind) -> BoxedStrategy<String> {
        let suffix = match kind {
            ValueKind::Number => prop_oneof![
                Just("_MINUTES"),
                Just("_HOURS"),
                Just("_SIZE"),
                Just("_LENGTH"),
                Just("_LIMIT"),
                Just("_DAYS")
            ]
            .boxed(),
            ValueKind::Boolean => prop_oneof![Just("_ENABLED"), Just("_MODE")].boxed(),
            ValueKind::Json => prop_oneof![Just("_SETTINGS"), Just("_BOUNDARY")].boxed(),
            ValueKind::String => Just("_NAME").boxed(),
        };
        // Vowel-free stems cannot contain another kind's marker.
        ("[BCDFGKPTVXZ]{1,8}", suffix)
            .prop_map(|(stem, suffix)| format!("{stem}{suffix}"))
            .boxed()
    }

    /// A value that satisfies `kind`.
    pub fn arb_value_of_kind(kind: ValueKind) -> BoxedStrategy<String> {
        match kind {
            ValueKind::Number => (0u64..1_000_000).prop_map(|n| n.to_string()).boxed(),
            ValueKind::Boolean => any::<bool>().prop_map(|b| b.to_string()).boxed(),
            ValueKind::Json => prop::collection::btree_map("[a-z]{1,6}", any::<bool>(), 0..4)
                .prop_map(|map| serde_json::json!(map).to_string())
                .boxed(),
            ValueKind::String => "[ -~]{0,24}".boxed(),
        }
    }

    pub fn arb_value_kind() -> impl Strategy<Value = ValueKind> {
        prop_oneof![
            Just(ValueKind::String),
            Just(ValueKind::Number),
            Just(ValueKind::Boolean),
            Just(ValueKind::Json),
        ]
    }

    /// A `(key, value)` pair whose value is valid for the key's name.
    pub fn arb_valid_pair() -> impl Strategy<Value = (String, String)> {
        arb_value_kind().prop_flat_map(|kind| (arb_key_of_kind(kind), arb_value_of_kind(kind)))
    }

    /// An upsert payload with optional type and description.
    pub fn arb_new_config() -> impl Strategy<Value = NewConfig> {
        (
            arb_key(),
            "[ -~]{0,16}",
            prop::option::of("[a-z]{1,8}"),
            prop::option::of("[ -~]{0,24}"),
        )
            .prop_map(|(key, value, config_type, description)| NewConfig {
                key,
                value,
                config_type,
                description,
            })
    }

    /// A persisted record, active or not.
    pub fn arb_record() -> impl Strategy<Value = ConfigRecord> {
        (arb_new_config(), any::<bool>()).prop_map(|(config, is_active)| ConfigRecord {
            key: config.key,
            value: config.value,
            config_type: config.config_type,
            description: config.description,
            is_active,
            updated_at: chrono::Utc::now(),
        })
    }
}

// ============================================================================
// TEST FIXTURES
// ============================================================================

pub mod fixtures {
    //! Pre-built fixtures for common testing scenarios.

    use super::*;
    use cfgmirror_storage::ConfigMirror;
    use std::sync::Arc;
    use uuid::Uuid;

    /// Keys used by the pattern-query fixtures.
    pub const COMPLAINT_TYPE_A: &str = "COMPLAINT_TYPE_A";
    pub const COMPLAINT_TYPE_B: &str = "COMPLAINT_TYPE_B";
    pub const OTHER_KEY: &str = "OTHER_KEY";

    /// A small, realistic set of active records plus one soft-deleted row.
    pub fn sample_records() -> Vec<ConfigRecord> {
        vec![
            ConfigRecord::new("APP_NAME", "Riverside Civic Desk")
                .with_type("string")
                .with_description("Application display name"),
            ConfigRecord::new("MAX_FILE_SIZE", "5242880").with_type("number"),
            ConfigRecord::new("MAINTENANCE_MODE", "false").with_type("boolean"),
            ConfigRecord::new(COMPLAINT_TYPE_A, "Water").with_type("complaint"),
            ConfigRecord::new(COMPLAINT_TYPE_B, "Roads").with_type("complaint"),
            ConfigRecord::new(OTHER_KEY, "other"),
            ConfigRecord::new("RETIRED_SETTING", "gone").inactive(),
        ]
    }

    /// Active complaint types plus one retired one.
    pub fn sample_complaint_types() -> Vec<ComplaintTypeRecord> {
        [("WATER_SUPPLY", "Water Supply", true), ("ROAD_REPAIR", "Road Repair", true), ("LEGACY", "Legacy", false)]
            .into_iter()
            .map(|(code, name, is_active)| ComplaintTypeRecord {
                id: Uuid::now_v7(),
                code: code.to_string(),
                name: name.to_string(),
                description: None,
                is_active,
            })
            .collect()
    }

    /// Mock store holding [`sample_records`] and [`sample_complaint_types`].
    pub fn seeded_store() -> Arc<MockConfigStore> {
        let store = MockConfigStore::with_records(sample_records());
        store.set_complaint_types(sample_complaint_types());
        Arc::new(store)
    }

    /// Mirror configuration without the periodic task.
    pub fn manual_config() -> MirrorConfig {
        MirrorConfig::default().with_auto_refresh(false)
    }

    /// Initialized mirror over `store` without the periodic task.
    pub async fn initialized_mirror(
        store: Arc<MockConfigStore>,
    ) -> MirrorResult<ConfigMirror<MockConfigStore>> {
        let mirror = ConfigMirror::new(store, manual_config());
        mirror.initialize().await?;
        Ok(mirror)
    }
}

// ============================================================================
// CUSTOM ASSERTIONS
// ============================================================================

pub mod assertions {
    //! Assertions for tier and error checks.

    use super::*;

    /// Assert that a public settings response came from `source`, with the
    /// `databaseAvailable` flag that tier implies.
    #[track_caller]
    pub fn assert_tier(settings: &PublicSettings, source: SettingsSource) {
        assert_eq!(settings.meta.source, source, "wrong tier: {:?}", settings.meta);
        assert_eq!(
            settings.meta.database_available,
            source == SettingsSource::Database,
            "databaseAvailable does not match tier: {:?}",
            settings.meta
        );
    }

    /// Assert that a result is a not-found storage error.
    #[track_caller]
    pub fn assert_not_found<T: std::fmt::Debug>(result: &MirrorResult<T>) {
        match result {
            Err(MirrorError::Storage(StorageError::NotFound { .. })) => {}
            other => panic!("Expected NotFound error, got: {:?}", other),
        }
    }

    /// Assert that a result is a validation error.
    #[track_caller]
    pub fn assert_validation_error<T: std::fmt::Debug>(result: &MirrorResult<T>) {
        match result {
            Err(MirrorError::Validation(_)) => {}
            other => panic!("Expected Validation error, got: {:?}", other),
        }
    }

    /// Assert that every entry's value satisfies its declared kind.
    #[track_caller]
    pub fn assert_entries_type_consistent(settings: &PublicSettings) {
        for entry in &settings.config {
            let kind = ValueKind::for_key(&entry.key, entry.entry_type.as_deref());
            assert!(
                kind.accepts(&entry.value),
                "{} = {:?} is not a valid {}",
                entry.key,
                entry.value,
                kind
            );
        }
    }
}

// ============================================================================
// TESTS
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    #[test]
    fn test_sample_records_have_one_inactive() {
        let records = fixtures::sample_records();
        assert_eq!(records.iter().filter(|r| !r.is_active).count(), 1);
    }

    #[tokio::test]
    async fn test_initialized_mirror_fixture() {
        let mirror = fixtures::initialized_mirror(fixtures::seeded_store())
            .await
            .unwrap();
        assert!(mirror.is_initialized());
        assert_eq!(mirror.len(), 6);
        assert!(!mirror.is_auto_refreshing());
    }

    #[test]
    fn test_assert_not_found() {
        let result: MirrorResult<()> = Err(MirrorError::not_found("X"));
        assertions::assert_not_found(&result);
    }

    proptest! {
        #[test]
        fn prop_valid_pairs_validate((key, value) in generators::arb_valid_pair()) {
            prop_assert!(cfgmirror_core::validate_value(&key, &value, None).is_ok());
        }
    }
}
