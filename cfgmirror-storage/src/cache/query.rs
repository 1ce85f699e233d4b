//! QueryFacade: reads served from the mirrored map.
//!
//! Every read returns owned copies. Before initialization (or after
//! `destroy()`) reads behave as if the map were empty and return the
//! caller's default instead of failing.

use std::collections::HashMap;

use cfgmirror_core::{
    sort_records, CacheEntry, ConfigFilter, ConfigQuery, ConfigRecord, MirrorResult,
};
use serde::{Deserialize, Serialize};
use serde_json::Value;

use super::defaults::{self, keys};
use super::mirror::ConfigMirror;
use crate::store::ConfigStore;

/// How [`ConfigMirror::get_by_pattern`] compares keys to the pattern.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum MatchType {
    StartsWith,
    EndsWith,
    Includes,
    Exact,
}

impl MatchType {
    pub fn matches(&self, key: &str, pattern: &str) -> bool {
        match self {
            MatchType::StartsWith => key.starts_with(pattern),
            MatchType::EndsWith => key.ends_with(pattern),
            MatchType::Includes => key.contains(pattern),
            MatchType::Exact => key == pattern,
        }
    }
}

/// Application identity and branding.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AppConfig {
    pub app_name: String,
    pub app_version: String,
    pub logo_url: String,
    pub primary_color: String,
    pub tagline: String,
}

/// Outgoing email settings.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct EmailConfig {
    pub from_name: String,
    pub from_address: String,
    pub reply_to: String,
    pub footer: String,
}

impl<S> ConfigMirror<S> {
    fn filter_entries<F>(&self, predicate: F) -> HashMap<String, CacheEntry>
    where
        F: Fn(&str, &CacheEntry) -> bool,
    {
        let state = self.inner.read_state();
        if !state.initialized {
            return HashMap::new();
        }
        state
            .entries
            .iter()
            .filter(|(key, entry)| predicate(key, entry))
            .map(|(key, entry)| (key.clone(), entry.clone()))
            .collect()
    }

    /// Cached value for `key`, or `None` when absent or uninitialized.
    pub fn value(&self, key: &str) -> Option<String> {
        let state = self.inner.read_state();
        if !state.initialized {
            return None;
        }
        state.entries.get(key).map(|entry| entry.value.clone())
    }

    /// Cached value for `key`, or `default` when absent or uninitialized.
    pub fn get(&self, key: &str, default: &str) -> String {
        self.value(key).unwrap_or_else(|| default.to_string())
    }

    /// Full cached entry for `key`.
    pub fn get_config(&self, key: &str) -> Option<CacheEntry> {
        let state = self.inner.read_state();
        if !state.initialized {
            return None;
        }
        state.entries.get(key).cloned()
    }

    pub fn get_by_type(&self, config_type: &str) -> HashMap<String, CacheEntry> {
        self.filter_entries(|_, entry| entry.config_type.as_deref() == Some(config_type))
    }

    pub fn get_by_pattern(&self, pattern: &str, match_type: MatchType) -> HashMap<String, CacheEntry> {
        self.filter_entries(|key, _| match_type.matches(key, pattern))
    }

    pub fn get_all(&self) -> HashMap<String, CacheEntry> {
        self.filter_entries(|_, _| true)
    }

    pub fn has(&self, key: &str) -> bool {
        let state = self.inner.read_state();
        state.initialized && state.entries.contains_key(key)
    }

    /// Cached value parsed as an unsigned integer, else `default`.
    pub fn get_number(&self, key: &str, default: u64) -> u64 {
        self.value(key)
            .and_then(|value| value.trim().parse().ok())
            .unwrap_or(default)
    }

    /// Cached value parsed as `"true"`/`"false"`, else `default`.
    pub fn get_bool(&self, key: &str, default: bool) -> bool {
        match self.value(key).as_deref().map(str::trim) {
            Some("true") => true,
            Some("false") => false,
            _ => default,
        }
    }

    /// Cached value parsed as JSON. Unparseable values read as `None`.
    pub fn get_json(&self, key: &str) -> Option<Value> {
        self.value(key)
            .and_then(|value| serde_json::from_str(&value).ok())
    }

    fn get_or_default(&self, key: &str) -> String {
        self.value(key)
            .or_else(|| defaults::default_value(key).map(str::to_string))
            .unwrap_or_default()
    }

    pub fn app_config(&self) -> AppConfig {
        AppConfig {
            app_name: self.get_or_default(keys::APP_NAME),
            app_version: self.get_or_default(keys::APP_VERSION),
            logo_url: self.get_or_default(keys::APP_LOGO_URL),
            primary_color: self.get_or_default(keys::APP_PRIMARY_COLOR),
            tagline: self.get_or_default(keys::APP_TAGLINE),
        }
    }

    pub fn email_config(&self) -> EmailConfig {
        EmailConfig {
            from_name: self.get_or_default(keys::EMAIL_FROM_NAME),
            from_address: self.get_or_default(keys::EMAIL_FROM_ADDRESS),
            reply_to: self.get_or_default(keys::EMAIL_REPLY_TO),
            footer: self.get_or_default(keys::EMAIL_FOOTER),
        }
    }
}

impl<S: ConfigStore + 'static> ConfigMirror<S> {
    /// Legacy structured query.
    ///
    /// Cacheable filters are answered from the map; an explicit
    /// `isActive = false` yields no rows since the map only holds active
    /// ones. Unsupported filters go to the store verbatim, with no implicit
    /// active-only condition. Ordering is applied afterwards in both cases.
    pub async fn find_many(&self, query: &ConfigQuery) -> MirrorResult<Vec<ConfigRecord>> {
        let mut records = match &query.filter {
            ConfigFilter::Cacheable(where_clause) => {
                if where_clause.wants_inactive() {
                    return Ok(Vec::new());
                }
                let mut records: Vec<ConfigRecord> = self
                    .filter_entries(|key, entry| where_clause.matches_entry(key, entry))
                    .iter()
                    .map(|(key, entry)| entry.to_record(key))
                    .collect();
                records.sort_by(|a, b| a.key.cmp(&b.key));
                records
            }
            ConfigFilter::Unsupported(raw) => {
                tracing::debug!(filter = %raw, "Forwarding legacy query to the store");
                self.inner.store.find_many(query).await?
            }
        };
        sort_records(&mut records, &query.order_by);
        Ok(records)
    }

    /// [`find_many`](Self::find_many) for a raw `{ where, orderBy }` object.
    pub async fn find_many_json(&self, query: &Value) -> MirrorResult<Vec<ConfigRecord>> {
        let query = ConfigQuery::from_json(query)?;
        self.find_many(&query).await
    }
}
