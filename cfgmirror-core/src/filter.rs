//! Legacy structured query shapes
//!
//! Older call sites address the configuration table through a relational
//! filter object (`{ where: {...}, orderBy: {...} }`). This module turns that
//! object into a typed [`ConfigQuery`]: shapes the in-memory mirror can answer
//! become [`ConfigFilter::Cacheable`], anything else (boolean combinators,
//! relational includes, operators on other columns) becomes
//! [`ConfigFilter::Unsupported`] and is forwarded verbatim to the store.
//!
//! [`matches_where`] evaluates a raw where clause against a single record so
//! that every store backend answers forwarded queries the same way.

use std::cmp::Ordering;

use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::{CacheEntry, ConfigRecord, MirrorResult, ValidationError};

/// Filter on the `key` column that the mirror can serve.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum KeyFilter {
    Equals(String),
    StartsWith(String),
    InList(Vec<String>),
}

impl KeyFilter {
    pub fn matches(&self, key: &str) -> bool {
        match self {
            KeyFilter::Equals(expected) => key == expected,
            KeyFilter::StartsWith(prefix) => key.starts_with(prefix.as_str()),
            KeyFilter::InList(keys) => keys.iter().any(|k| k == key),
        }
    }
}

/// Where clause restricted to the shapes the mirror can answer.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct CacheableWhere {
    pub key: Option<KeyFilter>,
    pub config_type: Option<String>,
    /// `None` means the caller did not ask, which defaults to active rows.
    pub is_active: Option<bool>,
}

impl CacheableWhere {
    /// True when the clause explicitly asks for inactive rows only.
    pub fn wants_inactive(&self) -> bool {
        self.is_active == Some(false)
    }

    /// Match a mirrored entry. Mirrored entries are always active.
    pub fn matches_entry(&self, key: &str, entry: &CacheEntry) -> bool {
        if self.wants_inactive() {
            return false;
        }
        if let Some(filter) = &self.key {
            if !filter.matches(key) {
                return false;
            }
        }
        if let Some(expected) = &self.config_type {
            if entry.config_type.as_deref() != Some(expected.as_str()) {
                return false;
            }
        }
        true
    }

    /// Match a persisted record, honoring `is_active` (default true).
    pub fn matches_record(&self, record: &ConfigRecord) -> bool {
        if record.is_active != self.is_active.unwrap_or(true) {
            return false;
        }
        if let Some(filter) = &self.key {
            if !filter.matches(&record.key) {
                return false;
            }
        }
        match &self.config_type {
            Some(expected) => record.config_type.as_deref() == Some(expected.as_str()),
            None => true,
        }
    }
}

/// Column a query can be ordered by.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum SortField {
    Key,
    Value,
    Type,
    Description,
    UpdatedAt,
}

impl SortField {
    fn parse(name: &str) -> Option<Self> {
        match name {
            "key" => Some(SortField::Key),
            "value" => Some(SortField::Value),
            "type" => Some(SortField::Type),
            "description" => Some(SortField::Description),
            "updatedAt" => Some(SortField::UpdatedAt),
            _ => None,
        }
    }
}

/// Sort direction.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SortDirection {
    #[default]
    Asc,
    Desc,
}

/// Single-field ordering.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct OrderBy {
    pub field: SortField,
    pub direction: SortDirection,
}

impl OrderBy {
    pub fn asc(field: SortField) -> Self {
        Self {
            field,
            direction: SortDirection::Asc,
        }
    }

    pub fn desc(field: SortField) -> Self {
        Self {
            field,
            direction: SortDirection::Desc,
        }
    }

    fn compare(&self, a: &ConfigRecord, b: &ConfigRecord) -> Ordering {
        let ordering = match self.field {
            SortField::Key => a.key.cmp(&b.key),
            SortField::Value => a.value.cmp(&b.value),
            SortField::Type => a.config_type.cmp(&b.config_type),
            SortField::Description => a.description.cmp(&b.description),
            SortField::UpdatedAt => a.updated_at.cmp(&b.updated_at),
        };
        match self.direction {
            SortDirection::Asc => ordering,
            SortDirection::Desc => ordering.reverse(),
        }
    }
}

/// Apply an ordering to records in place. Later entries break ties of earlier ones.
pub fn sort_records(records: &mut [ConfigRecord], order_by: &[OrderBy]) {
    if order_by.is_empty() {
        return;
    }
    records.sort_by(|a, b| {
        order_by
            .iter()
            .map(|order| order.compare(a, b))
            .find(|ordering| *ordering != Ordering::Equal)
            .unwrap_or(Ordering::Equal)
    });
}

/// The filter part of a legacy query.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ConfigFilter {
    /// Served from the mirror.
    Cacheable(CacheableWhere),
    /// Raw where clause forwarded verbatim to the store.
    Unsupported(Value),
}

/// A legacy structured query against the configuration table.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ConfigQuery {
    pub filter: ConfigFilter,
    pub order_by: Vec<OrderBy>,
}

impl Default for ConfigQuery {
    fn default() -> Self {
        Self::all()
    }
}

impl ConfigQuery {
    /// Every active row.
    pub fn all() -> Self {
        Self {
            filter: ConfigFilter::Cacheable(CacheableWhere::default()),
            order_by: Vec::new(),
        }
    }

    fn with_key(filter: KeyFilter) -> Self {
        Self {
            filter: ConfigFilter::Cacheable(CacheableWhere {
                key: Some(filter),
                ..Default::default()
            }),
            order_by: Vec::new(),
        }
    }

    pub fn key_equals(key: impl Into<String>) -> Self {
        Self::with_key(KeyFilter::Equals(key.into()))
    }

    pub fn key_starts_with(prefix: impl Into<String>) -> Self {
        Self::with_key(KeyFilter::StartsWith(prefix.into()))
    }

    pub fn key_in<I, S>(keys: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self::with_key(KeyFilter::InList(keys.into_iter().map(Into::into).collect()))
    }

    pub fn unsupported(where_clause: Value) -> Self {
        Self {
            filter: ConfigFilter::Unsupported(where_clause),
            order_by: Vec::new(),
        }
    }

    /// Restrict to a type. Has no effect on unsupported filters.
    pub fn with_type(mut self, config_type: impl Into<String>) -> Self {
        if let ConfigFilter::Cacheable(where_clause) = &mut self.filter {
            where_clause.config_type = Some(config_type.into());
        }
        self
    }

    /// Restrict by activity flag. Has no effect on unsupported filters.
    pub fn with_active(mut self, is_active: bool) -> Self {
        if let ConfigFilter::Cacheable(where_clause) = &mut self.filter {
            where_clause.is_active = Some(is_active);
        }
        self
    }

    pub fn order_by(mut self, order: OrderBy) -> Self {
        self.order_by.push(order);
        self
    }

    pub fn is_cacheable(&self) -> bool {
        matches!(self.filter, ConfigFilter::Cacheable(_))
    }

    /// Check a persisted record against this query's filter.
    ///
    /// Cacheable filters default to active rows; forwarded clauses are
    /// evaluated exactly as written, inactive rows included.
    pub fn matches_record(&self, record: &ConfigRecord) -> bool {
        match &self.filter {
            ConfigFilter::Cacheable(where_clause) => where_clause.matches_record(record),
            ConfigFilter::Unsupported(raw) => matches_where(record, raw),
        }
    }

    /// Translate a relational filter object into a typed query.
    ///
    /// Accepts `{ "where": {...}, "orderBy": {...} | [{...}], "include": {...} }`.
    /// Malformed shapes (non-object where, unknown sort field, bad direction)
    /// are rejected; shapes that are valid but not servable from the mirror
    /// become [`ConfigFilter::Unsupported`].
    pub fn from_json(query: &Value) -> MirrorResult<Self> {
        let object = query.as_object().ok_or_else(|| invalid("query", "must be an object"))?;

        let where_clause = match object.get("where") {
            None | Some(Value::Null) => Value::Object(Default::default()),
            Some(clause @ Value::Object(_)) => clause.clone(),
            Some(_) => return Err(invalid("where", "must be an object")),
        };

        let order_by = match object.get("orderBy") {
            None | Some(Value::Null) => Vec::new(),
            Some(Value::Array(items)) => items
                .iter()
                .map(parse_order_by)
                .collect::<MirrorResult<Vec<_>>>()?
                .into_iter()
                .flatten()
                .collect(),
            Some(single) => parse_order_by(single)?,
        };

        let has_include = object.contains_key("include") || object.contains_key("select");
        let filter = if has_include {
            ConfigFilter::Unsupported(where_clause)
        } else {
            match translate_where(&where_clause) {
                Some(cacheable) => ConfigFilter::Cacheable(cacheable),
                None => ConfigFilter::Unsupported(where_clause),
            }
        };

        Ok(Self { filter, order_by })
    }
}

fn invalid(field: &str, reason: &str) -> crate::MirrorError {
    ValidationError::InvalidValue {
        field: field.to_string(),
        reason: reason.to_string(),
    }
    .into()
}

fn parse_order_by(value: &Value) -> MirrorResult<Vec<OrderBy>> {
    let object = value
        .as_object()
        .ok_or_else(|| invalid("orderBy", "must be an object of field: direction"))?;
    object
        .iter()
        .map(|(field, direction)| {
            let field = SortField::parse(field)
                .ok_or_else(|| invalid("orderBy", &format!("unknown field {field}")))?;
            let direction = match direction.as_str() {
                Some("asc") => SortDirection::Asc,
                Some("desc") => SortDirection::Desc,
                _ => return Err(invalid("orderBy", "direction must be asc or desc")),
            };
            Ok(OrderBy { field, direction })
        })
        .collect()
}

/// Returns `None` when the clause uses anything the mirror cannot model.
fn translate_where(clause: &Value) -> Option<CacheableWhere> {
    let object = clause.as_object()?;
    let mut cacheable = CacheableWhere::default();

    for (field, condition) in object {
        match field.as_str() {
            "key" => cacheable.key = Some(translate_key(condition)?),
            "type" => cacheable.config_type = Some(translate_equals_str(condition)?),
            "isActive" => cacheable.is_active = Some(translate_equals_bool(condition)?),
            _ => return None,
        }
    }
    Some(cacheable)
}

fn translate_key(condition: &Value) -> Option<KeyFilter> {
    match condition {
        Value::String(key) => Some(KeyFilter::Equals(key.clone())),
        Value::Object(ops) if ops.len() == 1 => {
            let (op, operand) = ops.iter().next()?;
            match op.as_str() {
                "equals" => operand.as_str().map(|s| KeyFilter::Equals(s.to_string())),
                "startsWith" => operand.as_str().map(|s| KeyFilter::StartsWith(s.to_string())),
                "in" => operand
                    .as_array()?
                    .iter()
                    .map(|item| item.as_str().map(str::to_string))
                    .collect::<Option<Vec<_>>>()
                    .map(KeyFilter::InList),
                _ => None,
            }
        }
        _ => None,
    }
}

fn translate_equals_str(condition: &Value) -> Option<String> {
    match condition {
        Value::String(s) => Some(s.clone()),
        Value::Object(ops) if ops.len() == 1 => ops.get("equals")?.as_str().map(str::to_string),
        _ => None,
    }
}

fn translate_equals_bool(condition: &Value) -> Option<bool> {
    match condition {
        Value::Bool(b) => Some(*b),
        Value::Object(ops) if ops.len() == 1 => ops.get("equals")?.as_bool(),
        _ => None,
    }
}

// ============================================================================
// RAW WHERE EVALUATION
// ============================================================================

/// Evaluate a relational where clause against one record.
///
/// Supports `key`, `value`, `type`, `description` with `equals`,
/// `startsWith`, `endsWith`, `contains`, `in`, `notIn`, `not` and
/// `mode: "insensitive"`; `isActive` with plain or `equals`/`not` booleans;
/// and the `AND`, `OR`, `NOT` combinators. Unknown fields never match.
pub fn matches_where(record: &ConfigRecord, clause: &Value) -> bool {
    let Some(object) = clause.as_object() else {
        return clause.is_null();
    };

    object.iter().all(|(field, condition)| match field.as_str() {
        "AND" => match condition {
            Value::Array(items) => items.iter().all(|item| matches_where(record, item)),
            other => matches_where(record, other),
        },
        "OR" => condition
            .as_array()
            .map(|items| items.iter().any(|item| matches_where(record, item)))
            .unwrap_or(false),
        "NOT" => match condition {
            Value::Array(items) => !items.iter().any(|item| matches_where(record, item)),
            other => !matches_where(record, other),
        },
        "key" => string_condition(Some(&record.key), condition),
        "value" => string_condition(Some(&record.value), condition),
        "type" => string_condition(record.config_type.as_deref(), condition),
        "description" => string_condition(record.description.as_deref(), condition),
        "isActive" => bool_condition(record.is_active, condition),
        _ => false,
    })
}

fn string_condition(actual: Option<&str>, condition: &Value) -> bool {
    match condition {
        Value::Null => actual.is_none(),
        Value::String(expected) => actual == Some(expected.as_str()),
        Value::Object(ops) => {
            let insensitive = ops.get("mode").and_then(Value::as_str) == Some("insensitive");
            let fold = |s: &str| {
                if insensitive {
                    s.to_lowercase()
                } else {
                    s.to_string()
                }
            };
            let actual_folded = actual.map(fold);

            ops.iter().all(|(op, operand)| {
                let operand_str = operand.as_str().map(fold);
                match op.as_str() {
                    "mode" => true,
                    "equals" => match operand {
                        Value::Null => actual.is_none(),
                        _ => actual_folded.is_some() && actual_folded == operand_str,
                    },
                    "startsWith" => pair(&actual_folded, &operand_str, |a, b| a.starts_with(b)),
                    "endsWith" => pair(&actual_folded, &operand_str, |a, b| a.ends_with(b)),
                    "contains" => pair(&actual_folded, &operand_str, |a, b| a.contains(b)),
                    "in" => in_list(&actual_folded, operand, &fold),
                    "notIn" => !in_list(&actual_folded, operand, &fold),
                    "not" => !string_condition(actual, operand),
                    _ => false,
                }
            })
        }
        _ => false,
    }
}

fn pair(actual: &Option<String>, operand: &Option<String>, f: impl Fn(&str, &str) -> bool) -> bool {
    match (actual, operand) {
        (Some(a), Some(b)) => f(a, b),
        _ => false,
    }
}

fn in_list(actual: &Option<String>, operand: &Value, fold: &dyn Fn(&str) -> String) -> bool {
    let (Some(actual), Some(items)) = (actual, operand.as_array()) else {
        return false;
    };
    items
        .iter()
        .filter_map(Value::as_str)
        .any(|item| fold(item) == *actual)
}

fn bool_condition(actual: bool, condition: &Value) -> bool {
    match condition {
        Value::Bool(expected) => actual == *expected,
        Value::Object(ops) => ops.iter().all(|(op, operand)| match (op.as_str(), operand) {
            ("equals", Value::Bool(expected)) => actual == *expected,
            ("not", Value::Bool(expected)) => actual != *expected,
            _ => false,
        }),
        _ => false,
    }
}
