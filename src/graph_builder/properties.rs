//! Typed property values and property bags

use chrono::{DateTime, NaiveDate, NaiveDateTime, NaiveTime, Utc};
use rust_decimal::Decimal;
use serde::Serialize;
use std::collections::BTreeMap;
use std::fmt;

/// Reserved vertex property holding the canonical primary key until cleanup.
pub const PRIMARY_KEY_IDENTIFIER: &str = "*#primary_key_identifier#*";

/// Separator between the parts of a composite primary key
pub const KEY_PART_SEPARATOR: &str = "|";

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(untagged)]
pub enum PropertyValue {
    Integer(i64),
    Float(f64),
    Decimal(Decimal),
    String(String),
    Boolean(bool),
    Date(NaiveDate),
    Time(NaiveTime),
    DateTime(NaiveDateTime),
    DateTimeUtc(DateTime<Utc>),
}

impl PropertyValue {
    /// Canonical string used as natural key in joins.
    ///
    /// Numerically equal values of different numeric types map to the same
    /// key (`Integer(1)`, `Float(1.0)` and `Decimal(1.00)` all give `"1"`).
    pub fn canonical_key(&self) -> String {
        match self {
            PropertyValue::Integer(i) => i.to_string(),
            PropertyValue::Float(f) => f.to_string(),
            PropertyValue::Decimal(d) => d.normalize().to_string(),
            PropertyValue::String(s) => s.clone(),
            PropertyValue::Boolean(b) => b.to_string(),
            PropertyValue::Date(d) => d.to_string(),
            PropertyValue::Time(t) => t.to_string(),
            PropertyValue::DateTime(dt) => dt.to_string(),
            PropertyValue::DateTimeUtc(dt) => dt.to_rfc3339(),
        }
    }

    pub fn type_name(&self) -> &'static str {
        match self {
            PropertyValue::Integer(_) => "integer",
            PropertyValue::Float(_) => "float",
            PropertyValue::Decimal(_) => "decimal",
            PropertyValue::String(_) => "string",
            PropertyValue::Boolean(_) => "boolean",
            PropertyValue::Date(_) => "date",
            PropertyValue::Time(_) => "time",
            PropertyValue::DateTime(_) => "datetime",
            PropertyValue::DateTimeUtc(_) => "datetime",
        }
    }
}

impl fmt::Display for PropertyValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.canonical_key())
    }
}

impl From<i64> for PropertyValue {
    fn from(value: i64) -> Self {
        PropertyValue::Integer(value)
    }
}

impl From<&str> for PropertyValue {
    fn from(value: &str) -> Self {
        PropertyValue::String(value.to_string())
    }
}

impl From<String> for PropertyValue {
    fn from(value: String) -> Self {
        PropertyValue::String(value)
    }
}

impl From<bool> for PropertyValue {
    fn from(value: bool) -> Self {
        PropertyValue::Boolean(value)
    }
}

impl From<f64> for PropertyValue {
    fn from(value: f64) -> Self {
        PropertyValue::Float(value)
    }
}

/// Property bag. Ordered so serialized output is stable across runs.
pub type Properties = BTreeMap<String, PropertyValue>;

/// Canonical key of `columns` in `props`, or `None` if any part is missing.
pub fn composite_key(props: &Properties, columns: &[&str]) -> Option<String> {
    if columns.is_empty() {
        return None;
    }
    let parts: Option<Vec<String>> = columns
        .iter()
        .map(|c| props.get(*c).map(PropertyValue::canonical_key))
        .collect();
    parts.map(|p| p.join(KEY_PART_SEPARATOR))
}
