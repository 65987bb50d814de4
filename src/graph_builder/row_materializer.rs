//! Row materialization
//!
//! Runs a [`TablePlan`] against the source (partitions concurrently, results
//! concatenated in partition order) and turns each row into a property bag
//! using the plan's [`RowHeader`].
//!
//! # Type mapping
//!
//! | SqlType                          | PropertyValue  |
//! |----------------------------------|----------------|
//! | SmallInt, Integer, BigInt        | Integer        |
//! | Real, Double                     | Float          |
//! | Numeric                          | Decimal        |
//! | Char, Varchar, Text, Uuid, Json  | String         |
//! | Boolean                          | Boolean        |
//! | Date / Time / Timestamp          | Date / Time / DateTime |
//! | TimestampTz                      | DateTimeUtc    |
//!
//! Text values are parsed into the declared type, so text-only drivers and
//! YAML fixtures produce the same properties as typed drivers.

use chrono::{DateTime, NaiveDate, NaiveDateTime, NaiveTime, Utc};
use futures_util::future::try_join_all;
use rust_decimal::prelude::{FromPrimitive, ToPrimitive};
use rust_decimal::Decimal;
use std::str::FromStr;

use super::properties::{Properties, PropertyValue};
use crate::query_planner::{PlanKind, RowHeader, TablePlan};
use crate::source_catalog::{FieldError, SqlType};
use crate::source_db::{RawValue, SourceDatabase, SourceError, SourceRow};

/// All rows of one table, converted. Every row carries its table name through
/// `table_name`; nothing downstream relies on positional correlation.
#[derive(Debug, Clone, PartialEq)]
pub struct MaterializedTable {
    pub table_name: String,
    pub kind: PlanKind,
    pub rows: Vec<Properties>,
    /// Fields skipped during conversion
    pub skipped_fields: usize,
}

pub struct RowMaterializer<'a> {
    db: &'a dyn SourceDatabase,
}

impl<'a> RowMaterializer<'a> {
    pub fn new(db: &'a dyn SourceDatabase) -> Self {
        Self { db }
    }

    pub async fn materialize(&self, plan: &TablePlan) -> Result<MaterializedTable, SourceError> {
        let raw_rows = self.fetch(plan).await?;
        log::debug!("Fetched {} rows from {}", raw_rows.len(), plan.table_name);

        let mut skipped_fields = 0;
        let rows = raw_rows
            .iter()
            .map(|row| {
                let (props, errors) = convert_row(&plan.table_name, &plan.header, row);
                for err in &errors {
                    log::warn!("{}", err);
                }
                skipped_fields += errors.len();
                props
            })
            .collect();

        Ok(MaterializedTable {
            table_name: plan.table_name.clone(),
            kind: plan.kind,
            rows,
            skipped_fields,
        })
    }

    async fn fetch(&self, plan: &TablePlan) -> Result<Vec<SourceRow>, SourceError> {
        if plan.partitions.is_empty() {
            return self.db.execute_query(&plan.query, None).await;
        }

        log::debug!(
            "Fetching {} in {} partitions",
            plan.table_name,
            plan.partitions.len()
        );
        let parts = try_join_all(
            plan.partitions
                .iter()
                .map(|bounds| self.db.execute_query(&plan.query, Some(*bounds))),
        )
        .await?;

        Ok(parts.into_iter().flatten().collect())
    }
}

/// Convert one positional row. NULLs are left out of the bag; absent and
/// unconvertible fields are left out and reported.
pub fn convert_row(
    table_name: &str,
    header: &RowHeader,
    row: &SourceRow,
) -> (Properties, Vec<FieldError>) {
    let mut props = Properties::new();
    let mut errors = Vec::new();

    for entry in header.entries() {
        let empty_field = |reason: String| FieldError::EmptyField {
            table: table_name.to_string(),
            column: entry.name.clone(),
            position: entry.position,
            reason,
        };

        let Some(raw) = row.get(entry.position) else {
            errors.push(empty_field(format!("row has only {} fields", row.len())));
            continue;
        };

        match convert_value(raw, &entry.sql_type) {
            Ok(Some(value)) => {
                props.insert(entry.name.clone(), value);
            }
            Ok(None) => {
                log::debug!("NULL in {}.{}, property omitted", table_name, entry.name);
            }
            Err(reason) => errors.push(empty_field(reason)),
        }
    }

    (props, errors)
}

/// Map a raw driver value to a property value of the column's declared type.
///
/// `Ok(None)` means SQL NULL.
pub fn convert_value(raw: &RawValue, sql_type: &SqlType) -> Result<Option<PropertyValue>, String> {
    if let RawValue::Undecodable(reason) = raw {
        return Err(reason.clone());
    }
    if raw.is_null() {
        return Ok(None);
    }

    let mismatch = || format!("cannot convert {:?} to {}", raw, sql_type.as_str());

    let value = match sql_type {
        SqlType::SmallInt | SqlType::Integer | SqlType::BigInt => match raw {
            RawValue::Int(i) => PropertyValue::Integer(*i),
            RawValue::Float(f) if f.fract() == 0.0 && f.is_finite() => {
                PropertyValue::Integer(*f as i64)
            }
            RawValue::Decimal(d) if d.fract().is_zero() => {
                PropertyValue::Integer(d.to_i64().ok_or_else(mismatch)?)
            }
            RawValue::Text(s) => {
                PropertyValue::Integer(s.trim().parse::<i64>().map_err(|_| mismatch())?)
            }
            _ => return Err(mismatch()),
        },

        SqlType::Real | SqlType::Double => match raw {
            RawValue::Float(f) => PropertyValue::Float(*f),
            RawValue::Int(i) => PropertyValue::Float(*i as f64),
            RawValue::Decimal(d) => PropertyValue::Float(d.to_f64().ok_or_else(mismatch)?),
            RawValue::Text(s) => {
                PropertyValue::Float(s.trim().parse::<f64>().map_err(|_| mismatch())?)
            }
            _ => return Err(mismatch()),
        },

        SqlType::Numeric => match raw {
            RawValue::Decimal(d) => PropertyValue::Decimal(*d),
            RawValue::Int(i) => PropertyValue::Decimal(Decimal::from(*i)),
            RawValue::Float(f) => PropertyValue::Decimal(Decimal::from_f64(*f).ok_or_else(mismatch)?),
            RawValue::Text(s) => {
                PropertyValue::Decimal(Decimal::from_str(s.trim()).map_err(|_| mismatch())?)
            }
            _ => return Err(mismatch()),
        },

        SqlType::Char | SqlType::Varchar | SqlType::Text => match raw {
            RawValue::Text(s) => PropertyValue::String(s.clone()),
            RawValue::Int(i) => PropertyValue::String(i.to_string()),
            RawValue::Float(f) => PropertyValue::String(f.to_string()),
            RawValue::Decimal(d) => PropertyValue::String(d.to_string()),
            RawValue::Bool(b) => PropertyValue::String(b.to_string()),
            RawValue::Uuid(u) => PropertyValue::String(u.to_string()),
            _ => return Err(mismatch()),
        },

        SqlType::Uuid => match raw {
            RawValue::Uuid(u) => PropertyValue::String(u.to_string()),
            RawValue::Text(s) => {
                let parsed = uuid::Uuid::parse_str(s.trim()).map_err(|_| mismatch())?;
                PropertyValue::String(parsed.to_string())
            }
            _ => return Err(mismatch()),
        },

        SqlType::Json => match raw {
            RawValue::Json(v) => PropertyValue::String(v.to_string()),
            RawValue::Text(s) => PropertyValue::String(s.clone()),
            _ => return Err(mismatch()),
        },

        SqlType::Boolean => match raw {
            RawValue::Bool(b) => PropertyValue::Boolean(*b),
            RawValue::Int(0) => PropertyValue::Boolean(false),
            RawValue::Int(1) => PropertyValue::Boolean(true),
            RawValue::Text(s) => PropertyValue::Boolean(parse_bool(s).ok_or_else(mismatch)?),
            _ => return Err(mismatch()),
        },

        SqlType::Date => match raw {
            RawValue::Date(d) => PropertyValue::Date(*d),
            RawValue::Text(s) => PropertyValue::Date(
                NaiveDate::parse_from_str(s.trim(), "%Y-%m-%d").map_err(|_| mismatch())?,
            ),
            _ => return Err(mismatch()),
        },

        SqlType::Time => match raw {
            RawValue::Time(t) => PropertyValue::Time(*t),
            RawValue::Text(s) => {
                PropertyValue::Time(NaiveTime::from_str(s.trim()).map_err(|_| mismatch())?)
            }
            _ => return Err(mismatch()),
        },

        SqlType::Timestamp => match raw {
            RawValue::Timestamp(ts) => PropertyValue::DateTime(*ts),
            RawValue::TimestampTz(ts) => PropertyValue::DateTime(ts.naive_utc()),
            RawValue::Text(s) => PropertyValue::DateTime(parse_naive_timestamp(s).ok_or_else(mismatch)?),
            _ => return Err(mismatch()),
        },

        SqlType::TimestampTz => match raw {
            RawValue::TimestampTz(ts) => PropertyValue::DateTimeUtc(*ts),
            RawValue::Timestamp(ts) => PropertyValue::DateTimeUtc(ts.and_utc()),
            RawValue::Text(s) => {
                let s = s.trim();
                let parsed = DateTime::parse_from_rfc3339(s)
                    .map(|dt| dt.with_timezone(&Utc))
                    .ok()
                    .or_else(|| parse_naive_timestamp(s).map(|ts| ts.and_utc()))
                    .ok_or_else(mismatch)?;
                PropertyValue::DateTimeUtc(parsed)
            }
            _ => return Err(mismatch()),
        },

        // Only key columns reach here with an unknown type (user-defined enum
        // keys and the like); keep whatever scalar the driver produced.
        SqlType::Other(_) => match raw {
            RawValue::Int(i) => PropertyValue::Integer(*i),
            RawValue::Float(f) => PropertyValue::Float(*f),
            RawValue::Decimal(d) => PropertyValue::Decimal(*d),
            RawValue::Text(s) => PropertyValue::String(s.clone()),
            RawValue::Bool(b) => PropertyValue::Boolean(*b),
            RawValue::Uuid(u) => PropertyValue::String(u.to_string()),
            _ => return Err(mismatch()),
        },

        SqlType::Binary | SqlType::Array => {
            return Err(format!("unsupported type {}", sql_type.as_str()))
        }
    };

    Ok(Some(value))
}

fn parse_bool(s: &str) -> Option<bool> {
    match s.trim().to_lowercase().as_str() {
        "true" | "t" | "yes" | "y" | "1" => Some(true),
        "false" | "f" | "no" | "n" | "0" => Some(false),
        _ => None,
    }
}

fn parse_naive_timestamp(s: &str) -> Option<NaiveDateTime> {
    let s = s.trim();
    ["%Y-%m-%d %H:%M:%S%.f", "%Y-%m-%dT%H:%M:%S%.f", "%Y-%m-%d %H:%M", "%Y-%m-%d"]
        .iter()
        .find_map(|fmt| {
            NaiveDateTime::parse_from_str(s, fmt).ok().or_else(|| {
                NaiveDate::parse_from_str(s, fmt)
                    .ok()
                    .and_then(|d| d.and_hms_opt(0, 0, 0))
            })
        })
}
