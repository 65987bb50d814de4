//! Source column type system
//!
//! Database drivers report column types as free-form names ("int4",
//! "character varying(255)", "timestamp(6) without time zone", "NUMBER",
//! ...). This module normalises them into a small closed set, [`SqlType`],
//! which drives both column filtering during introspection and value
//! conversion during row materialization.
//!
//! # Unsupported types
//!
//! Binary, array and unknown (user-defined, large object, ...) columns are
//! reported as [`SqlType::Binary`], [`SqlType::Array`] and [`SqlType::Other`].
//! Attribute columns of these types are dropped from the catalog.

use lazy_static::lazy_static;
use regex::Regex;
use serde::{Deserialize, Serialize};
use std::fmt;

lazy_static! {
    /// Type modifiers: `(255)`, `(10,2)`, `(6)`
    static ref TYPE_MODIFIERS: Regex = Regex::new(r"\s*\([^)]*\)").unwrap();
    /// Redundant time zone suffix on plain timestamps/times
    static ref WITHOUT_TIME_ZONE: Regex = Regex::new(r"\s+without\s+time\s+zone$").unwrap();
    static ref WHITESPACE: Regex = Regex::new(r"\s+").unwrap();
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SqlType {
    SmallInt,
    Integer,
    BigInt,
    Real,
    Double,
    Numeric,
    Char,
    Varchar,
    Text,
    Boolean,
    Date,
    Time,
    Timestamp,
    TimestampTz,
    Uuid,
    Json,

    // Unsupported
    Binary,
    Array,
    Other(String),
}

impl SqlType {
    /// Map a driver type name to a `SqlType`.
    ///
    /// Case-insensitive; modifiers in parentheses are ignored.
    ///
    /// ```ignore
    /// assert_eq!(SqlType::from_type_name("character varying(255)"), SqlType::Varchar);
    /// assert_eq!(SqlType::from_type_name("INT8"), SqlType::BigInt);
    /// assert_eq!(SqlType::from_type_name("integer[]"), SqlType::Array);
    /// ```
    pub fn from_type_name(type_name: &str) -> Self {
        let normalized = normalize_type_name(type_name);

        if normalized.ends_with("[]") || normalized == "array" || normalized.starts_with('_') {
            return SqlType::Array;
        }

        match normalized.as_str() {
            "smallint" | "int2" | "tinyint" | "smallserial" => SqlType::SmallInt,
            "integer" | "int" | "int4" | "mediumint" | "serial" => SqlType::Integer,
            "bigint" | "int8" | "bigserial" => SqlType::BigInt,
            "real" | "float4" => SqlType::Real,
            "double precision" | "double" | "float8" | "float" => SqlType::Double,
            "numeric" | "decimal" | "number" | "money" => SqlType::Numeric,
            "character" | "char" | "bpchar" | "nchar" => SqlType::Char,
            "character varying" | "varchar" | "varchar2" | "nvarchar" | "nvarchar2" => {
                SqlType::Varchar
            }
            "text" | "name" | "citext" | "clob" | "longtext" | "mediumtext" | "tinytext" => {
                SqlType::Text
            }
            "boolean" | "bool" | "bit" => SqlType::Boolean,
            "date" => SqlType::Date,
            "time" => SqlType::Time,
            "timestamp" | "datetime" | "datetime2" | "smalldatetime" => SqlType::Timestamp,
            "timestamp with time zone" | "timestamptz" | "datetimeoffset" => SqlType::TimestampTz,
            "uuid" | "uniqueidentifier" => SqlType::Uuid,
            "json" | "jsonb" => SqlType::Json,
            "bytea" | "blob" | "binary" | "varbinary" | "longblob" | "mediumblob" | "tinyblob"
            | "image" | "raw" | "bit varying" | "varbit" => SqlType::Binary,
            _ => SqlType::Other(normalized),
        }
    }

    /// Whether values of this type can become properties.
    pub fn is_supported(&self) -> bool {
        !matches!(self, SqlType::Binary | SqlType::Array | SqlType::Other(_))
    }

    /// Whether the type can appear in an ORDER BY. PostgreSQL has no
    /// ordering operator for `json`.
    pub fn is_orderable(&self) -> bool {
        !matches!(self, SqlType::Json | SqlType::Binary | SqlType::Array)
    }

    pub fn as_str(&self) -> &str {
        match self {
            SqlType::SmallInt => "smallint",
            SqlType::Integer => "integer",
            SqlType::BigInt => "bigint",
            SqlType::Real => "real",
            SqlType::Double => "double",
            SqlType::Numeric => "numeric",
            SqlType::Char => "char",
            SqlType::Varchar => "varchar",
            SqlType::Text => "text",
            SqlType::Boolean => "boolean",
            SqlType::Date => "date",
            SqlType::Time => "time",
            SqlType::Timestamp => "timestamp",
            SqlType::TimestampTz => "timestamptz",
            SqlType::Uuid => "uuid",
            SqlType::Json => "json",
            SqlType::Binary => "binary",
            SqlType::Array => "array",
            SqlType::Other(name) => name.as_str(),
        }
    }
}

impl fmt::Display for SqlType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Lowercase, collapse whitespace, strip modifiers and `without time zone`.
fn normalize_type_name(type_name: &str) -> String {
    let lowered = type_name.trim().to_lowercase();
    let stripped = TYPE_MODIFIERS.replace_all(&lowered, "");
    let collapsed = WHITESPACE.replace_all(stripped.trim(), " ");
    WITHOUT_TIME_ZONE.replace(&collapsed, "").to_string()
}
