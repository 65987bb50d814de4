use chrono::{DateTime, NaiveDate, NaiveDateTime, NaiveTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use std::fmt;

/// A base table as reported by the source database.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct TableRef {
    pub schema: Option<String>,
    pub name: String,
}

impl TableRef {
    pub fn new(schema: Option<String>, name: impl Into<String>) -> Self {
        Self {
            schema,
            name: name.into(),
        }
    }

    /// Schema-qualified name, used as vertex and edge label.
    pub fn qualified_name(&self) -> String {
        qualify(self.schema.as_deref(), &self.name)
    }
}

impl fmt::Display for TableRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.qualified_name())
    }
}

/// Join an optional schema and a table name the way labels are formed.
pub fn qualify(schema: Option<&str>, name: &str) -> String {
    match schema {
        Some(schema) if !schema.is_empty() => format!("{}.{}", schema, name),
        _ => name.to_string(),
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RawColumn {
    pub name: String,
    /// Type name exactly as the database reports it
    #[serde(rename = "type")]
    pub type_name: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RawForeignKey {
    pub column: String,
    pub referenced_schema: Option<String>,
    pub referenced_table: String,
    pub referenced_column: String,
}

impl RawForeignKey {
    pub fn referenced_qualified_name(&self) -> String {
        qualify(self.referenced_schema.as_deref(), &self.referenced_table)
    }
}

/// A single field as decoded by a driver, before type mapping.
#[derive(Debug, Clone, PartialEq)]
pub enum RawValue {
    Null,
    Int(i64),
    Float(f64),
    Decimal(Decimal),
    Text(String),
    Bool(bool),
    Date(NaiveDate),
    Time(NaiveTime),
    Timestamp(NaiveDateTime),
    TimestampTz(DateTime<Utc>),
    Uuid(uuid::Uuid),
    Json(serde_json::Value),
    Bytes(Vec<u8>),
    /// The driver returned a value it could not decode; carries the reason
    Undecodable(String),
}

impl RawValue {
    pub fn is_null(&self) -> bool {
        matches!(self, RawValue::Null)
    }

    /// Convert a YAML scalar from a fixture file.
    ///
    /// Strings stay text; the materializer parses them according to the
    /// declared column type.
    pub fn from_yaml(value: &serde_yaml::Value) -> Self {
        match value {
            serde_yaml::Value::Null => RawValue::Null,
            serde_yaml::Value::Bool(b) => RawValue::Bool(*b),
            serde_yaml::Value::Number(n) => {
                if let Some(i) = n.as_i64() {
                    RawValue::Int(i)
                } else if let Some(f) = n.as_f64() {
                    RawValue::Float(f)
                } else {
                    RawValue::Text(n.to_string())
                }
            }
            serde_yaml::Value::String(s) => RawValue::Text(s.clone()),
            other => RawValue::Text(serde_yaml::to_string(other).unwrap_or_default()),
        }
    }
}

/// One result row, positionally aligned with the query projection.
pub type SourceRow = Vec<RawValue>;

/// SQL dialect family of the connected database.
///
/// Only identifier quoting and pagination differ between families.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SqlDialect {
    #[default]
    #[serde(rename = "postgresql")]
    PostgreSQL,
    #[serde(rename = "mysql")]
    MySQL,
    #[serde(rename = "sqlite")]
    SQLite,
    #[serde(rename = "h2")]
    H2,
    #[serde(rename = "sqlserver")]
    SqlServer,
    #[serde(rename = "oracle")]
    Oracle,
    #[serde(rename = "derby")]
    Derby,
}

/// How a dialect expresses a row range.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PaginationStyle {
    /// `LIMIT n OFFSET m`
    LimitOffset,
    /// `OFFSET m ROWS FETCH NEXT n ROWS ONLY`
    OffsetFetch,
}

impl SqlDialect {
    /// Pick the dialect from a driver product name ("PostgreSQL",
    /// "Microsoft SQL Server", ...). Unknown products use the LIMIT/OFFSET family.
    pub fn from_product_name(product: &str) -> Self {
        let product = product.trim().to_lowercase();
        if product.contains("postgres") {
            SqlDialect::PostgreSQL
        } else if product.contains("mysql") || product.contains("mariadb") {
            SqlDialect::MySQL
        } else if product.contains("sqlite") {
            SqlDialect::SQLite
        } else if product.contains("h2") || product.contains("hsql") {
            SqlDialect::H2
        } else if product.contains("sql server") || product.contains("sqlserver") {
            SqlDialect::SqlServer
        } else if product.contains("oracle") {
            SqlDialect::Oracle
        } else if product.contains("derby") {
            SqlDialect::Derby
        } else {
            log::warn!(
                "Unknown database product '{}', assuming LIMIT/OFFSET pagination",
                product
            );
            SqlDialect::PostgreSQL
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            SqlDialect::PostgreSQL => "postgresql",
            SqlDialect::MySQL => "mysql",
            SqlDialect::SQLite => "sqlite",
            SqlDialect::H2 => "h2",
            SqlDialect::SqlServer => "sqlserver",
            SqlDialect::Oracle => "oracle",
            SqlDialect::Derby => "derby",
        }
    }

    pub fn pagination(&self) -> PaginationStyle {
        match self {
            SqlDialect::SqlServer | SqlDialect::Oracle | SqlDialect::Derby => {
                PaginationStyle::OffsetFetch
            }
            _ => PaginationStyle::LimitOffset,
        }
    }

    /// Quote an identifier, doubling any embedded quote character.
    pub fn quote_ident(&self, ident: &str) -> String {
        match self {
            SqlDialect::MySQL => format!("`{}`", ident.replace('`', "``")),
            _ => format!("\"{}\"", ident.replace('"', "\"\"")),
        }
    }

    /// Quote a possibly schema-qualified table reference.
    pub fn quote_table(&self, table: &TableRef) -> String {
        match &table.schema {
            Some(schema) if !schema.is_empty() => {
                format!("{}.{}", self.quote_ident(schema), self.quote_ident(&table.name))
            }
            _ => self.quote_ident(&table.name),
        }
    }
}

impl fmt::Display for SqlDialect {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}
