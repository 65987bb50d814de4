//! In-memory description of introspected tables
//!
//! A [`TableDescriptor`] is built once per table by the schema catalog and is
//! read-only afterwards. Key columns and attribute columns never overlap; a
//! column may however be both a primary-key and a foreign-key column (junction
//! tables, one-to-one extension tables).

use serde::{Deserialize, Serialize};

use super::schema_types::SqlType;
use crate::source_db::TableRef;

/// Semantic role of a column in the graph mapping
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ColumnRole {
    PrimaryKey,
    ForeignKey,
    Attribute,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ColumnSpec {
    pub name: String,
    pub sql_type: SqlType,
    pub role: ColumnRole,
    /// Ordinal position in the source table (0-based)
    pub position: usize,
}

impl ColumnSpec {
    pub fn new(name: impl Into<String>, sql_type: SqlType, role: ColumnRole, position: usize) -> Self {
        Self {
            name: name.into(),
            sql_type,
            role,
            position,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ForeignKeyRef {
    pub column_name: String,
    pub sql_type: SqlType,
    pub referenced_column: String,
    /// Schema-qualified name of the referenced table
    pub referenced_table: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TableDescriptor {
    pub source: TableRef,
    /// Schema-qualified table name
    pub table_name: String,
    pub primary_keys: Vec<ColumnSpec>,
    pub foreign_keys: Vec<ForeignKeyRef>,
    pub attributes: Vec<ColumnSpec>,
    /// Size hint for partitioned retrieval, not integrity-critical
    pub row_count: u64,
}

impl TableDescriptor {
    pub fn is_primary_key(&self, column: &str) -> bool {
        self.primary_keys.iter().any(|pk| pk.name == column)
    }

    pub fn is_foreign_key(&self, column: &str) -> bool {
        self.foreign_keys.iter().any(|fk| fk.column_name == column)
    }

    pub fn primary_key_names(&self) -> Vec<&str> {
        self.primary_keys.iter().map(|pk| pk.name.as_str()).collect()
    }

    pub fn foreign_key_names(&self) -> Vec<&str> {
        self.foreign_keys
            .iter()
            .map(|fk| fk.column_name.as_str())
            .collect()
    }
}
