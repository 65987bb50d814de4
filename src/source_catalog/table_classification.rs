//! Table classification
//!
//! Partitions introspected tables into vertex tables and edge tables.
//!
//! # Rule
//!
//! A table is a junction (many-to-many) table iff it has exactly two foreign
//! keys AND exactly two primary-key columns. Every other table is a vertex
//! table, and each foreign key of a vertex table yields one direct edge spec.
//!
//! The rule only looks at cardinalities. A two-foreign-key entity table with
//! an unrelated two-column composite key is classified as a junction table
//! too; that is accepted behavior.

use serde::{Deserialize, Serialize};

use super::column_info::{ColumnSpec, TableDescriptor};
use super::schema_types::SqlType;
use crate::source_db::TableRef;

/// A table whose rows become vertices
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct VertexTableSpec {
    pub table: TableDescriptor,
}

impl VertexTableSpec {
    pub fn table_name(&self) -> &str {
        &self.table.table_name
    }
}

/// A single foreign key between two vertex tables
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DirectEdgeSpec {
    /// Referencing table (holds the foreign key)
    pub start_table: String,
    /// Referenced table
    pub end_table: String,
    pub foreign_key_column: String,
    pub referenced_column: String,
}

impl DirectEdgeSpec {
    /// Join label separating this foreign key from every other one in a batch.
    pub fn join_label(&self) -> String {
        format!("{}#{}", self.start_table, self.foreign_key_column)
    }
}

/// One side of a junction table
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct JunctionEndpoint {
    /// Referenced vertex table
    pub table: String,
    /// Foreign-key column in the junction table
    pub column: String,
    pub sql_type: SqlType,
    /// Column of the referenced table holding the natural key
    pub referenced_column: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct JunctionEdgeSpec {
    pub source: TableRef,
    pub junction_table_name: String,
    pub endpoint_one: JunctionEndpoint,
    pub endpoint_two: JunctionEndpoint,
    pub extra_attributes: Vec<ColumnSpec>,
    pub row_count: u64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum EdgeTableSpec {
    Direct(DirectEdgeSpec),
    Junction(JunctionEdgeSpec),
}

impl EdgeTableSpec {
    pub fn is_directed(&self) -> bool {
        matches!(self, EdgeTableSpec::Direct(_))
    }

    /// Label given to edges built from this spec
    pub fn edge_label(&self) -> &str {
        match self {
            EdgeTableSpec::Direct(spec) => &spec.start_table,
            EdgeTableSpec::Junction(spec) => &spec.junction_table_name,
        }
    }
}

/// Whether a table is a pure junction table.
pub fn is_junction_table(table: &TableDescriptor) -> bool {
    table.foreign_keys.len() == 2 && table.primary_keys.len() == 2
}

/// Classify tables into vertex specs and edge specs.
///
/// Deterministic and order-preserving: vertex specs follow input order, edge
/// specs follow input order and, within a table, foreign-key order.
pub fn classify(tables: &[TableDescriptor]) -> (Vec<VertexTableSpec>, Vec<EdgeTableSpec>) {
    let mut vertex_specs = Vec::new();
    let mut edge_specs = Vec::new();

    for table in tables {
        if is_junction_table(table) {
            let one = &table.foreign_keys[0];
            let two = &table.foreign_keys[1];
            edge_specs.push(EdgeTableSpec::Junction(JunctionEdgeSpec {
                source: table.source.clone(),
                junction_table_name: table.table_name.clone(),
                endpoint_one: JunctionEndpoint {
                    table: one.referenced_table.clone(),
                    column: one.column_name.clone(),
                    sql_type: one.sql_type.clone(),
                    referenced_column: one.referenced_column.clone(),
                },
                endpoint_two: JunctionEndpoint {
                    table: two.referenced_table.clone(),
                    column: two.column_name.clone(),
                    sql_type: two.sql_type.clone(),
                    referenced_column: two.referenced_column.clone(),
                },
                extra_attributes: table.attributes.clone(),
                row_count: table.row_count,
            }));
            continue;
        }

        for fk in &table.foreign_keys {
            edge_specs.push(EdgeTableSpec::Direct(DirectEdgeSpec {
                start_table: table.table_name.clone(),
                end_table: fk.referenced_table.clone(),
                foreign_key_column: fk.column_name.clone(),
                referenced_column: fk.referenced_column.clone(),
            }));
        }

        vertex_specs.push(VertexTableSpec {
            table: table.clone(),
        });
    }

    log::info!(
        "Classified {} tables: {} vertex tables, {} edge specs",
        tables.len(),
        vertex_specs.len(),
        edge_specs.len()
    );

    (vertex_specs, edge_specs)
}
