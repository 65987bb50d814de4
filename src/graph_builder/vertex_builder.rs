//! One vertex per vertex-table row

use super::elements::{IdGenerator, Vertex};
use super::properties::{composite_key, PropertyValue, PRIMARY_KEY_IDENTIFIER};
use super::row_materializer::MaterializedTable;

pub struct VertexBuilder<'a> {
    ids: &'a dyn IdGenerator,
}

impl<'a> VertexBuilder<'a> {
    pub fn new(ids: &'a dyn IdGenerator) -> Self {
        Self { ids }
    }

    /// Build the vertices of one table.
    ///
    /// Properties are the whole row, keys included, plus the canonical primary
    /// key under [`PRIMARY_KEY_IDENTIFIER`]. Rows without a complete primary
    /// key (no key declared, or a NULL key part) get no identifier property.
    pub fn build(&self, table: &MaterializedTable, primary_keys: &[&str]) -> Vec<Vertex> {
        table
            .rows
            .iter()
            .map(|row| {
                let mut properties = row.clone();
                if let Some(key) = composite_key(row, primary_keys) {
                    properties.insert(
                        PRIMARY_KEY_IDENTIFIER.to_string(),
                        PropertyValue::String(key),
                    );
                }
                Vertex {
                    id: self.ids.new_vertex_id(),
                    label: table.table_name.clone(),
                    properties,
                }
            })
            .collect()
    }
}
