//! Key bookkeeping removal
//!
//! Once every edge exists, key columns have done their job: relationships are
//! carried by edges. The cleaner strips the reserved identifier plus each
//! table's primary-key and foreign-key columns from its vertices.

use std::collections::{HashMap, HashSet};

use super::elements::Vertex;
use super::properties::PRIMARY_KEY_IDENTIFIER;
use crate::source_catalog::VertexTableSpec;

#[derive(Debug, Default)]
pub struct PropertyCleaner {
    /// Vertex label -> key columns to drop
    key_columns: HashMap<String, HashSet<String>>,
}

impl PropertyCleaner {
    pub fn new(vertex_specs: &[VertexTableSpec]) -> Self {
        let key_columns = vertex_specs
            .iter()
            .map(|spec| {
                let table = &spec.table;
                let columns = table
                    .primary_key_names()
                    .into_iter()
                    .chain(table.foreign_key_names())
                    .map(str::to_string)
                    .collect();
                (table.table_name.clone(), columns)
            })
            .collect();
        Self { key_columns }
    }

    /// A copy of `vertex` without key properties.
    pub fn clean(&self, vertex: &Vertex) -> Vertex {
        let keys = self.key_columns.get(&vertex.label);
        let properties = vertex
            .properties
            .iter()
            .filter(|(name, _)| {
                name.as_str() != PRIMARY_KEY_IDENTIFIER
                    && !keys.is_some_and(|k| k.contains(name.as_str()))
            })
            .map(|(name, value)| (name.clone(), value.clone()))
            .collect();

        Vertex {
            id: vertex.id,
            label: vertex.label.clone(),
            properties,
        }
    }

    pub fn clean_all(&self, vertices: &[Vertex]) -> Vec<Vertex> {
        vertices.iter().map(|v| self.clean(v)).collect()
    }
}
