//! Edge reconstruction
//!
//! Edges are recovered by joining foreign-key values against the natural keys
//! of already built vertices. Keys are compared in canonical string form, so
//! an `int4` foreign key matches an `int8` primary key.
//!
//! Direct edges (one per foreign key of a vertex table):
//!
//! ```text
//! referencing vertex --fk value--> KeyIndex(referenced table, referenced column) --> edge
//! ```
//!
//! Junction edges (one pair per junction row), joined in two stages:
//!
//! ```text
//! (k1, k2, extra) ⋈ endpoint one on k1 ⋈ endpoint two on k2 --> one->two, two->one
//! ```
//!
//! Duplicate natural keys join as a multi-map: every matching vertex yields an
//! edge. Rows whose key finds no vertex are dropped and counted.

use std::collections::{HashMap, HashSet};

use super::elements::{Edge, ElementId, IdGenerator, Vertex};
use super::properties::Properties;
use super::row_materializer::MaterializedTable;
use crate::source_catalog::{DirectEdgeSpec, EdgeTableSpec, FieldError, JunctionEdgeSpec};

/// Immutable natural-key lookup, built once and borrowed by every join.
///
/// Maps `(table, column)` to `canonical key -> vertex ids`.
#[derive(Debug, Default)]
pub struct KeyIndex {
    lookups: HashMap<(String, String), HashMap<String, Vec<ElementId>>>,
}

impl KeyIndex {
    /// Index `vertices` on every `(table, column)` pair in `wanted`.
    pub fn build<'s>(
        vertices: &[Vertex],
        wanted: impl IntoIterator<Item = (&'s str, &'s str)>,
    ) -> Self {
        let mut columns_by_table: HashMap<&str, HashSet<&str>> = HashMap::new();
        for (table, column) in wanted {
            columns_by_table.entry(table).or_default().insert(column);
        }

        let mut lookups: HashMap<(String, String), HashMap<String, Vec<ElementId>>> =
            HashMap::new();
        for (table, columns) in &columns_by_table {
            for column in columns {
                lookups.insert((table.to_string(), column.to_string()), HashMap::new());
            }
        }

        for vertex in vertices {
            let Some(columns) = columns_by_table.get(vertex.label.as_str()) else {
                continue;
            };
            for column in columns {
                let Some(value) = vertex.properties.get(*column) else {
                    continue;
                };
                if let Some(lookup) = lookups.get_mut(&(vertex.label.clone(), column.to_string())) {
                    lookup
                        .entry(value.canonical_key())
                        .or_default()
                        .push(vertex.id);
                }
            }
        }

        Self { lookups }
    }

    /// Vertex ids of `table` whose `column` has the canonical value `key`.
    pub fn lookup(&self, table: &str, column: &str, key: &str) -> &[ElementId] {
        self.lookups
            .get(&(table.to_string(), column.to_string()))
            .and_then(|m| m.get(key))
            .map(Vec::as_slice)
            .unwrap_or(&[])
    }
}

#[derive(Debug, Default)]
pub struct EdgeSet {
    pub edges: Vec<Edge>,
    pub direct_edges: usize,
    pub junction_edges: usize,
    /// Foreign-key values that matched no vertex
    pub dangling_references: usize,
}

pub struct EdgeReconstructor<'a> {
    ids: &'a dyn IdGenerator,
}

impl<'a> EdgeReconstructor<'a> {
    pub fn new(ids: &'a dyn IdGenerator) -> Self {
        Self { ids }
    }

    /// Build all edges once every vertex and junction row is available.
    ///
    /// `junction_tables` holds the materialized rows of junction tables; a
    /// junction spec without rows (failed retrieval) contributes nothing.
    pub fn reconstruct(
        &self,
        vertices: &[Vertex],
        edge_specs: &[EdgeTableSpec],
        junction_tables: &[MaterializedTable],
    ) -> EdgeSet {
        let index = KeyIndex::build(vertices, lookup_columns(edge_specs));

        let mut by_label: HashMap<&str, Vec<&Vertex>> = HashMap::new();
        for vertex in vertices {
            by_label.entry(vertex.label.as_str()).or_default().push(vertex);
        }

        let mut set = EdgeSet::default();
        for spec in edge_specs {
            match spec {
                EdgeTableSpec::Direct(direct) => {
                    let referencing = by_label
                        .get(direct.start_table.as_str())
                        .map(Vec::as_slice)
                        .unwrap_or(&[]);
                    self.direct_edges(direct, referencing, &index, &mut set);
                }
                EdgeTableSpec::Junction(junction) => {
                    match junction_tables
                        .iter()
                        .find(|t| t.table_name == junction.junction_table_name)
                    {
                        Some(table) => self.junction_edges(junction, table, &index, &mut set),
                        None => log::debug!(
                            "No rows for junction table {}, skipping",
                            junction.junction_table_name
                        ),
                    }
                }
            }
        }

        log::debug!(
            "Reconstructed {} direct and {} junction edges, {} dangling references",
            set.direct_edges,
            set.junction_edges,
            set.dangling_references
        );
        set
    }

    fn direct_edges(
        &self,
        spec: &DirectEdgeSpec,
        referencing: &[&Vertex],
        index: &KeyIndex,
        set: &mut EdgeSet,
    ) {
        for vertex in referencing {
            let Some(value) = vertex.properties.get(&spec.foreign_key_column) else {
                continue;
            };
            let key = value.canonical_key();
            let targets = index.lookup(&spec.end_table, &spec.referenced_column, &key);
            if targets.is_empty() {
                set.dangling_references += 1;
                log::debug!(
                    "{} (join {})",
                    FieldError::DanglingReference {
                        table: spec.start_table.clone(),
                        column: spec.foreign_key_column.clone(),
                        key,
                    },
                    spec.join_label()
                );
                continue;
            }
            for target in targets {
                set.edges.push(Edge {
                    id: self.ids.new_edge_id(),
                    label: spec.start_table.clone(),
                    source: vertex.id,
                    target: *target,
                    properties: Properties::new(),
                });
                set.direct_edges += 1;
            }
        }
    }

    fn junction_edges(
        &self,
        spec: &JunctionEdgeSpec,
        table: &MaterializedTable,
        index: &KeyIndex,
        set: &mut EdgeSet,
    ) {
        let one = &spec.endpoint_one;
        let two = &spec.endpoint_two;

        for row in &table.rows {
            let (Some(k1), Some(k2)) = (row.get(&one.column), row.get(&two.column)) else {
                continue;
            };
            let extra: Properties = row
                .iter()
                .filter(|(name, _)| **name != one.column && **name != two.column)
                .map(|(name, value)| (name.clone(), value.clone()))
                .collect();

            let k1 = k1.canonical_key();
            let sources = index.lookup(&one.table, &one.referenced_column, &k1);
            if sources.is_empty() {
                set.dangling_references += 1;
                log::debug!(
                    "{}",
                    FieldError::DanglingReference {
                        table: spec.junction_table_name.clone(),
                        column: one.column.clone(),
                        key: k1,
                    }
                );
                continue;
            }

            let k2 = k2.canonical_key();
            let targets = index.lookup(&two.table, &two.referenced_column, &k2);
            if targets.is_empty() {
                set.dangling_references += 1;
                log::debug!(
                    "{}",
                    FieldError::DanglingReference {
                        table: spec.junction_table_name.clone(),
                        column: two.column.clone(),
                        key: k2,
                    }
                );
                continue;
            }

            for source in sources {
                for target in targets {
                    set.edges.push(self.junction_edge(spec, *source, *target, &extra));
                    set.edges.push(self.junction_edge(spec, *target, *source, &extra));
                    set.junction_edges += 2;
                }
            }
        }
    }

    fn junction_edge(
        &self,
        spec: &JunctionEdgeSpec,
        source: ElementId,
        target: ElementId,
        extra: &Properties,
    ) -> Edge {
        Edge {
            id: self.ids.new_edge_id(),
            label: spec.junction_table_name.clone(),
            source,
            target,
            properties: extra.clone(),
        }
    }
}

/// Every `(table, column)` an edge spec looks vertices up by.
fn lookup_columns(edge_specs: &[EdgeTableSpec]) -> Vec<(&str, &str)> {
    let mut wanted = Vec::new();
    for spec in edge_specs {
        match spec {
            EdgeTableSpec::Direct(d) => {
                wanted.push((d.end_table.as_str(), d.referenced_column.as_str()))
            }
            EdgeTableSpec::Junction(j) => {
                wanted.push((
                    j.endpoint_one.table.as_str(),
                    j.endpoint_one.referenced_column.as_str(),
                ));
                wanted.push((
                    j.endpoint_two.table.as_str(),
                    j.endpoint_two.referenced_column.as_str(),
                ));
            }
        }
    }
    wanted
}
