//! Graph elements and identifier generation

use serde::Serialize;
use std::fmt;
use std::sync::atomic::{AtomicU64, Ordering};
use uuid::Uuid;

use super::properties::Properties;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize)]
#[serde(transparent)]
pub struct ElementId(pub Uuid);

impl fmt::Display for ElementId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Vertex {
    pub id: ElementId,
    /// Schema-qualified name of the source table
    pub label: String,
    pub properties: Properties,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Edge {
    pub id: ElementId,
    pub label: String,
    pub source: ElementId,
    pub target: ElementId,
    pub properties: Properties,
}

/// Hands out element identifiers. Shared across concurrent tasks.
pub trait IdGenerator: Send + Sync {
    fn new_vertex_id(&self) -> ElementId;
    fn new_edge_id(&self) -> ElementId;
}

/// Random v4 identifiers
#[derive(Debug, Default, Clone, Copy)]
pub struct UuidIdGenerator;

impl IdGenerator for UuidIdGenerator {
    fn new_vertex_id(&self) -> ElementId {
        ElementId(Uuid::new_v4())
    }

    fn new_edge_id(&self) -> ElementId {
        ElementId(Uuid::new_v4())
    }
}

/// Counter-based identifiers: `00000000-0000-0000-0000-000000000001`, ...
///
/// Vertices and edges draw from one counter, so identifiers stay unique across
/// element kinds. Two runs over the same data yield identical graphs.
#[derive(Debug, Default)]
pub struct SequentialIdGenerator {
    next: AtomicU64,
}

impl SequentialIdGenerator {
    pub fn new() -> Self {
        Self::default()
    }

    fn next_id(&self) -> ElementId {
        let n = self.next.fetch_add(1, Ordering::Relaxed) + 1;
        ElementId(Uuid::from_u128(n as u128))
    }
}

impl IdGenerator for SequentialIdGenerator {
    fn new_vertex_id(&self) -> ElementId {
        self.next_id()
    }

    fn new_edge_id(&self) -> ElementId {
        self.next_id()
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct Graph {
    pub vertices: Vec<Vertex>,
    pub edges: Vec<Edge>,
}

impl Graph {
    pub fn assemble(vertices: Vec<Vertex>, edges: Vec<Edge>) -> Self {
        Self { vertices, edges }
    }

    pub fn vertex(&self, id: ElementId) -> Option<&Vertex> {
        self.vertices.iter().find(|v| v.id == id)
    }

    pub fn vertices_with_label<'a>(&'a self, label: &str) -> impl Iterator<Item = &'a Vertex> {
        let label = label.to_string();
        self.vertices.iter().filter(move |v| v.label == label)
    }

    pub fn edges_with_label<'a>(&'a self, label: &str) -> impl Iterator<Item = &'a Edge> {
        let label = label.to_string();
        self.edges.iter().filter(move |e| e.label == label)
    }
}
