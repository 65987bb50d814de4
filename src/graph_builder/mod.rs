//! Graph construction
//!
//! Everything after introspection and planning: row materialization, vertex
//! and edge construction, key cleanup, and the pipeline tying them together.

pub mod edge_reconstructor;
pub mod elements;
pub mod errors;
pub mod pipeline;
pub mod properties;
pub mod property_cleaner;
pub mod row_materializer;
pub mod vertex_builder;

pub use edge_reconstructor::{EdgeReconstructor, EdgeSet, KeyIndex};
pub use elements::{
    Edge, ElementId, Graph, IdGenerator, SequentialIdGenerator, UuidIdGenerator, Vertex,
};
pub use errors::ConversionError;
pub use pipeline::{ConversionReport, RdbmsGraphConverter};
pub use properties::{Properties, PropertyValue, PRIMARY_KEY_IDENTIFIER};
pub use property_cleaner::PropertyCleaner;
pub use row_materializer::{MaterializedTable, RowMaterializer};
pub use vertex_builder::VertexBuilder;
