pub mod column_info;
pub mod errors;
pub mod schema_discovery;
pub mod schema_types;
pub mod table_classification;

pub use column_info::{ColumnRole, ColumnSpec, ForeignKeyRef, TableDescriptor};
pub use errors::{CatalogError, FieldError};
pub use schema_discovery::SchemaCatalog;
pub use schema_types::SqlType;
pub use table_classification::{
    classify, is_junction_table, DirectEdgeSpec, EdgeTableSpec, JunctionEdgeSpec,
    JunctionEndpoint, VertexTableSpec,
};
