//! Relational source collaborators
//!
//! The conversion core only needs metadata introspection and row cursors from
//! the source database. [`SourceDatabase`] is that seam; [`postgres_client`]
//! implements it over `sqlx`, [`in_memory`] over in-process tables (tests and
//! YAML fixtures).

use async_trait::async_trait;
use thiserror::Error;

use crate::query_planner::{PartitionBounds, TableQuery};

pub mod connection_pool;
pub mod in_memory;
pub mod models;
pub mod postgres_client;

pub use in_memory::{InMemorySource, InMemoryTable};
pub use models::{
    qualify, PaginationStyle, RawColumn, RawForeignKey, RawValue, SourceRow, SqlDialect, TableRef,
};
pub use postgres_client::PostgresSource;

/// Errors raised by a source driver
#[derive(Debug, Error)]
pub enum SourceError {
    #[error("Failed to connect to source database: {0}")]
    Connection(String),

    #[error("Metadata query failed for {table}: {message}")]
    Metadata { table: String, message: String },

    #[error("Query failed: {sql}: {message}")]
    Query { sql: String, message: String },

    #[error("Unknown table `{0}`")]
    UnknownTable(String),

    #[error("Failed to load fixture: {0}")]
    Fixture(String),
}

/// Database collaborator used by the conversion pipeline.
///
/// Metadata methods are called sequentially from a single task. `execute_query`
/// may be called concurrently, one call per table partition.
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait SourceDatabase: Send + Sync {
    /// Dialect used to render retrieval queries
    fn dialect(&self) -> SqlDialect;

    /// Every base table visible to the connection
    async fn list_tables(&self) -> Result<Vec<TableRef>, SourceError>;

    /// Primary-key column names, in key order
    async fn primary_keys(&self, table: &TableRef) -> Result<Vec<String>, SourceError>;

    async fn foreign_keys(&self, table: &TableRef) -> Result<Vec<RawForeignKey>, SourceError>;

    /// All columns, in table order
    async fn columns(&self, table: &TableRef) -> Result<Vec<RawColumn>, SourceError>;

    async fn approximate_row_count(&self, table: &TableRef) -> Result<u64, SourceError>;

    /// Run a planned retrieval query, optionally restricted to one partition.
    /// Rows are aligned with `query.columns`.
    async fn execute_query(
        &self,
        query: &TableQuery,
        bounds: Option<PartitionBounds>,
    ) -> Result<Vec<SourceRow>, SourceError>;
}
