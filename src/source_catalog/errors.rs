//! # Conversion Error Types
//!
//! ## Error Categories
//!
//! - **Fatal**: [`CatalogError`], the schema could not be enumerated. The run
//!   aborts.
//! - **Recoverable**: [`FieldError`], a single column or field is skipped and a
//!   warning is logged. Dangling references are never surfaced; they are only
//!   counted.
//!
//! Warnings should always name the table and the column:
//!
//! ```ignore
//! // ✅ GOOD: table and column context
//! log::warn!("{}", FieldError::UnsupportedColumnType {
//!     table: "shop.products".into(),
//!     column: "thumbnail".into(),
//!     sql_type: "bytea".into(),
//! });
//! ```

use thiserror::Error;

use crate::source_db::SourceError;

#[derive(Debug, Error)]
pub enum CatalogError {
    #[error("Introspection failed while {context}: {source}")]
    Introspection {
        context: String,
        #[source]
        source: SourceError,
    },
}

impl CatalogError {
    pub fn introspection(context: impl Into<String>, source: SourceError) -> Self {
        CatalogError::Introspection {
            context: context.into(),
            source,
        }
    }
}

#[derive(Debug, Clone, Error, PartialEq)]
pub enum FieldError {
    #[error("Unsupported column type `{sql_type}` for {table}.{column}, column dropped")]
    UnsupportedColumnType {
        table: String,
        column: String,
        sql_type: String,
    },

    #[error("Empty value field in {table}.{column} (position {position}): {reason}")]
    EmptyField {
        table: String,
        column: String,
        position: usize,
        reason: String,
    },

    #[error("Dangling reference {table}.{column} = {key}")]
    DanglingReference {
        table: String,
        column: String,
        key: String,
    },
}
