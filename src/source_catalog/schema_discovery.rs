//! Schema discovery for relational sources
//!
//! Walks every base table reported by the source and builds its
//! [`TableDescriptor`]: primary keys first (database order), then foreign keys
//! with their referenced table and column, then the remaining columns as
//! attributes. Metadata calls run one after another on the same handle.

use log::{debug, info, warn};
use std::collections::HashMap;

use super::column_info::{ColumnRole, ColumnSpec, ForeignKeyRef, TableDescriptor};
use super::errors::{CatalogError, FieldError};
use super::schema_types::SqlType;
use crate::source_db::{RawColumn, SourceDatabase, TableRef};

pub struct SchemaCatalog;

impl SchemaCatalog {
    /// Introspect every base table visible to the connection.
    ///
    /// Any metadata failure aborts the whole run. A failed row count only
    /// degrades the partitioning hint to 0.
    pub async fn introspect(db: &dyn SourceDatabase) -> Result<Vec<TableDescriptor>, CatalogError> {
        let tables = db
            .list_tables()
            .await
            .map_err(|e| CatalogError::introspection("listing tables", e))?;

        info!("Discovered {} base tables", tables.len());

        let mut descriptors = Vec::with_capacity(tables.len());
        for table in &tables {
            descriptors.push(Self::describe_table(db, table).await?);
        }

        Ok(descriptors)
    }

    async fn describe_table(
        db: &dyn SourceDatabase,
        table: &TableRef,
    ) -> Result<TableDescriptor, CatalogError> {
        let table_name = table.qualified_name();

        let pk_names = db.primary_keys(table).await.map_err(|e| {
            CatalogError::introspection(format!("reading primary keys of {}", table_name), e)
        })?;

        let raw_fks = db.foreign_keys(table).await.map_err(|e| {
            CatalogError::introspection(format!("reading foreign keys of {}", table_name), e)
        })?;

        let columns = db.columns(table).await.map_err(|e| {
            CatalogError::introspection(format!("reading columns of {}", table_name), e)
        })?;

        let column_index: HashMap<&str, (usize, &RawColumn)> = columns
            .iter()
            .enumerate()
            .map(|(pos, col)| (col.name.as_str(), (pos, col)))
            .collect();

        let type_of = |name: &str| -> (usize, SqlType) {
            match column_index.get(name) {
                Some((pos, col)) => (*pos, SqlType::from_type_name(&col.type_name)),
                None => {
                    warn!(
                        "Key column {}.{} missing from column metadata",
                        table_name, name
                    );
                    (usize::MAX, SqlType::Other("unknown".to_string()))
                }
            }
        };

        let primary_keys: Vec<ColumnSpec> = pk_names
            .iter()
            .map(|name| {
                let (position, sql_type) = type_of(name);
                ColumnSpec::new(name.clone(), sql_type, ColumnRole::PrimaryKey, position)
            })
            .collect();

        let foreign_keys: Vec<ForeignKeyRef> = raw_fks
            .iter()
            .map(|fk| ForeignKeyRef {
                column_name: fk.column.clone(),
                sql_type: type_of(&fk.column).1,
                referenced_column: fk.referenced_column.clone(),
                referenced_table: fk.referenced_qualified_name(),
            })
            .collect();

        let mut attributes = Vec::new();
        for (position, column) in columns.iter().enumerate() {
            let is_key = pk_names.iter().any(|pk| pk == &column.name)
                || raw_fks.iter().any(|fk| fk.column == column.name);
            if is_key {
                continue;
            }

            let sql_type = SqlType::from_type_name(&column.type_name);
            if !sql_type.is_supported() {
                warn!(
                    "{}",
                    FieldError::UnsupportedColumnType {
                        table: table_name.clone(),
                        column: column.name.clone(),
                        sql_type: column.type_name.clone(),
                    }
                );
                continue;
            }

            attributes.push(ColumnSpec::new(
                column.name.clone(),
                sql_type,
                ColumnRole::Attribute,
                position,
            ));
        }

        let row_count = match db.approximate_row_count(table).await {
            Ok(count) => count,
            Err(e) => {
                warn!("Failed to get row count for {}: {}", table_name, e);
                0
            }
        };

        debug!(
            "Table {}: {} primary keys, {} foreign keys, {} attributes, ~{} rows",
            table_name,
            primary_keys.len(),
            foreign_keys.len(),
            attributes.len(),
            row_count
        );

        Ok(TableDescriptor {
            source: table.clone(),
            table_name,
            primary_keys,
            foreign_keys,
            attributes,
            row_count,
        })
    }
}
