//! In-process source database
//!
//! Backs tests and the `--fixture` mode of the CLI. A fixture is a YAML file:
//!
//! ```yaml
//! tables:
//!   - schema: hr            # optional
//!     name: employees
//!     columns:
//!       - { name: emp_no, type: integer }
//!       - { name: dept_no, type: char(4) }
//!     primary_key: [emp_no]
//!     foreign_keys:
//!       - { column: dept_no, references_table: departments, references_column: dept_no }
//!     rows:
//!       - [10001, d005]
//! ```
//!
//! `references_schema` defaults to the schema of the declaring table.

use async_trait::async_trait;
use serde::Deserialize;
use std::path::Path;

use super::models::{RawColumn, RawForeignKey, RawValue, SourceRow, SqlDialect, TableRef};
use super::{SourceDatabase, SourceError};
use crate::query_planner::{PartitionBounds, TableQuery};

#[derive(Debug, Clone, PartialEq)]
pub struct InMemoryTable {
    pub table: TableRef,
    pub columns: Vec<RawColumn>,
    pub primary_key: Vec<String>,
    pub foreign_keys: Vec<RawForeignKey>,
    pub rows: Vec<SourceRow>,
}

impl InMemoryTable {
    pub fn new(schema: Option<&str>, name: impl Into<String>) -> Self {
        Self {
            table: TableRef::new(schema.map(str::to_string), name),
            columns: Vec::new(),
            primary_key: Vec::new(),
            foreign_keys: Vec::new(),
            rows: Vec::new(),
        }
    }

    pub fn column(mut self, name: impl Into<String>, type_name: impl Into<String>) -> Self {
        self.columns.push(RawColumn {
            name: name.into(),
            type_name: type_name.into(),
        });
        self
    }

    pub fn primary_key(mut self, columns: &[&str]) -> Self {
        self.primary_key = columns.iter().map(|c| c.to_string()).collect();
        self
    }

    /// Declare a foreign key to a table in the same schema.
    pub fn foreign_key(
        self,
        column: impl Into<String>,
        referenced_table: impl Into<String>,
        referenced_column: impl Into<String>,
    ) -> Self {
        let schema = self.table.schema.clone();
        self.foreign_key_in(column, schema, referenced_table, referenced_column)
    }

    pub fn foreign_key_in(
        mut self,
        column: impl Into<String>,
        referenced_schema: Option<String>,
        referenced_table: impl Into<String>,
        referenced_column: impl Into<String>,
    ) -> Self {
        self.foreign_keys.push(RawForeignKey {
            column: column.into(),
            referenced_schema,
            referenced_table: referenced_table.into(),
            referenced_column: referenced_column.into(),
        });
        self
    }

    pub fn row(mut self, values: Vec<RawValue>) -> Self {
        self.rows.push(values);
        self
    }

    fn column_index(&self, name: &str) -> Option<usize> {
        self.columns.iter().position(|c| c.name == name)
    }
}

#[derive(Debug, Clone, Default)]
pub struct InMemorySource {
    dialect: SqlDialect,
    tables: Vec<InMemoryTable>,
}

impl InMemorySource {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_dialect(mut self, dialect: SqlDialect) -> Self {
        self.dialect = dialect;
        self
    }

    pub fn with_table(mut self, table: InMemoryTable) -> Self {
        self.tables.push(table);
        self
    }

    pub fn tables(&self) -> &[InMemoryTable] {
        &self.tables
    }

    pub fn from_yaml_str(yaml: &str) -> Result<Self, SourceError> {
        let fixture: FixtureFile =
            serde_yaml::from_str(yaml).map_err(|e| SourceError::Fixture(e.to_string()))?;
        fixture.into_source()
    }

    pub fn from_yaml_file(path: impl AsRef<Path>) -> Result<Self, SourceError> {
        let path = path.as_ref();
        let contents = std::fs::read_to_string(path)
            .map_err(|e| SourceError::Fixture(format!("{}: {}", path.display(), e)))?;
        log::info!("Loading fixture from {}", path.display());
        Self::from_yaml_str(&contents)
    }

    fn find(&self, table: &TableRef) -> Result<&InMemoryTable, SourceError> {
        let wanted = table.qualified_name();
        self.tables
            .iter()
            .find(|t| t.table.qualified_name() == wanted)
            .ok_or(SourceError::UnknownTable(wanted))
    }
}

#[async_trait]
impl SourceDatabase for InMemorySource {
    fn dialect(&self) -> SqlDialect {
        self.dialect
    }

    async fn list_tables(&self) -> Result<Vec<TableRef>, SourceError> {
        Ok(self.tables.iter().map(|t| t.table.clone()).collect())
    }

    async fn primary_keys(&self, table: &TableRef) -> Result<Vec<String>, SourceError> {
        Ok(self.find(table)?.primary_key.clone())
    }

    async fn foreign_keys(&self, table: &TableRef) -> Result<Vec<RawForeignKey>, SourceError> {
        Ok(self.find(table)?.foreign_keys.clone())
    }

    async fn columns(&self, table: &TableRef) -> Result<Vec<RawColumn>, SourceError> {
        Ok(self.find(table)?.columns.clone())
    }

    async fn approximate_row_count(&self, table: &TableRef) -> Result<u64, SourceError> {
        Ok(self.find(table)?.rows.len() as u64)
    }

    async fn execute_query(
        &self,
        query: &TableQuery,
        bounds: Option<PartitionBounds>,
    ) -> Result<Vec<SourceRow>, SourceError> {
        let table = self.find(&query.source)?;

        let indices = query
            .columns
            .iter()
            .map(|name| {
                table.column_index(name).ok_or_else(|| SourceError::Query {
                    sql: query.to_sql(bounds),
                    message: format!("column `{}` does not exist", name),
                })
            })
            .collect::<Result<Vec<_>, _>>()?;

        // Rows keep insertion order, which stands in for ORDER BY
        let (skip, take) = match bounds {
            Some(b) => (b.offset as usize, b.limit.map_or(usize::MAX, |l| l as usize)),
            None => (0, usize::MAX),
        };

        Ok(table
            .rows
            .iter()
            .skip(skip)
            .take(take)
            .map(|row| {
                indices
                    .iter()
                    .map(|&i| row.get(i).cloned().unwrap_or(RawValue::Null))
                    .collect()
            })
            .collect())
    }
}

#[derive(Debug, Deserialize)]
struct FixtureFile {
    #[serde(default)]
    dialect: Option<SqlDialect>,
    tables: Vec<FixtureTable>,
}

#[derive(Debug, Deserialize)]
struct FixtureTable {
    #[serde(default)]
    schema: Option<String>,
    name: String,
    columns: Vec<RawColumn>,
    #[serde(default)]
    primary_key: Vec<String>,
    #[serde(default)]
    foreign_keys: Vec<FixtureForeignKey>,
    #[serde(default)]
    rows: Vec<Vec<serde_yaml::Value>>,
}

#[derive(Debug, Deserialize)]
struct FixtureForeignKey {
    column: String,
    #[serde(default)]
    references_schema: Option<String>,
    references_table: String,
    references_column: String,
}

impl FixtureFile {
    fn into_source(self) -> Result<InMemorySource, SourceError> {
        let mut source = InMemorySource::new().with_dialect(self.dialect.unwrap_or_default());
        for table in self.tables {
            source = source.with_table(table.into_table()?);
        }
        Ok(source)
    }
}

impl FixtureTable {
    fn into_table(self) -> Result<InMemoryTable, SourceError> {
        let table = TableRef::new(self.schema.clone(), self.name);
        let width = self.columns.len();

        let mut rows = Vec::with_capacity(self.rows.len());
        for (i, row) in self.rows.iter().enumerate() {
            if row.len() != width {
                return Err(SourceError::Fixture(format!(
                    "{} row {} has {} values, expected {}",
                    table,
                    i,
                    row.len(),
                    width
                )));
            }
            rows.push(row.iter().map(RawValue::from_yaml).collect());
        }

        let foreign_keys = self
            .foreign_keys
            .into_iter()
            .map(|fk| RawForeignKey {
                column: fk.column,
                referenced_schema: fk.references_schema.or_else(|| self.schema.clone()),
                referenced_table: fk.references_table,
                referenced_column: fk.references_column,
            })
            .collect();

        Ok(InMemoryTable {
            table,
            columns: self.columns,
            primary_key: self.primary_key,
            foreign_keys,
            rows,
        })
    }
}
