//! PostgreSQL source driver
//!
//! Metadata comes from `information_schema`; rows are decoded positionally by
//! the driver-reported type name.

use async_trait::async_trait;
use chrono::{DateTime, NaiveDate, NaiveDateTime, NaiveTime, Utc};
use rust_decimal::Decimal;
use sqlx::postgres::{PgPool, PgRow};
use sqlx::{Column, Row, TypeInfo};

use super::connection_pool::PoolConfig;
use super::models::{RawColumn, RawForeignKey, RawValue, SourceRow, SqlDialect, TableRef};
use super::{SourceDatabase, SourceError};
use crate::query_planner::{PartitionBounds, TableQuery};

const DEFAULT_SCHEMA: &str = "public";

const LIST_TABLES_SQL: &str = r#"
    SELECT table_schema, table_name
    FROM information_schema.tables
    WHERE table_type = 'BASE TABLE'
      AND table_schema NOT IN ('pg_catalog', 'information_schema')
      AND ($1::text IS NULL OR table_schema = $1)
    ORDER BY table_schema, table_name
"#;

const PRIMARY_KEYS_SQL: &str = r#"
    SELECT kcu.column_name
    FROM information_schema.table_constraints tc
    JOIN information_schema.key_column_usage kcu
      ON tc.constraint_schema = kcu.constraint_schema
     AND tc.constraint_name = kcu.constraint_name
    WHERE tc.constraint_type = 'PRIMARY KEY'
      AND tc.table_schema = $1
      AND tc.table_name = $2
    ORDER BY kcu.ordinal_position
"#;

// Read from pg_constraint rather than information_schema: constraint names are
// only unique per table, so they cannot identify a foreign key on their own.
// conkey and confkey are unnested together, pairing each referencing column
// with the referenced column at the same key position.
const FOREIGN_KEYS_SQL: &str = r#"
    SELECT a.attname::text AS column_name,
           rn.nspname::text AS referenced_schema,
           rt.relname::text AS referenced_table,
           ra.attname::text AS referenced_column
    FROM pg_catalog.pg_constraint c
    JOIN pg_catalog.pg_class t ON t.oid = c.conrelid
    JOIN pg_catalog.pg_namespace n ON n.oid = t.relnamespace
    JOIN pg_catalog.pg_class rt ON rt.oid = c.confrelid
    JOIN pg_catalog.pg_namespace rn ON rn.oid = rt.relnamespace
    CROSS JOIN LATERAL unnest(c.conkey, c.confkey) WITH ORDINALITY AS k(attnum, ref_attnum, ord)
    JOIN pg_catalog.pg_attribute a
      ON a.attrelid = c.conrelid AND a.attnum = k.attnum
    JOIN pg_catalog.pg_attribute ra
      ON ra.attrelid = c.confrelid AND ra.attnum = k.ref_attnum
    WHERE c.contype = 'f'
      AND n.nspname = $1
      AND t.relname = $2
    ORDER BY c.conname, k.ord
"#;

const COLUMNS_SQL: &str = r#"
    SELECT column_name,
           CASE WHEN data_type IN ('ARRAY', 'USER-DEFINED') THEN udt_name
                ELSE data_type END AS type_name
    FROM information_schema.columns
    WHERE table_schema = $1
      AND table_name = $2
    ORDER BY ordinal_position
"#;

pub struct PostgresSource {
    pool: PgPool,
    /// Restricts table discovery to one schema when set
    schema: Option<String>,
    dialect: SqlDialect,
}

impl PostgresSource {
    pub fn new(pool: PgPool, schema: Option<String>) -> Self {
        Self {
            pool,
            schema,
            dialect: SqlDialect::PostgreSQL,
        }
    }

    /// Connect and detect the dialect from the server's version banner, so
    /// wire-compatible servers get their own pagination and quoting.
    pub async fn connect(config: &PoolConfig, schema: Option<String>) -> Result<Self, SourceError> {
        let pool = config.connect().await?;
        let version: String = sqlx::query_scalar("SELECT version()")
            .fetch_one(&pool)
            .await
            .map_err(|e| SourceError::Connection(e.to_string()))?;
        let dialect = SqlDialect::from_product_name(&version);
        log::info!("Connected to {} ({})", version, dialect.as_str());

        Ok(Self {
            dialect,
            ..Self::new(pool, schema)
        })
    }

    pub fn pool(&self) -> &PgPool {
        &self.pool
    }

    pub async fn close(self) {
        log::info!("Closing source connection pool");
        self.pool.close().await;
    }

    fn schema_of<'a>(&self, table: &'a TableRef) -> &'a str {
        table.schema.as_deref().unwrap_or(DEFAULT_SCHEMA)
    }
}

fn metadata_error(table: &TableRef, e: sqlx::Error) -> SourceError {
    SourceError::Metadata {
        table: table.qualified_name(),
        message: e.to_string(),
    }
}

#[async_trait]
impl SourceDatabase for PostgresSource {
    fn dialect(&self) -> SqlDialect {
        self.dialect
    }

    async fn list_tables(&self) -> Result<Vec<TableRef>, SourceError> {
        let rows = sqlx::query(LIST_TABLES_SQL)
            .bind(self.schema.as_deref())
            .fetch_all(&self.pool)
            .await
            .map_err(|e| SourceError::Metadata {
                table: "*".to_string(),
                message: e.to_string(),
            })?;

        rows.iter()
            .map(|row| {
                let schema: String = row.try_get("table_schema").map_err(|e| {
                    SourceError::Metadata {
                        table: "*".to_string(),
                        message: e.to_string(),
                    }
                })?;
                let name: String = row.try_get("table_name").map_err(|e| {
                    SourceError::Metadata {
                        table: "*".to_string(),
                        message: e.to_string(),
                    }
                })?;
                Ok(TableRef::new(Some(schema), name))
            })
            .collect()
    }

    async fn primary_keys(&self, table: &TableRef) -> Result<Vec<String>, SourceError> {
        let rows = sqlx::query(PRIMARY_KEYS_SQL)
            .bind(self.schema_of(table))
            .bind(&table.name)
            .fetch_all(&self.pool)
            .await
            .map_err(|e| metadata_error(table, e))?;

        rows.iter()
            .map(|row| row.try_get::<String, _>("column_name"))
            .collect::<Result<Vec<_>, _>>()
            .map_err(|e| metadata_error(table, e))
    }

    async fn foreign_keys(&self, table: &TableRef) -> Result<Vec<RawForeignKey>, SourceError> {
        let rows = sqlx::query(FOREIGN_KEYS_SQL)
            .bind(self.schema_of(table))
            .bind(&table.name)
            .fetch_all(&self.pool)
            .await
            .map_err(|e| metadata_error(table, e))?;

        let mut keys = Vec::with_capacity(rows.len());
        for row in &rows {
            keys.push(RawForeignKey {
                column: row
                    .try_get("column_name")
                    .map_err(|e| metadata_error(table, e))?,
                referenced_schema: row
                    .try_get("referenced_schema")
                    .map_err(|e| metadata_error(table, e))?,
                referenced_table: row
                    .try_get("referenced_table")
                    .map_err(|e| metadata_error(table, e))?,
                referenced_column: row
                    .try_get("referenced_column")
                    .map_err(|e| metadata_error(table, e))?,
            });
        }
        Ok(keys)
    }

    async fn columns(&self, table: &TableRef) -> Result<Vec<RawColumn>, SourceError> {
        let rows = sqlx::query(COLUMNS_SQL)
            .bind(self.schema_of(table))
            .bind(&table.name)
            .fetch_all(&self.pool)
            .await
            .map_err(|e| metadata_error(table, e))?;

        let mut columns = Vec::with_capacity(rows.len());
        for row in &rows {
            columns.push(RawColumn {
                name: row
                    .try_get("column_name")
                    .map_err(|e| metadata_error(table, e))?,
                type_name: row
                    .try_get("type_name")
                    .map_err(|e| metadata_error(table, e))?,
            });
        }
        Ok(columns)
    }

    async fn approximate_row_count(&self, table: &TableRef) -> Result<u64, SourceError> {
        let sql = format!(
            "SELECT COUNT(*) FROM {}",
            self.dialect().quote_table(table)
        );
        let count: i64 = sqlx::query_scalar(&sql)
            .fetch_one(&self.pool)
            .await
            .map_err(|e| metadata_error(table, e))?;
        Ok(count.max(0) as u64)
    }

    async fn execute_query(
        &self,
        query: &TableQuery,
        bounds: Option<PartitionBounds>,
    ) -> Result<Vec<SourceRow>, SourceError> {
        let sql = query.to_sql(bounds);
        log::debug!("Executing: {}", sql);

        let rows = sqlx::query(&sql)
            .fetch_all(&self.pool)
            .await
            .map_err(|e| SourceError::Query {
                sql: sql.clone(),
                message: e.to_string(),
            })?;

        Ok(rows.iter().map(decode_row).collect())
    }
}

/// Decode every column of a row by its reported type name.
fn decode_row(row: &PgRow) -> SourceRow {
    (0..row.columns().len())
        .map(|idx| decode_value(row, idx))
        .collect()
}

fn decode_value(row: &PgRow, idx: usize) -> RawValue {
    let type_name = row.columns()[idx].type_info().name().to_string();

    let decoded: Result<Option<RawValue>, sqlx::Error> = match type_name.as_str() {
        "INT2" => row
            .try_get::<Option<i16>, _>(idx)
            .map(|v| v.map(|i| RawValue::Int(i as i64))),
        "INT4" => row
            .try_get::<Option<i32>, _>(idx)
            .map(|v| v.map(|i| RawValue::Int(i as i64))),
        "INT8" => row.try_get::<Option<i64>, _>(idx).map(|v| v.map(RawValue::Int)),
        "FLOAT4" => row
            .try_get::<Option<f32>, _>(idx)
            .map(|v| v.map(|f| RawValue::Float(f as f64))),
        "FLOAT8" => row.try_get::<Option<f64>, _>(idx).map(|v| v.map(RawValue::Float)),
        "NUMERIC" => row
            .try_get::<Option<Decimal>, _>(idx)
            .map(|v| v.map(RawValue::Decimal)),
        "TEXT" | "VARCHAR" | "BPCHAR" | "NAME" => row
            .try_get::<Option<String>, _>(idx)
            .map(|v| v.map(RawValue::Text)),
        "BOOL" => row.try_get::<Option<bool>, _>(idx).map(|v| v.map(RawValue::Bool)),
        "DATE" => row
            .try_get::<Option<NaiveDate>, _>(idx)
            .map(|v| v.map(RawValue::Date)),
        "TIME" => row
            .try_get::<Option<NaiveTime>, _>(idx)
            .map(|v| v.map(RawValue::Time)),
        "TIMESTAMP" => row
            .try_get::<Option<NaiveDateTime>, _>(idx)
            .map(|v| v.map(RawValue::Timestamp)),
        "TIMESTAMPTZ" => row
            .try_get::<Option<DateTime<Utc>>, _>(idx)
            .map(|v| v.map(RawValue::TimestampTz)),
        "UUID" => row
            .try_get::<Option<uuid::Uuid>, _>(idx)
            .map(|v| v.map(RawValue::Uuid)),
        "JSON" | "JSONB" => row
            .try_get::<Option<serde_json::Value>, _>(idx)
            .map(|v| v.map(RawValue::Json)),
        "BYTEA" => row
            .try_get::<Option<Vec<u8>>, _>(idx)
            .map(|v| v.map(RawValue::Bytes)),
        _ => row
            .try_get::<Option<String>, _>(idx)
            .map(|v| v.map(RawValue::Text)),
    };

    match decoded {
        Ok(Some(value)) => value,
        Ok(None) => RawValue::Null,
        Err(e) => {
            log::debug!(
                "Could not decode column {} ({}): {}",
                row.columns()[idx].name(),
                type_name,
                e
            );
            RawValue::Undecodable(format!("driver could not decode {}: {}", type_name, e))
        }
    }
}
