//! End-to-end conversion
//!
//! ```text
//! SchemaCatalog -> classify -> QueryPlanner -> RowMaterializer
//!     -> VertexBuilder + EdgeReconstructor -> PropertyCleaner -> Graph
//! ```
//!
//! Introspection runs on one handle and aborts the run on failure. Tables are
//! materialized concurrently, at most `parallelism` at a time; a table whose
//! retrieval fails is logged and left out. Joins start only once every table
//! has been materialized.

use futures_util::stream::{self, StreamExt};
use serde::Serialize;
use std::collections::HashMap;
use std::sync::Arc;

use super::edge_reconstructor::EdgeReconstructor;
use super::elements::{Graph, IdGenerator, UuidIdGenerator, Vertex};
use super::errors::ConversionError;
use super::property_cleaner::PropertyCleaner;
use super::row_materializer::{MaterializedTable, RowMaterializer};
use super::vertex_builder::VertexBuilder;
use crate::config::ConverterConfig;
use crate::query_planner::{PlanKind, PlannerOptions, QueryPlanner, TablePlan};
use crate::source_catalog::{classify, EdgeTableSpec, SchemaCatalog};
use crate::source_db::{InMemorySource, PostgresSource, SourceDatabase, SourceError};

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct ConversionReport {
    pub tables_introspected: usize,
    pub vertex_tables: usize,
    pub junction_tables: usize,
    /// Tables whose retrieval failed and were left out of the graph
    pub failed_tables: Vec<String>,
    pub vertices: usize,
    pub direct_edges: usize,
    pub junction_edges: usize,
    pub dangling_references: usize,
    pub skipped_fields: usize,
}

pub struct RdbmsGraphConverter {
    db: Arc<dyn SourceDatabase>,
    ids: Arc<dyn IdGenerator>,
    options: PlannerOptions,
}

impl RdbmsGraphConverter {
    pub fn new(db: Arc<dyn SourceDatabase>, ids: Arc<dyn IdGenerator>, options: PlannerOptions) -> Self {
        Self { db, ids, options }
    }

    /// Random identifiers, default parallelism and fetch size
    pub fn with_defaults(db: Arc<dyn SourceDatabase>) -> Self {
        Self::new(db, Arc::new(UuidIdGenerator), PlannerOptions::default())
    }

    /// Open the configured source (fixture or Postgres) with random identifiers.
    pub async fn from_config(config: &ConverterConfig) -> Result<Self, ConversionError> {
        let db: Arc<dyn SourceDatabase> = match (&config.fixture, config.pool_config()) {
            (Some(path), _) => Arc::new(InMemorySource::from_yaml_file(path)?),
            (None, Some(pool)) => {
                Arc::new(PostgresSource::connect(&pool, config.schema.clone()).await?)
            }
            (None, None) => {
                return Err(SourceError::Connection("no source configured".to_string()).into())
            }
        };
        Ok(Self::new(db, Arc::new(UuidIdGenerator), config.planner_options()))
    }

    pub async fn convert(&self) -> Result<(Graph, ConversionReport), ConversionError> {
        let db = self.db.as_ref();
        let mut report = ConversionReport::default();

        let tables = SchemaCatalog::introspect(db).await?;
        report.tables_introspected = tables.len();

        let (vertex_specs, edge_specs) = classify(&tables);
        report.vertex_tables = vertex_specs.len();
        report.junction_tables = edge_specs
            .iter()
            .filter(|s| matches!(s, EdgeTableSpec::Junction(_)))
            .count();
        log::info!(
            "Classified {} vertex tables, {} edge specs ({} junction tables)",
            report.vertex_tables,
            edge_specs.len(),
            report.junction_tables
        );

        let planner = QueryPlanner::new(db.dialect(), self.options);
        let plans = planner.plan_all(&vertex_specs, &edge_specs);

        let materialized = self.materialize_all(&plans, &mut report).await;

        let primary_keys: HashMap<&str, Vec<&str>> = vertex_specs
            .iter()
            .map(|spec| (spec.table_name(), spec.table.primary_key_names()))
            .collect();

        let builder = VertexBuilder::new(self.ids.as_ref());
        let mut vertices: Vec<Vertex> = Vec::new();
        let mut junction_tables: Vec<MaterializedTable> = Vec::new();
        for table in materialized {
            report.skipped_fields += table.skipped_fields;
            match table.kind {
                PlanKind::Vertex => {
                    let keys = primary_keys
                        .get(table.table_name.as_str())
                        .map(Vec::as_slice)
                        .unwrap_or(&[]);
                    vertices.extend(builder.build(&table, keys));
                }
                PlanKind::Junction => junction_tables.push(table),
            }
        }
        report.vertices = vertices.len();

        let edge_set = EdgeReconstructor::new(self.ids.as_ref()).reconstruct(
            &vertices,
            &edge_specs,
            &junction_tables,
        );
        report.direct_edges = edge_set.direct_edges;
        report.junction_edges = edge_set.junction_edges;
        report.dangling_references = edge_set.dangling_references;

        let cleaned = PropertyCleaner::new(&vertex_specs).clean_all(&vertices);
        let graph = Graph::assemble(cleaned, edge_set.edges);

        log::info!(
            "Built graph: {} vertices, {} edges ({} direct, {} junction)",
            report.vertices,
            graph.edges.len(),
            report.direct_edges,
            report.junction_edges
        );
        if report.dangling_references > 0 {
            log::debug!("{} dangling references dropped", report.dangling_references);
        }
        if !report.failed_tables.is_empty() {
            log::warn!(
                "{} tables failed and were left out: {}",
                report.failed_tables.len(),
                report.failed_tables.join(", ")
            );
        }

        Ok((graph, report))
    }

    /// Materialize every plan, at most `parallelism` tables at a time.
    /// Results keep plan order; failed tables are recorded and skipped.
    async fn materialize_all(
        &self,
        plans: &[TablePlan],
        report: &mut ConversionReport,
    ) -> Vec<MaterializedTable> {
        let materializer = RowMaterializer::new(self.db.as_ref());
        let results: Vec<_> = stream::iter(plans)
            .map(|plan| {
                let materializer = &materializer;
                async move { (plan, materializer.materialize(plan).await) }
            })
            .buffered(self.options.parallelism.max(1))
            .collect()
            .await;

        let mut tables = Vec::with_capacity(results.len());
        for (plan, result) in results {
            match result {
                Ok(table) => tables.push(table),
                Err(e) => {
                    log::warn!("Retrieval of {} failed, table skipped: {}", plan.table_name, e);
                    report.failed_tables.push(plan.table_name.clone());
                }
            }
        }
        tables
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::graph_builder::elements::SequentialIdGenerator;
    use crate::source_catalog::CatalogError;
    use crate::source_db::{InMemoryTable, MockSourceDatabase, RawColumn, RawValue, SqlDialect, TableRef};

    fn converter(db: impl SourceDatabase + 'static) -> RdbmsGraphConverter {
        RdbmsGraphConverter::new(
            Arc::new(db),
            Arc::new(SequentialIdGenerator::new()),
            PlannerOptions::default(),
        )
    }

    #[tokio::test]
    async fn test_introspection_failure_is_fatal() {
        let mut db = MockSourceDatabase::new();
        db.expect_list_tables()
            .returning(|| Err(SourceError::Connection("refused".to_string())));

        let result = converter(db).convert().await;
        assert!(matches!(
            result,
            Err(ConversionError::Introspection(CatalogError::Introspection { .. }))
        ));
    }

    #[tokio::test]
    async fn test_failed_table_is_isolated() {
        let mut db = MockSourceDatabase::new();
        db.expect_dialect().return_const(SqlDialect::PostgreSQL);
        db.expect_list_tables().returning(|| {
            Ok(vec![
                TableRef::new(None, "good"),
                TableRef::new(None, "bad"),
            ])
        });
        db.expect_primary_keys()
            .returning(|_| Ok(vec!["id".to_string()]));
        db.expect_foreign_keys().returning(|_| Ok(vec![]));
        db.expect_columns().returning(|_| {
            Ok(vec![RawColumn {
                name: "id".to_string(),
                type_name: "integer".to_string(),
            }])
        });
        db.expect_approximate_row_count().returning(|_| Ok(1));
        db.expect_execute_query().returning(|query, bounds| {
            if query.source.name == "bad" {
                Err(SourceError::Query {
                    sql: query.to_sql(bounds),
                    message: "permission denied".to_string(),
                })
            } else {
                Ok(vec![vec![RawValue::Int(1)]])
            }
        });

        let (graph, report) = converter(db).convert().await.unwrap();
        assert_eq!(graph.vertices.len(), 1);
        assert_eq!(graph.vertices[0].label, "good");
        assert_eq!(report.failed_tables, vec!["bad".to_string()]);
        assert_eq!(report.tables_introspected, 2);
    }

    #[tokio::test]
    async fn test_report_counts() {
        let db = InMemorySource::new()
            .with_table(
                InMemoryTable::new(None, "a")
                    .column("id", "integer")
                    .primary_key(&["id"])
                    .row(vec![RawValue::Int(1)])
                    .row(vec![RawValue::Int(2)]),
            )
            .with_table(
                InMemoryTable::new(None, "b")
                    .column("id", "integer")
                    .column("a_id", "integer")
                    .column("blob", "bytea")
                    .primary_key(&["id"])
                    .foreign_key("a_id", "a", "id")
                    .row(vec![RawValue::Int(10), RawValue::Int(1), RawValue::Null])
                    .row(vec![RawValue::Int(11), RawValue::Int(3), RawValue::Null]),
            );

        let (graph, report) = converter(db).convert().await.unwrap();
        assert_eq!(
            report,
            ConversionReport {
                tables_introspected: 2,
                vertex_tables: 2,
                junction_tables: 0,
                failed_tables: vec![],
                vertices: 4,
                direct_edges: 1,
                junction_edges: 0,
                dangling_references: 1,
                skipped_fields: 0,
            }
        );
        assert_eq!(graph.edges.len(), 1);
    }
}
