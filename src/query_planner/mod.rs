//! Query planning
//!
//! Turns classified table specs into retrieval plans: the projection, the
//! [`RowHeader`] describing each result position, the rendered query and the
//! optional partition bounds.
//!
//! | Spec            | Projection                                        |
//! |-----------------|---------------------------------------------------|
//! | vertex table    | primary keys ++ foreign keys ++ attributes        |
//! | junction table  | endpoint one ++ endpoint two ++ extra attributes  |
//!
//! A column is never projected twice: a primary-key column that is also a
//! foreign key keeps its primary-key role.

use serde::{Deserialize, Serialize};

pub mod partitioning;
pub mod row_header;
pub mod sql_query;

pub use partitioning::{partition_bounds, PartitionBounds};
pub use row_header::{HeaderEntry, RowHeader};
pub use sql_query::TableQuery;

use crate::source_catalog::{
    ColumnRole, EdgeTableSpec, JunctionEdgeSpec, TableDescriptor, VertexTableSpec,
};
use crate::source_db::SqlDialect;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PlanKind {
    Vertex,
    Junction,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TablePlan {
    /// Schema-qualified table name, carried with every materialized row
    pub table_name: String,
    pub kind: PlanKind,
    pub header: RowHeader,
    pub query: TableQuery,
    /// Empty when the table is fetched with a single query
    pub partitions: Vec<PartitionBounds>,
}

impl TablePlan {
    /// SQL text for every fetch this plan performs
    pub fn statements(&self) -> Vec<String> {
        if self.partitions.is_empty() {
            vec![self.query.to_sql(None)]
        } else {
            self.partitions
                .iter()
                .map(|b| self.query.to_sql(Some(*b)))
                .collect()
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PlannerOptions {
    /// Declared parallelism, used only for fetch partitioning
    pub parallelism: usize,
    /// Rows one fetch handles before partitioning kicks in
    pub fetch_size: u64,
}

impl Default for PlannerOptions {
    fn default() -> Self {
        Self {
            parallelism: 4,
            fetch_size: 10_000,
        }
    }
}

pub struct QueryPlanner {
    dialect: SqlDialect,
    options: PlannerOptions,
}

impl QueryPlanner {
    pub fn new(dialect: SqlDialect, options: PlannerOptions) -> Self {
        Self { dialect, options }
    }

    pub fn plan_vertex_table(&self, spec: &VertexTableSpec) -> TablePlan {
        let table = &spec.table;
        let mut header = RowHeader::new();

        for pk in &table.primary_keys {
            header.push(pk.name.clone(), ColumnRole::PrimaryKey, pk.sql_type.clone());
        }
        for fk in &table.foreign_keys {
            if !header.contains(&fk.column_name) {
                header.push(fk.column_name.clone(), ColumnRole::ForeignKey, fk.sql_type.clone());
            }
        }
        for attr in &table.attributes {
            header.push(attr.name.clone(), ColumnRole::Attribute, attr.sql_type.clone());
        }

        self.build_plan(PlanKind::Vertex, header, table)
    }

    pub fn plan_junction_table(&self, spec: &JunctionEdgeSpec) -> TablePlan {
        let mut header = RowHeader::new();
        header.push(
            spec.endpoint_one.column.clone(),
            ColumnRole::ForeignKey,
            spec.endpoint_one.sql_type.clone(),
        );
        header.push(
            spec.endpoint_two.column.clone(),
            ColumnRole::ForeignKey,
            spec.endpoint_two.sql_type.clone(),
        );
        for attr in &spec.extra_attributes {
            header.push(attr.name.clone(), ColumnRole::Attribute, attr.sql_type.clone());
        }

        let columns = header.column_names();
        let order_by = vec![
            spec.endpoint_one.column.clone(),
            spec.endpoint_two.column.clone(),
        ];
        TablePlan {
            table_name: spec.junction_table_name.clone(),
            kind: PlanKind::Junction,
            partitions: self.partitions_for(spec.row_count),
            query: TableQuery::new(spec.source.clone(), columns, order_by, self.dialect),
            header,
        }
    }

    /// Plan every vertex table and every junction table.
    ///
    /// Direct edge specs need no query of their own; they are resolved from
    /// vertex rows.
    pub fn plan_all(
        &self,
        vertex_specs: &[VertexTableSpec],
        edge_specs: &[EdgeTableSpec],
    ) -> Vec<TablePlan> {
        let vertex_plans = vertex_specs.iter().map(|spec| self.plan_vertex_table(spec));
        let junction_plans = edge_specs.iter().filter_map(|spec| match spec {
            EdgeTableSpec::Junction(junction) => Some(self.plan_junction_table(junction)),
            EdgeTableSpec::Direct(_) => None,
        });
        vertex_plans.chain(junction_plans).collect()
    }

    /// Partitioned fetches need a stable order: the primary key, or for
    /// keyless tables every orderable projected column. A keyless table with
    /// nothing orderable is fetched in one query.
    fn build_plan(&self, kind: PlanKind, header: RowHeader, table: &TableDescriptor) -> TablePlan {
        let columns = header.column_names();
        let order_by: Vec<String> = if table.primary_keys.is_empty() {
            header
                .entries()
                .iter()
                .filter(|e| e.sql_type.is_orderable())
                .map(|e| e.name.clone())
                .collect()
        } else {
            table.primary_keys.iter().map(|pk| pk.name.clone()).collect()
        };

        let partitions = if order_by.is_empty() {
            if table.row_count > self.options.fetch_size {
                log::debug!(
                    "{} has no orderable columns, fetching it in one query",
                    table.table_name
                );
            }
            Vec::new()
        } else {
            self.partitions_for(table.row_count)
        };

        TablePlan {
            table_name: table.table_name.clone(),
            kind,
            partitions,
            query: TableQuery::new(table.source.clone(), columns, order_by, self.dialect),
            header,
        }
    }

    fn partitions_for(&self, row_count: u64) -> Vec<PartitionBounds> {
        partition_bounds(row_count, self.options.parallelism, self.options.fetch_size)
    }
}
