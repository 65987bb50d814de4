//! Retrieval query rendering

use serde::{Deserialize, Serialize};

use super::partitioning::PartitionBounds;
use crate::source_db::{PaginationStyle, SqlDialect, TableRef};

/// A projection over one table.
///
/// Kept structured so drivers that do not speak SQL (the in-memory source)
/// can execute it directly; SQL drivers call [`TableQuery::to_sql`].
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TableQuery {
    pub source: TableRef,
    pub columns: Vec<String>,
    /// Ordering applied to partitioned queries so ranges are disjoint
    pub order_by: Vec<String>,
    pub dialect: SqlDialect,
}

impl TableQuery {
    pub fn new(source: TableRef, columns: Vec<String>, order_by: Vec<String>, dialect: SqlDialect) -> Self {
        Self {
            source,
            columns,
            order_by,
            dialect,
        }
    }

    /// Render the query, restricted to `bounds` when given.
    pub fn to_sql(&self, bounds: Option<PartitionBounds>) -> String {
        let projection = if self.columns.is_empty() {
            "*".to_string()
        } else {
            self.columns
                .iter()
                .map(|c| self.dialect.quote_ident(c))
                .collect::<Vec<_>>()
                .join(", ")
        };

        let mut sql = format!(
            "SELECT {} FROM {}",
            projection,
            self.dialect.quote_table(&self.source)
        );

        let Some(bounds) = bounds else {
            return sql;
        };

        let ordering: Vec<String> = if self.order_by.is_empty() {
            // Positional ordering over the whole projection
            (1..=self.columns.len().max(1)).map(|i| i.to_string()).collect()
        } else {
            self.order_by
                .iter()
                .map(|c| self.dialect.quote_ident(c))
                .collect()
        };
        sql.push_str(&format!(" ORDER BY {}", ordering.join(", ")));

        match self.dialect.pagination() {
            PaginationStyle::LimitOffset => match (bounds.limit, self.dialect) {
                (Some(limit), _) => {
                    sql.push_str(&format!(" LIMIT {} OFFSET {}", limit, bounds.offset))
                }
                // MySQL and SQLite reject OFFSET without LIMIT
                (None, SqlDialect::MySQL) => sql.push_str(&format!(
                    " LIMIT 18446744073709551615 OFFSET {}",
                    bounds.offset
                )),
                (None, SqlDialect::SQLite) => {
                    sql.push_str(&format!(" LIMIT -1 OFFSET {}", bounds.offset))
                }
                (None, _) => sql.push_str(&format!(" OFFSET {}", bounds.offset)),
            },
            PaginationStyle::OffsetFetch => {
                sql.push_str(&format!(" OFFSET {} ROWS", bounds.offset));
                if let Some(limit) = bounds.limit {
                    sql.push_str(&format!(" FETCH NEXT {} ROWS ONLY", limit));
                }
            }
        }

        sql
    }
}
