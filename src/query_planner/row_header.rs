//! Row header: the positional contract between a retrieval query and the
//! materializer. Entry `i` describes result column `i`.

use serde::{Deserialize, Serialize};

use crate::source_catalog::{ColumnRole, SqlType};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct HeaderEntry {
    pub name: String,
    pub role: ColumnRole,
    pub sql_type: SqlType,
    /// Position in the query result
    pub position: usize,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct RowHeader {
    entries: Vec<HeaderEntry>,
}

impl RowHeader {
    pub fn new() -> Self {
        Self::default()
    }

    /// Append a column; its position is the next free index.
    pub fn push(&mut self, name: impl Into<String>, role: ColumnRole, sql_type: SqlType) {
        let position = self.entries.len();
        self.entries.push(HeaderEntry {
            name: name.into(),
            role,
            sql_type,
            position,
        });
    }

    pub fn contains(&self, name: &str) -> bool {
        self.entries.iter().any(|e| e.name == name)
    }

    pub fn entries(&self) -> &[HeaderEntry] {
        &self.entries
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn column_names(&self) -> Vec<String> {
        self.entries.iter().map(|e| e.name.clone()).collect()
    }

    pub fn names_with_role(&self, role: ColumnRole) -> Vec<&str> {
        self.entries
            .iter()
            .filter(|e| e.role == role)
            .map(|e| e.name.as_str())
            .collect()
    }
}
