//! Range partitioning for parallel retrieval
//!
//! A table is split into `parallelism` contiguous ranges of `rows / parallelism`
//! rows; the remainder goes to the last range. The last range is open-ended so
//! that an undercounted size hint never drops rows.

use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct PartitionBounds {
    pub offset: u64,
    /// `None` = read to the end of the result
    pub limit: Option<u64>,
}

impl PartitionBounds {
    pub fn new(offset: u64, limit: Option<u64>) -> Self {
        Self { offset, limit }
    }
}

/// Compute partition bounds for a table.
///
/// Returns an empty vector when the table fits in one fetch unit or
/// parallelism is 1; the caller then runs a single unbounded query.
pub fn partition_bounds(row_count: u64, parallelism: usize, fetch_size: u64) -> Vec<PartitionBounds> {
    if parallelism <= 1 || row_count <= fetch_size.max(1) {
        return Vec::new();
    }

    let partitions = (parallelism as u64).min(row_count);
    let size = row_count / partitions;

    (0..partitions)
        .map(|i| {
            let offset = i * size;
            if i == partitions - 1 {
                PartitionBounds::new(offset, None)
            } else {
                PartitionBounds::new(offset, Some(size))
            }
        })
        .collect()
}
