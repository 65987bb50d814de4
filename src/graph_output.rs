//! JSON graph output
//!
//! ```json
//! {
//!   "vertices": [{"id": "...", "label": "hr.employees", "properties": {...}}],
//!   "edges": [{"id": "...", "label": "hr.dept_emp", "source": "...", "target": "...", "properties": {...}}]
//! }
//! ```

use std::fs::File;
use std::io::{BufWriter, Write};
use std::path::Path;
use thiserror::Error;

use crate::graph_builder::Graph;

#[derive(Debug, Error)]
pub enum OutputError {
    #[error("Failed to write graph: {0}")]
    Io(#[from] std::io::Error),

    #[error("Failed to serialize graph: {0}")]
    Serialization(#[from] serde_json::Error),
}

pub fn write_json<W: Write>(graph: &Graph, writer: W, pretty: bool) -> Result<(), OutputError> {
    let mut writer = BufWriter::new(writer);
    if pretty {
        serde_json::to_writer_pretty(&mut writer, graph)?;
    } else {
        serde_json::to_writer(&mut writer, graph)?;
    }
    writer.write_all(b"\n")?;
    writer.flush()?;
    Ok(())
}

pub fn write_json_file(graph: &Graph, path: impl AsRef<Path>, pretty: bool) -> Result<(), OutputError> {
    let path = path.as_ref();
    let file = File::create(path)?;
    write_json(graph, file, pretty)?;
    log::info!(
        "Wrote {} vertices and {} edges to {}",
        graph.vertices.len(),
        graph.edges.len(),
        path.display()
    );
    Ok(())
}
