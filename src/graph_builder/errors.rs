use thiserror::Error;

use crate::source_catalog::CatalogError;
use crate::source_db::SourceError;

/// Run-level failures. Table-level retrieval failures never surface here;
/// they are logged and counted in the conversion report.
#[derive(Debug, Error)]
pub enum ConversionError {
    #[error(transparent)]
    Introspection(#[from] CatalogError),

    #[error("Source unavailable: {0}")]
    Source(#[from] SourceError),
}
