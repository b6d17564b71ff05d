use std::path::PathBuf;
use thiserror::Error;

/// Failures that abort an index build. A failed build never replaces the
/// previously published index.
#[derive(Debug, Error)]
pub enum BuildError {
    #[error("corpus not found: {0}")]
    CorpusMissing(PathBuf),
    #[error("corpus yielded no indexable documents")]
    EmptyCorpus,
    #[error("block {block_id} failed: {cause}")]
    BuildAborted { block_id: u64, cause: String },
    #[error(transparent)]
    Io(#[from] std::io::Error),
    #[error(transparent)]
    Json(#[from] serde_json::Error),
}

#[derive(Debug, Error)]
pub enum SearchError {
    #[error("query must not be blank")]
    EmptyQuery,
    #[error("index not built")]
    IndexMissing,
    #[error(transparent)]
    Io(#[from] std::io::Error),
    #[error(transparent)]
    Json(#[from] serde_json::Error),
}
