use std::path::PathBuf;

use thiserror::Error;

#[derive(Debug, Error)]
pub enum Error {
    #[error("unsupported file format: {0}")]
    UnsupportedFormat(String),

    #[error("malformed document {path}: {reason}")]
    Malformed { path: PathBuf, reason: String },

    #[error("failed to load embedding model '{model}': {reason}")]
    ModelLoad { model: String, reason: String },

    #[error("failed to encode input: {0}")]
    Encoding(String),

    #[error("no index found at {0}")]
    IndexNotFound(PathBuf),

    #[error("index at {path} is corrupt: {reason}")]
    IndexCorrupt { path: PathBuf, reason: String },

    #[error("dimension mismatch: expected {expected}, got {actual}")]
    DimensionMismatch { expected: usize, actual: usize },

    #[error("index was built with model '{index_model}' but the query embedder is '{query_model}'")]
    ModelMismatch { index_model: String, query_model: String },

    #[error("cannot build an index from zero entries or zero-length vectors")]
    EmptyIndex,

    #[error("failed to read {path}: {source}")]
    Read {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error(transparent)]
    Io(#[from] std::io::Error),

    #[error(transparent)]
    Json(#[from] serde_json::Error),

    #[error("invalid configuration: {0}")]
    InvalidConfig(String),

    #[error("answer generation failed: {0}")]
    Generation(String),
}

impl Error {
    pub fn model_load(model: impl Into<String>, reason: impl ToString) -> Self {
        Self::ModelLoad { model: model.into(), reason: reason.to_string() }
    }

    pub fn malformed(path: impl Into<PathBuf>, reason: impl ToString) -> Self {
        Self::Malformed { path: path.into(), reason: reason.to_string() }
    }

    pub fn corrupt(path: impl Into<PathBuf>, reason: impl ToString) -> Self {
        Self::IndexCorrupt { path: path.into(), reason: reason.to_string() }
    }
}

pub type Result<T> = std::result::Result<T, Error>;
