//! Flat exact nearest-neighbour index with versioned on-disk persistence.

mod flat;
pub mod metric;
mod store;

pub use flat::IndexHandle;
pub use store::{exists, load, persist, read_info, IndexInfo, DOCSTORE_FILE, SCHEMA_VERSION};

use docqa_core::{Chunk, Metric, Result, SearchHit};

/// Builds a fresh index from `(vector, chunk)` pairs.
pub fn build(model_id: &str, metric: Metric, entries: Vec<(Vec<f32>, Chunk)>) -> Result<IndexHandle> {
    IndexHandle::build(model_id, metric, entries)
}

/// The `k` entries of `handle` nearest to `query`.
pub fn search(handle: &IndexHandle, query: &[f32], k: usize) -> Result<Vec<SearchHit>> {
    handle.search(query, k)
}
