use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex, PoisonError};

use docqa_core::{Chunk, Embedder, Error, Result, SearchHit};
use docqa_index::IndexHandle;
use tracing::{debug, error, info};

/// Answers nearest-chunk queries against one persisted index.
///
/// The index is loaded on first use and kept; a failed load is retried on
/// the next call.
pub struct Retriever {
    embedder: Arc<dyn Embedder>,
    location: PathBuf,
    handle: Mutex<Option<Arc<IndexHandle>>>,
}

impl Retriever {
    pub fn new(embedder: Arc<dyn Embedder>, location: impl Into<PathBuf>) -> Self {
        Self { embedder, location: location.into(), handle: Mutex::new(None) }
    }

    /// A retriever over an already loaded index.
    pub fn from_handle(embedder: Arc<dyn Embedder>, location: impl Into<PathBuf>, handle: Arc<IndexHandle>) -> Self {
        Self { embedder, location: location.into(), handle: Mutex::new(Some(handle)) }
    }

    pub fn location(&self) -> &Path {
        &self.location
    }

    /// The cached index, loading it if needed.
    pub fn handle(&self) -> Result<Arc<IndexHandle>> {
        let mut slot = self.handle.lock().unwrap_or_else(PoisonError::into_inner);
        if let Some(handle) = slot.as_ref() {
            return Ok(Arc::clone(handle));
        }
        let handle = Arc::new(docqa_index::load(&self.location)?);
        info!(location = %self.location.display(), entries = handle.len(), model = handle.model_id(), "index loaded");
        *slot = Some(Arc::clone(&handle));
        Ok(handle)
    }

    /// Drops the cached index so the next query reloads it from disk.
    pub fn invalidate(&self) {
        *self.handle.lock().unwrap_or_else(PoisonError::into_inner) = None;
    }

    /// Top-`k` chunks for `query`, closest first. Errors are logged and
    /// produce an empty result.
    pub fn retrieve(&self, query: &str, k: usize) -> Vec<Chunk> {
        match self.try_retrieve(query, k) {
            Ok(hits) => hits.into_iter().map(|h| h.chunk).collect(),
            Err(e) => {
                error!(location = %self.location.display(), error = %e, "retrieval failed");
                Vec::new()
            }
        }
    }

    pub fn try_retrieve(&self, query: &str, k: usize) -> Result<Vec<SearchHit>> {
        let handle = self.handle()?;
        search_with(self.embedder.as_ref(), &handle, query, k)
    }
}

/// Embeds `query` and searches `handle`, refusing indexes built by another model.
fn search_with(embedder: &dyn Embedder, handle: &IndexHandle, query: &str, k: usize) -> Result<Vec<SearchHit>> {
    if handle.model_id() != embedder.model_id() {
        return Err(Error::ModelMismatch {
            index_model: handle.model_id().to_string(),
            query_model: embedder.model_id().to_string(),
        });
    }
    if k == 0 {
        return Ok(Vec::new());
    }
    let vector = embedder.embed(query)?;
    let hits = handle.search(&vector, k)?;
    debug!(k, hits = hits.len(), "retrieved");
    Ok(hits)
}
