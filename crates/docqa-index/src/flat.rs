use docqa_core::{Chunk, Error, Metric, Result, SearchHit};
use tracing::debug;

use crate::metric::{distance, score};

/// In-memory exact nearest-neighbour index.
///
/// Vectors are stored row-major in one buffer; row `i` belongs to
/// `chunks[i]` and `i` is the entry's id. Entries are only ever appended.
#[derive(Debug, Clone, PartialEq)]
pub struct IndexHandle {
    model_id: String,
    metric: Metric,
    dim: usize,
    vectors: Vec<f32>,
    chunks: Vec<Chunk>,
}

impl IndexHandle {
    /// Builds a fresh index. Every vector must have the same non-zero length.
    pub fn build(model_id: impl Into<String>, metric: Metric, entries: Vec<(Vec<f32>, Chunk)>) -> Result<Self> {
        let dim = match entries.first() {
            Some((v, _)) if !v.is_empty() => v.len(),
            _ => return Err(Error::EmptyIndex),
        };
        let mut handle = Self {
            model_id: model_id.into(),
            metric,
            dim,
            vectors: Vec::with_capacity(dim * entries.len()),
            chunks: Vec::with_capacity(entries.len()),
        };
        handle.append(entries)?;
        Ok(handle)
    }

    /// Reassembles a handle from persisted parts; `vectors.len()` must equal
    /// `dim * chunks.len()`.
    pub(crate) fn from_parts(model_id: String, metric: Metric, dim: usize, vectors: Vec<f32>, chunks: Vec<Chunk>) -> Self {
        debug_assert_eq!(vectors.len(), dim * chunks.len());
        Self { model_id, metric, dim, vectors, chunks }
    }

    /// Appends entries after the existing ones. Nothing is added if any
    /// vector has the wrong dimension.
    pub fn append(&mut self, entries: Vec<(Vec<f32>, Chunk)>) -> Result<()> {
        if let Some((v, _)) = entries.iter().find(|(v, _)| v.len() != self.dim) {
            return Err(Error::DimensionMismatch { expected: self.dim, actual: v.len() });
        }
        for (vector, chunk) in entries {
            self.vectors.extend_from_slice(&vector);
            self.chunks.push(chunk);
        }
        Ok(())
    }

    /// The `k` nearest entries, closest first; equal distances keep
    /// insertion order.
    pub fn search(&self, query: &[f32], k: usize) -> Result<Vec<SearchHit>> {
        if query.len() != self.dim {
            return Err(Error::DimensionMismatch { expected: self.dim, actual: query.len() });
        }
        let k = k.min(self.len());
        if k == 0 {
            return Ok(Vec::new());
        }

        let mut scored: Vec<(f32, usize)> = self
            .vectors
            .chunks_exact(self.dim)
            .enumerate()
            .map(|(i, row)| (distance(self.metric, query, row), i))
            .collect();
        let by_distance = |a: &(f32, usize), b: &(f32, usize)| a.0.total_cmp(&b.0).then(a.1.cmp(&b.1));
        if k < scored.len() {
            scored.select_nth_unstable_by(k - 1, by_distance);
            scored.truncate(k);
        }
        scored.sort_unstable_by(by_distance);

        debug!(k, n = self.len(), "flat search");
        Ok(scored
            .into_iter()
            .map(|(d, i)| {
                #[allow(clippy::cast_possible_truncation)]
                let id = i as u32;
                SearchHit { id, chunk: self.chunks[i].clone(), distance: d, score: score(self.metric, d) }
            })
            .collect())
    }

    pub fn len(&self) -> usize {
        self.chunks.len()
    }

    pub fn is_empty(&self) -> bool {
        self.chunks.is_empty()
    }

    pub fn dim(&self) -> usize {
        self.dim
    }

    pub fn metric(&self) -> Metric {
        self.metric
    }

    /// Identifier of the embedding model the vectors came from.
    pub fn model_id(&self) -> &str {
        &self.model_id
    }

    pub fn chunks(&self) -> &[Chunk] {
        &self.chunks
    }

    pub fn vector(&self, id: usize) -> Option<&[f32]> {
        self.vectors.get(id * self.dim..(id + 1) * self.dim)
    }

    pub(crate) fn raw_vectors(&self) -> &[f32] {
        &self.vectors
    }
}
