//! Domain types shared by the loader, the index and the retriever.

use serde::{Deserialize, Serialize};
use serde_json::Value;

/// Free-form provenance attached to a chunk. Keys keep insertion order.
pub type Metadata = serde_json::Map<String, Value>;

/// Metadata key naming the file or logical source a chunk came from.
pub const SOURCE_KEY: &str = "source";

/// A unit of retrievable text plus its provenance.
///
/// Serialized as `{"page_content": ..., "metadata": {...}}`, the same record
/// shape accepted by the JSON loader, so a docstore can be read back as input.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Chunk {
    #[serde(rename = "page_content")]
    content: String,
    #[serde(default)]
    metadata: Metadata,
}

impl Chunk {
    pub fn new(content: impl Into<String>, metadata: Metadata) -> Self {
        Self { content: content.into(), metadata }
    }

    /// A chunk whose only metadata is `source`.
    pub fn with_source(content: impl Into<String>, source: impl Into<String>) -> Self {
        let mut metadata = Metadata::new();
        metadata.insert(SOURCE_KEY.to_string(), Value::String(source.into()));
        Self::new(content, metadata)
    }

    pub fn content(&self) -> &str {
        &self.content
    }

    pub fn metadata(&self) -> &Metadata {
        &self.metadata
    }

    /// `metadata.source` rendered for display: strings verbatim, other
    /// values as JSON text.
    pub fn source(&self) -> Option<String> {
        match self.metadata.get(SOURCE_KEY)? {
            Value::String(s) => Some(s.clone()),
            Value::Null => None,
            other => Some(other.to_string()),
        }
    }

    /// Copy of this chunk carrying different content and extra metadata.
    pub fn derive(&self, content: impl Into<String>, extra: impl IntoIterator<Item = (String, Value)>) -> Self {
        let mut metadata = self.metadata.clone();
        metadata.extend(extra);
        Self::new(content, metadata)
    }
}

/// Distance function an index is built with. Fixed for the index lifetime.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Metric {
    /// Squared Euclidean distance.
    #[default]
    #[serde(alias = "l2")]
    Euclidean,
    /// `1 - cos(a, b)`.
    Cosine,
}

impl std::fmt::Display for Metric {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Euclidean => f.write_str("euclidean"),
            Self::Cosine => f.write_str("cosine"),
        }
    }
}

/// One nearest-neighbour result.
///
/// `id` is the entry's insertion position in the index. `distance` is the raw
/// metric value (lower is closer); `score` is derived from it so that higher
/// is always better.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SearchHit {
    pub id: u32,
    pub chunk: Chunk,
    pub distance: f32,
    pub score: f32,
}
