use std::path::Path;

use serde_json::Value;
use tracing::warn;

use crate::error::{Error, Result};
use crate::types::{Chunk, Metadata};

/// Reads a JSON array of `{"page_content": str, "metadata": {...}}` records.
/// Records without usable text are skipped.
pub(super) fn load(path: &Path) -> Result<Vec<Chunk>> {
    let bytes = super::read_bytes(path)?;
    let data: Value = serde_json::from_slice(&bytes).map_err(|e| Error::malformed(path, e))?;
    let Value::Array(records) = data else {
        return Err(Error::malformed(path, "expected a JSON array of records"));
    };

    let mut chunks = Vec::with_capacity(records.len());
    for (i, record) in records.into_iter().enumerate() {
        let Value::Object(mut obj) = record else {
            warn!(path = %path.display(), record = i, "record is not an object");
            continue;
        };
        let content = match obj.remove("page_content") {
            Some(Value::String(s)) if !s.trim().is_empty() => s,
            _ => {
                warn!(path = %path.display(), record = i, "record has no page_content");
                continue;
            }
        };
        let metadata = match obj.remove("metadata") {
            Some(Value::Object(m)) => m,
            _ => Metadata::new(),
        };
        chunks.push(Chunk::new(content, metadata));
    }
    Ok(chunks)
}
