use std::path::Path;

use crate::error::{Error, Result};
use crate::types::Chunk;

/// The whole file as one chunk. Content must be UTF-8.
pub(super) fn load(path: &Path) -> Result<Vec<Chunk>> {
    let bytes = super::read_bytes(path)?;
    let text = String::from_utf8(bytes).map_err(|e| Error::malformed(path, e))?;
    Ok(super::single_chunk(path, text))
}
