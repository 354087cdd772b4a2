use std::panic::{catch_unwind, AssertUnwindSafe};
use std::path::Path;

use crate::error::{Error, Result};
use crate::types::Chunk;

/// Extracts text page by page; each page is terminated by a newline.
pub(super) fn load(path: &Path) -> Result<Vec<Chunk>> {
    let bytes = super::read_bytes(path)?;
    // pdf-extract panics on some malformed inputs instead of returning Err.
    let pages = catch_unwind(AssertUnwindSafe(|| pdf_extract::extract_text_from_mem_by_pages(&bytes)))
        .map_err(|_| Error::malformed(path, "PDF parser panicked"))?
        .map_err(|e| Error::malformed(path, e))?;

    let mut text = String::new();
    for page in pages {
        text.push_str(&page);
        text.push('\n');
    }
    Ok(super::single_chunk(path, text))
}
