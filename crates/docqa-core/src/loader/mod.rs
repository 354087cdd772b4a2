//! Normalizes source files into [`Chunk`]s.
//!
//! The format is chosen from the file extension through [`Format`]. Text,
//! word-processor and PDF files each become a single chunk tagged with
//! `source = <path>`; JSON files are expected to be pre-chunked and every
//! record becomes one chunk with its own metadata.
//!
//! [`load`] never fails: per-file problems are logged and yield an empty
//! result so a multi-file batch keeps going. [`try_load`] returns the
//! underlying error instead.

mod docx;
mod json;
mod pdf;
mod text;

use std::path::{Path, PathBuf};

use tracing::{debug, warn};
use walkdir::WalkDir;

use crate::error::{Error, Result};
use crate::types::Chunk;

pub use docx::paragraphs_from_document_xml;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Format {
    Json,
    Text,
    Docx,
    Pdf,
}

type LoadFn = fn(&Path) -> Result<Vec<Chunk>>;

const FORMATS: &[(&str, Format)] = &[
    ("json", Format::Json),
    ("txt", Format::Text),
    ("docx", Format::Docx),
    ("pdf", Format::Pdf),
];

impl Format {
    /// Looks up the format for `path` by its extension, case-insensitively.
    pub fn from_path(path: &Path) -> Option<Self> {
        let ext = path.extension()?.to_str()?.to_ascii_lowercase();
        FORMATS.iter().find(|(e, _)| *e == ext).map(|(_, f)| *f)
    }

    pub fn extension(self) -> &'static str {
        FORMATS
            .iter()
            .find(|(_, f)| *f == self)
            .map_or("", |(e, _)| e)
    }

    fn loader(self) -> LoadFn {
        match self {
            Self::Json => json::load,
            Self::Text => text::load,
            Self::Docx => docx::load,
            Self::Pdf => pdf::load,
        }
    }
}

/// Loads one file, returning the first error encountered.
pub fn try_load(path: &Path) -> Result<Vec<Chunk>> {
    let format = Format::from_path(path).ok_or_else(|| {
        let ext = path
            .extension()
            .map(|e| format!(".{}", e.to_string_lossy()))
            .unwrap_or_else(|| "(none)".to_string());
        Error::UnsupportedFormat(ext)
    })?;
    let chunks = (format.loader())(path)?;
    debug!(path = %path.display(), ?format, chunks = chunks.len(), "loaded document");
    Ok(chunks)
}

/// Loads one file; errors are logged and produce an empty result.
pub fn load(path: &Path) -> Vec<Chunk> {
    match try_load(path) {
        Ok(chunks) => chunks,
        Err(e) => {
            warn!(path = %path.display(), error = %e, "skipping document");
            Vec::new()
        }
    }
}

/// Loads each path in order and concatenates the results.
pub fn load_many<P: AsRef<Path>>(paths: &[P]) -> Vec<Chunk> {
    paths.iter().flat_map(|p| load(p.as_ref())).collect()
}

/// Loads every supported file under `root`, in sorted path order.
/// Hidden files and directories are skipped.
pub fn load_dir(root: &Path) -> Vec<Chunk> {
    let files = list_supported_files(root);
    if files.is_empty() {
        warn!(root = %root.display(), "no supported documents found");
    }
    load_many(&files)
}

/// Loads a single file, or every supported file when `path` is a directory.
pub fn load_path(path: &Path) -> Vec<Chunk> {
    if path.is_dir() { load_dir(path) } else { load(path) }
}

pub fn list_supported_files(root: &Path) -> Vec<PathBuf> {
    let mut files: Vec<PathBuf> = WalkDir::new(root)
        .follow_links(false)
        .into_iter()
        .filter_entry(|e| e.depth() == 0 || !is_hidden(e))
        .filter_map(|e| match e {
            Ok(e) => Some(e),
            Err(err) => {
                warn!(error = %err, "walk error");
                None
            }
        })
        .filter(|e| e.file_type().is_file() && Format::from_path(e.path()).is_some())
        .map(walkdir::DirEntry::into_path)
        .collect();
    files.sort();
    files
}

fn is_hidden(entry: &walkdir::DirEntry) -> bool {
    entry.file_name().to_str().is_some_and(|s| s.starts_with('.'))
}

/// Single-chunk result for whole-document formats; blank text yields nothing.
fn single_chunk(path: &Path, text: String) -> Vec<Chunk> {
    if text.trim().is_empty() {
        debug!(path = %path.display(), "document has no text");
        return Vec::new();
    }
    vec![Chunk::with_source(text, path.to_string_lossy())]
}

fn read_bytes(path: &Path) -> Result<Vec<u8>> {
    std::fs::read(path).map_err(|source| Error::Read { path: path.to_path_buf(), source })
}
