//! On-disk layout of a persisted index.
//!
//! A location is a directory holding `vectors-<generation>.bin` (bincode
//! matrix) and `docstore.json` (header plus id → chunk table). Both are
//! written to temp files and renamed into place, vectors first. The docstore
//! names the vector file it belongs to, so replacing it is the commit point:
//! readers see either the old pair or the new pair. The previous
//! generation's vector file is kept for readers still holding the old
//! docstore; anything older is removed.

use std::fs;
use std::io::{ErrorKind, Write};
use std::path::{Path, PathBuf};

use chrono::{DateTime, Utc};
use docqa_core::{Chunk, Error, Metric, Result};
use serde::{Deserialize, Serialize};
use tempfile::NamedTempFile;
use tracing::{debug, info, warn};

use crate::flat::IndexHandle;

pub const SCHEMA_VERSION: u32 = 1;
pub const DOCSTORE_FILE: &str = "docstore.json";
const VECTOR_PREFIX: &str = "vectors-";
const VECTOR_SUFFIX: &str = ".bin";

/// Docstore header describing one committed generation.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct IndexInfo {
    pub schema_version: u32,
    pub model_id: String,
    pub metric: Metric,
    pub dim: usize,
    pub count: usize,
    pub generation: u64,
    pub vector_file: String,
    /// blake3 hex digest of the vector file.
    pub checksum: String,
    pub created_at: DateTime<Utc>,
}

#[derive(Serialize, Deserialize)]
struct Docstore {
    header: IndexInfo,
    chunks: Vec<Chunk>,
}

#[derive(Serialize, Deserialize)]
struct VectorMatrix {
    dim: usize,
    count: usize,
    data: Vec<f32>,
}

/// True when `location` holds a committed index.
pub fn exists(location: &Path) -> bool {
    location.join(DOCSTORE_FILE).is_file()
}

/// Writes `handle` to `location` as a new generation and returns its header.
pub fn persist(handle: &IndexHandle, location: &Path) -> Result<IndexInfo> {
    fs::create_dir_all(location)?;

    let previous = read_info(location).ok().map(|info| info.vector_file);
    let generation = next_generation(location)?;
    let vector_file = vector_file_name(generation);

    let matrix = VectorMatrix { dim: handle.dim(), count: handle.len(), data: handle.raw_vectors().to_vec() };
    let bytes = bincode::serialize(&matrix).map_err(|e| Error::corrupt(location, format!("encode vectors: {e}")))?;
    let checksum = blake3::hash(&bytes).to_hex().to_string();
    write_atomic(location, &location.join(&vector_file), &bytes)?;
    debug!(file = %vector_file, bytes = bytes.len(), "vector file written");

    let header = IndexInfo {
        schema_version: SCHEMA_VERSION,
        model_id: handle.model_id().to_string(),
        metric: handle.metric(),
        dim: handle.dim(),
        count: handle.len(),
        generation,
        vector_file: vector_file.clone(),
        checksum,
        created_at: Utc::now(),
    };
    let docstore = Docstore { header, chunks: handle.chunks().to_vec() };
    let json = serde_json::to_vec(&docstore)?;
    write_atomic(location, &location.join(DOCSTORE_FILE), &json)?;
    sync_dir(location);

    remove_stale_generations(location, &vector_file, previous.as_deref());
    info!(location = %location.display(), generation, count = docstore.header.count, "index persisted");
    Ok(docstore.header)
}

/// Loads the committed index at `location`.
pub fn load(location: &Path) -> Result<IndexHandle> {
    let docstore = read_docstore(location)?;
    let header = docstore.header;

    if docstore.chunks.len() != header.count {
        return Err(Error::corrupt(
            location,
            format!("docstore lists {} chunks, header says {}", docstore.chunks.len(), header.count),
        ));
    }
    if header.dim == 0 {
        return Err(Error::corrupt(location, "header dimension is zero"));
    }
    if let Some(id) = docstore.chunks.iter().position(|c| c.content().trim().is_empty()) {
        return Err(Error::corrupt(location, format!("chunk {id} has no content")));
    }

    let vector_path = location.join(&header.vector_file);
    let bytes = match fs::read(&vector_path) {
        Ok(b) => b,
        Err(e) if e.kind() == ErrorKind::NotFound => {
            return Err(Error::corrupt(location, format!("vector file {} is missing", header.vector_file)));
        }
        Err(e) => return Err(e.into()),
    };
    if blake3::hash(&bytes).to_hex().as_str() != header.checksum {
        return Err(Error::corrupt(location, format!("checksum mismatch for {}", header.vector_file)));
    }
    let matrix: VectorMatrix =
        bincode::deserialize(&bytes).map_err(|e| Error::corrupt(location, format!("decode vectors: {e}")))?;
    if matrix.dim != header.dim || matrix.count != header.count || matrix.data.len() != matrix.dim * matrix.count {
        return Err(Error::corrupt(
            location,
            format!(
                "vector file holds {}x{} ({} values), docstore expects {}x{}",
                matrix.count,
                matrix.dim,
                matrix.data.len(),
                header.count,
                header.dim
            ),
        ));
    }

    debug!(location = %location.display(), generation = header.generation, count = header.count, "index loaded");
    Ok(IndexHandle::from_parts(header.model_id, header.metric, header.dim, matrix.data, docstore.chunks))
}

/// Reads only the docstore header of the committed index.
pub fn read_info(location: &Path) -> Result<IndexInfo> {
    read_docstore(location).map(|d| d.header)
}

fn read_docstore(location: &Path) -> Result<Docstore> {
    let path = location.join(DOCSTORE_FILE);
    let raw = match fs::read(&path) {
        Ok(raw) => raw,
        Err(e) if e.kind() == ErrorKind::NotFound => return Err(Error::IndexNotFound(location.to_path_buf())),
        Err(e) => return Err(e.into()),
    };
    let docstore: Docstore =
        serde_json::from_slice(&raw).map_err(|e| Error::corrupt(location, format!("{DOCSTORE_FILE}: {e}")))?;

    let header = &docstore.header;
    if header.schema_version != SCHEMA_VERSION {
        return Err(Error::corrupt(location, format!("unsupported schema version {}", header.schema_version)));
    }
    if parse_generation(&header.vector_file).is_none() {
        return Err(Error::corrupt(location, format!("invalid vector file name {:?}", header.vector_file)));
    }
    Ok(docstore)
}

fn vector_file_name(generation: u64) -> String {
    format!("{VECTOR_PREFIX}{generation}{VECTOR_SUFFIX}")
}

/// Generation number of a vector file name; `None` for anything else,
/// including names with path separators.
fn parse_generation(name: &str) -> Option<u64> {
    name.strip_prefix(VECTOR_PREFIX)?.strip_suffix(VECTOR_SUFFIX)?.parse().ok()
}

fn vector_files(location: &Path) -> Result<Vec<(u64, PathBuf)>> {
    let mut out = Vec::new();
    for entry in fs::read_dir(location)? {
        let entry = entry?;
        if let Some(generation) = entry.file_name().to_str().and_then(parse_generation) {
            out.push((generation, entry.path()));
        }
    }
    Ok(out)
}

fn next_generation(location: &Path) -> Result<u64> {
    let latest = vector_files(location)?.into_iter().map(|(g, _)| g).max();
    Ok(latest.map_or(1, |g| g + 1))
}

fn write_atomic(dir: &Path, target: &Path, bytes: &[u8]) -> Result<()> {
    let mut tmp = NamedTempFile::new_in(dir)?;
    tmp.write_all(bytes)?;
    tmp.as_file().sync_all()?;
    tmp.persist(target).map_err(|e| Error::Io(e.error))?;
    Ok(())
}

#[cfg(unix)]
fn sync_dir(dir: &Path) {
    if let Err(e) = fs::File::open(dir).and_then(|d| d.sync_all()) {
        debug!(dir = %dir.display(), error = %e, "directory fsync failed");
    }
}

#[cfg(not(unix))]
fn sync_dir(_dir: &Path) {}

fn remove_stale_generations(location: &Path, current: &str, previous: Option<&str>) {
    let files = match vector_files(location) {
        Ok(files) => files,
        Err(e) => {
            warn!(location = %location.display(), error = %e, "could not list old generations");
            return;
        }
    };
    for (_, path) in files {
        let name = path.file_name().and_then(|n| n.to_str()).unwrap_or_default();
        if name == current || Some(name) == previous {
            continue;
        }
        match fs::remove_file(&path) {
            Ok(()) => debug!(file = %path.display(), "removed old generation"),
            Err(e) => warn!(file = %path.display(), error = %e, "could not remove old generation"),
        }
    }
}
