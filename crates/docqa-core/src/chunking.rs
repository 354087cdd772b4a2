//! Optional splitting of oversized chunks.
//!
//! Loaders emit one chunk per text/docx/pdf document. When
//! `chunking.max_chars > 0` those chunks are split on paragraph boundaries,
//! and paragraphs that are still too long are packed word by word with an
//! optional overlap between consecutive pieces. A single word is never cut.

use serde_json::Value;

use crate::config::ChunkingSettings;
use crate::types::Chunk;

pub const CHUNK_INDEX_KEY: &str = "chunk_index";
pub const TOTAL_CHUNKS_KEY: &str = "total_chunks";

/// Applies the configured splitting to every chunk, preserving order.
/// Pieces inherit the parent's metadata plus `chunk_index`/`total_chunks`.
pub fn split_chunks(chunks: Vec<Chunk>, settings: &ChunkingSettings) -> Vec<Chunk> {
    if settings.max_chars == 0 {
        return chunks;
    }
    let mut out = Vec::with_capacity(chunks.len());
    for chunk in chunks {
        let pieces = split_text(chunk.content(), settings.max_chars, settings.overlap_words);
        if pieces.len() <= 1 {
            out.push(chunk);
            continue;
        }
        let total = pieces.len();
        for (i, piece) in pieces.into_iter().enumerate() {
            out.push(chunk.derive(
                piece,
                [
                    (CHUNK_INDEX_KEY.to_string(), Value::from(i)),
                    (TOTAL_CHUNKS_KEY.to_string(), Value::from(total)),
                ],
            ));
        }
    }
    out
}

/// Splits `text` into pieces of at most `max_chars` bytes where possible.
pub fn split_text(text: &str, max_chars: usize, overlap_words: usize) -> Vec<String> {
    if max_chars == 0 {
        return vec![text.to_string()];
    }
    let mut result = Vec::new();
    for para in text.split("\n\n") {
        let para = para.trim();
        if para.is_empty() {
            continue;
        }
        if para.len() <= max_chars {
            result.push(para.to_string());
        } else {
            result.extend(split_words(para, max_chars, overlap_words));
        }
    }
    result
}

fn split_words(text: &str, max_chars: usize, overlap_words: usize) -> Vec<String> {
    let words: Vec<&str> = text.split_whitespace().collect();
    let mut pieces = Vec::new();
    let mut start = 0;
    while start < words.len() {
        let mut end = start;
        let mut len = 0;
        while end < words.len() {
            let add = words[end].len() + usize::from(end > start);
            if end > start && len + add > max_chars {
                break;
            }
            len += add;
            end += 1;
        }
        pieces.push(words[start..end].join(" "));
        if end >= words.len() {
            break;
        }
        // step back for overlap but always advance by at least one word
        start = end - overlap_words.min(end - start - 1);
    }
    pieces
}
