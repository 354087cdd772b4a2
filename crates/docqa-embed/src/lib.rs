//! Embedding providers.
//!
//! [`BertEmbedder`] runs a BERT-family sentence encoder with candle and
//! mean-pools token states into one L2-normalized vector per input.
//! [`HashEmbedder`] is a weight-free stand-in for tests and offline runs.
//! Use [`embedder_from_settings`] to build whichever one configuration asks for.

mod bert;
mod device;
mod hash;
mod pool;
mod tokenize;

use std::path::Path;
use std::sync::Arc;

use docqa_core::config::{expand_path, EmbeddingBackend, EmbeddingSettings};
use docqa_core::{Embedder, Result};
use tracing::info;

pub use bert::{resolve_model_dir, BertEmbedder};
pub use device::select_device;
pub use hash::HashEmbedder;
pub use pool::masked_mean_l2;
pub use tokenize::tokenize_batch;

/// True when `APP_USE_FAKE_EMBEDDINGS` is `1` or `true`.
pub fn use_fake_embeddings() -> bool {
    std::env::var("APP_USE_FAKE_EMBEDDINGS")
        .ok()
        .is_some_and(|v| v == "1" || v.eq_ignore_ascii_case("true"))
}

/// Builds the embedder described by `settings`.
///
/// `APP_USE_FAKE_EMBEDDINGS` forces the hashing backend regardless of
/// `settings.backend`.
pub fn embedder_from_settings(settings: &EmbeddingSettings) -> Result<Arc<dyn Embedder>> {
    if use_fake_embeddings() || settings.backend == EmbeddingBackend::Hash {
        info!(dim = settings.hash_dim, "using hash embedder");
        return Ok(Arc::new(HashEmbedder::new(settings.hash_dim)));
    }
    let models_dir = expand_path(&settings.models_dir);
    load_bert(&settings.model, &models_dir, settings)
}

fn load_bert(model: &str, models_dir: &Path, settings: &EmbeddingSettings) -> Result<Arc<dyn Embedder>> {
    let dir = resolve_model_dir(model, models_dir)?;
    let embedder = BertEmbedder::load(model, &dir, settings.max_len, settings.batch_size)?;
    Ok(Arc::new(embedder))
}
