use std::path::{Path, PathBuf};
use std::time::Instant;

use candle_core::{Device, Tensor};
use candle_nn::VarBuilder;
use candle_transformers::models::bert::{BertModel, Config as BertConfig, DTYPE};
use docqa_core::{Embedder, Error, Result};
use tokenizers::{Tokenizer, TruncationParams};
use tracing::{debug, info};

use crate::device::select_device;
use crate::pool::masked_mean_l2;
use crate::tokenize::tokenize_batch;

const TOKENIZER_FILE: &str = "tokenizer.json";
const CONFIG_FILE: &str = "config.json";
const SAFETENSORS_FILE: &str = "model.safetensors";
const PICKLE_FILE: &str = "pytorch_model.bin";

/// Sentence embedder backed by a BERT-family encoder (e.g. all-MiniLM-L6-v2).
pub struct BertEmbedder {
    model: BertModel,
    tokenizer: Tokenizer,
    device: Device,
    model_id: String,
    dim: usize,
    max_len: usize,
    batch_size: usize,
}

impl BertEmbedder {
    /// Loads tokenizer, config and weights from `model_dir`.
    ///
    /// `model_id` is what gets recorded in indexes built with this embedder.
    pub fn load(model_id: &str, model_dir: &Path, max_len: usize, batch_size: usize) -> Result<Self> {
        let started = Instant::now();
        let device = select_device();
        info!(model = model_id, dir = %model_dir.display(), "loading embedding model");

        let tokenizer_path = model_dir.join(TOKENIZER_FILE);
        let mut tokenizer = Tokenizer::from_file(&tokenizer_path)
            .map_err(|e| Error::model_load(model_id, format!("{}: {e}", tokenizer_path.display())))?;
        // padding is done per mini-batch
        tokenizer.with_padding(None);

        let config_path = model_dir.join(CONFIG_FILE);
        let raw = std::fs::read_to_string(&config_path)
            .map_err(|e| Error::model_load(model_id, format!("{}: {e}", config_path.display())))?;
        let config: BertConfig = serde_json::from_str(&raw)
            .map_err(|e| Error::model_load(model_id, format!("{}: {e}", config_path.display())))?;
        let position_limit = read_usize(&raw, "max_position_embeddings").unwrap_or(512);
        let max_len = max_len.min(position_limit).max(1);
        tokenizer
            .with_truncation(Some(TruncationParams { max_length: max_len, ..Default::default() }))
            .map_err(|e| Error::model_load(model_id, format!("truncation: {e}")))?;

        let vb = weights(model_id, model_dir, &device)?;
        let model = BertModel::load(vb, &config).map_err(|e| Error::model_load(model_id, e))?;
        let dim = read_usize(&raw, "hidden_size")
            .ok_or_else(|| Error::model_load(model_id, "config.json has no hidden_size"))?;

        info!(model = model_id, dim, max_len, elapsed_ms = started.elapsed().as_millis(), "embedding model ready");
        Ok(Self { model, tokenizer, device, model_id: model_id.to_string(), dim, max_len, batch_size: batch_size.max(1) })
    }

    fn forward(&self, texts: &[String]) -> candle_core::Result<Vec<Vec<f32>>> {
        let (input_ids, attention_mask) =
            tokenize_batch(&self.tokenizer, texts, &self.device).map_err(candle_core::Error::msg)?;
        let token_type_ids = input_ids.zeros_like()?;
        let hidden = self.model.forward(&input_ids, &token_type_ids, Some(&attention_mask))?;
        let pooled = masked_mean_l2(&hidden, &attention_mask)?;
        pooled.to_device(&Device::Cpu)?.to_vec2::<f32>()
    }
}

impl Embedder for BertEmbedder {
    fn model_id(&self) -> &str {
        &self.model_id
    }

    fn dim(&self) -> usize {
        self.dim
    }

    fn max_len(&self) -> usize {
        self.max_len
    }

    fn embed_batch(&self, texts: &[String]) -> Result<Vec<Vec<f32>>> {
        let mut out = Vec::with_capacity(texts.len());
        for batch in texts.chunks(self.batch_size) {
            let started = Instant::now();
            let vectors = self.forward(batch).map_err(|e| Error::Encoding(e.to_string()))?;
            debug!(batch = batch.len(), elapsed_ms = started.elapsed().as_millis(), "embedded batch");
            out.extend(vectors);
        }
        Ok(out)
    }
}

fn weights(model_id: &str, model_dir: &Path, device: &Device) -> Result<VarBuilder<'static>> {
    let safetensors = model_dir.join(SAFETENSORS_FILE);
    if safetensors.exists() {
        // SAFETY: the weights file is not modified while the model is alive.
        return unsafe { VarBuilder::from_mmaped_safetensors(&[safetensors], DTYPE, device) }
            .map_err(|e| Error::model_load(model_id, e));
    }
    let pickle = model_dir.join(PICKLE_FILE);
    if pickle.exists() {
        let tensors = candle_core::pickle::read_all(&pickle).map_err(|e| Error::model_load(model_id, e))?;
        let map: std::collections::HashMap<String, Tensor> = tensors.into_iter().collect();
        return Ok(VarBuilder::from_tensors(map, DTYPE, device));
    }
    Err(Error::model_load(
        model_id,
        format!("no {SAFETENSORS_FILE} or {PICKLE_FILE} in {}", model_dir.display()),
    ))
}

fn read_usize(config_json: &str, key: &str) -> Option<usize> {
    let value: serde_json::Value = serde_json::from_str(config_json).ok()?;
    value.get(key)?.as_u64().and_then(|v| usize::try_from(v).ok())
}

/// Finds the directory holding `model`'s files.
///
/// Tried in order: `model` itself as a path, `$APP_MODEL_DIR/<model>`, then
/// `<models_dir>/<model>`. A directory counts only if it has a tokenizer.
pub fn resolve_model_dir(model: &str, models_dir: &Path) -> Result<PathBuf> {
    let mut candidates = vec![docqa_core::config::expand_path(model)];
    if let Ok(root) = std::env::var("APP_MODEL_DIR") {
        candidates.push(docqa_core::config::expand_path(root).join(model));
    }
    candidates.push(models_dir.join(model));

    for dir in &candidates {
        if dir.join(TOKENIZER_FILE).is_file() {
            debug!(model, dir = %dir.display(), "resolved model directory");
            return Ok(dir.clone());
        }
    }
    let tried: Vec<String> = candidates.iter().map(|p| p.display().to_string()).collect();
    Err(Error::model_load(model, format!("model files not found (tried {})", tried.join(", "))))
}
