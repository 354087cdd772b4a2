use candle_core::{Device, Tensor};
use docqa_core::{Error, Result};
use tokenizers::Tokenizer;

/// Encodes a mini-batch, pads every row to the longest one and returns
/// `(input_ids, attention_mask)`, both `[B, T]` u32 tensors.
///
/// Truncation to the model's token budget is configured on the tokenizer.
pub fn tokenize_batch(tokenizer: &Tokenizer, texts: &[String], device: &Device) -> Result<(Tensor, Tensor)> {
    let encodings = tokenizer
        .encode_batch(texts.to_vec(), true)
        .map_err(|e| Error::Encoding(format!("tokenization failed: {e}")))?;

    let pad_id = tokenizer
        .get_padding()
        .map(|p| p.pad_id)
        .or_else(|| tokenizer.token_to_id("[PAD]"))
        .unwrap_or(0);
    let width = encodings.iter().map(|e| e.get_ids().len()).max().unwrap_or(0).max(1);

    let mut ids = Vec::with_capacity(texts.len() * width);
    let mut mask = Vec::with_capacity(texts.len() * width);
    for enc in &encodings {
        let row_ids = enc.get_ids();
        let pad = width - row_ids.len();
        ids.extend_from_slice(row_ids);
        ids.extend(std::iter::repeat(pad_id).take(pad));
        mask.extend_from_slice(enc.get_attention_mask());
        mask.extend(std::iter::repeat(0u32).take(pad));
    }

    let to_tensor = |data: Vec<u32>| {
        Tensor::from_vec(data, (encodings.len(), width), device)
            .map_err(|e| Error::Encoding(format!("failed to build input tensor: {e}")))
    };
    Ok((to_tensor(ids)?, to_tensor(mask)?))
}
