use candle_core::{DType, Result, Tensor};

/// Mean of the token states selected by `attention_mask`, then L2-normalized.
///
/// `hidden` is `[B, T, H]`, `attention_mask` is `[B, T]` (any numeric dtype,
/// 1 for real tokens, 0 for padding). Returns `[B, H]`.
pub fn masked_mean_l2(hidden: &Tensor, attention_mask: &Tensor) -> Result<Tensor> {
    let (_batch, _tokens, hidden_dim) = hidden.dims3()?;

    let mask = attention_mask.to_device(hidden.device())?.to_dtype(hidden.dtype())?;
    let mask_3d = mask.unsqueeze(2)?;
    let mask_broadcast = match mask_3d.broadcast_as(hidden.shape()) {
        Ok(m) => m,
        Err(_) => mask_3d.repeat((1, 1, hidden_dim))?,
    };
    let sum = (hidden * &mask_broadcast)?.sum(1)?;
    // an all-padding row would divide by zero
    let lengths = mask.sum(1)?.unsqueeze(1)?.clamp(1f64, f64::MAX)?;
    let mean = sum.broadcast_div(&lengths)?;

    let eps = match hidden.dtype() {
        DType::F16 | DType::BF16 => 1e-6,
        _ => 1e-12,
    };
    let norm = (mean.sqr()?.sum_keepdim(1)?.sqrt()? + eps)?;
    mean.broadcast_div(&norm)
}
