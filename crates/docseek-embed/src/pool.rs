use anyhow::{ensure, Result};
use candle_core::{DType, Tensor};

/// Mean of the unmasked token states of `hidden` (`[B, T, H]`), L2-normalized
/// per row. `attention_mask` is `[B, T]` of 0/1 in any dtype.
pub fn masked_mean_l2(hidden: &Tensor, attention_mask: &Tensor) -> Result<Tensor> {
    let (batch, tokens, width) = hidden.dims3()?;
    ensure!(
        attention_mask.dims() == [batch, tokens],
        "mask shape {:?} does not match hidden [{batch}, {tokens}, _]",
        attention_mask.dims()
    );
    let eps = match hidden.dtype() {
        DType::F16 | DType::BF16 => 1e-4,
        _ => 1e-12,
    };

    // [B, T, 1] so it broadcasts across the hidden width.
    let mask = attention_mask.to_device(hidden.device())?.to_dtype(hidden.dtype())?.unsqueeze(2)?;
    let summed = hidden.broadcast_mul(&mask)?.sum(1)?;
    let counts = (mask.sum(1)? + eps)?;
    let mean = summed.broadcast_div(&counts)?;
    let norms = (mean.sqr()?.sum_keepdim(1)?.sqrt()? + eps)?;
    let pooled = mean.broadcast_div(&norms)?;
    ensure!(pooled.dims() == [batch, width], "pooled shape {:?}", pooled.dims());
    Ok(pooled)
}

/// Scales `v` to unit length in place; zero vectors are left untouched.
pub fn l2_normalize(v: &mut [f32]) {
    let norm = v.iter().map(|x| x * x).sum::<f32>().sqrt();
    if norm > 0.0 {
        for x in v.iter_mut() {
            *x /= norm;
        }
    }
}
