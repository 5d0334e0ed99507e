use anyhow::{anyhow, Result};
use candle_core::{Device, Tensor};
use tokenizers::{EncodeInput, Tokenizer};

/// XLM-RoBERTa padding token.
const PAD_ID: u32 = 1;

/// Ids, segment ids and attention mask of one encoded input, kept aligned.
#[derive(Debug, Clone, PartialEq)]
struct Encoded {
    ids: Vec<u32>,
    type_ids: Vec<u32>,
    mask: Vec<u32>,
}

impl Encoded {
    fn encode<'s, E: Into<EncodeInput<'s>>>(tokenizer: &Tokenizer, input: E) -> Result<Self> {
        let enc = tokenizer.encode(input, true).map_err(|e| anyhow!("Tokenization failed: {}", e))?;
        Ok(Self {
            ids: enc.get_ids().to_vec(),
            type_ids: enc.get_type_ids().to_vec(),
            mask: enc.get_attention_mask().to_vec(),
        })
    }

    fn len(&self) -> usize { self.ids.len() }

    /// Cuts to `max_len` tokens; the closing special token survives in the last slot.
    fn truncate(&mut self, max_len: usize) {
        if self.len() <= max_len || max_len == 0 {
            return;
        }
        let last = self.ids[self.len() - 1];
        self.ids.truncate(max_len);
        self.type_ids.truncate(max_len);
        self.mask.truncate(max_len);
        self.ids[max_len - 1] = last;
    }

    /// Pads with masked-out `PAD_ID` tokens up to `len`.
    fn pad(&mut self, len: usize) {
        let missing = len.saturating_sub(self.len());
        self.ids.extend(std::iter::repeat(PAD_ID).take(missing));
        self.type_ids.extend(std::iter::repeat(0).take(missing));
        self.mask.extend(std::iter::repeat(0).take(missing));
    }

    fn row(values: Vec<u32>, device: &Device) -> Result<Tensor> {
        let len = values.len();
        Ok(Tensor::from_iter(values, device)?.reshape((1, len))?)
    }
}

/// Encodes `text` into `(input_ids, attention_mask)` of shape `[1, max_len]`.
pub fn tokenize_on_device(tokenizer: &Tokenizer, text: &str, max_len: usize, device: &Device) -> Result<(Tensor, Tensor)> {
    let mut enc = Encoded::encode(tokenizer, text)?;
    enc.truncate(max_len);
    enc.pad(max_len);
    Ok((Encoded::row(enc.ids, device)?, Encoded::row(enc.mask, device)?))
}

/// Encodes a `(query, passage)` pair into `(input_ids, token_type_ids, attention_mask)`
/// of shape `[1, len]` with `len <= max_len`. No padding: pairs are scored one at a time.
pub fn tokenize_pair_on_device(
    tokenizer: &Tokenizer,
    query: &str,
    passage: &str,
    max_len: usize,
    device: &Device,
) -> Result<(Tensor, Tensor, Tensor)> {
    let mut enc = Encoded::encode(tokenizer, (query, passage))?;
    enc.truncate(max_len);
    Ok((
        Encoded::row(enc.ids, device)?,
        Encoded::row(enc.type_ids, device)?,
        Encoded::row(enc.mask, device)?,
    ))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn encoded(ids: &[u32]) -> Encoded {
        Encoded { ids: ids.to_vec(), type_ids: vec![0; ids.len()], mask: vec![1; ids.len()] }
    }

    #[test]
    fn truncation_keeps_closing_token() {
        let mut enc = encoded(&[0, 10, 11, 12, 13, 2]);
        enc.truncate(4);
        assert_eq!(enc.ids, vec![0, 10, 11, 2]);
        assert_eq!(enc.mask.len(), 4);

        let mut short = encoded(&[0, 10, 2]);
        short.truncate(4);
        assert_eq!(short.ids, vec![0, 10, 2]);
    }

    #[test]
    fn padding_is_masked_out() {
        let mut enc = encoded(&[0, 10, 2]);
        enc.pad(5);
        assert_eq!(enc.ids, vec![0, 10, 2, PAD_ID, PAD_ID]);
        assert_eq!(enc.mask, vec![1, 1, 1, 0, 0]);
        assert_eq!(enc.type_ids, vec![0; 5]);
    }
}
