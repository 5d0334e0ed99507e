use anyhow::Result;
use std::hash::{Hash, Hasher};
use twox_hash::XxHash64;

use docseek_core::traits::EmbeddingProvider;

use crate::pool::l2_normalize;

/// Deterministic hashed bag-of-words embedder for tests and offline runs.
///
/// Tokens are lower-cased and stripped of surrounding punctuation, so texts
/// sharing words get a positive cosine similarity.
pub struct FakeEmbedder {
    dim: usize,
}

impl FakeEmbedder {
    pub fn new(dim: usize) -> Self { Self { dim: dim.max(1) } }

    fn embed_one(&self, text: &str) -> Vec<f32> {
        let mut v = vec![0f32; self.dim];
        for token in text.split_whitespace() {
            let token = token.trim_matches(|c: char| !c.is_alphanumeric()).to_lowercase();
            if token.is_empty() {
                continue;
            }
            let mut hasher = XxHash64::with_seed(0);
            token.hash(&mut hasher);
            let h = hasher.finish();
            let idx = (h % self.dim as u64) as usize;
            v[idx] += 0.5 + (((h >> 32) as u32) as f32) / (u32::MAX as f32);
        }
        l2_normalize(&mut v);
        v
    }
}

impl EmbeddingProvider for FakeEmbedder {
    fn dim(&self) -> usize { self.dim }

    fn embed_batch(&self, texts: &[String]) -> Result<Vec<Vec<f32>>> {
        Ok(texts.iter().map(|t| self.embed_one(t)).collect())
    }
}
