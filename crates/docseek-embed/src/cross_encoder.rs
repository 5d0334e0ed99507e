//! Pairwise relevance providers.
//!
//! `CrossEncoderModel` runs a BERT sequence classifier (ms-marco MiniLM style)
//! over `(query, passage)` pairs and returns its raw logit. `TermOverlapRelevance`
//! is a deterministic stand-in used when no model is available.
use anyhow::{anyhow, Result};
use std::collections::HashSet;
use std::path::Path;

use candle_core::{DType, Device, IndexOp};
use candle_nn::{Linear, Module, VarBuilder};
use candle_transformers::models::bert::{BertModel, Config as BertConfig};
use tokenizers::Tokenizer;

use docseek_core::traits::RelevanceProvider;

use crate::model::{load_weights, select_device};
use crate::tokenize::tokenize_pair_on_device;

const MAX_LEN: usize = 512;

pub struct CrossEncoderModel {
    bert: BertModel,
    pooler: Linear,
    classifier: Linear,
    tokenizer: Tokenizer,
    device: Device,
}

impl CrossEncoderModel {
    pub fn load(model_dir: &Path) -> Result<Self> {
        let device = select_device();
        tracing::info!(dir = %model_dir.display(), "loading cross-encoder");
        let tokenizer_path = model_dir.join("tokenizer.json");
        let tokenizer = Tokenizer::from_file(&tokenizer_path)
            .map_err(|e| anyhow!("Failed to load tokenizer from {}: {}", tokenizer_path.display(), e))?;
        let config: BertConfig = serde_json::from_str(&std::fs::read_to_string(model_dir.join("config.json"))?)?;
        let weights = load_weights(model_dir, &device)?;
        let vb = VarBuilder::from_tensors(weights, DType::F32, &device);
        let bert = BertModel::load(vb.pp("bert"), &config)?;
        let pooler = candle_nn::linear(config.hidden_size, config.hidden_size, vb.pp("bert.pooler.dense"))?;
        let classifier = candle_nn::linear(config.hidden_size, 1, vb.pp("classifier"))?;
        Ok(Self { bert, pooler, classifier, tokenizer, device })
    }

    fn score_pair(&self, query: &str, passage: &str) -> Result<f32> {
        let (input_ids, token_type_ids, attention_mask) =
            tokenize_pair_on_device(&self.tokenizer, query, passage, MAX_LEN, &self.device)?;
        let hidden = self.bert.forward(&input_ids, &token_type_ids, Some(&attention_mask))?;
        let cls = hidden.i((.., 0, ..))?;
        let pooled = self.pooler.forward(&cls)?.tanh()?;
        let logits = self.classifier.forward(&pooled)?;
        logits
            .flatten_all()?
            .to_vec1::<f32>()?
            .first()
            .copied()
            .ok_or_else(|| anyhow!("classifier produced no logit"))
    }
}

impl RelevanceProvider for CrossEncoderModel {
    fn predict(&self, pairs: &[(String, String)]) -> Result<Vec<f32>> {
        pairs.iter().map(|(q, p)| self.score_pair(q, p)).collect()
    }
}

/// Fraction of distinct query terms that occur in the passage.
#[derive(Debug, Default, Clone, Copy)]
pub struct TermOverlapRelevance;

fn terms(text: &str) -> HashSet<String> {
    text.split_whitespace()
        .map(|w| w.trim_matches(|c: char| !c.is_alphanumeric()).to_lowercase())
        .filter(|w| !w.is_empty())
        .collect()
}

impl RelevanceProvider for TermOverlapRelevance {
    fn predict(&self, pairs: &[(String, String)]) -> Result<Vec<f32>> {
        Ok(pairs
            .iter()
            .map(|(query, passage)| {
                let query_terms = terms(query);
                if query_terms.is_empty() {
                    return 0.0;
                }
                let passage_terms = terms(passage);
                let matches = query_terms.intersection(&passage_terms).count();
                matches as f32 / query_terms.len() as f32
            })
            .collect())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn pair(q: &str, p: &str) -> (String, String) { (q.to_string(), p.to_string()) }

    #[test]
    fn overlap_counts_distinct_normalized_terms() {
        let scores = TermOverlapRelevance
            .predict(&[
                pair("quick fox", "The quick brown fox."),
                pair("quick fox", "a lazy dog"),
                pair("Quick quick", "QUICK!"),
                pair("...", "anything"),
            ])
            .unwrap();
        assert_eq!(scores, vec![1.0, 0.0, 1.0, 0.0]);
    }
}
