use std::sync::Arc;

use docseek_core::traits::EmbeddingProvider;
use docseek_core::{Degradation, ScoreVector, Stage, StageResult};

use crate::similarity::cosine;

/// Embedding similarity between the query and each chunk, remapped from
/// cosine `[-1, 1]` to `[0, 1]`.
pub struct SemanticScorer {
    embedder: Arc<dyn EmbeddingProvider>,
}

impl SemanticScorer {
    pub fn new(embedder: Arc<dyn EmbeddingProvider>) -> Self { Self { embedder } }

    pub fn score(&self, query: &str, chunk_embeddings: &[Vec<f32>]) -> StageResult<ScoreVector> {
        if chunk_embeddings.is_empty() {
            return StageResult::Completed(Vec::new());
        }
        let fallback = || vec![0.0; chunk_embeddings.len()];
        let q = match self.embedder.embed(query) {
            Ok(q) => q,
            Err(e) => return StageResult::degraded(fallback(), Degradation::provider(Stage::Semantic, e)),
        };
        if let Some((i, c)) = chunk_embeddings.iter().enumerate().find(|(_, c)| c.len() != q.len()) {
            return StageResult::degraded(
                fallback(),
                Degradation::scoring(
                    Stage::Semantic,
                    format!("query embedding has dimension {}, chunk {} has {}", q.len(), i, c.len()),
                ),
            );
        }
        let scores: Vec<f32> = chunk_embeddings.iter().map(|c| (cosine(&q, c) + 1.0) / 2.0).collect();
        if scores.iter().any(|s| !s.is_finite()) {
            return StageResult::degraded(
                fallback(),
                Degradation::scoring(Stage::Semantic, "non-finite similarity"),
            );
        }
        tracing::debug!(chunks = scores.len(), dim = q.len(), "semantic scoring complete");
        StageResult::Completed(scores)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use anyhow::{anyhow, Result};

    struct Fixed(Vec<f32>);

    impl EmbeddingProvider for Fixed {
        fn dim(&self) -> usize { self.0.len() }
        fn embed_batch(&self, texts: &[String]) -> Result<Vec<Vec<f32>>> {
            Ok(texts.iter().map(|_| self.0.clone()).collect())
        }
    }

    struct Broken;

    impl EmbeddingProvider for Broken {
        fn dim(&self) -> usize { 2 }
        fn embed_batch(&self, _texts: &[String]) -> Result<Vec<Vec<f32>>> { Err(anyhow!("offline")) }
    }

    #[test]
    fn remaps_cosine_to_unit_interval() {
        let scorer = SemanticScorer::new(Arc::new(Fixed(vec![1.0, 0.0])));
        let scores = scorer.score("q", &[vec![1.0, 0.0], vec![0.0, 1.0], vec![-1.0, 0.0]]);
        assert!(!scores.is_degraded());
        let s = scores.value();
        assert!((s[0] - 1.0).abs() < 1e-6);
        assert!((s[1] - 0.5).abs() < 1e-6);
        assert!(s[2].abs() < 1e-6);
    }

    #[test]
    fn empty_collection_skips_the_provider() {
        let scorer = SemanticScorer::new(Arc::new(Broken));
        assert_eq!(scorer.score("q", &[]), StageResult::Completed(vec![]));
    }

    #[test]
    fn provider_failure_and_dimension_mismatch_degrade_to_zeros() {
        let broken = SemanticScorer::new(Arc::new(Broken)).score("q", &vec![vec![1.0, 0.0]; 3]);
        let (scores, degradation) = broken.into_parts();
        assert_eq!(scores, vec![0.0; 3]);
        assert_eq!(degradation.map(|d| d.kind), Some(docseek_core::DegradationKind::Provider));

        let mismatch = SemanticScorer::new(Arc::new(Fixed(vec![1.0, 0.0, 0.0]))).score("q", &[vec![1.0, 0.0]]);
        assert!(mismatch.is_degraded());
        assert_eq!(mismatch.value(), &vec![0.0]);
    }
}
