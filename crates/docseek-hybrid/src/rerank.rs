use std::sync::Arc;

use docseek_core::traits::RelevanceProvider;
use docseek_core::{Degradation, ScoreVector, Stage, StageResult};

/// Score given to every chunk when the raw scores carry no ordering.
pub const NEUTRAL_SCORE: f32 = 0.5;

/// Cross-encoder reranking with min-max normalization to `[0, 1]`.
pub struct Reranker {
    provider: Arc<dyn RelevanceProvider>,
}

impl Reranker {
    pub fn new(provider: Arc<dyn RelevanceProvider>) -> Self { Self { provider } }

    pub fn rerank<T: AsRef<str>>(&self, query: &str, chunks: &[T]) -> StageResult<ScoreVector> {
        if chunks.is_empty() {
            return StageResult::Completed(Vec::new());
        }
        let neutral = || vec![NEUTRAL_SCORE; chunks.len()];
        let pairs: Vec<(String, String)> =
            chunks.iter().map(|c| (query.to_string(), c.as_ref().to_string())).collect();
        let raw = match self.provider.predict(&pairs) {
            Ok(raw) => raw,
            Err(e) => return StageResult::degraded(neutral(), Degradation::provider(Stage::Rerank, e)),
        };
        if raw.len() != chunks.len() {
            return StageResult::degraded(
                neutral(),
                Degradation::scoring(
                    Stage::Rerank,
                    format!("provider returned {} scores for {} pairs", raw.len(), chunks.len()),
                ),
            );
        }
        if raw.iter().any(|s| !s.is_finite()) {
            return StageResult::degraded(neutral(), Degradation::scoring(Stage::Rerank, "non-finite relevance score"));
        }
        StageResult::Completed(min_max(&raw))
    }
}

/// Computed in f64 so the range of finite f32 scores cannot overflow.
fn min_max(raw: &[f32]) -> Vec<f32> {
    let min = raw.iter().copied().fold(f32::INFINITY, f32::min);
    let max = raw.iter().copied().fold(f32::NEG_INFINITY, f32::max);
    let range = f64::from(max) - f64::from(min);
    if range > 0.0 {
        raw.iter().map(|&s| ((f64::from(s) - f64::from(min)) / range) as f32).collect()
    } else {
        vec![NEUTRAL_SCORE; raw.len()]
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use anyhow::{anyhow, Result};

    struct Raw(Vec<f32>);

    impl RelevanceProvider for Raw {
        fn predict(&self, _pairs: &[(String, String)]) -> Result<Vec<f32>> { Ok(self.0.clone()) }
    }

    struct Down;

    impl RelevanceProvider for Down {
        fn predict(&self, _pairs: &[(String, String)]) -> Result<Vec<f32>> { Err(anyhow!("model not loaded")) }
    }

    #[test]
    fn normalizes_to_unit_interval() {
        let scores = Reranker::new(Arc::new(Raw(vec![-2.0, 6.0, 2.0]))).rerank("q", &["a", "b", "c"]);
        assert_eq!(scores, StageResult::Completed(vec![0.0, 1.0, 0.5]));
    }

    #[test]
    fn extreme_scores_stay_in_unit_interval() {
        let scores = Reranker::new(Arc::new(Raw(vec![-3e38, 3e38, 0.0]))).rerank("q", &["a", "b", "c"]);
        assert!(!scores.is_degraded());
        assert_eq!(scores.value(), &vec![0.0, 1.0, 0.5]);
    }

    #[test]
    fn equal_scores_are_exactly_neutral() {
        let scores = Reranker::new(Arc::new(Raw(vec![3.3; 4]))).rerank("q", &["a", "b", "c", "d"]);
        assert_eq!(scores.value(), &vec![0.5; 4]);
        assert!(!scores.is_degraded());
    }

    #[test]
    fn failures_fall_back_to_neutral() {
        let down = Reranker::new(Arc::new(Down)).rerank("q", &["a", "b"]);
        assert!(down.is_degraded());
        assert_eq!(down.value(), &vec![0.5, 0.5]);

        let short = Reranker::new(Arc::new(Raw(vec![1.0]))).rerank("q", &["a", "b"]);
        assert!(short.is_degraded());

        let nan = Reranker::new(Arc::new(Raw(vec![1.0, f32::NAN]))).rerank("q", &["a", "b"]);
        assert_eq!(nan.value(), &vec![0.5, 0.5]);

        let none: [&str; 0] = [];
        assert_eq!(Reranker::new(Arc::new(Down)).rerank("q", &none), StageResult::Completed(vec![]));
    }
}
