use docseek_core::traits::LexicalIndex;
use docseek_core::{Degradation, ScoreVector, Stage, StageResult};

use crate::cache::{collection_key, CacheStats, IndexCache, DEFAULT_CAPACITY};
use crate::index::Bm25Index;
use crate::tantivy_utils::tokenize_query;

/// BM25 relevance of each chunk for a query.
///
/// Scores are divided by the best score when it is positive, so the top
/// chunk scores 1.0 and the ordering is unchanged. Indexes are reused for
/// repeated queries against the same chunk collection.
pub struct LexicalScorer {
    cache: IndexCache<Bm25Index>,
}

impl Default for LexicalScorer {
    fn default() -> Self { Self::new() }
}

impl LexicalScorer {
    pub fn new() -> Self { Self::with_capacity(DEFAULT_CAPACITY) }

    pub fn with_capacity(capacity: usize) -> Self { Self { cache: IndexCache::new(capacity) } }

    pub fn score<T: AsRef<str>>(&self, query: &str, chunks: &[T]) -> StageResult<ScoreVector> {
        if chunks.is_empty() {
            return StageResult::Completed(Vec::new());
        }
        let fallback = || vec![0.0; chunks.len()];
        let index = match self.cache.get_or_build(collection_key(chunks), || Bm25Index::build(chunks)) {
            Ok(index) => index,
            Err(e) => {
                return StageResult::degraded(
                    fallback(),
                    Degradation::provider(Stage::Lexical, format!("index build failed: {e}")),
                )
            }
        };
        let tokens = tokenize_query(query);
        let raw = match index.get_scores(&tokens) {
            Ok(raw) => raw,
            Err(e) => {
                return StageResult::degraded(fallback(), Degradation::provider(Stage::Lexical, e))
            }
        };
        if raw.len() != chunks.len() {
            return StageResult::degraded(
                fallback(),
                Degradation::scoring(
                    Stage::Lexical,
                    format!("index returned {} scores for {} chunks", raw.len(), chunks.len()),
                ),
            );
        }
        if raw.iter().any(|s| !s.is_finite() || *s < 0.0) {
            return StageResult::degraded(
                fallback(),
                Degradation::scoring(Stage::Lexical, "non-finite or negative BM25 score"),
            );
        }
        let scores = normalize_by_max(raw);
        tracing::debug!(
            chunks = chunks.len(),
            tokens = tokens.len(),
            max = scores.iter().copied().fold(0.0f32, f32::max),
            "lexical scoring complete"
        );
        StageResult::Completed(scores)
    }

    pub fn cache_stats(&self) -> CacheStats { self.cache.stats() }

}

fn normalize_by_max(mut scores: Vec<f32>) -> Vec<f32> {
    let max = scores.iter().copied().fold(0.0f32, f32::max);
    if max > 0.0 {
        for s in &mut scores {
            *s /= max;
        }
    }
    scores
}
