use std::sync::Arc;

use docseek_core::traits::EmbeddingProvider;
use docseek_core::{Degradation, ExpansionError, Stage, StageResult};

use crate::similarity::{cosine, order_desc};

/// Words considered per chunk when building a phrase.
const LEADING_WORDS: usize = 5;
/// Words must be longer than this many characters.
const MIN_WORD_CHARS: usize = 3;
const WORDS_PER_PHRASE: usize = 2;

/// Pseudo-relevance feedback: phrases lifted from the chunks closest to the
/// query in embedding space.
pub struct QueryExpander {
    embedder: Arc<dyn EmbeddingProvider>,
}

impl QueryExpander {
    pub fn new(embedder: Arc<dyn EmbeddingProvider>) -> Self { Self { embedder } }

    /// Returns the original query followed by at most `max_expansions` phrases.
    pub fn expand<T: AsRef<str>>(
        &self,
        query: &str,
        chunks: &[T],
        embeddings: &[Vec<f32>],
        max_expansions: usize,
    ) -> Result<StageResult<Vec<String>>, ExpansionError> {
        if chunks.len() != embeddings.len() {
            return Err(ExpansionError::CountMismatch { chunks: chunks.len(), embeddings: embeddings.len() });
        }
        let original = vec![query.to_string()];
        if chunks.is_empty() || max_expansions == 0 {
            return Ok(StageResult::Completed(original));
        }
        let q = match self.embedder.embed(query) {
            Ok(q) => q,
            Err(e) => return Ok(StageResult::degraded(original, Degradation::provider(Stage::Expansion, e))),
        };
        if embeddings.iter().any(|e| e.len() != q.len()) {
            return Ok(StageResult::degraded(
                original,
                Degradation::scoring(Stage::Expansion, "query and chunk embeddings differ in dimension"),
            ));
        }
        let similarities: Vec<f32> = embeddings.iter().map(|e| cosine(&q, e)).collect();
        let mut expanded = original;
        for i in order_desc(&similarities).into_iter().take(max_expansions) {
            if let Some(phrase) = key_phrase(chunks[i].as_ref()) {
                expanded.push(phrase);
            }
        }
        tracing::debug!(added = expanded.len() - 1, "query expanded");
        Ok(StageResult::Completed(expanded))
    }
}

fn key_phrase(text: &str) -> Option<String> {
    let words: Vec<&str> = text
        .split_whitespace()
        .take(LEADING_WORDS)
        .filter(|w| w.chars().count() > MIN_WORD_CHARS)
        .take(WORDS_PER_PHRASE)
        .collect();
    (!words.is_empty()).then(|| words.join(" "))
}
