/// Turns text into fixed-size vectors.
pub trait EmbeddingProvider: Send + Sync {
    fn dim(&self) -> usize;
    fn embed_batch(&self, texts: &[String]) -> anyhow::Result<Vec<Vec<f32>>>;

    fn embed(&self, text: &str) -> anyhow::Result<Vec<f32>> {
        self.embed_batch(&[text.to_string()])?
            .pop()
            .ok_or_else(|| anyhow::anyhow!("embedding provider returned no vector"))
    }
}

/// Scores `(query, passage)` pairs directly, e.g. a cross-encoder.
///
/// Scores are on an arbitrary scale; higher is more relevant.
pub trait RelevanceProvider: Send + Sync {
    fn predict(&self, pairs: &[(String, String)]) -> anyhow::Result<Vec<f32>>;
}

/// A lexical index over a fixed document collection.
pub trait LexicalIndex: Send + Sync {
    /// Number of indexed documents.
    fn len(&self) -> usize;

    fn is_empty(&self) -> bool { self.len() == 0 }

    /// One score per indexed document, in insertion order.
    fn get_scores(&self, query_tokens: &[String]) -> anyhow::Result<Vec<f32>>;
}
