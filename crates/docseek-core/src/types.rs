//! Domain types shared by every retrieval stage.

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

use crate::error::{Degradation, Error, Stage, ValidationError};

/// One score per chunk, aligned by chunk index.
pub type ScoreVector = Vec<f32>;

/// A bounded span of document text with a stable index in its source.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Chunk {
    pub index: usize,
    pub text: String,
}

impl Chunk {
    pub fn new(index: usize, text: impl Into<String>) -> Self {
        Self { index, text: text.into() }
    }

    /// Builds chunks numbered by their position in `texts`.
    pub fn from_texts<I, S>(texts: I) -> Vec<Chunk>
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        texts.into_iter().enumerate().map(|(i, t)| Chunk::new(i, t)).collect()
    }
}

impl AsRef<str> for Chunk {
    fn as_ref(&self) -> &str { &self.text }
}

/// Where a chunk sits in its document.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum SourcePosition {
    Intro,
    #[default]
    Middle,
    Conclusion,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChunkMetadata {
    pub chunk_index: usize,
    pub source_position: SourcePosition,
    /// Length in characters.
    pub chunk_length: usize,
    pub is_header: bool,
}

impl ChunkMetadata {
    /// Derives metadata for chunk `index` of a document split into `total` chunks.
    ///
    /// The first and last tenth of the document (at least one chunk each) are
    /// `Intro` and `Conclusion`. A chunk counts as a header when its first
    /// non-empty line is short, unpunctuated and either upper-case or a
    /// Markdown heading.
    pub fn derive(index: usize, total: usize, text: &str) -> Self {
        let edge = (total / 10).max(1);
        let source_position = if index < edge {
            SourcePosition::Intro
        } else if index + edge >= total {
            SourcePosition::Conclusion
        } else {
            SourcePosition::Middle
        };
        Self {
            chunk_index: index,
            source_position,
            chunk_length: text.chars().count(),
            is_header: looks_like_header(text),
        }
    }

    pub fn derive_all(chunks: &[Chunk]) -> Vec<ChunkMetadata> {
        let total = chunks.len();
        chunks.iter().map(|c| Self::derive(c.index, total, &c.text)).collect()
    }
}

fn looks_like_header(text: &str) -> bool {
    let Some(line) = text.lines().map(str::trim).find(|l| !l.is_empty()) else {
        return false;
    };
    if line.chars().count() >= 80 || line.ends_with(['.', ',', ';', ':', '?', '!']) {
        return false;
    }
    if line.starts_with('#') {
        return true;
    }
    let mut letters = line.chars().filter(|c| c.is_alphabetic()).peekable();
    letters.peek().is_some() && letters.all(char::is_uppercase)
}

/// Score vectors of one retrieval call. All four have the same length.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct HybridScoreBundle {
    lexical: ScoreVector,
    semantic: ScoreVector,
    fused: ScoreVector,
    final_scores: ScoreVector,
}

impl HybridScoreBundle {
    pub fn new(
        lexical: ScoreVector,
        semantic: ScoreVector,
        fused: ScoreVector,
        final_scores: ScoreVector,
    ) -> Result<Self, Error> {
        let lens = [lexical.len(), semantic.len(), fused.len(), final_scores.len()];
        if lens.iter().any(|&l| l != lens[0]) {
            return Err(Error::Operation(format!(
                "score vectors must have same length: lexical={}, semantic={}, fused={}, final={}",
                lens[0], lens[1], lens[2], lens[3]
            )));
        }
        Ok(Self { lexical, semantic, fused, final_scores })
    }

    pub fn len(&self) -> usize { self.lexical.len() }
    pub fn is_empty(&self) -> bool { self.lexical.is_empty() }
    pub fn lexical(&self) -> &[f32] { &self.lexical }
    pub fn semantic(&self) -> &[f32] { &self.semantic }
    pub fn fused(&self) -> &[f32] { &self.fused }
    pub fn final_scores(&self) -> &[f32] { &self.final_scores }
}

/// A chunk and its full scoring trail.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RetrievalCandidate {
    pub chunk: Chunk,
    pub lexical_score: f32,
    /// Position in the lexical ordering, 0 for the best; `None` when lexical
    /// scoring was disabled.
    pub lexical_rank: Option<usize>,
    pub semantic_score: f32,
    /// As `lexical_rank`, for the semantic stage.
    pub semantic_rank: Option<usize>,
    pub fusion_score: f32,
    /// `None` when the candidate was not reranked.
    pub rerank_score: Option<f32>,
    pub diversity_penalty: f32,
    pub final_score: f32,
    pub metadata: ChunkMetadata,
}

/// Stage toggles, weights and thresholds for one retrieval call.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct RetrievalConfig {
    pub top_k: usize,
    pub use_lexical: bool,
    pub use_semantic: bool,
    pub use_reranking: bool,
    pub use_diversity: bool,
    pub expand_query: bool,
    pub lexical_weight: f32,
    pub semantic_weight: f32,
    pub rerank_weight: f32,
    pub max_expansions: usize,
    pub diversity_threshold: f32,
    pub diversity_strength: f32,
    /// Smoothing constant of reciprocal rank fusion.
    pub rrf_k: f32,
    /// How many of the best fused candidates are sent to the reranker.
    pub rerank_depth: usize,
}

impl Default for RetrievalConfig {
    fn default() -> Self {
        Self {
            top_k: 5,
            use_lexical: true,
            use_semantic: true,
            use_reranking: true,
            use_diversity: true,
            expand_query: true,
            lexical_weight: 0.3,
            semantic_weight: 0.7,
            rerank_weight: 0.5,
            max_expansions: 3,
            diversity_threshold: 0.85,
            diversity_strength: 0.5,
            rrf_k: 60.0,
            rerank_depth: 50,
        }
    }
}

pub const MAX_TOP_K: usize = 100;
pub const MAX_EXPANSIONS: usize = 10;

fn check_range(name: &'static str, value: f64, min: f64, max: f64) -> Result<(), ValidationError> {
    // NaN fails both comparisons, so test for containment rather than exclusion.
    if (min..=max).contains(&value) {
        Ok(())
    } else {
        Err(ValidationError::OutOfRange { name, value, min, max })
    }
}

impl RetrievalConfig {
    pub fn validate(&self) -> Result<(), ValidationError> {
        check_range("top_k", self.top_k as f64, 1.0, MAX_TOP_K as f64)?;
        check_range("lexical_weight", f64::from(self.lexical_weight), 0.0, 1.0)?;
        check_range("semantic_weight", f64::from(self.semantic_weight), 0.0, 1.0)?;
        if self.lexical_weight + self.semantic_weight <= 0.0 {
            return Err(ValidationError::DegenerateWeights);
        }
        check_range("rerank_weight", f64::from(self.rerank_weight), 0.0, 1.0)?;
        check_range("max_expansions", self.max_expansions as f64, 1.0, MAX_EXPANSIONS as f64)?;
        check_range("diversity_threshold", f64::from(self.diversity_threshold), 0.0, 1.0)?;
        check_range("diversity_strength", f64::from(self.diversity_strength), 0.0, 1.0)?;
        if !(self.rrf_k.is_finite() && self.rrf_k > 0.0) {
            return Err(ValidationError::OutOfRange {
                name: "rrf_k",
                value: f64::from(self.rrf_k),
                min: f64::MIN_POSITIVE,
                max: f64::from(f32::MAX),
            });
        }
        check_range("rerank_depth", self.rerank_depth as f64, 1.0, f64::from(u32::MAX))?;
        Ok(())
    }
}

/// Everything one retrieval call needs.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RetrievalRequest {
    pub query: String,
    pub chunks: Vec<Chunk>,
    pub embeddings: Vec<Vec<f32>>,
    #[serde(default)]
    pub config: RetrievalConfig,
    /// Either empty (derive on demand) or one entry per chunk.
    #[serde(default)]
    pub chunk_metadata: Vec<ChunkMetadata>,
}

impl RetrievalRequest {
    pub fn new(query: impl Into<String>, chunks: Vec<Chunk>, embeddings: Vec<Vec<f32>>) -> Self {
        Self {
            query: query.into(),
            chunks,
            embeddings,
            config: RetrievalConfig::default(),
            chunk_metadata: Vec::new(),
        }
    }

    pub fn with_config(mut self, config: RetrievalConfig) -> Self {
        self.config = config;
        self
    }

    pub fn with_metadata(mut self, metadata: Vec<ChunkMetadata>) -> Self {
        self.chunk_metadata = metadata;
        self
    }

    /// Checks the request before any scoring runs.
    pub fn validate(&self) -> Result<(), ValidationError> {
        if self.query.trim().is_empty() {
            return Err(ValidationError::EmptyQuery);
        }
        if self.chunks.is_empty() {
            return Err(ValidationError::EmptyChunks);
        }
        if self.chunks.len() != self.embeddings.len() {
            return Err(ValidationError::CountMismatch {
                chunks: self.chunks.len(),
                embeddings: self.embeddings.len(),
            });
        }
        let expected = self.embeddings[0].len();
        if expected == 0 {
            return Err(ValidationError::ZeroDimension);
        }
        if let Some((index, e)) = self.embeddings.iter().enumerate().find(|(_, e)| e.len() != expected) {
            return Err(ValidationError::InconsistentDimensions { index, expected, found: e.len() });
        }
        if !self.chunk_metadata.is_empty() && self.chunk_metadata.len() != self.chunks.len() {
            return Err(ValidationError::MetadataMismatch {
                chunks: self.chunks.len(),
                metadata: self.chunk_metadata.len(),
            });
        }
        self.config.validate()
    }
}

/// Summary statistics of one stage's output.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Default)]
pub struct StageSummary {
    pub applied: bool,
    pub count: usize,
    pub mean: f32,
    pub min: f32,
    pub max: f32,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub degraded: Option<String>,
}

impl StageSummary {
    pub fn skipped() -> Self { Self::default() }

    pub fn from_scores(scores: &[f32]) -> Self {
        if scores.is_empty() {
            return Self { applied: true, ..Self::default() };
        }
        let sum: f64 = scores.iter().map(|&s| f64::from(s)).sum();
        let min = scores.iter().copied().fold(f32::INFINITY, f32::min);
        let max = scores.iter().copied().fold(f32::NEG_INFINITY, f32::max);
        Self {
            applied: true,
            count: scores.len(),
            mean: (sum / scores.len() as f64) as f32,
            min,
            max,
            degraded: None,
        }
    }

    pub fn with_degradation(mut self, degradation: Option<&Degradation>) -> Self {
        self.degraded = degradation.map(|d| d.message.clone());
        self
    }
}

/// Ranked candidates (best first) and how they were produced.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RetrievalResult {
    pub candidates: Vec<RetrievalCandidate>,
    pub query_expanded: bool,
    /// Terms added by expansion; the original query is not repeated here.
    pub expanded_query_terms: Vec<String>,
    pub reranking_applied: bool,
    pub diversity_applied: bool,
    pub stages: BTreeMap<Stage, StageSummary>,
    pub degradations: Vec<Degradation>,
    pub scores: HybridScoreBundle,
}

impl RetrievalResult {
    pub fn results_count(&self) -> usize { self.candidates.len() }

    pub fn is_degraded(&self) -> bool { !self.degradations.is_empty() }

    pub fn chunk_indices(&self) -> Vec<usize> {
        self.candidates.iter().map(|c| c.chunk.index).collect()
    }
}
