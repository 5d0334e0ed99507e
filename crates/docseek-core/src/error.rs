use serde::{Deserialize, Serialize};
use std::fmt;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum Error {
    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),

    #[error("Not found: {0}")]
    NotFound(String),

    #[error("Operation failed: {0}")]
    Operation(String),
}

pub type Result<T> = std::result::Result<T, Error>;

/// A malformed or inconsistent retrieval request. Always terminal.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum ValidationError {
    #[error("query must not be empty")]
    EmptyQuery,

    #[error("chunk collection must not be empty")]
    EmptyChunks,

    #[error("chunk count {chunks} does not match embedding count {embeddings}")]
    CountMismatch { chunks: usize, embeddings: usize },

    #[error("embedding {index} has dimension {found}, expected {expected}")]
    InconsistentDimensions { index: usize, expected: usize, found: usize },

    #[error("embeddings must have a non-zero dimension")]
    ZeroDimension,

    #[error("metadata count {metadata} does not match chunk count {chunks}")]
    MetadataMismatch { chunks: usize, metadata: usize },

    #[error("{name} = {value} is outside {min}..={max}")]
    OutOfRange { name: &'static str, value: f64, min: f64, max: f64 },

    #[error("lexical and semantic weights cannot both be zero")]
    DegenerateWeights,
}

/// Raised by rank fusion when the two score vectors are not aligned.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum FusionError {
    #[error("score vectors must have the same length (lexical={lexical}, semantic={semantic})")]
    LengthMismatch { lexical: usize, semantic: usize },
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ExpansionError {
    #[error("chunk count {chunks} does not match embedding count {embeddings}")]
    CountMismatch { chunks: usize, embeddings: usize },
}

/// Errors that end a retrieval call without a result.
#[derive(Debug, Error)]
pub enum RetrievalError {
    #[error("invalid request: {0}")]
    Validation(#[from] ValidationError),

    #[error("fusion failed: {0}")]
    Fusion(#[from] FusionError),

    /// Stage outputs disagreed in length after fusion.
    #[error(transparent)]
    Internal(#[from] Error),
}

/// Pipeline stages, in execution order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Stage {
    Lexical,
    Semantic,
    Expansion,
    Fusion,
    Rerank,
    Diversity,
}

impl fmt::Display for Stage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Stage::Lexical => "lexical",
            Stage::Semantic => "semantic",
            Stage::Expansion => "expansion",
            Stage::Fusion => "fusion",
            Stage::Rerank => "rerank",
            Stage::Diversity => "diversity",
        };
        f.write_str(name)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DegradationKind {
    /// An external provider failed to initialize or respond.
    Provider,
    /// The stage's own computation failed.
    Scoring,
}

/// A stage failure that was replaced by the stage's neutral fallback.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Degradation {
    pub stage: Stage,
    pub kind: DegradationKind,
    pub message: String,
}

impl Degradation {
    pub fn provider(stage: Stage, err: impl fmt::Display) -> Self {
        Self { stage, kind: DegradationKind::Provider, message: err.to_string() }
    }

    pub fn scoring(stage: Stage, message: impl Into<String>) -> Self {
        Self { stage, kind: DegradationKind::Scoring, message: message.into() }
    }
}

impl fmt::Display for Degradation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let kind = match self.kind {
            DegradationKind::Provider => "provider error",
            DegradationKind::Scoring => "scoring degradation",
        };
        write!(f, "{} stage {}: {}", self.stage, kind, self.message)
    }
}

/// Outcome of a scoring stage: the computed value, or the stage's fallback
/// together with the reason it was used.
#[derive(Debug, Clone, PartialEq)]
pub enum StageResult<T> {
    Completed(T),
    Degraded { fallback: T, degradation: Degradation },
}

impl<T> StageResult<T> {
    pub fn degraded(fallback: T, degradation: Degradation) -> Self {
        tracing::warn!(%degradation, "stage fell back to neutral result");
        Self::Degraded { fallback, degradation }
    }

    pub fn value(&self) -> &T {
        match self {
            Self::Completed(v) => v,
            Self::Degraded { fallback, .. } => fallback,
        }
    }

    pub fn is_degraded(&self) -> bool {
        matches!(self, Self::Degraded { .. })
    }

    pub fn into_parts(self) -> (T, Option<Degradation>) {
        match self {
            Self::Completed(v) => (v, None),
            Self::Degraded { fallback, degradation } => (fallback, Some(degradation)),
        }
    }
}
