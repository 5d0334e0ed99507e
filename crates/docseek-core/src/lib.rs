#![deny(warnings)]
#![deny(dead_code)]
#![deny(unused_variables)]
#![deny(unused_imports)]

pub mod config;
pub mod data_processor;
pub mod error;
pub mod traits;
pub mod types;

pub use error::{
    Degradation, DegradationKind, ExpansionError, FusionError, RetrievalError, Stage, StageResult,
    ValidationError,
};
pub use types::{
    Chunk, ChunkMetadata, HybridScoreBundle, RetrievalCandidate, RetrievalConfig, RetrievalRequest,
    RetrievalResult, ScoreVector, SourcePosition, StageSummary,
};
