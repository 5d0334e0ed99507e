//! Hybrid retrieval: rank fusion of lexical and semantic scores, optional
//! cross-encoder reranking and diversity-aware selection.
pub mod diversity;
pub mod fusion;
pub mod pipeline;
pub mod rerank;

pub use diversity::{DiversitySelector, Selection};
pub use fusion::RankFusion;
pub use pipeline::RetrievalPipeline;
pub use rerank::Reranker;
