//! Embedding-space stages: semantic scoring and query expansion.
pub mod expand;
pub mod semantic;
pub mod similarity;

pub use expand::QueryExpander;
pub use semantic::SemanticScorer;
pub use similarity::{cmp_desc, cosine, order_desc};
