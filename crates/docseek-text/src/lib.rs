//! docseek-text
//!
//! Lexical scoring: a tantivy BM25 index over whitespace tokens, cached per
//! chunk collection. See `search::LexicalScorer`.
pub mod cache;
pub mod index;
pub mod search;
pub mod tantivy_utils;

pub use cache::CacheStats;
pub use index::Bm25Index;
pub use search::LexicalScorer;
