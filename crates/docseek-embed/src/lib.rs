//! Embedding and pairwise-relevance providers.
//!
//! Model-backed providers run locally through candle. Set
//! `APP_USE_FAKE_EMBEDDINGS=1` / `APP_USE_FAKE_RERANKER=1` to get fast,
//! deterministic stand-ins for tests and development.
use anyhow::{anyhow, Result};
use std::path::{Path, PathBuf};
use std::sync::Arc;

use docseek_core::traits::{EmbeddingProvider, RelevanceProvider};

pub mod cross_encoder;
pub mod fake;
pub mod model;
pub mod pool;
pub mod tokenize;

pub use cross_encoder::{CrossEncoderModel, TermOverlapRelevance};
pub use fake::FakeEmbedder;
pub use model::EmbeddingModel;
pub use pool::masked_mean_l2;

pub const FAKE_DIM: usize = 384;

/// A provider that failed to load. Every call reports the load error, so the
/// stage using it falls back and records why.
pub struct Unavailable {
    reason: String,
}

impl Unavailable {
    pub fn new(reason: impl Into<String>) -> Self { Self { reason: reason.into() } }
}

impl EmbeddingProvider for Unavailable {
    fn dim(&self) -> usize { 0 }
    fn embed_batch(&self, _texts: &[String]) -> Result<Vec<Vec<f32>>> {
        Err(anyhow!("embedding provider unavailable: {}", self.reason))
    }
}

impl RelevanceProvider for Unavailable {
    fn predict(&self, _pairs: &[(String, String)]) -> Result<Vec<f32>> {
        Err(anyhow!("relevance provider unavailable: {}", self.reason))
    }
}

fn env_flag(name: &str) -> bool {
    std::env::var(name).ok().is_some_and(|v| v == "1" || v.eq_ignore_ascii_case("true"))
}

pub fn get_default_embedder(model_dir: Option<&Path>) -> Result<Arc<dyn EmbeddingProvider>> {
    if env_flag("APP_USE_FAKE_EMBEDDINGS") {
        tracing::info!("Using FakeEmbedder");
        return Ok(Arc::new(FakeEmbedder::new(FAKE_DIM)));
    }
    let dir = resolve_model_dir(model_dir, "APP_MODEL_DIR", &["../models/bge-m3", "models/bge-m3"])?;
    Ok(Arc::new(EmbeddingModel::load(&dir)?))
}

pub fn get_default_relevance(model_dir: Option<&Path>) -> Result<Arc<dyn RelevanceProvider>> {
    if env_flag("APP_USE_FAKE_RERANKER") {
        tracing::info!("Using TermOverlapRelevance");
        return Ok(Arc::new(TermOverlapRelevance));
    }
    let dir = resolve_model_dir(
        model_dir,
        "APP_RERANKER_DIR",
        &["../models/ms-marco-MiniLM-L-6-v2", "models/ms-marco-MiniLM-L-6-v2"],
    )?;
    Ok(Arc::new(CrossEncoderModel::load(&dir)?))
}

/// Embeds chunk texts in batches of `batch_size`, checking every vector's dimension.
pub fn embed_chunks(provider: &dyn EmbeddingProvider, texts: &[String], batch_size: usize) -> Result<Vec<Vec<f32>>> {
    if texts.is_empty() {
        return Err(anyhow!("Cannot embed empty list of chunks"));
    }
    let mut embeddings = Vec::with_capacity(texts.len());
    for batch in texts.chunks(batch_size.max(1)) {
        let vectors = provider.embed_batch(batch)?;
        if vectors.len() != batch.len() {
            return Err(anyhow!("provider returned {} vectors for {} texts", vectors.len(), batch.len()));
        }
        embeddings.extend(vectors);
    }
    if let Some((i, v)) = embeddings.iter().enumerate().find(|(_, v)| v.len() != provider.dim()) {
        return Err(anyhow!("embedding {} has dimension {}, expected {}", i, v.len(), provider.dim()));
    }
    tracing::info!(chunks = texts.len(), dim = provider.dim(), "embedded chunks");
    Ok(embeddings)
}

/// Explicit directory first, then `$env_var`, then the fallbacks in order.
fn resolve_model_dir(explicit: Option<&Path>, env_var: &str, fallbacks: &[&str]) -> Result<PathBuf> {
    if let Some(p) = explicit {
        if p.exists() { return Ok(p.to_path_buf()); }
        return Err(anyhow!("model directory {} does not exist", p.display()));
    }
    if let Ok(dir) = std::env::var(env_var) {
        let p = PathBuf::from(&dir);
        if p.exists() { tracing::info!("Using {}: {}", env_var, p.display()); return Ok(p); }
    }
    for candidate in fallbacks {
        let p = Path::new(candidate);
        if p.exists() { tracing::info!("Using model dir: {}", p.display()); return Ok(p.to_path_buf()); }
    }
    Err(anyhow!("Could not locate model directory (set {} or configure models.*_dir)", env_var))
}
