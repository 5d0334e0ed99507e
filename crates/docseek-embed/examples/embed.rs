use std::path::PathBuf;

use docseek_core::traits::EmbeddingProvider;
use docseek_embed::EmbeddingModel;

fn main() -> anyhow::Result<()> {
    let dir = std::env::args().nth(1).map(PathBuf::from).unwrap_or_else(|| PathBuf::from("models/bge-m3"));
    let embedder = EmbeddingModel::load(&dir)?;
    let texts = vec!["hello world".to_string(), "rust embeddings".to_string()];
    let embs = embedder.embed_batch(&texts)?;
    println!("B={} dim={}", embs.len(), embedder.dim());
    Ok(())
}
