use std::env;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use indicatif::{ProgressBar, ProgressStyle};
use tracing_subscriber::EnvFilter;

use docseek_core::config::{expand_path, Config, Settings};
use docseek_core::data_processor::{ChunkingConfig, DataProcessor};
use docseek_core::traits::{EmbeddingProvider, RelevanceProvider};
use docseek_core::RetrievalRequest;
use docseek_embed::{embed_chunks, get_default_embedder, get_default_relevance, Unavailable};
use docseek_hybrid::RetrievalPipeline;

const EMBED_BATCH: usize = 16;

fn parse_args() -> (String, Vec<PathBuf>) {
    let mut args: Vec<String> = env::args().collect();
    let prog = args.remove(0);
    if args.is_empty() || args[0].starts_with('-') {
        eprintln!("Usage: {} <query> [file...]", prog);
        eprintln!("Without files, every .txt under paths.input_folder is searched.");
        std::process::exit(1);
    }
    let query = args.remove(0);
    (query, args.into_iter().map(PathBuf::from).collect())
}

fn init_logging(settings: &Settings) {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(&settings.log_level));
    tracing_subscriber::fmt().with_env_filter(filter).with_writer(std::io::stderr).init();
}

/// A provider that fails to load is replaced by one that reports the failure
/// on every call, so retrieval degrades instead of aborting.
fn embedder(settings: &Settings) -> Arc<dyn EmbeddingProvider> {
    let dir = settings.models.embedding_dir.as_deref().map(expand_path);
    get_default_embedder(dir.as_deref()).unwrap_or_else(|e| {
        tracing::warn!(error = %e, "embedding model unavailable");
        Arc::new(Unavailable::new(e.to_string()))
    })
}

fn relevance(settings: &Settings) -> Arc<dyn RelevanceProvider> {
    let dir = settings.models.reranker_dir.as_deref().map(expand_path);
    get_default_relevance(dir.as_deref()).unwrap_or_else(|e| {
        tracing::warn!(error = %e, "reranker unavailable");
        Arc::new(Unavailable::new(e.to_string()))
    })
}

fn search_file(
    path: &Path,
    query: &str,
    settings: &Settings,
    processor: &DataProcessor,
    embedder: &dyn EmbeddingProvider,
    pipeline: &RetrievalPipeline,
) -> anyhow::Result<serde_json::Value> {
    let doc = processor.process_file(path)?;
    let embeddings = embed_chunks(embedder, &doc.texts(), EMBED_BATCH)?;
    let request = RetrievalRequest::new(query, doc.chunks, embeddings)
        .with_config(settings.retrieval.clone())
        .with_metadata(doc.metadata);
    let result = pipeline.run(&request)?;
    Ok(serde_json::json!({ "file": doc.filename, "result": result }))
}

fn main() -> anyhow::Result<()> {
    let config = Config::load().map_err(|e| { eprintln!("Error loading config: {}", e); e })?;
    let settings = config.settings()?;
    init_logging(&settings);
    let (query, files) = parse_args();

    let processor = DataProcessor::with_config(ChunkingConfig {
        chunk_size: settings.chunking.chunk_size,
        chunk_overlap: settings.chunking.chunk_overlap,
    });
    let files = if files.is_empty() {
        let base = env::current_dir()?;
        let input = settings.input_folder(&base);
        tracing::info!(dir = %input.display(), "searching input folder");
        processor.list_input_files(&input)
    } else {
        files
    };
    if files.is_empty() {
        tracing::warn!("no input files found");
        return Ok(());
    }

    let embedder = embedder(&settings);
    let pipeline = RetrievalPipeline::new(embedder.clone(), relevance(&settings));

    let pb = ProgressBar::new(files.len() as u64);
    pb.set_style(
        ProgressStyle::default_bar()
            .template("{spinner:.green} [{elapsed_precise}] [{bar:40.cyan/blue}] {pos}/{len} files {msg}")?
            .progress_chars("#>-"),
    );
    let (mut processed, mut failed) = (0usize, 0usize);
    for path in &files {
        pb.set_message(path.file_name().map(|n| n.to_string_lossy().into_owned()).unwrap_or_default());
        match search_file(path, &query, &settings, &processor, embedder.as_ref(), &pipeline) {
            Ok(line) => {
                pb.suspend(|| println!("{}", line));
                processed += 1;
            }
            Err(e) => {
                pb.suspend(|| tracing::error!(file = %path.display(), error = %e, "search failed"));
                failed += 1;
            }
        }
        pb.inc(1);
    }
    pb.finish_and_clear();
    tracing::info!(processed, failed, "search complete");
    Ok(())
}
