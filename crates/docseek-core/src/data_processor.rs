//! Reads `.txt` documents and splits them into overlapping character windows.
use regex::Regex;
use std::fs;
use std::path::{Path, PathBuf};
use std::sync::LazyLock;

use crate::error::{Error, Result};
use crate::types::{Chunk, ChunkMetadata};

/// Back-matter headings; everything from the earliest match on is dropped.
static BACK_MATTER: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(
        r"(?mi)^[ \t]*(references?|bibliography|appendix([ \t]+[a-z])?|appendices|index|acknowledgments?|works?[ \t]+cited)[ \t]*\r?$",
    )
    .expect("back-matter pattern is valid")
});

#[derive(Debug, Clone)]
pub struct ChunkingConfig {
    /// Window size in characters.
    pub chunk_size: usize,
    /// Characters shared by consecutive windows.
    pub chunk_overlap: usize,
}

impl Default for ChunkingConfig {
    fn default() -> Self {
        Self { chunk_size: 2500, chunk_overlap: 200 }
    }
}

#[derive(Debug, Clone)]
pub struct ProcessedDocument {
    pub filename: String,
    pub chunks: Vec<Chunk>,
    pub metadata: Vec<ChunkMetadata>,
    pub total_characters: usize,
    pub file_size_bytes: u64,
}

impl ProcessedDocument {
    pub fn texts(&self) -> Vec<String> {
        self.chunks.iter().map(|c| c.text.clone()).collect()
    }
}

#[derive(Default)]
pub struct DataProcessor {
    chunking_config: ChunkingConfig,
}

impl DataProcessor {
    pub fn new() -> Self { Self::default() }

    pub fn with_config(chunking_config: ChunkingConfig) -> Self { Self { chunking_config } }

    /// Processes every `.txt` file under `data_dir`; unreadable files are logged and skipped.
    pub fn process_directory(&self, data_dir: &Path) -> Result<Vec<ProcessedDocument>> {
        let files = self.list_input_files(data_dir);
        if files.is_empty() {
            tracing::warn!(dir = %data_dir.display(), "no .txt files found");
            return Ok(vec![]);
        }
        let mut documents = Vec::new();
        for (file_index, file_path) in files.iter().enumerate() {
            tracing::info!("Processing file {}/{}: {}", file_index + 1, files.len(), file_path.display());
            match self.process_file(file_path) {
                Ok(doc) => documents.push(doc),
                Err(e) => tracing::warn!(file = %file_path.display(), error = %e, "skipping file"),
            }
        }
        tracing::info!("Processed {} of {} files", documents.len(), files.len());
        Ok(documents)
    }

    pub fn process_file(&self, file_path: &Path) -> Result<ProcessedDocument> {
        if !file_path.is_file() {
            return Err(Error::NotFound(file_path.display().to_string()));
        }
        if !is_txt(file_path) {
            return Err(Error::Operation(format!(
                "unsupported file type: {} (supported: .txt)",
                file_path.display()
            )));
        }
        let raw = self.read_file_content(file_path)?;
        let cleaned = strip_back_matter(&raw);
        tracing::debug!(raw = raw.len(), cleaned = cleaned.len(), "cleaned document text");

        let texts = self.chunk_text(cleaned)?;
        let chunks = Chunk::from_texts(texts);
        let metadata = ChunkMetadata::derive_all(&chunks);
        let total_characters = metadata.iter().map(|m| m.chunk_length).sum();
        let file_size_bytes = fs::metadata(file_path).map_err(|e| Error::Operation(e.to_string()))?.len();
        let filename = file_path
            .file_name()
            .map_or_else(|| file_path.display().to_string(), |n| n.to_string_lossy().to_string());
        tracing::info!(file = %filename, chunks = chunks.len(), "document chunked");
        Ok(ProcessedDocument { filename, chunks, metadata, total_characters, file_size_bytes })
    }

    fn read_file_content(&self, file_path: &Path) -> Result<String> {
        match fs::read_to_string(file_path) {
            Ok(content) => Ok(content),
            Err(_) => {
                let bytes = fs::read(file_path).map_err(|e| Error::Operation(e.to_string()))?;
                Ok(String::from_utf8_lossy(&bytes).to_string())
            }
        }
    }

    /// Splits `text` into windows of `chunk_size` characters advancing by
    /// `chunk_size - chunk_overlap`.
    pub fn chunk_text(&self, text: &str) -> Result<Vec<String>> {
        let ChunkingConfig { chunk_size, chunk_overlap } = self.chunking_config;
        if chunk_size == 0 {
            return Err(Error::InvalidConfig("chunk_size must be positive".into()));
        }
        if chunk_overlap >= chunk_size {
            return Err(Error::InvalidConfig("chunk_overlap must be smaller than chunk_size".into()));
        }
        if text.is_empty() {
            return Err(Error::Operation("cannot chunk empty text".into()));
        }
        let chars: Vec<char> = text.chars().collect();
        let step = chunk_size - chunk_overlap;
        let mut chunks = Vec::new();
        let mut start = 0;
        while start < chars.len() {
            let end = (start + chunk_size).min(chars.len());
            chunks.push(chars[start..end].iter().collect());
            start += step;
        }
        Ok(chunks)
    }

    /// Sorted `.txt` files under `root`.
    pub fn list_input_files(&self, root: &Path) -> Vec<PathBuf> {
        let mut txt_files: Vec<PathBuf> = walkdir::WalkDir::new(root)
            .into_iter()
            .filter_map(|e| e.ok())
            .filter(|e| e.file_type().is_file() && is_txt(e.path()))
            .map(|e| e.path().to_path_buf())
            .collect();
        txt_files.sort();
        txt_files
    }
}

fn is_txt(path: &Path) -> bool {
    path.extension()
        .and_then(|s| s.to_str())
        .is_some_and(|ext| ext.eq_ignore_ascii_case("txt"))
}

/// Drops references, bibliography and similar trailing sections, then trims.
pub fn strip_back_matter(text: &str) -> &str {
    let end = BACK_MATTER.find(text).map_or(text.len(), |m| m.start());
    text[..end].trim()
}
