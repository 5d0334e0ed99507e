use std::fs;
use tempfile::TempDir;

use docseek_core::data_processor::{strip_back_matter, ChunkingConfig, DataProcessor};
use docseek_core::{
    Chunk, ChunkMetadata, HybridScoreBundle, RetrievalConfig, RetrievalRequest, SourcePosition,
    ValidationError,
};

fn request(n: usize, dim: usize) -> RetrievalRequest {
    let chunks = Chunk::from_texts((0..n).map(|i| format!("chunk number {i}")));
    let embeddings = vec![vec![0.5; dim]; n];
    RetrievalRequest::new("what is in the chunks", chunks, embeddings)
}

#[test]
fn process_file_single_small_file() {
    let tmp = TempDir::new().unwrap();
    let file_path = tmp.path().join("a.txt");
    fs::write(&file_path, "Short text\n").unwrap();

    let doc = DataProcessor::new().process_file(&file_path).expect("process");

    assert_eq!(doc.filename, "a.txt");
    assert_eq!(doc.chunks.len(), 1, "one small document becomes one chunk");
    assert_eq!(doc.chunks[0].text, "Short text");
    assert_eq!(doc.metadata.len(), 1);
    assert_eq!(doc.total_characters, "Short text".len());
    assert_eq!(doc.file_size_bytes, 11);
}

#[test]
fn process_file_rejects_missing_and_unsupported_files() {
    let tmp = TempDir::new().unwrap();
    let processor = DataProcessor::new();
    assert!(processor.process_file(&tmp.path().join("missing.txt")).is_err());

    let pdf = tmp.path().join("paper.pdf");
    fs::write(&pdf, "%PDF-1.4").unwrap();
    assert!(processor.process_file(&pdf).is_err());

    let empty = tmp.path().join("empty.txt");
    fs::write(&empty, "   \n").unwrap();
    assert!(processor.process_file(&empty).is_err(), "nothing left to chunk");
}

#[test]
fn chunk_windows_overlap_by_configured_amount() {
    let processor = DataProcessor::with_config(ChunkingConfig { chunk_size: 10, chunk_overlap: 3 });
    let text: String = ('a'..='z').collect();
    let chunks = processor.chunk_text(&text).unwrap();

    assert_eq!(chunks[0], "abcdefghij");
    assert_eq!(chunks[1], "hijklmnopq");
    assert!(chunks.iter().all(|c| c.chars().count() <= 10));
    assert_eq!(chunks.last().unwrap(), "vwxyz");
    assert_eq!(chunks.len(), 4);
}

#[test]
fn chunking_rejects_bad_sizes() {
    let zero = DataProcessor::with_config(ChunkingConfig { chunk_size: 0, chunk_overlap: 0 });
    assert!(zero.chunk_text("abc").is_err());
    let overlap = DataProcessor::with_config(ChunkingConfig { chunk_size: 5, chunk_overlap: 5 });
    assert!(overlap.chunk_text("abc").is_err());
}

#[test]
fn back_matter_is_removed() {
    let text = "Intro paragraph.\n\nBody text.\n\nReferences\n[1] Someone, 2020.\n";
    assert_eq!(strip_back_matter(text), "Intro paragraph.\n\nBody text.");

    let inline = "These references are discussed inline and stay.";
    assert_eq!(strip_back_matter(inline), inline);

    let earliest = "Body\nAcknowledgments\nthanks\nBibliography\nbooks";
    assert_eq!(strip_back_matter(earliest), "Body");
}

#[test]
fn list_input_files_sorted_txt_only() {
    let tmp = TempDir::new().unwrap();
    let dir = tmp.path();
    fs::write(dir.join("b.txt"), "bravo").unwrap();
    fs::write(dir.join("a.txt"), "alpha").unwrap();
    fs::write(dir.join("c.md"), "charlie").unwrap();

    let processor = DataProcessor::new();
    let files = processor.list_input_files(dir);
    let names: Vec<_> = files.iter().map(|p| p.file_name().unwrap().to_string_lossy().to_string()).collect();
    assert_eq!(names, vec!["a.txt", "b.txt"]);

    let docs = processor.process_directory(dir).unwrap();
    assert_eq!(docs.len(), 2);
}

#[test]
fn metadata_positions_and_headers() {
    let chunks = Chunk::from_texts((0..20).map(|i| format!("body text {i}.")));
    let meta = ChunkMetadata::derive_all(&chunks);
    assert_eq!(meta[0].source_position, SourcePosition::Intro);
    assert_eq!(meta[1].source_position, SourcePosition::Intro);
    assert_eq!(meta[2].source_position, SourcePosition::Middle);
    assert_eq!(meta[17].source_position, SourcePosition::Middle);
    assert_eq!(meta[18].source_position, SourcePosition::Conclusion);
    assert_eq!(meta[19].source_position, SourcePosition::Conclusion);

    assert!(ChunkMetadata::derive(0, 1, "INTRODUCTION\nSome text.").is_header);
    assert!(ChunkMetadata::derive(0, 1, "# Overview\nSome text.").is_header);
    assert!(!ChunkMetadata::derive(0, 1, "A normal sentence.").is_header);
    assert_eq!(ChunkMetadata::derive(0, 1, "héllo").chunk_length, 5);
}

#[test]
fn request_validation_rules() {
    assert!(request(3, 4).validate().is_ok());

    let mut r = request(3, 4);
    r.embeddings.pop();
    assert_eq!(r.validate(), Err(ValidationError::CountMismatch { chunks: 3, embeddings: 2 }));

    let mut r = request(3, 4);
    r.embeddings[2] = vec![0.1; 5];
    assert_eq!(
        r.validate(),
        Err(ValidationError::InconsistentDimensions { index: 2, expected: 4, found: 5 })
    );

    assert_eq!(request(0, 4).validate(), Err(ValidationError::EmptyChunks));

    let mut r = request(2, 4);
    r.config.lexical_weight = 0.0;
    r.config.semantic_weight = 0.0;
    assert_eq!(r.validate(), Err(ValidationError::DegenerateWeights));

    for top_k in [0, 101] {
        let r = request(2, 4).with_config(RetrievalConfig { top_k, ..RetrievalConfig::default() });
        assert!(matches!(r.validate(), Err(ValidationError::OutOfRange { name: "top_k", .. })));
    }

    let mut r = request(2, 4);
    r.config.semantic_weight = 1.5;
    assert!(r.validate().is_err());

    let r = request(2, 4).with_metadata(vec![ChunkMetadata::derive(0, 2, "x")]);
    assert_eq!(r.validate(), Err(ValidationError::MetadataMismatch { chunks: 2, metadata: 1 }));
}

#[test]
fn score_bundle_requires_equal_lengths() {
    assert!(HybridScoreBundle::new(vec![0.0; 2], vec![0.0; 2], vec![0.0; 2], vec![0.0; 2]).is_ok());
    assert!(HybridScoreBundle::new(vec![0.0; 2], vec![0.0; 3], vec![0.0; 2], vec![0.0; 2]).is_err());
}
