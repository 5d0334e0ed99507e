use std::env;
use std::path::PathBuf;

use docseek_core::data_processor::DataProcessor;
use docseek_text::LexicalScorer;

// Score the chunks of one text file against a query with BM25.
// Usage:
//   cargo run -p docseek-text --example search -- "your query" path/to/file.txt [--limit 10]

fn main() -> anyhow::Result<()> {
    let args: Vec<String> = env::args().skip(1).collect();
    if args.len() < 2 {
        eprintln!("Usage: cargo run -p docseek-text --example search -- <query> <file> [--limit N]");
        std::process::exit(1);
    }
    let query = &args[0];
    let file = PathBuf::from(&args[1]);
    let mut limit: usize = 10;
    let mut i = 2;
    while i < args.len() {
        if args[i] == "--limit" && i + 1 < args.len() {
            limit = args[i + 1].parse().unwrap_or(limit);
            i += 1;
        }
        i += 1;
    }

    let doc = DataProcessor::new().process_file(&file)?;
    let scorer = LexicalScorer::new();
    let scores = scorer.score(query, &doc.chunks);
    if scores.is_degraded() {
        eprintln!("lexical scoring degraded; all scores are zero");
    }
    let scores = scores.value();
    let mut order: Vec<usize> = (0..scores.len()).collect();
    order.sort_by(|&a, &b| scores[b].total_cmp(&scores[a]).then(a.cmp(&b)));

    println!("{} chunks in {}", doc.chunks.len(), doc.filename);
    for (rank, &i) in order.iter().take(limit).enumerate() {
        let snippet: String = doc.chunks[i].text.chars().take(100).collect();
        println!("  {}. chunk={} score={:.4}  {}", rank + 1, i, scores[i], snippet.replace('\n', " "));
    }
    Ok(())
}
