use docseek_core::traits::EmbeddingProvider;
use docseek_embed::{embed_chunks, get_default_embedder, FakeEmbedder, Unavailable, FAKE_DIM};

fn cosine(a: &[f32], b: &[f32]) -> f32 {
    a.iter().zip(b).map(|(x, y)| x * y).sum()
}

#[test]
fn fake_embedder_shapes_and_determinism() {
    // Force fake embedder to avoid loading large model
    std::env::set_var("APP_USE_FAKE_EMBEDDINGS", "1");

    let embedder = get_default_embedder(None).expect("embedder");
    let texts = vec!["hello world".to_string(), "hello world".to_string()];
    let embs = embedder.embed_batch(&texts).expect("embed_batch");
    let v1 = &embs[0];
    let v2 = &embs[1];

    assert_eq!(v1.len(), FAKE_DIM);

    let norm: f32 = v1.iter().map(|x| x * x).sum::<f32>().sqrt();
    assert!((norm - 1.0).abs() <= 1e-3, "vector is L2-normalized (norm={norm})");

    for (a, b) in v1.iter().zip(v2.iter()) { assert!((a - b).abs() <= 1e-6); }
}

#[test]
fn fake_embedder_ignores_case_and_punctuation() {
    let embedder = FakeEmbedder::new(256);
    let a = embedder.embed("Mammals.").unwrap();
    let b = embedder.embed("mammals").unwrap();
    assert!((cosine(&a, &b) - 1.0).abs() < 1e-5);

    let blank = embedder.embed("!!! ...").unwrap();
    assert!(blank.iter().all(|x| *x == 0.0), "no tokens gives the zero vector");
}

#[test]
fn embed_chunks_batches_and_checks() {
    let embedder = FakeEmbedder::new(32);
    let texts: Vec<String> = (0..5).map(|i| format!("chunk {i}")).collect();
    let embs = embed_chunks(&embedder, &texts, 2).unwrap();
    assert_eq!(embs.len(), 5);
    assert!(embs.iter().all(|e| e.len() == 32));

    assert!(embed_chunks(&embedder, &[], 2).is_err());
    assert!(embed_chunks(&Unavailable::new("no weights"), &texts, 2).is_err());
}
