use anyhow::{anyhow, Result};
use tantivy::collector::TopDocs;
use tantivy::query::BooleanQuery;
use tantivy::schema::Value;
use tantivy::{doc, Index, IndexReader, IndexWriter, ReloadPolicy, TantivyDocument, Term};

use docseek_core::traits::LexicalIndex;

use crate::tantivy_utils::{build_schema, register_tokenizer, ChunkFields};

const WRITER_MEMORY_BYTES: usize = 50_000_000;

/// In-memory BM25 index over one chunk collection.
///
/// Documents are numbered by insertion order; scores come back in that order.
pub struct Bm25Index {
    reader: IndexReader,
    fields: ChunkFields,
    len: usize,
}

impl Bm25Index {
    pub fn build<T: AsRef<str>>(texts: &[T]) -> Result<Self> {
        let (schema, fields) = build_schema();
        let index = Index::create_in_ram(schema);
        register_tokenizer(&index);
        // A single indexing thread keeps one segment and a deterministic doc order.
        let mut index_writer: IndexWriter = index.writer_with_num_threads(1, WRITER_MEMORY_BYTES)?;
        for (ord, text) in texts.iter().enumerate() {
            index_writer.add_document(doc!(
                fields.ord => ord as u64,
                fields.text => text.as_ref().to_string(),
            ))?;
        }
        index_writer.commit()?;
        let reader = index.reader_builder().reload_policy(ReloadPolicy::Manual).try_into()?;
        tracing::debug!(docs = texts.len(), "built BM25 index");
        Ok(Self { reader, fields, len: texts.len() })
    }
}

impl LexicalIndex for Bm25Index {
    fn len(&self) -> usize { self.len }

    fn get_scores(&self, query_tokens: &[String]) -> Result<Vec<f32>> {
        let mut scores = vec![0.0f32; self.len];
        if self.len == 0 || query_tokens.is_empty() {
            return Ok(scores);
        }
        let terms = query_tokens
            .iter()
            .map(|t| Term::from_field_text(self.fields.text, t))
            .collect();
        let query = BooleanQuery::new_multiterms_query(terms);
        let searcher = self.reader.searcher();
        let top_docs = searcher.search(&query, &TopDocs::with_limit(self.len))?;
        for (score, addr) in top_docs {
            let doc: TantivyDocument = searcher.doc(addr)?;
            let ord = doc
                .get_first(self.fields.ord)
                .and_then(|v| v.as_u64())
                .ok_or_else(|| anyhow!("indexed document without ord"))?;
            let slot = scores
                .get_mut(usize::try_from(ord)?)
                .ok_or_else(|| anyhow!("ord {ord} outside index of {} documents", self.len))?;
            *slot = score;
        }
        Ok(scores)
    }
}
