use std::collections::BTreeMap;
use std::sync::Arc;
use std::time::Instant;

use docseek_core::traits::{EmbeddingProvider, RelevanceProvider};
use docseek_core::{
    ChunkMetadata, Degradation, ExpansionError, HybridScoreBundle, RetrievalCandidate, RetrievalError,
    RetrievalRequest, RetrievalResult, ScoreVector, Stage, StageResult, StageSummary, ValidationError,
};
use docseek_text::LexicalScorer;
use docseek_vector::{cmp_desc, order_desc, QueryExpander, SemanticScorer};

use crate::diversity::DiversitySelector;
use crate::fusion::RankFusion;
use crate::rerank::Reranker;

/// Runs one retrieval call end to end:
/// validate, expand, lexical, semantic, fuse, rerank, diversify, top-k.
///
/// Stage failures are replaced by each stage's neutral fallback and reported
/// in [`RetrievalResult::degradations`]. Only an invalid request or a fusion
/// length mismatch ends the call with an error.
pub struct RetrievalPipeline {
    lexical: LexicalScorer,
    semantic: SemanticScorer,
    expander: QueryExpander,
    reranker: Reranker,
}

#[derive(Default)]
struct Provenance {
    stages: BTreeMap<Stage, StageSummary>,
    degradations: Vec<Degradation>,
}

impl Provenance {
    fn skip(&mut self, stage: Stage) {
        self.stages.insert(stage, StageSummary::skipped());
    }

    /// Records `summary` and the degradation behind it, if any.
    fn record(&mut self, stage: Stage, summary: StageSummary, degradation: Option<Degradation>) {
        self.stages.insert(stage, summary.with_degradation(degradation.as_ref()));
        self.degradations.extend(degradation);
    }

    fn scores(&mut self, stage: Stage, result: StageResult<ScoreVector>) -> ScoreVector {
        let (scores, degradation) = result.into_parts();
        self.record(stage, StageSummary::from_scores(&scores), degradation);
        scores
    }
}

impl RetrievalPipeline {
    pub fn new(embedder: Arc<dyn EmbeddingProvider>, relevance: Arc<dyn RelevanceProvider>) -> Self {
        Self {
            lexical: LexicalScorer::new(),
            semantic: SemanticScorer::new(embedder.clone()),
            expander: QueryExpander::new(embedder),
            reranker: Reranker::new(relevance),
        }
    }

    pub fn run(&self, request: &RetrievalRequest) -> Result<RetrievalResult, RetrievalError> {
        let start = Instant::now();
        request.validate()?;
        let config = &request.config;
        let n = request.chunks.len();
        let mut prov = Provenance::default();

        let expanded_query_terms = if config.expand_query {
            let (mut terms, degradation) = self
                .expander
                .expand(&request.query, &request.chunks, &request.embeddings, config.max_expansions)
                .map_err(|ExpansionError::CountMismatch { chunks, embeddings }| {
                    ValidationError::CountMismatch { chunks, embeddings }
                })?
                .into_parts();
            terms.remove(0);
            let summary = StageSummary { applied: true, count: terms.len(), ..StageSummary::default() };
            prov.record(Stage::Expansion, summary, degradation);
            terms
        } else {
            prov.skip(Stage::Expansion);
            Vec::new()
        };
        let lexical_query = std::iter::once(request.query.as_str())
            .chain(expanded_query_terms.iter().map(String::as_str))
            .collect::<Vec<_>>()
            .join(" ");

        let lexical = if config.use_lexical {
            prov.scores(Stage::Lexical, self.lexical.score(&lexical_query, &request.chunks))
        } else {
            prov.skip(Stage::Lexical);
            vec![0.0; n]
        };
        let semantic = if config.use_semantic {
            prov.scores(Stage::Semantic, self.semantic.score(&request.query, &request.embeddings))
        } else {
            prov.skip(Stage::Semantic);
            vec![0.0; n]
        };

        // A disabled stage contributes nothing, so its all-zero vector cannot
        // bias the fused order towards low indices.
        let lexical_weight = if config.use_lexical { config.lexical_weight } else { 0.0 };
        let semantic_weight = if config.use_semantic { config.semantic_weight } else { 0.0 };
        let fused = RankFusion::new(config.rrf_k).fuse(&lexical, &semantic, lexical_weight, semantic_weight)?;
        let fused = prov.scores(Stage::Fusion, fused);
        let fused_norm = normalize_by_max(&fused);

        let mut rerank_scores: Vec<Option<f32>> = vec![None; n];
        let mut final_scores = fused_norm.clone();
        let mut reranking_applied = false;
        if config.use_reranking {
            let depth = config.rerank_depth.min(n);
            let top: Vec<usize> = order_desc(&fused).into_iter().take(depth).collect();
            let texts: Vec<&str> = top.iter().map(|&i| request.chunks[i].text.as_str()).collect();
            let (scores, degradation) = self.reranker.rerank(&request.query, &texts).into_parts();
            reranking_applied = degradation.is_none();
            let w = config.rerank_weight;
            for s in final_scores.iter_mut() {
                *s *= 1.0 - w;
            }
            for (&i, &r) in top.iter().zip(&scores) {
                rerank_scores[i] = Some(r);
                final_scores[i] += w * r;
            }
            prov.record(Stage::Rerank, StageSummary::from_scores(&scores), degradation);
        } else {
            prov.skip(Stage::Rerank);
        }

        let metadata = if request.chunk_metadata.is_empty() {
            ChunkMetadata::derive_all(&request.chunks)
        } else {
            request.chunk_metadata.clone()
        };
        let lexical_ranks = config.use_lexical.then(|| RankFusion::dense_ranks(&lexical));
        let semantic_ranks = config.use_semantic.then(|| RankFusion::dense_ranks(&semantic));

        let (order, penalties) = if config.use_diversity {
            let selector = DiversitySelector::new(config.diversity_threshold, config.diversity_strength);
            let selection = selector.select_order(&final_scores, &request.embeddings, config.top_k);
            prov.record(Stage::Diversity, StageSummary::from_scores(&selection.penalties), None);
            final_scores = selection.scores;
            (selection.order, selection.penalties)
        } else {
            prov.skip(Stage::Diversity);
            let mut order: Vec<usize> = (0..n).collect();
            order.sort_by(|&a, &b| cmp_desc(final_scores[a], final_scores[b]).then(a.cmp(&b)));
            (order, vec![0.0; n])
        };

        let candidates: Vec<RetrievalCandidate> = order
            .into_iter()
            .take(config.top_k)
            .map(|i| RetrievalCandidate {
                chunk: request.chunks[i].clone(),
                lexical_score: lexical[i],
                lexical_rank: lexical_ranks.as_ref().map(|r| r[i]),
                semantic_score: semantic[i],
                semantic_rank: semantic_ranks.as_ref().map(|r| r[i]),
                fusion_score: fused[i],
                rerank_score: rerank_scores[i],
                diversity_penalty: penalties[i],
                final_score: final_scores[i],
                metadata: metadata[i].clone(),
            })
            .collect();

        let scores = HybridScoreBundle::new(lexical, semantic, fused, final_scores)?;
        let Provenance { stages, degradations } = prov;
        tracing::info!(
            chunks = n,
            results = candidates.len(),
            degraded = degradations.len(),
            ms = start.elapsed().as_millis() as u64,
            "retrieval complete"
        );
        Ok(RetrievalResult {
            candidates,
            query_expanded: !expanded_query_terms.is_empty(),
            expanded_query_terms,
            reranking_applied,
            diversity_applied: config.use_diversity,
            stages,
            degradations,
            scores,
        })
    }
}

fn normalize_by_max(scores: &[f32]) -> Vec<f32> {
    let max = scores.iter().copied().fold(0.0f32, f32::max);
    if max > 0.0 {
        scores.iter().map(|s| s / max).collect()
    } else {
        scores.to_vec()
    }
}
