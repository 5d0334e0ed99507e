use docseek_core::RetrievalCandidate;
use docseek_vector::{cmp_desc, cosine};

pub const DEFAULT_THRESHOLD: f32 = 0.85;
pub const DEFAULT_STRENGTH: f32 = 0.5;

/// Output of a selection pass, indexed by input position.
#[derive(Debug, Clone, PartialEq)]
pub struct Selection {
    /// Input positions, best first. The first `accepted` were picked greedily.
    pub order: Vec<usize>,
    pub accepted: usize,
    pub penalties: Vec<f32>,
    /// Scores after penalties.
    pub scores: Vec<f32>,
}

/// Greedy near-duplicate suppression over candidate embeddings.
///
/// The best remaining candidate is compared with everything already
/// accepted. When its closest match is more similar than `threshold`, it is
/// penalized by `strength * (sim - threshold) / (1 - threshold)` and returned
/// to the pool; a candidate whose penalty did not grow is accepted.
#[derive(Debug, Clone, Copy)]
pub struct DiversitySelector {
    threshold: f32,
    strength: f32,
}

impl Default for DiversitySelector {
    fn default() -> Self { Self::new(DEFAULT_THRESHOLD, DEFAULT_STRENGTH) }
}

impl DiversitySelector {
    pub fn new(threshold: f32, strength: f32) -> Self { Self { threshold, strength } }

    fn penalty(&self, similarity: f32) -> f32 {
        if similarity <= self.threshold || self.threshold >= 1.0 {
            return 0.0;
        }
        self.strength * (similarity - self.threshold) / (1.0 - self.threshold)
    }

    /// Selects up to `limit` candidates from `scores`, with `embeddings[i]`
    /// belonging to `scores[i]`. Positions not accepted follow in penalized
    /// score order.
    pub fn select_order(&self, scores: &[f32], embeddings: &[Vec<f32>], limit: usize) -> Selection {
        let n = scores.len().min(embeddings.len());
        let mut current = scores[..n].to_vec();
        let mut penalties = vec![0.0f32; n];
        let mut pool: Vec<usize> = (0..n).collect();
        let mut order = Vec::with_capacity(n);

        while order.len() < limit && !pool.is_empty() {
            let Some(slot) = best_slot(&pool, &current) else { break };
            let i = pool[slot];
            let similarity = order
                .iter()
                .map(|&j: &usize| cosine(&embeddings[i], &embeddings[j]))
                .fold(f32::NEG_INFINITY, f32::max);
            let penalty = self.penalty(similarity);
            if penalty > penalties[i] {
                penalties[i] = penalty;
                current[i] = scores[i] - penalty;
                continue;
            }
            pool.swap_remove(slot);
            order.push(i);
        }

        let accepted = order.len();
        pool.sort_by(|&a, &b| cmp_desc(current[a], current[b]).then(a.cmp(&b)));
        order.extend(pool);
        Selection { order, accepted, penalties, scores: current }
    }

    /// Reorders candidates, writing each one's penalty and penalized score.
    pub fn select(
        &self,
        candidates: Vec<RetrievalCandidate>,
        embeddings: &[Vec<f32>],
        limit: usize,
    ) -> Vec<RetrievalCandidate> {
        let scores: Vec<f32> = candidates.iter().map(|c| c.final_score).collect();
        let selection = self.select_order(&scores, embeddings, limit);
        let mut slots: Vec<Option<RetrievalCandidate>> = candidates.into_iter().map(Some).collect();
        selection
            .order
            .iter()
            .filter_map(|&i| {
                let mut c = slots[i].take()?;
                c.diversity_penalty = selection.penalties[i];
                c.final_score = selection.scores[i];
                Some(c)
            })
            .collect()
    }
}

fn best_slot(pool: &[usize], scores: &[f32]) -> Option<usize> {
    (0..pool.len()).min_by(|&a, &b| cmp_desc(scores[pool[a]], scores[pool[b]]).then(pool[a].cmp(&pool[b])))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn near_duplicate() -> Vec<f32> {
        // cosine 0.95 with [1, 0]
        vec![0.95, (1.0f32 - 0.95 * 0.95).sqrt()]
    }

    #[test]
    fn penalizes_near_duplicate_but_keeps_it() {
        let embeddings = vec![vec![1.0, 0.0], near_duplicate(), vec![0.0, 1.0]];
        let sel = DiversitySelector::default().select_order(&[1.0, 0.9, 0.2], &embeddings, 3);
        assert_eq!(sel.order, vec![0, 1, 2]);
        let expected = 0.5 * (0.95 - 0.85) / (1.0 - 0.85);
        assert!((sel.penalties[1] - expected).abs() < 1e-4, "penalty {}", sel.penalties[1]);
        assert!((sel.scores[1] - (0.9 - expected)).abs() < 1e-4);
        assert_eq!(sel.penalties[0], 0.0);
        assert_eq!(sel.penalties[2], 0.0);
    }

    #[test]
    fn penalty_can_push_duplicate_past_limit() {
        let embeddings = vec![vec![1.0, 0.0], near_duplicate(), vec![0.0, 1.0]];
        let sel = DiversitySelector::default().select_order(&[1.0, 0.9, 0.7], &embeddings, 2);
        assert_eq!(sel.order, vec![0, 2, 1]);
        assert_eq!(sel.accepted, 2);
    }

    #[test]
    fn distinct_candidates_keep_score_order() {
        let embeddings = vec![vec![1.0, 0.0, 0.0], vec![0.0, 1.0, 0.0], vec![0.0, 0.0, 1.0]];
        let sel = DiversitySelector::default().select_order(&[0.3, 0.8, 0.8], &embeddings, 3);
        assert_eq!(sel.order, vec![1, 2, 0]);
        assert!(sel.penalties.iter().all(|p| *p == 0.0));
    }

    fn candidate(index: usize, final_score: f32) -> RetrievalCandidate {
        RetrievalCandidate {
            chunk: docseek_core::Chunk::new(index, format!("chunk {index}")),
            lexical_score: 0.0,
            lexical_rank: Some(index),
            semantic_score: 0.0,
            semantic_rank: Some(index),
            fusion_score: 0.0,
            rerank_score: None,
            diversity_penalty: 0.0,
            final_score,
            metadata: docseek_core::ChunkMetadata::derive(index, 3, "body."),
        }
    }

    #[test]
    fn select_writes_penalty_and_score_onto_candidates() {
        let embeddings = vec![vec![1.0, 0.0], near_duplicate(), vec![0.0, 1.0]];
        let candidates = vec![candidate(0, 1.0), candidate(1, 0.9), candidate(2, 0.7)];
        let selected = DiversitySelector::default().select(candidates, &embeddings, 3);

        let order: Vec<usize> = selected.iter().map(|c| c.chunk.index).collect();
        assert_eq!(order, vec![0, 2, 1]);
        let expected = 0.5 * (0.95 - 0.85) / (1.0 - 0.85);
        let duplicate = &selected[2];
        assert!((duplicate.diversity_penalty - expected).abs() < 1e-4);
        assert!((duplicate.final_score - (0.9 - expected)).abs() < 1e-4);
        assert_eq!(selected[0].diversity_penalty, 0.0);
        assert_eq!(selected[0].final_score, 1.0);
        assert_eq!(selected[1].final_score, 0.7);
    }

    #[test]
    fn repeated_runs_agree() {
        let embeddings = vec![vec![1.0, 0.0], near_duplicate(), vec![0.0, 1.0], vec![0.1, 1.0]];
        let selector = DiversitySelector::default();
        let first = selector.select_order(&[0.9, 0.85, 0.6, 0.55], &embeddings, 4);
        let again = selector.select_order(&[0.9, 0.85, 0.6, 0.55], &embeddings, 4);
        assert_eq!(first, again);
    }
}
