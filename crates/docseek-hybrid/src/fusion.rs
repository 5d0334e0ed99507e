use docseek_core::{Degradation, FusionError, ScoreVector, Stage, StageResult};
use docseek_vector::order_desc;

pub const DEFAULT_RRF_K: f32 = 60.0;

/// Weighted reciprocal rank fusion.
///
/// Only the ordering of each input matters, so any monotonic rescaling of
/// either score vector leaves the fused scores unchanged.
#[derive(Debug, Clone, Copy)]
pub struct RankFusion {
    k: f32,
}

impl Default for RankFusion {
    fn default() -> Self { Self::new(DEFAULT_RRF_K) }
}

impl RankFusion {
    pub fn new(k: f32) -> Self { Self { k } }

    /// Rank position of every score, 0 for the best. Ties keep index order and
    /// NaN ranks last.
    pub fn dense_ranks(scores: &[f32]) -> Vec<usize> {
        let mut ranks = vec![0; scores.len()];
        for (rank, i) in order_desc(scores).into_iter().enumerate() {
            ranks[i] = rank;
        }
        ranks
    }

    pub fn fuse(
        &self,
        lexical: &[f32],
        semantic: &[f32],
        lexical_weight: f32,
        semantic_weight: f32,
    ) -> Result<StageResult<ScoreVector>, FusionError> {
        if lexical.len() != semantic.len() {
            return Err(FusionError::LengthMismatch { lexical: lexical.len(), semantic: semantic.len() });
        }
        let n = lexical.len();
        if !(lexical_weight.is_finite() && semantic_weight.is_finite() && self.k.is_finite() && self.k > 0.0) {
            return Ok(StageResult::degraded(
                vec![0.0; n],
                Degradation::scoring(
                    Stage::Fusion,
                    format!("invalid fusion parameters (k={}, weights={lexical_weight}/{semantic_weight})", self.k),
                ),
            ));
        }
        let lexical_ranks = Self::dense_ranks(lexical);
        let semantic_ranks = Self::dense_ranks(semantic);
        let fused: Vec<f32> = lexical_ranks
            .iter()
            .zip(&semantic_ranks)
            .map(|(&rl, &rs)| lexical_weight / (self.k + rl as f32) + semantic_weight / (self.k + rs as f32))
            .collect();
        if fused.iter().any(|s| !s.is_finite()) {
            return Ok(StageResult::degraded(vec![0.0; n], Degradation::scoring(Stage::Fusion, "non-finite fused score")));
        }
        Ok(StageResult::Completed(fused))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn ranks_break_ties_by_index() {
        assert_eq!(RankFusion::dense_ranks(&[0.2, 0.9, 0.2, f32::NAN]), vec![1, 0, 2, 3]);
    }

    #[test]
    fn fuses_weighted_reciprocal_ranks() {
        let fused = RankFusion::default().fuse(&[1.0, 0.0], &[0.0, 1.0], 0.3, 0.7).unwrap();
        let fused = fused.value();
        assert!((fused[0] - (0.3 / 60.0 + 0.7 / 61.0)).abs() < 1e-7);
        assert!((fused[1] - (0.3 / 61.0 + 0.7 / 60.0)).abs() < 1e-7);
        assert!(fused[1] > fused[0]);
    }

    #[test]
    fn empty_and_mismatched_inputs() {
        assert_eq!(RankFusion::default().fuse(&[], &[], 0.3, 0.7).unwrap(), StageResult::Completed(vec![]));
        assert_eq!(
            RankFusion::default().fuse(&[1.0, 2.0, 3.0], &[1.0, 2.0], 0.3, 0.7).unwrap_err(),
            FusionError::LengthMismatch { lexical: 3, semantic: 2 }
        );
    }

    #[test]
    fn invariant_under_monotonic_rescaling() {
        let lexical = [0.1, 0.7, 0.4, 0.0];
        let semantic = [0.9, 0.2, 0.5, 0.3];
        let rescaled: Vec<f32> = lexical.iter().map(|s| s * 100.0 + 3.0).collect();
        let squashed: Vec<f32> = semantic.iter().map(|s| s * s).collect();
        let fusion = RankFusion::default();
        assert_eq!(
            fusion.fuse(&lexical, &semantic, 0.3, 0.7).unwrap(),
            fusion.fuse(&rescaled, &squashed, 0.3, 0.7).unwrap()
        );
    }

    #[test]
    fn non_finite_weight_degrades_to_zeros() {
        let (fused, degradation) = RankFusion::default().fuse(&[1.0, 0.0], &[0.0, 1.0], f32::NAN, 0.7).unwrap().into_parts();
        assert_eq!(fused, vec![0.0, 0.0]);
        assert_eq!(degradation.map(|d| d.stage), Some(Stage::Fusion));
    }
}
