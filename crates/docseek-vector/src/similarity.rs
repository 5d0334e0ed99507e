use std::cmp::Ordering;

const EPS: f32 = 1e-8;

/// Cosine similarity with a small epsilon in the denominator, so zero vectors
/// score 0 instead of NaN. Callers must pass equal-length slices.
pub fn cosine(a: &[f32], b: &[f32]) -> f32 {
    let (mut dot, mut na, mut nb) = (0f32, 0f32, 0f32);
    for (x, y) in a.iter().zip(b) {
        dot += x * y;
        na += x * x;
        nb += y * y;
    }
    dot / (na.sqrt() * nb.sqrt() + EPS)
}

/// Descending order for scores; NaN sorts after every number.
pub fn cmp_desc(a: f32, b: f32) -> Ordering {
    match (a.is_nan(), b.is_nan()) {
        (true, true) => Ordering::Equal,
        (true, false) => Ordering::Greater,
        (false, true) => Ordering::Less,
        (false, false) => b.partial_cmp(&a).unwrap_or(Ordering::Equal),
    }
}

/// Indices of `scores` from best to worst. The sort is stable, so equal
/// scores keep ascending index order.
pub fn order_desc(scores: &[f32]) -> Vec<usize> {
    let mut order: Vec<usize> = (0..scores.len()).collect();
    order.sort_by(|&a, &b| cmp_desc(scores[a], scores[b]));
    order
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn cosine_of_parallel_and_zero_vectors() {
        assert!((cosine(&[1.0, 2.0], &[2.0, 4.0]) - 1.0).abs() < 1e-6);
        assert!((cosine(&[1.0, 0.0], &[-1.0, 0.0]) + 1.0).abs() < 1e-6);
        assert_eq!(cosine(&[0.0, 0.0], &[1.0, 0.0]), 0.0);
    }

    #[test]
    fn order_is_stable_and_puts_nan_last() {
        assert_eq!(order_desc(&[0.5, f32::NAN, 0.9, 0.5]), vec![2, 0, 3, 1]);
        assert!(order_desc(&[]).is_empty());
    }
}
