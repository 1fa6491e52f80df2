// ============================================================
// Layer 4 - Train/Test Partitioner
// ============================================================
// Splits the positions 0..total of a sampled set into two
// disjoint index sets:
//   - Training set: `train_count` positions drawn without replacement
//   - Test set:     every remaining position, ascending
//
// Union is the full range, intersection is empty. With a seeded
// RNG the partition is reproducible; the run draws it before the
// sampler so a cache hit does not shift the random stream.

use rand::Rng;

use crate::error::{PipelineError, PipelineResult};

/// Disjoint train/test positions into a sampled set.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Partition {
    /// In draw order
    pub train: Vec<usize>,
    /// Ascending
    pub test:  Vec<usize>,
}

/// Partition `0..total` into `train_count` training positions and the rest.
pub fn partition<R: Rng + ?Sized>(
    total:       usize,
    train_count: usize,
    rng:         &mut R,
) -> PipelineResult<Partition> {
    if train_count > total {
        return Err(PipelineError::InvalidPartition { total, train: train_count });
    }

    let train = rand::seq::index::sample(rng, total, train_count).into_vec();

    let mut in_train = vec![false; total];
    for &i in &train {
        in_train[i] = true;
    }
    let test: Vec<usize> = (0..total).filter(|&i| !in_train[i]).collect();

    tracing::debug!(
        "Partition: {} train, {} test ({}% / {}%)",
        train.len(),
        test.len(),
        (train.len() * 100) / total.max(1),
        (test.len()  * 100) / total.max(1),
    );

    Ok(Partition { train, test })
}

/// Training count for a ratio, truncating like `int(total * ratio)`.
pub fn train_count_for(total: usize, train_ratio: f64) -> usize {
    let n = (total as f64 * train_ratio.clamp(0.0, 1.0)) as usize;
    n.min(total)
}

// ─── Unit Tests ───────────────────────────────────────────────────────────────
#[cfg(test)]
mod tests {
    use super::*;
    use rand::{rngs::StdRng, SeedableRng};
    use std::collections::HashSet;

    fn check(total: usize, train_count: usize, seed: u64) {
        let p = partition(total, train_count, &mut StdRng::seed_from_u64(seed)).unwrap();
        assert_eq!(p.train.len(), train_count);
        assert_eq!(p.test.len(), total - train_count);

        let train: HashSet<_> = p.train.iter().copied().collect();
        let test:  HashSet<_> = p.test.iter().copied().collect();
        assert_eq!(train.len(), train_count, "train has duplicates");
        assert!(train.is_disjoint(&test));

        let union: HashSet<_> = train.union(&test).copied().collect();
        assert_eq!(union, (0..total).collect());
    }

    #[test]
    fn test_disjoint_and_covering_for_many_sizes() {
        for (seed, total) in [0usize, 1, 2, 7, 50, 333].into_iter().enumerate() {
            for train_count in [0, total / 3, total / 2, total] {
                check(total, train_count, seed as u64);
            }
        }
    }

    #[test]
    fn test_test_set_is_ascending() {
        let p = partition(100, 75, &mut StdRng::seed_from_u64(100)).unwrap();
        assert!(p.test.windows(2).all(|w| w[0] < w[1]));
        assert_eq!(p.train.len() + p.test.len(), 100);
    }

    #[test]
    fn test_same_seed_same_partition() {
        let a = partition(500, 375, &mut StdRng::seed_from_u64(100)).unwrap();
        let b = partition(500, 375, &mut StdRng::seed_from_u64(100)).unwrap();
        assert_eq!(a, b);
    }

    #[test]
    fn test_train_larger_than_total_fails() {
        let err = partition(10, 11, &mut StdRng::seed_from_u64(0)).unwrap_err();
        assert!(matches!(err, PipelineError::InvalidPartition { total: 10, train: 11 }));
    }

    #[test]
    fn test_train_count_for_truncates() {
        assert_eq!(train_count_for(100, 0.75), 75);
        assert_eq!(train_count_for(7, 0.5), 3);
        assert_eq!(train_count_for(10, 1.5), 10);
    }
}
