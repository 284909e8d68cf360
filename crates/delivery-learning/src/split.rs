//! Seeded train/evaluation split.

use rand::SeedableRng;
use rand::seq::SliceRandom;
use rand_chacha::ChaCha8Rng;

/// Row indices of the two partitions.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SplitIndices {
    pub train: Vec<usize>,
    pub eval: Vec<usize>,
}

/// Shuffle `0..n_rows` with `seed` and hold out `ceil(test_fraction * n_rows)`
/// rows for evaluation.
///
/// The held-out count is clamped so both partitions are non-empty whenever
/// `n_rows >= 2`.
pub fn train_eval_split(n_rows: usize, test_fraction: f64, seed: u64) -> SplitIndices {
    let mut indices: Vec<usize> = (0..n_rows).collect();
    let mut rng = ChaCha8Rng::seed_from_u64(seed);
    indices.shuffle(&mut rng);

    let n_eval = ((test_fraction * n_rows as f64).ceil() as usize).clamp(
        usize::from(n_rows > 1),
        n_rows.saturating_sub(1),
    );
    let train = indices.split_off(n_eval);

    SplitIndices {
        train,
        eval: indices,
    }
}
