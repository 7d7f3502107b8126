//! Reproducible train/test partitioning.

use rand::rngs::StdRng;
use rand::seq::SliceRandom;
use rand::SeedableRng;

use super::error::ScorerError;

/// Smallest partition size that still yields meaningful metrics.
pub const MIN_PARTITION_ROWS: usize = 2;

/// Row indices of the two partitions.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Partition {
    pub train: Vec<usize>,
    pub test: Vec<usize>,
}

/// Shuffle `0..n` with `seed` and hold out `ceil(n * test_fraction)` rows.
///
/// Fails when either partition would have fewer than
/// [`MIN_PARTITION_ROWS`] rows.
pub fn train_test_split(n: usize, test_fraction: f64, seed: u64) -> Result<Partition, ScorerError> {
    if !(test_fraction > 0.0 && test_fraction < 1.0) {
        return Err(ScorerError::validation(format!(
            "test_fraction: {test_fraction} must be in (0, 1)"
        )));
    }

    #[allow(clippy::cast_possible_truncation, clippy::cast_sign_loss, clippy::cast_precision_loss)]
    let n_test = (n as f64 * test_fraction).ceil() as usize;
    let n_train = n.saturating_sub(n_test);
    if n_test < MIN_PARTITION_ROWS || n_train < MIN_PARTITION_ROWS {
        return Err(ScorerError::Validation(vec![format!(
            "table: {n} rows gives a {n_train}/{n_test} train/test split, \
             each partition needs at least {MIN_PARTITION_ROWS} rows"
        )]));
    }

    let mut indices: Vec<usize> = (0..n).collect();
    let mut rng = StdRng::seed_from_u64(seed);
    indices.shuffle(&mut rng);

    let train = indices.split_off(n_test);
    Ok(Partition {
        train,
        test: indices,
    })
}
