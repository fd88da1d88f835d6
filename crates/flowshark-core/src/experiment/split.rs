use rand::SeedableRng;
use rand::seq::SliceRandom;
use rand_chacha::ChaCha8Rng;

/// Row indices of the training and evaluation partitions.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Split {
    pub train: Vec<usize>,
    pub test: Vec<usize>,
}

/// Shuffle `0..n` with a seeded ChaCha8 generator and hold out
/// `ceil(test_fraction * n)` rows for evaluation.
///
/// The same `n`, fraction and seed always give the same partition.
///
/// # Examples
/// ```
/// use flowshark_core::experiment::split::train_test_split;
///
/// let split = train_test_split(10, 0.3, 42);
/// assert_eq!(split.test.len(), 3);
/// assert_eq!(split.train.len(), 7);
/// assert_eq!(split, train_test_split(10, 0.3, 42));
/// ```
pub fn train_test_split(n: usize, test_fraction: f64, seed: u64) -> Split {
    let mut indices: Vec<usize> = (0..n).collect();
    let mut rng = ChaCha8Rng::seed_from_u64(seed);
    indices.shuffle(&mut rng);

    let n_test = ((n as f64) * test_fraction).ceil().max(0.0) as usize;
    let n_test = n_test.min(n);
    let train = indices.split_off(n_test);
    Split {
        train,
        test: indices,
    }
}
