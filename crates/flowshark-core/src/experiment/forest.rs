//! Random forest of bootstrap CART trees.

use rand::seq::SliceRandom;
use rand::{Rng, SeedableRng};
use rand_chacha::ChaCha8Rng;
use serde::{Deserialize, Serialize};

use super::error::TrainError;

/// A supervised classifier over dense feature rows and class indices.
///
/// Labels are class indices in `0..n_classes`.
pub trait Classifier {
    fn fit(
        &mut self,
        features: &[Vec<f64>],
        labels: &[usize],
        n_classes: usize,
    ) -> Result<(), TrainError>;

    fn predict(&self, features: &[Vec<f64>]) -> Result<Vec<usize>, TrainError>;
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ForestConfig {
    pub n_trees: usize,
    /// Unlimited when `None`: leaves are grown until pure.
    pub max_depth: Option<usize>,
    pub min_samples_split: usize,
    pub seed: u64,
}

impl Default for ForestConfig {
    fn default() -> Self {
        Self {
            n_trees: 5,
            max_depth: None,
            min_samples_split: 2,
            seed: 42,
        }
    }
}

/// Bagged ensemble of Gini CART trees with `sqrt(n_features)` candidate
/// features per split. Predictions average the per-tree class distributions.
///
/// # Examples
/// ```
/// use flowshark_core::experiment::{Classifier, ForestConfig, RandomForest};
///
/// let features = vec![vec![0.0], vec![0.1], vec![0.9], vec![1.0]];
/// let labels = vec![0, 0, 1, 1];
/// let mut forest = RandomForest::new(ForestConfig::default());
/// forest.fit(&features, &labels, 2).unwrap();
/// assert_eq!(forest.predict(&[vec![0.05], vec![0.95]]).unwrap(), vec![0, 1]);
/// ```
#[derive(Debug, Clone)]
pub struct RandomForest {
    config: ForestConfig,
    trees: Vec<DecisionTree>,
    n_classes: usize,
    n_features: usize,
}

impl RandomForest {
    pub fn new(config: ForestConfig) -> Self {
        Self {
            config,
            trees: Vec::new(),
            n_classes: 0,
            n_features: 0,
        }
    }

    pub fn config(&self) -> &ForestConfig {
        &self.config
    }

    pub fn n_trees(&self) -> usize {
        self.trees.len()
    }

    fn tree_rng(&self, tree: usize) -> ChaCha8Rng {
        let stream = (tree as u64).wrapping_mul(0x9E37_79B9_7F4A_7C15);
        ChaCha8Rng::seed_from_u64(self.config.seed ^ stream)
    }
}

impl Classifier for RandomForest {
    fn fit(
        &mut self,
        features: &[Vec<f64>],
        labels: &[usize],
        n_classes: usize,
    ) -> Result<(), TrainError> {
        if features.is_empty() {
            return Err(TrainError::EmptyTrainingSet);
        }
        if features.len() != labels.len() {
            return Err(TrainError::LabelMismatch {
                rows: features.len(),
                labels: labels.len(),
            });
        }
        let n_features = features[0].len();
        if let Some(row) = features.iter().find(|row| row.len() != n_features) {
            return Err(TrainError::FeatureWidth {
                expected: n_features,
                actual: row.len(),
            });
        }
        if let Some(label) = labels.iter().find(|label| **label >= n_classes) {
            return Err(TrainError::LabelOutOfRange {
                label: *label,
                n_classes,
            });
        }

        let data = TrainingData {
            features,
            labels,
            n_classes,
        };
        let n = features.len();
        let trees = (0..self.config.n_trees.max(1))
            .map(|tree| {
                let mut rng = self.tree_rng(tree);
                let bootstrap: Vec<usize> = (0..n).map(|_| rng.gen_range(0..n)).collect();
                DecisionTree::grow(&data, bootstrap, &self.config, &mut rng)
            })
            .collect();

        self.trees = trees;
        self.n_classes = n_classes;
        self.n_features = n_features;
        Ok(())
    }

    fn predict(&self, features: &[Vec<f64>]) -> Result<Vec<usize>, TrainError> {
        if self.trees.is_empty() {
            return Err(TrainError::NotFitted);
        }
        features
            .iter()
            .map(|row| {
                if row.len() != self.n_features {
                    return Err(TrainError::FeatureWidth {
                        expected: self.n_features,
                        actual: row.len(),
                    });
                }
                let mut votes = vec![0.0; self.n_classes];
                for tree in &self.trees {
                    for (vote, p) in votes.iter_mut().zip(tree.distribution(row)) {
                        *vote += p;
                    }
                }
                Ok(argmax(&votes))
            })
            .collect()
    }
}

/// Lowest index wins ties.
fn argmax(values: &[f64]) -> usize {
    let mut best = 0;
    for (index, value) in values.iter().enumerate() {
        if *value > values[best] {
            best = index;
        }
    }
    best
}

struct TrainingData<'a> {
    features: &'a [Vec<f64>],
    labels: &'a [usize],
    n_classes: usize,
}

impl TrainingData<'_> {
    fn value(&self, sample: usize, feature: usize) -> f64 {
        self.features[sample][feature]
    }

    fn class_counts(&self, samples: &[usize]) -> Vec<usize> {
        let mut counts = vec![0; self.n_classes];
        for sample in samples {
            counts[self.labels[*sample]] += 1;
        }
        counts
    }
}

#[derive(Debug, Clone)]
enum Node {
    Leaf {
        distribution: Vec<f64>,
    },
    Split {
        feature: usize,
        threshold: f64,
        left: usize,
        right: usize,
    },
}

#[derive(Debug, Clone, Copy)]
struct SplitRule {
    feature: usize,
    threshold: f64,
}

#[derive(Debug, Clone)]
struct DecisionTree {
    nodes: Vec<Node>,
}

impl DecisionTree {
    /// Grown with an explicit work stack; unbounded depth must not recurse.
    fn grow(
        data: &TrainingData<'_>,
        samples: Vec<usize>,
        config: &ForestConfig,
        rng: &mut ChaCha8Rng,
    ) -> Self {
        let placeholder = || Node::Leaf {
            distribution: Vec::new(),
        };
        let mut nodes = vec![placeholder()];
        let mut pending = vec![(0usize, samples, 0usize)];

        while let Some((slot, samples, depth)) = pending.pop() {
            let counts = data.class_counts(&samples);
            let classes_present = counts.iter().filter(|count| **count > 0).count();
            let splittable = classes_present > 1
                && samples.len() >= config.min_samples_split
                && config.max_depth.is_none_or(|max| depth < max);
            let rule = if splittable {
                best_split(data, &samples, &counts, rng)
            } else {
                None
            };

            let Some(rule) = rule else {
                nodes[slot] = leaf(&counts, samples.len());
                continue;
            };
            let (left, right): (Vec<usize>, Vec<usize>) = samples
                .into_iter()
                .partition(|sample| data.value(*sample, rule.feature) <= rule.threshold);
            let left_slot = nodes.len();
            nodes.push(placeholder());
            let right_slot = nodes.len();
            nodes.push(placeholder());
            nodes[slot] = Node::Split {
                feature: rule.feature,
                threshold: rule.threshold,
                left: left_slot,
                right: right_slot,
            };
            pending.push((right_slot, right, depth + 1));
            pending.push((left_slot, left, depth + 1));
        }

        Self { nodes }
    }

    fn distribution(&self, row: &[f64]) -> &[f64] {
        let mut index = 0;
        loop {
            match &self.nodes[index] {
                Node::Leaf { distribution } => return distribution,
                Node::Split {
                    feature,
                    threshold,
                    left,
                    right,
                } => {
                    index = if row[*feature] <= *threshold {
                        *left
                    } else {
                        *right
                    };
                }
            }
        }
    }
}

fn leaf(counts: &[usize], total: usize) -> Node {
    let total = total.max(1) as f64;
    Node::Leaf {
        distribution: counts.iter().map(|count| *count as f64 / total).collect(),
    }
}

fn gini(counts: impl Iterator<Item = usize>, total: f64) -> f64 {
    if total == 0.0 {
        return 0.0;
    }
    1.0 - counts
        .map(|count| (count as f64 / total).powi(2))
        .sum::<f64>()
}

/// Lowest weighted child Gini over `sqrt(n_features)` random candidate
/// features. Constant candidates do not count: more features are drawn until
/// one admits a split or all have been tried.
fn best_split(
    data: &TrainingData<'_>,
    samples: &[usize],
    counts: &[usize],
    rng: &mut ChaCha8Rng,
) -> Option<SplitRule> {
    let n_features = data.features[samples[0]].len();
    let max_features = ((n_features as f64).sqrt().floor() as usize).max(1);
    let mut order: Vec<usize> = (0..n_features).collect();
    order.shuffle(rng);

    let total = samples.len() as f64;
    let mut sorted = samples.to_vec();
    let mut best: Option<(f64, SplitRule)> = None;

    for (visited, feature) in order.into_iter().enumerate() {
        if visited >= max_features && best.is_some() {
            break;
        }
        sorted.sort_by(|a, b| data.value(*a, feature).total_cmp(&data.value(*b, feature)));

        let mut left = vec![0usize; counts.len()];
        for k in 0..sorted.len() - 1 {
            left[data.labels[sorted[k]]] += 1;
            let here = data.value(sorted[k], feature);
            let next = data.value(sorted[k + 1], feature);
            if here == next {
                continue;
            }
            let n_left = (k + 1) as f64;
            let n_right = total - n_left;
            let left_gini = gini(left.iter().copied(), n_left);
            let right_gini = gini(
                counts.iter().zip(&left).map(|(all, l)| all - l),
                n_right,
            );
            let impurity = (n_left * left_gini + n_right * right_gini) / total;
            if best.is_none_or(|(score, _)| impurity < score) {
                let mut threshold = here + (next - here) / 2.0;
                if threshold >= next || !threshold.is_finite() {
                    threshold = here;
                }
                best = Some((impurity, SplitRule { feature, threshold }));
            }
        }
    }
    best.map(|(_, rule)| rule)
}
