//! Feature-set experiments: for each hypothesis, split the dataset with a
//! fixed seed, standardise on the training partition, train a classifier and
//! score it on the held-out rows.

pub mod config;
pub mod error;
pub mod forest;
pub mod hypothesis;
pub mod runner;
pub mod scale;
pub mod split;

pub use config::ExperimentConfig;
pub use error::{ConfigError, ExperimentError, HypothesisError, TrainError};
pub use forest::{Classifier, ForestConfig, RandomForest};
pub use hypothesis::{Feature, Hypothesis, default_hypotheses};
pub use runner::{ExperimentReport, HypothesisOutcome, run_experiments};
pub use scale::StandardScaler;
pub use split::{Split, train_test_split};
