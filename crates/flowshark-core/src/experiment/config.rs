use serde::{Deserialize, Serialize};

use super::error::ConfigError;
use super::forest::ForestConfig;
use super::hypothesis::{Hypothesis, default_hypotheses};
use crate::flow::IatOrder;

/// Experiment settings; every field has a default, so a partial JSON document
/// is a valid config.
///
/// # Examples
/// ```
/// use flowshark_core::experiment::ExperimentConfig;
///
/// let config = ExperimentConfig::from_json(r#"{"test_fraction": 0.25, "forest": {"n_trees": 9}}"#).unwrap();
/// assert_eq!(config.seed, 42);
/// assert_eq!(config.test_fraction, 0.25);
/// assert_eq!(config.forest.n_trees, 9);
/// assert_eq!(config.forest.min_samples_split, 2);
/// ```
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ExperimentConfig {
    /// Seed of the train/test permutation, shared by all hypotheses.
    pub seed: u64,
    pub test_fraction: f64,
    pub iat_order: IatOrder,
    /// Evaluate hypotheses on scoped threads.
    pub parallel: bool,
    pub forest: ForestConfig,
    pub hypotheses: Vec<Hypothesis>,
}

impl Default for ExperimentConfig {
    fn default() -> Self {
        Self {
            seed: 42,
            test_fraction: 0.3,
            iat_order: IatOrder::default(),
            parallel: false,
            forest: ForestConfig::default(),
            hypotheses: default_hypotheses(),
        }
    }
}

impl ExperimentConfig {
    pub fn from_json(input: &str) -> Result<Self, ConfigError> {
        let config: Self = serde_json::from_str(input)?;
        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        if !(self.test_fraction > 0.0 && self.test_fraction < 1.0) {
            return Err(ConfigError::TestFraction(self.test_fraction));
        }
        if self.forest.n_trees == 0 {
            return Err(ConfigError::NoTrees);
        }
        if self.forest.min_samples_split < 2 {
            return Err(ConfigError::MinSamplesSplit(self.forest.min_samples_split));
        }
        if self.forest.max_depth == Some(0) {
            return Err(ConfigError::MaxDepth);
        }
        if self.hypotheses.is_empty() {
            return Err(ConfigError::NoHypotheses);
        }
        Ok(())
    }
}
