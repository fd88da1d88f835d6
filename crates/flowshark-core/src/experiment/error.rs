use thiserror::Error;

/// Dataset-level failures; no hypothesis is evaluated.
#[derive(Debug, Error)]
pub enum ExperimentError {
    #[error("dataset has no rows")]
    EmptyDataset,
    #[error("dataset needs at least 2 distinct labels, found {found}")]
    InsufficientClasses { found: usize },
}

/// Failure of a single hypothesis; other hypotheses still run.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum HypothesisError {
    #[error("hypothesis has no features")]
    EmptyFeatureSet,
    #[error("split left an empty partition (train {train}, test {test})")]
    EmptyPartition { train: usize, test: usize },
    #[error("training failed: {0}")]
    Training(#[from] TrainError),
}

#[derive(Debug, Clone, PartialEq, Error)]
pub enum TrainError {
    #[error("training set is empty")]
    EmptyTrainingSet,
    #[error("{rows} feature rows but {labels} labels")]
    LabelMismatch { rows: usize, labels: usize },
    #[error("expected {expected} features per row, got {actual}")]
    FeatureWidth { expected: usize, actual: usize },
    #[error("label {label} is outside 0..{n_classes}")]
    LabelOutOfRange { label: usize, n_classes: usize },
    #[error("classifier used before fit")]
    NotFitted,
}

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("invalid config JSON: {0}")]
    Json(#[from] serde_json::Error),
    #[error("test_fraction must be in (0, 1), got {0}")]
    TestFraction(f64),
    #[error("forest needs at least one tree")]
    NoTrees,
    #[error("min_samples_split must be at least 2, got {0}")]
    MinSamplesSplit(usize),
    #[error("max_depth must be at least 1 when set")]
    MaxDepth,
    #[error("no hypotheses configured")]
    NoHypotheses,
}
