use log::{info, warn};
use serde::Serialize;
use serde::ser::{SerializeStruct, Serializer};

use super::config::ExperimentConfig;
use super::error::{ExperimentError, HypothesisError};
use super::forest::Classifier;
use super::hypothesis::{Feature, Hypothesis};
use super::scale::StandardScaler;
use super::split::train_test_split;
use crate::flow::FeatureRow;
use crate::validate::DatasetRecord;

/// Result of evaluating one hypothesis.
#[derive(Debug, Clone, PartialEq)]
pub struct HypothesisOutcome {
    pub name: String,
    pub features: Vec<Feature>,
    pub train_rows: usize,
    pub test_rows: usize,
    /// Fraction of evaluation rows predicted correctly.
    pub accuracy: Result<f64, HypothesisError>,
}

impl Serialize for HypothesisOutcome {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let mut state = serializer.serialize_struct("HypothesisOutcome", 6)?;
        state.serialize_field("name", &self.name)?;
        state.serialize_field("features", &self.features)?;
        state.serialize_field("train_rows", &self.train_rows)?;
        state.serialize_field("test_rows", &self.test_rows)?;
        state.serialize_field("accuracy", &self.accuracy.as_ref().ok())?;
        state.serialize_field(
            "error",
            &self.accuracy.as_ref().err().map(ToString::to_string),
        )?;
        state.end()
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ExperimentReport {
    pub rows: usize,
    /// Distinct label values, ascending; class index `i` is `classes[i]`.
    pub classes: Vec<f64>,
    pub seed: u64,
    pub test_fraction: f64,
    pub outcomes: Vec<HypothesisOutcome>,
}

impl ExperimentReport {
    pub fn accuracy(&self, name: &str) -> Option<f64> {
        self.outcomes
            .iter()
            .find(|outcome| outcome.name == name)
            .and_then(|outcome| outcome.accuracy.as_ref().ok().copied())
    }

    /// One `Accuracy for <name>: <value>` line per hypothesis.
    pub fn render(&self) -> String {
        let mut out = String::new();
        for outcome in &self.outcomes {
            match &outcome.accuracy {
                Ok(accuracy) => {
                    out.push_str(&format!("Accuracy for {}: {accuracy:.4}\n", outcome.name))
                }
                Err(err) => out.push_str(&format!("Accuracy for {}: failed ({err})\n", outcome.name)),
            }
        }
        out
    }
}

/// Train and score one classifier per hypothesis in `config`.
///
/// Every hypothesis sees the same seeded partition. Standardisation is fitted
/// on the training rows and applied unchanged to the evaluation rows. Each
/// hypothesis trains a fresh clone of `prototype`, so the outcome does not
/// depend on whether hypotheses run in parallel.
///
/// # Errors
/// `EmptyDataset` for zero rows, `InsufficientClasses` when fewer than two
/// distinct labels are present. Per-hypothesis failures are reported in the
/// outcome instead.
pub fn run_experiments<C>(
    rows: &[FeatureRow<DatasetRecord>],
    config: &ExperimentConfig,
    prototype: &C,
) -> Result<ExperimentReport, ExperimentError>
where
    C: Classifier + Clone + Send + Sync,
{
    if rows.is_empty() {
        return Err(ExperimentError::EmptyDataset);
    }
    let mut classes: Vec<f64> = rows.iter().map(|row| row.record.label).collect();
    classes.sort_by(f64::total_cmp);
    classes.dedup_by(|a, b| a.total_cmp(b).is_eq());
    if classes.len() < 2 {
        return Err(ExperimentError::InsufficientClasses {
            found: classes.len(),
        });
    }
    let labels: Vec<usize> = rows
        .iter()
        .map(|row| {
            classes
                .binary_search_by(|class| class.total_cmp(&row.record.label))
                .unwrap_or_default()
        })
        .collect();

    let hypotheses = &config.hypotheses;
    let split = train_test_split(rows.len(), config.test_fraction, config.seed);
    info!(
        "running {} hypothesis(es) on {} rows, {} classes, {} train / {} test",
        hypotheses.len(),
        rows.len(),
        classes.len(),
        split.train.len(),
        split.test.len()
    );

    let run_one = |hypothesis: &Hypothesis| {
        let accuracy = evaluate(
            rows,
            &labels,
            classes.len(),
            hypothesis,
            &split.train,
            &split.test,
            prototype.clone(),
        );
        match &accuracy {
            Ok(value) => info!("{}: accuracy {value:.4}", hypothesis.name),
            Err(err) => warn!("{}: {err}", hypothesis.name),
        }
        HypothesisOutcome {
            name: hypothesis.name.clone(),
            features: hypothesis.features.clone(),
            train_rows: split.train.len(),
            test_rows: split.test.len(),
            accuracy,
        }
    };

    let outcomes = if config.parallel && hypotheses.len() > 1 {
        let run_one = &run_one;
        std::thread::scope(|scope| {
            let handles: Vec<_> = hypotheses
                .iter()
                .map(|hypothesis| scope.spawn(move || run_one(hypothesis)))
                .collect();
            handles
                .into_iter()
                .map(|handle| match handle.join() {
                    Ok(outcome) => outcome,
                    Err(panic) => std::panic::resume_unwind(panic),
                })
                .collect()
        })
    } else {
        hypotheses.iter().map(&run_one).collect()
    };

    Ok(ExperimentReport {
        rows: rows.len(),
        classes,
        seed: config.seed,
        test_fraction: config.test_fraction,
        outcomes,
    })
}

fn evaluate<C: Classifier>(
    rows: &[FeatureRow<DatasetRecord>],
    labels: &[usize],
    n_classes: usize,
    hypothesis: &Hypothesis,
    train: &[usize],
    test: &[usize],
    mut classifier: C,
) -> Result<f64, HypothesisError> {
    if hypothesis.features.is_empty() {
        return Err(HypothesisError::EmptyFeatureSet);
    }
    if train.is_empty() || test.is_empty() {
        return Err(HypothesisError::EmptyPartition {
            train: train.len(),
            test: test.len(),
        });
    }

    let matrix = hypothesis.matrix(rows);
    let pick = |indices: &[usize]| -> Vec<Vec<f64>> {
        indices.iter().map(|index| matrix[*index].clone()).collect()
    };
    let scaler = StandardScaler::fit(&pick(train));
    let x_train = scaler.transform(&pick(train));
    let x_test = scaler.transform(&pick(test));
    let y_train: Vec<usize> = train.iter().map(|index| labels[*index]).collect();

    classifier.fit(&x_train, &y_train, n_classes)?;
    let predictions = classifier.predict(&x_test)?;
    let correct = predictions
        .iter()
        .zip(test)
        .filter(|(predicted, index)| **predicted == labels[**index])
        .count();
    Ok(correct as f64 / test.len() as f64)
}
