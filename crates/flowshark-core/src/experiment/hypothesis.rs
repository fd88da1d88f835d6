use std::fmt;

use serde::{Deserialize, Serialize};

use crate::flow::FeatureRow;
use crate::validate::DatasetRecord;

/// A numeric column a hypothesis may train on.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Feature {
    Size,
    Timestamp,
    FlowId,
    InterArrivalTime,
    SrcPort,
    DstPort,
}

impl Feature {
    pub fn value(self, row: &FeatureRow<DatasetRecord>) -> f64 {
        match self {
            Feature::Size => row.record.size,
            Feature::Timestamp => row.record.timestamp,
            Feature::FlowId => f64::from(row.flow_id.value()),
            Feature::InterArrivalTime => row.inter_arrival_time,
            Feature::SrcPort => f64::from(row.record.src_port),
            Feature::DstPort => f64::from(row.record.dst_port),
        }
    }
}

impl fmt::Display for Feature {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Feature::Size => "size",
            Feature::Timestamp => "timestamp",
            Feature::FlowId => "flow_id",
            Feature::InterArrivalTime => "inter_arrival_time",
            Feature::SrcPort => "src_port",
            Feature::DstPort => "dst_port",
        };
        f.write_str(name)
    }
}

/// A named feature subset evaluated as one experiment.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Hypothesis {
    pub name: String,
    pub features: Vec<Feature>,
}

impl Hypothesis {
    pub fn new(name: impl Into<String>, features: impl Into<Vec<Feature>>) -> Self {
        Self {
            name: name.into(),
            features: features.into(),
        }
    }

    pub(crate) fn matrix(&self, rows: &[FeatureRow<DatasetRecord>]) -> Vec<Vec<f64>> {
        rows.iter()
            .map(|row| self.features.iter().map(|feature| feature.value(row)).collect())
            .collect()
    }
}

/// The with/without flow id comparison.
pub fn default_hypotheses() -> Vec<Hypothesis> {
    vec![
        Hypothesis::new(
            "Case 1 (Flow ID included)",
            [
                Feature::Size,
                Feature::Timestamp,
                Feature::FlowId,
                Feature::InterArrivalTime,
            ],
        ),
        Hypothesis::new(
            "Case 2 (Without Flow ID)",
            [Feature::Size, Feature::Timestamp, Feature::InterArrivalTime],
        ),
    ]
}
