//! Stage glue: each function takes an immutable table and returns a new one.

use log::info;
use thiserror::Error;

use crate::flow::{FeatureRow, FlowError, FlowTuple, IatOrder, attach_inter_arrival, resolve_all};
use crate::table::Table;
use crate::validate::{DatasetRecord, RemediationSummary, ValidationError, validate};

#[derive(Debug, Error)]
pub enum PipelineError {
    #[error(transparent)]
    Validation(#[from] ValidationError),
}

/// Resolve flow ids and attach inter-arrival times.
///
/// Records whose addresses cannot be resolved are logged and left out.
///
/// # Examples
/// ```
/// use flowshark_core::pipeline::extract_features;
/// use flowshark_core::{IatOrder, PacketRecord, Protocol};
///
/// let packet = |ts: f64| PacketRecord {
///     timestamp: ts,
///     size: 60,
///     src_addr: "10.0.0.1".parse().unwrap(),
///     dst_addr: "10.0.0.2".parse().unwrap(),
///     src_port: 51000,
///     dst_port: 443,
///     protocol: Protocol::Tcp,
///     tcp_flags: None,
///     app: "Chrome".to_string(),
/// };
/// let rows = extract_features(vec![packet(10.0), packet(10.25)], IatOrder::Timestamp);
/// assert_eq!(rows[0].flow_id, rows[1].flow_id);
/// assert_eq!(rows[1].inter_arrival_time, 0.25);
/// ```
pub fn extract_features<R: FlowTuple>(records: Vec<R>, order: IatOrder) -> Vec<FeatureRow<R>> {
    attach_inter_arrival(resolve_all(records).rows, order)
}

/// Dataset rows ready for the experiment runner.
#[derive(Debug, Clone, PartialEq)]
pub struct PreparedDataset {
    pub rows: Vec<FeatureRow<DatasetRecord>>,
    pub remediation: RemediationSummary,
    /// Validated rows whose addresses could not be resolved, by row index.
    pub rejected: Vec<(usize, FlowError)>,
}

/// Validate a combined dataset table, then resolve and aggregate its rows.
///
/// # Errors
/// Schema and label errors from validation abort the preparation.
pub fn prepare_dataset(table: &Table, order: IatOrder) -> Result<PreparedDataset, PipelineError> {
    let validated = validate(table)?;
    let remediation = validated.remediation();
    let resolved = resolve_all(validated.into_records());
    let rows = attach_inter_arrival(resolved.rows, order);
    info!(
        "prepared {} dataset rows ({} rejected, inter-arrival order {order})",
        rows.len(),
        resolved.rejected.len()
    );
    Ok(PreparedDataset {
        rows,
        remediation,
        rejected: resolved.rejected,
    })
}
