//! Dataset validation.
//!
//! Checks a classification dataset against [`DATASET_SCHEMA`] once, at the
//! table boundary, and remediates missing values before any feature is
//! derived. The order of checks is fixed: schema, label type, remediation,
//! then typed conversion of every required column.

pub mod error;
pub mod fill;
pub mod schema;

pub use error::ValidationError;
pub use schema::{ColumnKind, ColumnSpec, DATASET_SCHEMA};

use log::info;
use serde::Serialize;

use crate::flow::{FlowError, FlowKey, FlowTuple};
use crate::table::Table;
use crate::table::columns::CLASSIFICATION;
use fill::{backward_fill, drop_incomplete, forward_fill};
use schema::{column_positions, missing_columns, parse_float, parse_port};

/// One validated dataset row.
#[derive(Debug, Clone, PartialEq)]
pub struct DatasetRecord {
    pub timestamp: f64,
    pub size: f64,
    pub src_addr: String,
    pub dst_addr: String,
    pub src_port: u16,
    pub dst_port: u16,
    pub label: f64,
}

impl FlowTuple for DatasetRecord {
    fn flow_key(&self) -> Result<FlowKey, FlowError> {
        FlowKey::from_literals(&self.src_addr, &self.dst_addr, self.src_port, self.dst_port)
    }

    fn timestamp(&self) -> f64 {
        self.timestamp
    }

    fn size(&self) -> f64 {
        self.size
    }
}

/// What remediation changed.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct RemediationSummary {
    pub forward_filled: usize,
    pub backward_filled: usize,
    pub rows_dropped: usize,
}

/// A dataset that passed validation, with its typed records.
#[derive(Debug, Clone)]
pub struct ValidatedTable {
    table: Table,
    records: Vec<DatasetRecord>,
    remediation: RemediationSummary,
}

impl ValidatedTable {
    /// The remediated table; no required cell is missing.
    pub fn table(&self) -> &Table {
        &self.table
    }

    pub fn records(&self) -> &[DatasetRecord] {
        &self.records
    }

    pub fn into_records(self) -> Vec<DatasetRecord> {
        self.records
    }

    pub fn remediation(&self) -> RemediationSummary {
        self.remediation
    }
}

/// Validate and remediate a classification dataset.
///
/// # Errors
/// - `SchemaError` listing every absent required column,
/// - `LabelTypeError` for the first non-numeric Classification value,
/// - `ColumnTypeError` for a required value that cannot be parsed, with the
///   row counted in the input table.
///
/// # Examples
/// ```
/// use flowshark_core::table::csv::read_table;
/// use flowshark_core::validate::{ValidationError, validate};
///
/// let data = "Timestamp,Size,Source IP,Dest IP,Source Port,Dest Port\n1.0,60,10.0.0.1,10.0.0.2,1,2\n";
/// let err = validate(&read_table(data.as_bytes()).unwrap()).unwrap_err();
/// match err {
///     ValidationError::SchemaError { missing } => {
///         assert_eq!(missing.into_iter().collect::<Vec<_>>(), vec!["Classification"]);
///     }
///     other => panic!("unexpected error: {other}"),
/// }
/// ```
pub fn validate(table: &Table) -> Result<ValidatedTable, ValidationError> {
    let missing = missing_columns(table, &DATASET_SCHEMA);
    if !missing.is_empty() {
        return Err(ValidationError::SchemaError { missing });
    }
    let positions = column_positions(table, &DATASET_SCHEMA).ok_or_else(|| {
        ValidationError::SchemaError {
            missing: missing_columns(table, &DATASET_SCHEMA),
        }
    })?;

    check_labels(table)?;

    let (rows, forward_filled) = forward_fill(table.rows());
    let (rows, backward_filled) = backward_fill(&rows);
    let input_rows = rows.len();
    let (rows, origins) = drop_incomplete(rows, &positions);
    let rows_dropped = input_rows - rows.len();
    let remediation = RemediationSummary {
        forward_filled,
        backward_filled,
        rows_dropped,
    };
    if remediation != RemediationSummary::default() {
        info!(
            "remediated dataset: {} forward-filled, {} backward-filled, {} row(s) dropped",
            forward_filled, backward_filled, rows_dropped
        );
    }

    let table = table.with_rows(rows)?;
    let records = table
        .rows()
        .iter()
        .zip(origins)
        .map(|(cells, row)| {
            let cell = |position: usize| {
                let spec = DATASET_SCHEMA[position];
                let value = cells[positions[position]].as_deref().unwrap_or_default();
                let bad = move || ValidationError::ColumnTypeError {
                    column: spec.name.to_string(),
                    row,
                    value: value.to_string(),
                };
                (value, bad)
            };
            let float = |position: usize| {
                let (value, bad) = cell(position);
                parse_float(value).ok_or_else(bad)
            };
            let port = |position: usize| {
                let (value, bad) = cell(position);
                parse_port(value).ok_or_else(bad)
            };
            Ok(DatasetRecord {
                timestamp: float(0)?,
                size: float(1)?,
                src_addr: cell(2).0.to_string(),
                dst_addr: cell(3).0.to_string(),
                src_port: port(4)?,
                dst_port: port(5)?,
                label: float(6)?,
            })
        })
        .collect::<Result<Vec<_>, ValidationError>>()?;

    Ok(ValidatedTable {
        table,
        records,
        remediation,
    })
}

fn check_labels(table: &Table) -> Result<(), ValidationError> {
    let Some(labels) = table.column(CLASSIFICATION) else {
        return Ok(());
    };
    for (row, value) in labels.enumerate() {
        if let Some(value) = value {
            if parse_float(value).is_none() {
                return Err(ValidationError::LabelTypeError {
                    row,
                    value: value.to_string(),
                });
            }
        }
    }
    Ok(())
}
