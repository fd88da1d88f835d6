use std::collections::BTreeSet;

use thiserror::Error;

use crate::table::TableError;

#[derive(Debug, Error)]
pub enum ValidationError {
    #[error("dataset is missing required column(s): {}", join(.missing))]
    SchemaError { missing: BTreeSet<String> },
    #[error("Classification must be numeric, found '{value}' at row {row}")]
    LabelTypeError { row: usize, value: String },
    #[error("column '{column}' has invalid value '{value}' at row {row}")]
    ColumnTypeError {
        column: String,
        row: usize,
        value: String,
    },
    #[error(transparent)]
    Table(#[from] TableError),
}

fn join(columns: &BTreeSet<String>) -> String {
    columns
        .iter()
        .map(String::as_str)
        .collect::<Vec<_>>()
        .join(", ")
}
