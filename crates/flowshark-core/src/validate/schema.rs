use std::collections::BTreeSet;

use crate::table::Table;
use crate::table::columns::{
    CLASSIFICATION, DEST_IP, DEST_PORT, SIZE, SOURCE_IP, SOURCE_PORT, TIMESTAMP,
};

/// Value type expected in a required column.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ColumnKind {
    /// Finite floating-point number.
    Float,
    /// Address literal, checked later by the flow resolver.
    Address,
    /// Integer in `0..=65535` (an integral float such as `443.0` is accepted).
    Port,
    /// Numeric class label.
    Label,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ColumnSpec {
    pub name: &'static str,
    pub kind: ColumnKind,
}

/// Required columns of a classification dataset, in record field order.
pub const DATASET_SCHEMA: [ColumnSpec; 7] = [
    ColumnSpec {
        name: TIMESTAMP,
        kind: ColumnKind::Float,
    },
    ColumnSpec {
        name: SIZE,
        kind: ColumnKind::Float,
    },
    ColumnSpec {
        name: SOURCE_IP,
        kind: ColumnKind::Address,
    },
    ColumnSpec {
        name: DEST_IP,
        kind: ColumnKind::Address,
    },
    ColumnSpec {
        name: SOURCE_PORT,
        kind: ColumnKind::Port,
    },
    ColumnSpec {
        name: DEST_PORT,
        kind: ColumnKind::Port,
    },
    ColumnSpec {
        name: CLASSIFICATION,
        kind: ColumnKind::Label,
    },
];

/// Names of schema columns absent from `table`.
pub fn missing_columns(table: &Table, schema: &[ColumnSpec]) -> BTreeSet<String> {
    schema
        .iter()
        .filter(|spec| table.column_index(spec.name).is_none())
        .map(|spec| spec.name.to_string())
        .collect()
}

/// Positions of every schema column in `table`, or `None` if one is absent.
pub fn column_positions(table: &Table, schema: &[ColumnSpec]) -> Option<Vec<usize>> {
    schema
        .iter()
        .map(|spec| table.column_index(spec.name))
        .collect()
}

pub fn parse_float(value: &str) -> Option<f64> {
    value.parse::<f64>().ok().filter(|number| number.is_finite())
}

pub fn parse_port(value: &str) -> Option<u16> {
    if let Ok(port) = value.parse::<u16>() {
        return Some(port);
    }
    let number = parse_float(value)?;
    if number.fract() == 0.0 && (0.0..=f64::from(u16::MAX)).contains(&number) {
        Some(number as u16)
    } else {
        None
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn ports_accept_integral_floats() {
        assert_eq!(parse_port("443"), Some(443));
        assert_eq!(parse_port("443.0"), Some(443));
        assert_eq!(parse_port("443.5"), None);
        assert_eq!(parse_port("70000"), None);
        assert_eq!(parse_port("-1"), None);
    }

    #[test]
    fn floats_must_be_finite() {
        assert_eq!(parse_float("1.5"), Some(1.5));
        assert_eq!(parse_float("inf"), None);
        assert_eq!(parse_float("abc"), None);
    }

    #[test]
    fn missing_columns_lists_every_absent_name() {
        let table = Table::new(vec![TIMESTAMP.to_string(), SIZE.to_string()]);
        let missing = missing_columns(&table, &DATASET_SCHEMA);
        assert_eq!(missing.len(), 5);
        assert!(missing.contains(CLASSIFICATION));
        assert!(column_positions(&table, &DATASET_SCHEMA).is_none());
    }
}
