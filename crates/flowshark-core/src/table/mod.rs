//! Named-column tables.
//!
//! [`Table`] is the boundary representation of delimited files: every cell
//! is text or missing. Transformation stages never mutate a table in place;
//! they build a new one with [`Table::with_rows`].

pub mod columns;
pub mod csv;

use thiserror::Error;

#[derive(Debug, Error)]
pub enum TableError {
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
    #[error("CSV error: {0}")]
    Csv(#[from] ::csv::Error),
    #[error("row {row} has {actual} cells, expected {expected}")]
    RowWidth {
        row: usize,
        expected: usize,
        actual: usize,
    },
}

pub type Row = Vec<Option<String>>;

/// Text table with optional cells.
///
/// # Examples
/// ```
/// use flowshark_core::table::Table;
///
/// let mut table = Table::new(vec!["Size".to_string(), "Classification".to_string()]);
/// table.push_row(vec![Some("60".to_string()), None]).unwrap();
/// assert_eq!(table.len(), 1);
/// assert_eq!(table.missing_cells(), 1);
/// assert_eq!(table.column_index("Classification"), Some(1));
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct Table {
    columns: Vec<String>,
    rows: Vec<Row>,
}

impl Table {
    pub fn new(columns: Vec<String>) -> Self {
        Self {
            columns,
            rows: Vec::new(),
        }
    }

    /// Build a table, checking that every row matches the column count.
    pub fn from_rows(columns: Vec<String>, rows: Vec<Row>) -> Result<Self, TableError> {
        let mut table = Self::new(columns);
        table.rows.reserve(rows.len());
        for row in rows {
            table.push_row(row)?;
        }
        Ok(table)
    }

    pub fn columns(&self) -> &[String] {
        &self.columns
    }

    pub fn rows(&self) -> &[Row] {
        &self.rows
    }

    pub fn len(&self) -> usize {
        self.rows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    pub fn column_index(&self, name: &str) -> Option<usize> {
        self.columns.iter().position(|column| column == name)
    }

    /// Cells of one column, top to bottom.
    pub fn column(&self, name: &str) -> Option<impl Iterator<Item = Option<&str>>> {
        let index = self.column_index(name)?;
        Some(self.rows.iter().map(move |row| row[index].as_deref()))
    }

    pub fn push_row(&mut self, row: Row) -> Result<(), TableError> {
        if row.len() != self.columns.len() {
            return Err(TableError::RowWidth {
                row: self.rows.len(),
                expected: self.columns.len(),
                actual: row.len(),
            });
        }
        self.rows.push(row);
        Ok(())
    }

    /// New table with the same columns and the given rows.
    pub fn with_rows(&self, rows: Vec<Row>) -> Result<Self, TableError> {
        Self::from_rows(self.columns.clone(), rows)
    }

    pub fn missing_cells(&self) -> usize {
        self.rows
            .iter()
            .flat_map(|row| row.iter())
            .filter(|cell| cell.is_none())
            .count()
    }
}

/// Numeric class ids for application names, assigned in first-seen order.
///
/// # Examples
/// ```
/// use flowshark_core::table::LabelCatalog;
///
/// let mut labels = LabelCatalog::default();
/// assert_eq!(labels.id("Chrome"), 0);
/// assert_eq!(labels.id("Zoom"), 1);
/// assert_eq!(labels.id("Chrome"), 0);
/// assert_eq!(labels.name(1), Some("Zoom"));
/// ```
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct LabelCatalog {
    names: Vec<String>,
}

impl LabelCatalog {
    pub fn id(&mut self, name: &str) -> u32 {
        if let Some(index) = self.names.iter().position(|known| known == name) {
            return index as u32;
        }
        self.names.push(name.to_string());
        (self.names.len() - 1) as u32
    }

    pub fn name(&self, id: u32) -> Option<&str> {
        self.names.get(id as usize).map(String::as_str)
    }

    pub fn names(&self) -> &[String] {
        &self.names
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn cell(value: &str) -> Option<String> {
        Some(value.to_string())
    }

    #[test]
    fn rejects_rows_of_wrong_width() {
        let mut table = Table::new(vec!["a".to_string(), "b".to_string()]);
        let err = table.push_row(vec![cell("1")]).unwrap_err();
        assert!(matches!(
            err,
            TableError::RowWidth {
                row: 0,
                expected: 2,
                actual: 1
            }
        ));
    }

    #[test]
    fn column_iterates_cells() {
        let table = Table::from_rows(
            vec!["a".to_string(), "b".to_string()],
            vec![vec![cell("1"), None], vec![cell("2"), cell("x")]],
        )
        .unwrap();
        let b: Vec<_> = table.column("b").unwrap().collect();
        assert_eq!(b, vec![None, Some("x")]);
        assert!(table.column("c").is_none());
    }

    #[test]
    fn with_rows_keeps_columns_and_leaves_source_untouched() {
        let table = Table::from_rows(vec!["a".to_string()], vec![vec![cell("1")]]).unwrap();
        let next = table.with_rows(vec![vec![cell("2")], vec![None]]).unwrap();
        assert_eq!(next.columns(), table.columns());
        assert_eq!(table.len(), 1);
        assert_eq!(next.len(), 2);
    }
}
