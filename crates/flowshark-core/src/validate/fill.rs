//! Missing-value remediation passes. Each pass returns new rows.

use crate::table::Row;

/// Propagate the last present value of each column downwards.
pub fn forward_fill(rows: &[Row]) -> (Vec<Row>, usize) {
    let mut filled = 0;
    let mut out: Vec<Row> = Vec::with_capacity(rows.len());
    for row in rows {
        let mut next = row.clone();
        if let Some(previous) = out.last() {
            for (cell, above) in next.iter_mut().zip(previous) {
                if cell.is_none() && above.is_some() {
                    *cell = above.clone();
                    filled += 1;
                }
            }
        }
        out.push(next);
    }
    (out, filled)
}

/// Propagate the next present value of each column upwards.
pub fn backward_fill(rows: &[Row]) -> (Vec<Row>, usize) {
    let mut reversed: Vec<Row> = rows.iter().rev().cloned().collect();
    let (filled_rows, filled) = forward_fill(&reversed);
    reversed = filled_rows;
    reversed.reverse();
    (reversed, filled)
}

/// Drop rows with a missing cell in any of the `required` positions.
///
/// Returns the kept rows with their indices in `rows`.
pub fn drop_incomplete(rows: Vec<Row>, required: &[usize]) -> (Vec<Row>, Vec<usize>) {
    rows.into_iter()
        .enumerate()
        .filter(|(_, row)| required.iter().all(|index| row[*index].is_some()))
        .map(|(index, row)| (row, index))
        .unzip()
}
