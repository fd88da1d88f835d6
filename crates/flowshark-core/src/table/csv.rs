//! Delimited-text readers and writers.

use std::collections::HashSet;
use std::io::{Read, Write};

use ::csv::{ReaderBuilder, StringRecord, Trim, WriterBuilder};

use super::columns::{DATASET_COLUMNS, TRAFFIC_COLUMNS};
use super::{LabelCatalog, Row, Table, TableError};
use crate::PacketRecord;
use crate::flow::FeatureRow;

/// Cell spellings read as a missing value.
const MISSING_MARKERS: [&str; 8] = ["", "NaN", "nan", "NA", "N/A", "null", "NULL", "None"];

fn parse_cell(field: &str) -> Option<String> {
    if MISSING_MARKERS.contains(&field) {
        None
    } else {
        Some(field.to_string())
    }
}

/// Trimmed header names and the indices of their first occurrence.
fn unique_headers(headers: &StringRecord) -> (Vec<String>, Vec<usize>) {
    let mut seen = HashSet::new();
    let mut names = Vec::new();
    let mut indices = Vec::new();
    for (index, header) in headers.iter().enumerate() {
        let header = header.trim();
        if seen.insert(header.to_string()) {
            names.push(header.to_string());
            indices.push(index);
        }
    }
    (names, indices)
}

/// Read a table with a header row.
///
/// Fields are trimmed; empty fields and common NaN spellings become missing
/// cells. Repeated header names keep their first column only.
///
/// # Examples
/// ```
/// use flowshark_core::table::csv::read_table;
///
/// let data = "Timestamp,Size\n1.5,60\n2.0,\n";
/// let table = read_table(data.as_bytes()).unwrap();
/// assert_eq!(table.columns(), ["Timestamp", "Size"]);
/// assert_eq!(table.rows()[1][1], None);
/// ```
pub fn read_table<R: Read>(reader: R) -> Result<Table, TableError> {
    let mut rdr = ReaderBuilder::new().trim(Trim::All).from_reader(reader);
    let (columns, indices) = unique_headers(rdr.headers()?);

    let mut table = Table::new(columns);
    for record in rdr.records() {
        let record = record?;
        let row: Row = indices
            .iter()
            .map(|index| record.get(*index).and_then(parse_cell))
            .collect();
        table.push_row(row)?;
    }
    Ok(table)
}

/// Write a table with a header row; missing cells are written empty.
pub fn write_table<W: Write>(table: &Table, writer: W) -> Result<(), TableError> {
    let mut wtr = WriterBuilder::new().from_writer(writer);
    wtr.write_record(table.columns())?;
    for row in table.rows() {
        wtr.write_record(row.iter().map(|cell| cell.as_deref().unwrap_or("")))?;
    }
    wtr.flush()?;
    Ok(())
}

/// Write decoded packets as a traffic table.
///
/// The header row is always written, even for an empty capture.
pub fn write_traffic<W: Write>(records: &[PacketRecord], writer: W) -> Result<(), TableError> {
    let mut wtr = WriterBuilder::new().has_headers(false).from_writer(writer);
    wtr.write_record(TRAFFIC_COLUMNS)?;
    for record in records {
        wtr.serialize(record)?;
    }
    wtr.flush()?;
    Ok(())
}

/// Read a traffic table written by [`write_traffic`].
pub fn read_traffic<R: Read>(reader: R) -> Result<Vec<PacketRecord>, TableError> {
    let mut rdr = ReaderBuilder::new().trim(Trim::All).from_reader(reader);
    let mut records = Vec::new();
    for record in rdr.deserialize::<PacketRecord>() {
        records.push(record?);
    }
    Ok(records)
}

/// Write packet feature rows as a classification dataset.
///
/// Applications are mapped to numeric `Classification` values through
/// `labels`, so the dataset can be fed straight back to the validator.
pub fn write_dataset<W: Write>(
    rows: &[FeatureRow<PacketRecord>],
    labels: &mut LabelCatalog,
    writer: W,
) -> Result<(), TableError> {
    let mut wtr = WriterBuilder::new().from_writer(writer);
    wtr.write_record(DATASET_COLUMNS)?;
    for row in rows {
        let record = &row.record;
        wtr.write_record([
            record.timestamp.to_string(),
            record.size.to_string(),
            record.src_addr.to_string(),
            record.dst_addr.to_string(),
            record.src_port.to_string(),
            record.dst_port.to_string(),
            labels.id(&record.app).to_string(),
            row.flow_id.to_string(),
            row.inter_arrival_time.to_string(),
        ])?;
    }
    wtr.flush()?;
    Ok(())
}
