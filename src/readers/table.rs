//! Canonical tabular storage format shared by partitions and consolidated
//! files: CSV with a `time` first column (ISO-8601 UTC) and one numeric
//! column per field, missing cells written as `-`.

use std::collections::BTreeSet;
use std::path::Path;

use chrono::{DateTime, SecondsFormat, Utc};
use csv::{ReaderBuilder, WriterBuilder};

use crate::error::{HarvestError, Result};
use crate::models::Record;

pub const TIME_COLUMN: &str = "time";
pub const MISSING_MARKER: &str = "-";

/// Read a canonical table back into records.
///
/// Fails on a malformed header, timestamp or cell; a partition that cannot
/// be read must surface the failure to the caller, never be silently
/// replaced.
pub fn read_table(path: &Path) -> Result<Vec<Record>> {
    let mut reader = ReaderBuilder::new().from_path(path)?;

    let headers = reader.headers()?.clone();
    if headers.get(0) != Some(TIME_COLUMN) {
        return Err(HarvestError::Parse(format!(
            "{}: first column must be '{}'",
            path.display(),
            TIME_COLUMN
        )));
    }
    let columns: Vec<String> = headers.iter().skip(1).map(|h| h.to_string()).collect();

    let mut records = Vec::new();
    for (index, row) in reader.records().enumerate() {
        let row = row?;
        let time_cell = row.get(0).unwrap_or_default();
        let time = DateTime::parse_from_rfc3339(time_cell)?.with_timezone(&Utc);

        let mut record = Record::new(time);
        for (column, cell) in columns.iter().zip(row.iter().skip(1)) {
            record.values.insert(column.clone(), parse_cell(cell, path, index)?);
        }
        records.push(record);
    }

    Ok(records)
}

/// Write records as a canonical table, overwriting any existing file. The
/// column set is the union of fields across all records; cells a record does
/// not carry get the missing marker.
pub fn write_table(path: &Path, records: &[Record]) -> Result<()> {
    let columns: BTreeSet<&str> = records
        .iter()
        .flat_map(|r| r.values.keys().map(String::as_str))
        .collect();

    let mut writer = WriterBuilder::new().from_path(path)?;

    let mut header = vec![TIME_COLUMN];
    header.extend(columns.iter().copied());
    writer.write_record(&header)?;

    for record in records {
        let mut row = vec![record.time.to_rfc3339_opts(SecondsFormat::Secs, true)];
        for column in &columns {
            match record.values.get(*column) {
                Some(Some(value)) => row.push(value.to_string()),
                _ => row.push(MISSING_MARKER.to_string()),
            }
        }
        writer.write_record(&row)?;
    }

    writer.flush()?;
    Ok(())
}

fn parse_cell(cell: &str, path: &Path, row_index: usize) -> Result<Option<f64>> {
    let cell = cell.trim();
    if cell.is_empty() || cell == MISSING_MARKER || cell.eq_ignore_ascii_case("nan") {
        return Ok(None);
    }
    cell.parse::<f64>().map(Some).map_err(|_| {
        HarvestError::Parse(format!(
            "{}: row {}: not a number: '{}'",
            path.display(),
            row_index + 2,
            cell
        ))
    })
}
