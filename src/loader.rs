// Decodes a workbook (first sheet only) or a CSV file into a `RawSheet`.
use crate::error::DashboardError;
use crate::types::{RawRow, RawSheet};
use calamine::{open_workbook_auto, Data, Reader};
use chrono::{NaiveTime, Timelike};
use csv::ReaderBuilder;
use std::path::Path;
use tracing::{info, warn};

/// Decode the spreadsheet at `path` into rows of optional cell texts.
///
/// - A `.csv` extension (any case) is read as comma-separated text with no
///   header handling; every other file goes through calamine, which picks
///   the format (xlsx, xls, ods...) from the content, and only the first
///   sheet is read.
/// - Blank cells are `None`; trailing blanks are trimmed from each row, so a
///   fully blank row comes back empty.
/// - Excel dates render as `dd/mm/yyyy` (with the time appended when there
///   is one), integral numbers without a fractional part.
///
/// Any failure, from a missing file to a corrupt archive, becomes
/// [`DashboardError::FileRead`] with the underlying message kept as detail.
pub fn read_sheet(path: &Path) -> Result<RawSheet, DashboardError> {
    let is_csv = path
        .extension()
        .and_then(|e| e.to_str())
        .map(|e| e.eq_ignore_ascii_case("csv"))
        .unwrap_or(false);
    let result = if is_csv {
        read_csv(path)
    } else {
        read_workbook(path)
    };
    match result {
        Ok(rows) => {
            info!(path = %path.display(), rows = rows.len(), "sheet decoded");
            Ok(rows)
        }
        Err(e) => {
            warn!(path = %path.display(), error = %e, "could not decode sheet");
            Err(DashboardError::file_read(e))
        }
    }
}

fn read_csv(path: &Path) -> Result<RawSheet, Box<dyn std::error::Error>> {
    let mut rdr = ReaderBuilder::new()
        .has_headers(false)
        .flexible(true)
        .from_path(path)?;
    let mut rows = Vec::new();
    for record in rdr.records() {
        let record = record?;
        let row: RawRow = record.iter().map(text_cell).collect();
        rows.push(trim_trailing(row));
    }
    Ok(rows)
}

fn read_workbook(path: &Path) -> Result<RawSheet, Box<dyn std::error::Error>> {
    let mut workbook = open_workbook_auto(path)?;
    let sheet_names = workbook.sheet_names().to_owned();
    let Some(first) = sheet_names.first() else {
        return Err("workbook has no sheets".into());
    };
    let range = workbook.worksheet_range(first)?;
    Ok(range
        .rows()
        .map(|row| trim_trailing(row.iter().map(data_to_cell).collect()))
        .collect())
}

fn text_cell(s: &str) -> Option<String> {
    if s.is_empty() {
        None
    } else {
        Some(s.to_string())
    }
}

/// Blank cells at the end of a row carry nothing; a fully blank row becomes
/// empty.
fn trim_trailing(mut row: RawRow) -> RawRow {
    while matches!(row.last(), Some(None)) {
        row.pop();
    }
    row
}

/// Text form of one workbook cell, `None` when blank.
pub fn data_to_cell(cell: &Data) -> Option<String> {
    match cell {
        Data::Empty => None,
        Data::String(s) => text_cell(s),
        Data::Int(v) => Some(v.to_string()),
        Data::Float(v) => Some(format_float(*v)),
        Data::Bool(v) => Some(v.to_string()),
        Data::DateTime(dt) => match dt.as_datetime() {
            Some(ndt) if ndt.time() == NaiveTime::MIN => Some(ndt.format("%d/%m/%Y").to_string()),
            Some(ndt) if ndt.second() == 0 => Some(ndt.format("%d/%m/%Y %H:%M").to_string()),
            Some(ndt) => Some(ndt.format("%d/%m/%Y %H:%M:%S").to_string()),
            None => Some(dt.to_string()),
        },
        Data::DateTimeIso(s) | Data::DurationIso(s) => text_cell(s),
        Data::Error(e) => Some(e.to_string()),
    }
}

fn format_float(v: f64) -> String {
    if v.fract() == 0.0 && v.abs() < 1e15 {
        format!("{}", v as i64)
    } else {
        v.to_string()
    }
}
