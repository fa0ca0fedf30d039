//! CSV ingest and normalization.
//!
//! This module turns the public per-country COVID-19 CSV into `DailyRecord`s.
//!
//! Design goals:
//! - **Strict schema** for the key columns (`location`, `date`)
//! - **Lenient values**: every numeric column is optional; blanks and junk become missing
//! - **Row-level validation** (skip bad rows, but report what happened)
//! - **Separation of concerns**: no derivation logic here

use std::collections::{BTreeSet, HashMap};
use std::fs::File;
use std::io::Read;
use std::path::Path;

use chrono::NaiveDate;
use csv::StringRecord;
use tracing::{info, warn};

use crate::domain::{DailyRecord, RecordField};
use crate::error::AppError;

/// A row-level error encountered during ingest.
#[derive(Debug, Clone)]
pub struct RowError {
    pub line: usize,
    pub location: Option<String>,
    pub message: String,
}

/// Ingest output: parsed records + row errors + counters.
#[derive(Debug, Clone)]
pub struct IngestedData {
    pub records: Vec<DailyRecord>,
    pub row_errors: Vec<RowError>,
    pub rows_read: usize,
    pub rows_used: usize,
    /// Numeric columns that were absent from the header (always missing).
    pub missing_columns: Vec<RecordField>,
}

impl IngestedData {
    /// Sorted, deduplicated location names.
    pub fn countries(&self) -> Vec<String> {
        countries(&self.records)
    }
}

/// Sorted, deduplicated location names of a record set.
pub fn countries(records: &[DailyRecord]) -> Vec<String> {
    records
        .iter()
        .map(|r| r.location.as_str())
        .collect::<BTreeSet<_>>()
        .into_iter()
        .map(str::to_string)
        .collect()
}

/// Load the dataset from a CSV file.
pub fn load_records(path: &Path) -> Result<IngestedData, AppError> {
    let file = File::open(path)
        .map_err(|e| AppError::new(2, format!("Failed to open CSV '{}': {e}", path.display())))?;
    let data = read_records(file)?;

    info!(
        path = %path.display(),
        rows_read = data.rows_read,
        rows_used = data.rows_used,
        row_errors = data.row_errors.len(),
        "loaded dataset"
    );
    Ok(data)
}

/// Parse the dataset from any reader.
pub fn read_records<R: Read>(reader: R) -> Result<IngestedData, AppError> {
    let mut reader = csv::ReaderBuilder::new()
        .flexible(true)
        .trim(csv::Trim::All)
        .from_reader(reader);

    let headers = reader
        .headers()
        .map_err(|e| AppError::new(2, format!("Failed to read CSV headers: {e}")))?
        .clone();

    let header_map = build_header_map(&headers);
    ensure_required_columns_exist(&header_map)?;

    let missing_columns: Vec<RecordField> = RecordField::ALL
        .into_iter()
        .filter(|f| !header_map.contains_key(f.column_name()))
        .collect();
    if !missing_columns.is_empty() {
        let names: Vec<&str> = missing_columns.iter().map(|f| f.column_name()).collect();
        warn!(columns = ?names, "numeric columns absent from CSV; treated as missing");
    }

    let mut records = Vec::new();
    let mut row_errors = Vec::new();
    let mut rows_read = 0usize;

    for (idx, result) in reader.records().enumerate() {
        // +2 because:
        // - records() starts at line 1 after headers
        // - CSV is 1-based line numbers
        let line = idx + 2;
        rows_read += 1;

        let record = match result {
            Ok(r) => r,
            Err(e) => {
                row_errors.push(RowError {
                    line,
                    location: None,
                    message: format!("CSV parse error: {e}"),
                });
                continue;
            }
        };

        match parse_row(&record, &header_map) {
            Ok(row) => records.push(row),
            Err(message) => row_errors.push(RowError {
                line,
                location: get_optional(&record, &header_map, "location").map(str::to_string),
                message,
            }),
        }
    }

    let rows_used = records.len();
    if rows_used == 0 {
        return Err(AppError::new(2, "No valid rows found in the dataset."));
    }

    Ok(IngestedData {
        records,
        row_errors,
        rows_read,
        rows_used,
        missing_columns,
    })
}

fn build_header_map(headers: &StringRecord) -> HashMap<String, usize> {
    headers
        .iter()
        .enumerate()
        .map(|(idx, name)| (normalize_header_name(name), idx))
        .collect()
}

fn normalize_header_name(name: &str) -> String {
    // Spreadsheet exports sometimes prefix the first header with a UTF-8 BOM.
    let name = name.trim().trim_start_matches('\u{feff}');
    name.to_ascii_lowercase()
}

fn ensure_required_columns_exist(header_map: &HashMap<String, usize>) -> Result<(), AppError> {
    for name in ["location", "date"] {
        if !header_map.contains_key(name) {
            return Err(AppError::new(2, format!("Missing required column: `{name}`")));
        }
    }
    Ok(())
}

fn parse_row(record: &StringRecord, header_map: &HashMap<String, usize>) -> Result<DailyRecord, String> {
    let location = get_required(record, header_map, "location")?.to_string();
    let date = parse_date(get_required(record, header_map, "date")?)?;

    let mut row = DailyRecord::empty(location, date);
    for field in RecordField::ALL {
        row.set_field(field, parse_opt_f64(get_optional(record, header_map, field.column_name())));
    }
    Ok(row)
}

fn get_required<'a>(
    record: &'a StringRecord,
    header_map: &HashMap<String, usize>,
    name: &str,
) -> Result<&'a str, String> {
    let idx = header_map
        .get(name)
        .ok_or_else(|| format!("Missing required column: `{name}`"))?;
    record
        .get(*idx)
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .ok_or_else(|| format!("Missing required value: `{name}`"))
}

fn get_optional<'a>(record: &'a StringRecord, header_map: &HashMap<String, usize>, name: &str) -> Option<&'a str> {
    let idx = header_map.get(name)?;
    record.get(*idx).map(str::trim).filter(|s| !s.is_empty())
}

fn parse_date(s: &str) -> Result<NaiveDate, String> {
    NaiveDate::parse_from_str(s, "%Y-%m-%d").map_err(|_| format!("Invalid date '{s}'. Expected YYYY-MM-DD."))
}

fn parse_opt_f64(s: Option<&str>) -> Option<f64> {
    let s = s?;
    let v = s.parse::<f64>().ok()?;
    if v.is_finite() { Some(v) } else { None }
}
