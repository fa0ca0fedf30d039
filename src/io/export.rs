//! Export processed series (CSV) and correlation reports (JSON).
//!
//! The exports are meant to be easy to consume in spreadsheets or downstream scripts.

use std::fs::File;
use std::io::Write;
use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::correlate::{CorrelatedPair, CorrelationTable, LaggedCorrelation};
use crate::domain::{CountrySeries, Metric};
use crate::error::AppError;

/// Portable representation of a correlation run.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CorrelationReport {
    pub tool: String,
    pub country: String,
    pub rows: usize,
    pub table: CorrelationTable,
    pub top_pair: Option<CorrelatedPair>,
    pub pairs: Vec<CorrelatedPair>,
    #[serde(skip_serializing_if = "Option::is_none", default)]
    pub lagged: Option<LaggedCorrelation>,
}

impl CorrelationReport {
    pub fn new(series: &CountrySeries, table: CorrelationTable, lagged: Option<LaggedCorrelation>) -> Self {
        Self {
            tool: "covx".to_string(),
            country: series.country.clone(),
            rows: series.len(),
            top_pair: table.top_pair(),
            pairs: table.pairs(),
            table,
            lagged,
        }
    }
}

/// Write a processed series to a CSV file.
pub fn write_series_csv(path: &Path, series: &CountrySeries) -> Result<(), AppError> {
    let mut file = File::create(path)
        .map_err(|e| AppError::new(2, format!("Failed to create export CSV '{}': {e}", path.display())))?;
    write_series(&mut file, series)
}

/// Write a processed series as CSV to any writer.
pub fn write_series<W: Write>(out: &mut W, series: &CountrySeries) -> Result<(), AppError> {
    let mut writer = csv::Writer::from_writer(out);

    let mut header = vec!["location", "date", "days_since_epoch"];
    header.extend(Metric::ALL.iter().map(|m| m.key()));
    writer
        .write_record(&header)
        .map_err(|e| AppError::new(2, format!("Failed to write export CSV header: {e}")))?;

    for row in &series.rows {
        let mut record = vec![series.country.clone(), row.date.to_string(), row.days_since_epoch.to_string()];
        record.extend(Metric::ALL.iter().map(|m| format!("{:.6}", m.value(row))));
        writer
            .write_record(&record)
            .map_err(|e| AppError::new(2, format!("Failed to write export CSV row: {e}")))?;
    }

    writer
        .flush()
        .map_err(|e| AppError::new(2, format!("Failed to flush export CSV: {e}")))?;
    Ok(())
}

/// Write a correlation report as pretty JSON.
pub fn write_correlations_json(path: &Path, report: &CorrelationReport) -> Result<(), AppError> {
    let file = File::create(path)
        .map_err(|e| AppError::new(2, format!("Failed to create report JSON '{}': {e}", path.display())))?;

    serde_json::to_writer_pretty(file, report)
        .map_err(|e| AppError::new(2, format!("Failed to write report JSON: {e}")))?;

    Ok(())
}

/// Read a correlation report written by [`write_correlations_json`].
pub fn read_correlations_json(path: &Path) -> Result<CorrelationReport, AppError> {
    let file = File::open(path)
        .map_err(|e| AppError::new(2, format!("Failed to open report JSON '{}': {e}", path.display())))?;
    serde_json::from_reader(file).map_err(|e| AppError::new(2, format!("Invalid report JSON: {e}")))
}
