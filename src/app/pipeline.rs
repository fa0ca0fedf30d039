//! Shared dataset/analysis logic used by both CLI and TUI front-ends.
//!
//! Keeping this in one place avoids duplicating the core workflow:
//! dataset load (CSV or synthetic) -> per-country series (cached) -> correlations
//!
//! The CLI and the TUI can then focus on presentation (printing vs widgets).

use std::path::PathBuf;
use std::sync::Arc;

use tracing::{info, warn};

use crate::cli::DataArgs;
use crate::config::Settings;
use crate::correlate::{LaggedCorrelation, correlation_table, search_columns};
use crate::data::{SampleConfig, generate_sample};
use crate::domain::{AnalysisColumns, DailyRecord, Metric};
use crate::error::AppError;
use crate::io::{CorrelationReport, countries, load_records};
use crate::process::SeriesCache;

/// Where the records came from.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DataSource {
    Csv(PathBuf),
    Sample,
}

impl std::fmt::Display for DataSource {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            DataSource::Csv(path) => write!(f, "{}", path.display()),
            DataSource::Sample => f.write_str("synthetic sample"),
        }
    }
}

/// A loaded dataset plus its processed-series cache.
#[derive(Debug, Clone)]
pub struct Dataset {
    pub source: DataSource,
    pub countries: Vec<String>,
    pub cache: SeriesCache,
}

impl Dataset {
    pub fn from_records(source: DataSource, records: Vec<DailyRecord>) -> Self {
        let countries = countries(&records);
        Self {
            source,
            countries,
            cache: SeriesCache::new(Arc::new(records)),
        }
    }

    pub fn records(&self) -> &[DailyRecord] {
        self.cache.records()
    }
}

/// Load the dataset selected by CLI flags, falling back to settings.
pub fn load_dataset(args: &DataArgs, settings: &Settings) -> Result<Dataset, AppError> {
    if args.sample {
        let records = generate_sample(&SampleConfig::default());
        info!(records = records.len(), "generated synthetic dataset");
        return Ok(Dataset::from_records(DataSource::Sample, records));
    }

    let path = args.data.clone().unwrap_or_else(|| settings.data_path.clone());
    if !path.exists() {
        return Err(AppError::new(
            2,
            format!(
                "Dataset '{}' not found. Run `covx fetch` to download it, or pass --sample.",
                path.display()
            ),
        ));
    }

    let ingest = load_records(&path)?;
    if !ingest.row_errors.is_empty() {
        warn!(skipped = ingest.row_errors.len(), "rows skipped during ingest");
    }
    if !ingest.missing_columns.is_empty() {
        warn!(missing = ?ingest.missing_columns, "dataset lacks some columns; they read as missing");
    }
    Ok(Dataset::from_records(DataSource::Csv(path), ingest.records))
}

/// Country from flags, then settings; on the synthetic dataset an absent
/// default falls back to the first sample country.
pub fn resolve_country(args: &DataArgs, settings: &Settings, dataset: &Dataset) -> String {
    if let Some(c) = &args.country {
        return c.clone();
    }
    if dataset.countries.iter().any(|c| c == &settings.country) {
        return settings.country.clone();
    }
    match (&dataset.source, dataset.countries.first()) {
        (DataSource::Sample, Some(first)) => first.clone(),
        _ => settings.country.clone(),
    }
}

/// Analysis columns from flags, then `COVX_COLUMNS`, then the default set.
pub fn resolve_columns(flags: &[Metric], settings: &Settings) -> Result<AnalysisColumns, AppError> {
    if !flags.is_empty() {
        return Ok(AnalysisColumns::new(flags.to_vec()));
    }
    match &settings.columns {
        Some(list) => list
            .parse()
            .map_err(|e| AppError::new(2, format!("Invalid COVX_COLUMNS '{list}': {e}"))),
        None => Ok(AnalysisColumns::default()),
    }
}

/// Lag search for one country; `lookback = None` uses the default window.
pub fn run_lag_search(
    dataset: &mut Dataset,
    country: &str,
    a: Metric,
    b: Metric,
    lookback: Option<usize>,
) -> Result<LaggedCorrelation, AppError> {
    let series = dataset.cache.series(country)?;
    let lookback = lookback.unwrap_or_else(|| crate::correlate::default_lookback(series.len()));
    let lagged = search_columns(&series, a, b, lookback)?;
    info!(
        country,
        a = a.key(),
        b = b.key(),
        shift = lagged.alignment.shift,
        r = lagged.alignment.r,
        "lag search"
    );
    Ok(lagged)
}

/// Correlation table for a country, optionally with a lag search on its top pair.
pub fn run_table(
    dataset: &mut Dataset,
    country: &str,
    columns: &AnalysisColumns,
    with_lag: bool,
) -> Result<CorrelationReport, AppError> {
    let series = dataset.cache.series(country)?;
    let table = correlation_table(&series, columns);

    let lagged = match (with_lag, table.top_pair()) {
        (true, Some(top)) => {
            let lookback = crate::correlate::default_lookback(series.len());
            match search_columns(&series, top.a, top.b, lookback) {
                Ok(l) => Some(l),
                Err(e) => {
                    warn!(error = %e, "lag search on top pair failed");
                    None
                }
            }
        }
        _ => None,
    };

    Ok(CorrelationReport::new(&series, table, lagged))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample_args() -> DataArgs {
        DataArgs {
            data: None,
            sample: true,
            country: None,
        }
    }

    #[test]
    fn sample_dataset_resolves_to_a_known_country() {
        let settings = Settings::default();
        let ds = load_dataset(&sample_args(), &settings).unwrap();
        assert_eq!(ds.source, DataSource::Sample);
        let country = resolve_country(&sample_args(), &settings, &ds);
        assert!(ds.countries.contains(&country));
    }

    #[test]
    fn missing_csv_is_an_input_error() {
        let args = DataArgs {
            data: Some(PathBuf::from("/nonexistent/covx/data.csv")),
            sample: false,
            country: None,
        };
        let err = load_dataset(&args, &Settings::default()).unwrap_err();
        assert_eq!(err.exit_code(), 2);
    }

    #[test]
    fn table_and_lag_run_on_sample() {
        let settings = Settings::default();
        let mut ds = load_dataset(&sample_args(), &settings).unwrap();
        let country = resolve_country(&sample_args(), &settings, &ds);

        let report = run_table(&mut ds, &country, &AnalysisColumns::default(), true).unwrap();
        assert_eq!(report.table.columns.len(), AnalysisColumns::default().len());
        assert!(report.rows > 0);

        let lagged = run_lag_search(&mut ds, &country, Metric::NewCases, Metric::NewDeaths, Some(0)).unwrap();
        assert_eq!(lagged.lookback, report.rows);
        assert!(ds.cache.hits() >= 1);
    }

    #[test]
    fn columns_come_from_flags_then_settings() {
        let settings = Settings {
            columns: Some("total tests, new_deaths".to_string()),
            ..Settings::default()
        };
        let cols = resolve_columns(&[Metric::IcuPatients], &settings).unwrap();
        assert_eq!(cols.as_slice(), &[Metric::IcuPatients]);

        let cols = resolve_columns(&[], &settings).unwrap();
        assert_eq!(cols.as_slice(), &[Metric::TotalTests, Metric::NewDeaths]);

        assert_eq!(resolve_columns(&[], &Settings::default()).unwrap(), AnalysisColumns::default());
    }

    #[test]
    fn unknown_configured_column_is_a_config_error() {
        let settings = Settings {
            columns: Some("new_cases,hospitalised".to_string()),
            ..Settings::default()
        };
        let err = resolve_columns(&[], &settings).unwrap_err();
        assert_eq!(err.exit_code(), 2);
        assert!(err.to_string().contains("hospitalised"));
    }

    #[test]
    fn unknown_country_maps_to_analysis_exit_code() {
        let mut ds = load_dataset(&sample_args(), &Settings::default()).unwrap();
        let err = run_lag_search(&mut ds, "Atlantis", Metric::NewCases, Metric::NewDeaths, None).unwrap_err();
        assert_eq!(err.exit_code(), 3);
    }
}
