//! Shared domain types.
//!
//! These types are intentionally kept lightweight and serializable so they can be:
//!
//! - used in-memory by the derivation and correlation code
//! - exported to JSON/CSV
//! - rendered by the CLI and the TUI without extra conversion layers

use std::fmt;
use std::str::FromStr;

use chrono::NaiveDate;
use clap::ValueEnum;
use serde::{Deserialize, Serialize};

use crate::error::AnalysisError;

const fn ymd(year: i32, month: u32, day: u32) -> NaiveDate {
    match NaiveDate::from_ymd_opt(year, month, day) {
        Some(date) => date,
        None => panic!("invalid calendar constant"),
    }
}

/// First date retained in a processed country series.
pub const SERIES_CUTOFF: NaiveDate = ymd(2020, 3, 1);

/// Reference date of the prevalence-ratio model (day 0 of the outbreak).
pub const PREVALENCE_EPOCH: NaiveDate = ymd(2020, 2, 12);

/// First date shown in the country comparison view.
pub const COMPARISON_START: NaiveDate = ymd(2020, 2, 1);

/// Trailing window (days) used for every smoothed column.
pub const SMOOTHING_WINDOW: usize = 7;

/// Minimum number of overlapping pairs for a correlation to be defined.
pub const MIN_OVERLAP: usize = 30;

/// One row of the source dataset for a `(location, date)` pair.
///
/// Every numeric column may be missing in the source file.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DailyRecord {
    pub location: String,
    pub date: NaiveDate,
    pub total_cases: Option<f64>,
    pub new_cases: Option<f64>,
    pub total_deaths: Option<f64>,
    pub new_deaths: Option<f64>,
    pub hosp_patients: Option<f64>,
    pub icu_patients: Option<f64>,
    pub new_tests: Option<f64>,
    pub total_tests: Option<f64>,
    pub total_vaccinations: Option<f64>,
    pub people_vaccinated: Option<f64>,
    pub people_fully_vaccinated: Option<f64>,
    pub new_vaccinations: Option<f64>,
}

impl DailyRecord {
    /// A record with every numeric column missing.
    pub fn empty(location: impl Into<String>, date: NaiveDate) -> Self {
        Self {
            location: location.into(),
            date,
            total_cases: None,
            new_cases: None,
            total_deaths: None,
            new_deaths: None,
            hosp_patients: None,
            icu_patients: None,
            new_tests: None,
            total_tests: None,
            total_vaccinations: None,
            people_vaccinated: None,
            people_fully_vaccinated: None,
            new_vaccinations: None,
        }
    }

    pub fn field(&self, field: RecordField) -> Option<f64> {
        match field {
            RecordField::TotalCases => self.total_cases,
            RecordField::NewCases => self.new_cases,
            RecordField::TotalDeaths => self.total_deaths,
            RecordField::NewDeaths => self.new_deaths,
            RecordField::HospPatients => self.hosp_patients,
            RecordField::IcuPatients => self.icu_patients,
            RecordField::NewTests => self.new_tests,
            RecordField::TotalTests => self.total_tests,
            RecordField::TotalVaccinations => self.total_vaccinations,
            RecordField::PeopleVaccinated => self.people_vaccinated,
            RecordField::PeopleFullyVaccinated => self.people_fully_vaccinated,
            RecordField::NewVaccinations => self.new_vaccinations,
        }
    }

    pub fn set_field(&mut self, field: RecordField, value: Option<f64>) {
        let slot = match field {
            RecordField::TotalCases => &mut self.total_cases,
            RecordField::NewCases => &mut self.new_cases,
            RecordField::TotalDeaths => &mut self.total_deaths,
            RecordField::NewDeaths => &mut self.new_deaths,
            RecordField::HospPatients => &mut self.hosp_patients,
            RecordField::IcuPatients => &mut self.icu_patients,
            RecordField::NewTests => &mut self.new_tests,
            RecordField::TotalTests => &mut self.total_tests,
            RecordField::TotalVaccinations => &mut self.total_vaccinations,
            RecordField::PeopleVaccinated => &mut self.people_vaccinated,
            RecordField::PeopleFullyVaccinated => &mut self.people_fully_vaccinated,
            RecordField::NewVaccinations => &mut self.new_vaccinations,
        };
        *slot = value;
    }
}

/// Numeric columns of the source dataset.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RecordField {
    TotalCases,
    NewCases,
    TotalDeaths,
    NewDeaths,
    HospPatients,
    IcuPatients,
    NewTests,
    TotalTests,
    TotalVaccinations,
    PeopleVaccinated,
    PeopleFullyVaccinated,
    NewVaccinations,
}

impl RecordField {
    pub const ALL: [RecordField; 12] = [
        RecordField::TotalCases,
        RecordField::NewCases,
        RecordField::TotalDeaths,
        RecordField::NewDeaths,
        RecordField::HospPatients,
        RecordField::IcuPatients,
        RecordField::NewTests,
        RecordField::TotalTests,
        RecordField::TotalVaccinations,
        RecordField::PeopleVaccinated,
        RecordField::PeopleFullyVaccinated,
        RecordField::NewVaccinations,
    ];

    /// CSV header name.
    pub fn column_name(self) -> &'static str {
        match self {
            RecordField::TotalCases => "total_cases",
            RecordField::NewCases => "new_cases",
            RecordField::TotalDeaths => "total_deaths",
            RecordField::NewDeaths => "new_deaths",
            RecordField::HospPatients => "hosp_patients",
            RecordField::IcuPatients => "icu_patients",
            RecordField::NewTests => "new_tests",
            RecordField::TotalTests => "total_tests",
            RecordField::TotalVaccinations => "total_vaccinations",
            RecordField::PeopleVaccinated => "people_vaccinated",
            RecordField::PeopleFullyVaccinated => "people_fully_vaccinated",
            RecordField::NewVaccinations => "new_vaccinations",
        }
    }
}

/// One row of a processed country series.
///
/// Smoothed columns hold their 7-day trailing mean; `new_cases` is the raw
/// daily value. Rows only exist when every column is defined and finite.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SeriesRow {
    pub date: NaiveDate,
    pub days_since_epoch: i64,
    pub total_cases: f64,
    pub new_cases: f64,
    pub total_deaths: f64,
    pub new_deaths: f64,
    pub hosp_patients: f64,
    pub icu_patients: f64,
    pub new_tests: f64,
    pub total_tests: f64,
    pub percent_positive: f64,
    pub prevalence_ratio: f64,
    pub infection_fatality_rate: f64,
    pub cumulative_recovered_estimate: f64,
}

/// Processed, date-ordered series for one location.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CountrySeries {
    pub country: String,
    pub rows: Vec<SeriesRow>,
}

impl CountrySeries {
    pub fn len(&self) -> usize {
        self.rows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    pub fn dates(&self) -> Vec<NaiveDate> {
        self.rows.iter().map(|r| r.date).collect()
    }

    /// Values of one metric, in date order.
    pub fn column(&self, metric: Metric) -> Vec<f64> {
        self.rows.iter().map(|r| metric.value(r)).collect()
    }

    pub fn first_date(&self) -> Option<NaiveDate> {
        self.rows.first().map(|r| r.date)
    }

    pub fn last_date(&self) -> Option<NaiveDate> {
        self.rows.last().map(|r| r.date)
    }
}

/// Named numeric columns of a processed series.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, ValueEnum)]
#[serde(rename_all = "snake_case")]
pub enum Metric {
    TotalCases,
    NewCases,
    TotalDeaths,
    NewDeaths,
    HospPatients,
    IcuPatients,
    NewTests,
    TotalTests,
    PercentPositive,
    PrevalenceRatio,
    InfectionFatalityRate,
    CumulativeRecoveredEstimate,
}

impl Metric {
    pub const ALL: [Metric; 12] = [
        Metric::TotalCases,
        Metric::NewCases,
        Metric::TotalDeaths,
        Metric::NewDeaths,
        Metric::HospPatients,
        Metric::IcuPatients,
        Metric::NewTests,
        Metric::TotalTests,
        Metric::PercentPositive,
        Metric::PrevalenceRatio,
        Metric::InfectionFatalityRate,
        Metric::CumulativeRecoveredEstimate,
    ];

    /// Machine-friendly name (CSV/JSON headers).
    pub fn key(self) -> &'static str {
        match self {
            Metric::TotalCases => "total_cases",
            Metric::NewCases => "new_cases",
            Metric::TotalDeaths => "total_deaths",
            Metric::NewDeaths => "new_deaths",
            Metric::HospPatients => "hosp_patients",
            Metric::IcuPatients => "icu_patients",
            Metric::NewTests => "new_tests",
            Metric::TotalTests => "total_tests",
            Metric::PercentPositive => "percent_positive",
            Metric::PrevalenceRatio => "prevalence_ratio",
            Metric::InfectionFatalityRate => "infection_fatality_rate",
            Metric::CumulativeRecoveredEstimate => "cumulative_recovered_estimate",
        }
    }

    /// Human-friendly name for tables and charts.
    pub fn label(self) -> &'static str {
        match self {
            Metric::TotalCases => "Total cases",
            Metric::NewCases => "New cases",
            Metric::TotalDeaths => "Total deaths",
            Metric::NewDeaths => "New deaths",
            Metric::HospPatients => "Hospital patients",
            Metric::IcuPatients => "ICU patients",
            Metric::NewTests => "New tests",
            Metric::TotalTests => "Total tests",
            Metric::PercentPositive => "Percent positive",
            Metric::PrevalenceRatio => "Prevalence ratio",
            Metric::InfectionFatalityRate => "Infection Fatality Rate",
            Metric::CumulativeRecoveredEstimate => "Cumulative Recovered Infections Estimate",
        }
    }

    pub fn value(self, row: &SeriesRow) -> f64 {
        match self {
            Metric::TotalCases => row.total_cases,
            Metric::NewCases => row.new_cases,
            Metric::TotalDeaths => row.total_deaths,
            Metric::NewDeaths => row.new_deaths,
            Metric::HospPatients => row.hosp_patients,
            Metric::IcuPatients => row.icu_patients,
            Metric::NewTests => row.new_tests,
            Metric::TotalTests => row.total_tests,
            Metric::PercentPositive => row.percent_positive,
            Metric::PrevalenceRatio => row.prevalence_ratio,
            Metric::InfectionFatalityRate => row.infection_fatality_rate,
            Metric::CumulativeRecoveredEstimate => row.cumulative_recovered_estimate,
        }
    }
}

impl fmt::Display for Metric {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

impl FromStr for Metric {
    type Err = AnalysisError;

    /// Accepts the key (`new_cases`), the kebab form (`new-cases`) or the label.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let wanted = s.trim().replace('-', "_");
        Metric::ALL
            .into_iter()
            .find(|m| m.key().eq_ignore_ascii_case(&wanted) || m.label().eq_ignore_ascii_case(s.trim()))
            .ok_or_else(|| AnalysisError::UnknownColumn { name: s.to_string() })
    }
}

/// The set of columns offered for correlation analysis.
///
/// Passed explicitly to the correlation table and to the UI pickers.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AnalysisColumns(Vec<Metric>);

impl AnalysisColumns {
    pub fn new(columns: Vec<Metric>) -> Self {
        let mut unique: Vec<Metric> = Vec::with_capacity(columns.len());
        for c in columns {
            if !unique.contains(&c) {
                unique.push(c);
            }
        }
        Self(unique)
    }

    pub fn as_slice(&self) -> &[Metric] {
        &self.0
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn get(&self, idx: usize) -> Option<Metric> {
        self.0.get(idx).copied()
    }

    pub fn position(&self, metric: Metric) -> Option<usize> {
        self.0.iter().position(|&m| m == metric)
    }
}

/// Comma-separated column names, each accepted by [`Metric::from_str`].
impl FromStr for AnalysisColumns {
    type Err = AnalysisError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let columns = s
            .split(',')
            .map(str::trim)
            .filter(|name| !name.is_empty())
            .map(str::parse::<Metric>)
            .collect::<Result<Vec<_>, _>>()?;
        if columns.is_empty() {
            return Err(AnalysisError::UnknownColumn { name: s.to_string() });
        }
        Ok(Self::new(columns))
    }
}

impl Default for AnalysisColumns {
    fn default() -> Self {
        Self(vec![
            Metric::InfectionFatalityRate,
            Metric::NewCases,
            Metric::NewDeaths,
            Metric::HospPatients,
            Metric::IcuPatients,
            Metric::PercentPositive,
            Metric::TotalTests,
        ])
    }
}

/// Integer days between `date` and the prevalence epoch (negative before it).
pub fn days_since_epoch(date: NaiveDate) -> i64 {
    (date - PREVALENCE_EPOCH).num_days()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn days_since_epoch_can_be_negative() {
        assert_eq!(days_since_epoch(PREVALENCE_EPOCH), 0);
        assert_eq!(days_since_epoch(SERIES_CUTOFF), 18);
        assert_eq!(days_since_epoch(ymd(2020, 2, 1)), -11);
    }

    #[test]
    fn metric_parses_keys_labels_and_kebab_case() {
        assert_eq!("new_cases".parse::<Metric>().unwrap(), Metric::NewCases);
        assert_eq!("percent-positive".parse::<Metric>().unwrap(), Metric::PercentPositive);
        assert_eq!(
            "Infection Fatality Rate".parse::<Metric>().unwrap(),
            Metric::InfectionFatalityRate
        );
        assert!(matches!(
            "bogus".parse::<Metric>(),
            Err(AnalysisError::UnknownColumn { .. })
        ));
    }

    #[test]
    fn analysis_columns_parse_from_a_list() {
        let cols: AnalysisColumns = "new-cases, ICU patients,new_cases,,total_tests".parse().unwrap();
        assert_eq!(cols.as_slice(), &[Metric::NewCases, Metric::IcuPatients, Metric::TotalTests]);

        let err = "new_cases,hospitalised".parse::<AnalysisColumns>().unwrap_err();
        assert_eq!(err, AnalysisError::UnknownColumn { name: "hospitalised".to_string() });
        assert!(" , ".parse::<AnalysisColumns>().is_err());
    }

    #[test]
    fn analysis_columns_drop_duplicates() {
        let cols = AnalysisColumns::new(vec![Metric::NewCases, Metric::NewDeaths, Metric::NewCases]);
        assert_eq!(cols.as_slice(), &[Metric::NewCases, Metric::NewDeaths]);
        assert_eq!(AnalysisColumns::default().len(), 7);
    }
}
