//! Straight-line trend fits of a daily value against the day index.

use std::collections::BTreeMap;

use chrono::NaiveDate;
use nalgebra::DVector;
use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::domain::{DailyRecord, RecordField};
use crate::error::AnalysisError;
use crate::math::{line_design, solve_least_squares};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LinearTrend {
    pub field: RecordField,
    pub intercept: f64,
    /// Change per day.
    pub slope: f64,
    /// Undefined when the observations are constant.
    pub r_squared: Option<f64>,
    pub dates: Vec<NaiveDate>,
    pub observed: Vec<f64>,
    pub fitted: Vec<f64>,
}

impl LinearTrend {
    /// Predicted value `day` days after the first observation.
    pub fn predict(&self, day: f64) -> f64 {
        self.intercept + self.slope * day
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TrendReport {
    pub country: String,
    pub cases: LinearTrend,
    pub vaccinations: LinearTrend,
}

/// Fit the case and full-vaccination trends for one country.
pub fn fit_trends(records: &[DailyRecord], country: &str) -> Result<TrendReport, AnalysisError> {
    Ok(TrendReport {
        country: country.to_string(),
        cases: fit_trend(records, country, RecordField::TotalCases)?,
        vaccinations: fit_trend(records, country, RecordField::PeopleFullyVaccinated)?,
    })
}

/// Regress `field` on the day index `0..n`.
///
/// Values are summed per date first; missing values count as zero.
pub fn fit_trend(records: &[DailyRecord], country: &str, field: RecordField) -> Result<LinearTrend, AnalysisError> {
    let mut by_date: BTreeMap<NaiveDate, f64> = BTreeMap::new();
    for r in records.iter().filter(|r| r.location == country) {
        *by_date.entry(r.date).or_insert(0.0) += r.field(field).unwrap_or(0.0);
    }

    if by_date.is_empty() {
        return Err(AnalysisError::EmptySeries {
            country: country.to_string(),
        });
    }
    if by_date.len() < 2 {
        return Err(AnalysisError::InsufficientData {
            needed: 2,
            available: by_date.len(),
        });
    }

    let (dates, observed): (Vec<NaiveDate>, Vec<f64>) = by_date.into_iter().unzip();
    let xs: Vec<f64> = (0..observed.len()).map(|i| i as f64).collect();

    let beta = solve_least_squares(&line_design(&xs), &DVector::from_column_slice(&observed)).ok_or(
        AnalysisError::InsufficientData {
            needed: 2,
            available: observed.len(),
        },
    )?;
    let (intercept, slope) = (beta[0], beta[1]);

    let fitted: Vec<f64> = xs.iter().map(|x| intercept + slope * x).collect();
    let r_squared = r_squared(&observed, &fitted);
    debug!(country, field = field.column_name(), slope, intercept, "linear trend");

    Ok(LinearTrend {
        field,
        intercept,
        slope,
        r_squared,
        dates,
        observed,
        fitted,
    })
}

fn r_squared(observed: &[f64], fitted: &[f64]) -> Option<f64> {
    let n = observed.len() as f64;
    let mean = observed.iter().sum::<f64>() / n;
    let ss_tot: f64 = observed.iter().map(|y| (y - mean).powi(2)).sum();
    if ss_tot <= 0.0 {
        return None;
    }
    let ss_res: f64 = observed.iter().zip(fitted).map(|(y, f)| (y - f).powi(2)).sum();
    Some(1.0 - ss_res / ss_tot)
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Duration;

    fn rec(day: i64, cases: Option<f64>) -> DailyRecord {
        let start = NaiveDate::from_ymd_opt(2021, 1, 1).unwrap();
        let mut r = DailyRecord::empty("Freedonia", start + Duration::days(day));
        r.total_cases = cases;
        r
    }

    #[test]
    fn recovers_exact_line() {
        let records: Vec<DailyRecord> = (0..30).map(|d| rec(d, Some(100.0 + 25.0 * d as f64))).collect();
        let trend = fit_trend(&records, "Freedonia", RecordField::TotalCases).unwrap();
        assert!((trend.intercept - 100.0).abs() < 1e-6);
        assert!((trend.slope - 25.0).abs() < 1e-8);
        assert!((trend.r_squared.unwrap() - 1.0).abs() < 1e-12);
        assert!((trend.predict(40.0) - 1100.0).abs() < 1e-6);
    }

    #[test]
    fn duplicate_dates_are_summed_and_missing_is_zero() {
        let records = vec![rec(0, Some(1.0)), rec(0, Some(2.0)), rec(1, None), rec(2, Some(6.0))];
        let trend = fit_trend(&records, "Freedonia", RecordField::TotalCases).unwrap();
        assert_eq!(trend.observed, vec![3.0, 0.0, 6.0]);
        assert_eq!(trend.dates.len(), 3);
    }

    #[test]
    fn needs_two_dates() {
        let err = fit_trend(&[rec(0, Some(1.0))], "Freedonia", RecordField::TotalCases).unwrap_err();
        assert_eq!(err, AnalysisError::InsufficientData { needed: 2, available: 1 });
        assert!(matches!(
            fit_trends(&[rec(0, Some(1.0))], "Sylvania"),
            Err(AnalysisError::EmptySeries { .. })
        ));
    }

    #[test]
    fn constant_series_has_undefined_r_squared() {
        let records: Vec<DailyRecord> = (0..5).map(|d| rec(d, None)).collect();
        let trend = fit_trend(&records, "Freedonia", RecordField::PeopleFullyVaccinated).unwrap();
        assert_eq!(trend.r_squared, None);
        assert!(trend.slope.abs() < 1e-12);
    }
}
