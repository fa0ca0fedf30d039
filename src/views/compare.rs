//! Side-by-side case trajectories of two countries.

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

use crate::domain::{COMPARISON_START, DailyRecord};
use crate::error::AnalysisError;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CountryTrajectory {
    pub country: String,
    pub dates: Vec<NaiveDate>,
    pub total_cases: Vec<Option<f64>>,
    pub new_cases: Vec<Option<f64>>,
}

impl CountryTrajectory {
    pub fn latest_total_cases(&self) -> Option<(NaiveDate, f64)> {
        self.dates
            .iter()
            .zip(&self.total_cases)
            .rev()
            .find_map(|(&d, v)| v.map(|v| (d, v)))
    }

    /// Largest daily case count; ties keep the earliest date.
    pub fn peak_new_cases(&self) -> Option<(NaiveDate, f64)> {
        let mut best: Option<(NaiveDate, f64)> = None;
        for (&d, v) in self.dates.iter().zip(&self.new_cases) {
            let Some(v) = *v else { continue };
            if best.is_none_or(|(_, b)| v > b) {
                best = Some((d, v));
            }
        }
        best
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Comparison {
    pub first: CountryTrajectory,
    pub second: CountryTrajectory,
}

/// Trajectories of two distinct countries from [`COMPARISON_START`] onwards.
pub fn compare_countries(records: &[DailyRecord], first: &str, second: &str) -> Result<Comparison, AnalysisError> {
    if first == second {
        return Err(AnalysisError::SameCountry {
            country: first.to_string(),
        });
    }

    Ok(Comparison {
        first: trajectory(records, first)?,
        second: trajectory(records, second)?,
    })
}

fn trajectory(records: &[DailyRecord], country: &str) -> Result<CountryTrajectory, AnalysisError> {
    let mut rows: Vec<&DailyRecord> = records.iter().filter(|r| r.location == country).collect();
    if rows.is_empty() {
        return Err(AnalysisError::EmptySeries {
            country: country.to_string(),
        });
    }
    rows.sort_by_key(|r| r.date);
    rows.dedup_by_key(|r| r.date);
    rows.retain(|r| r.date >= COMPARISON_START);

    Ok(CountryTrajectory {
        country: country.to_string(),
        dates: rows.iter().map(|r| r.date).collect(),
        total_cases: rows.iter().map(|r| r.total_cases).collect(),
        new_cases: rows.iter().map(|r| r.new_cases).collect(),
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Duration;

    fn rows(country: &str, start: NaiveDate, new_cases: &[f64]) -> Vec<DailyRecord> {
        let mut total = 0.0;
        new_cases
            .iter()
            .enumerate()
            .map(|(i, &n)| {
                total += n;
                let mut r = DailyRecord::empty(country, start + Duration::days(i as i64));
                r.new_cases = Some(n);
                r.total_cases = Some(total);
                r
            })
            .collect()
    }

    #[test]
    fn same_country_is_rejected() {
        let err = compare_countries(&[], "Freedonia", "Freedonia").unwrap_err();
        assert!(matches!(err, AnalysisError::SameCountry { .. }));
    }

    #[test]
    fn trajectories_start_at_comparison_date() {
        let jan = NaiveDate::from_ymd_opt(2020, 1, 25).unwrap();
        let mut records = rows("Freedonia", jan, &[1.0, 2.0, 3.0, 4.0, 5.0, 6.0, 7.0, 8.0, 9.0, 10.0]);
        records.extend(rows("Sylvania", jan, &[5.0, 9.0, 9.0, 1.0, 0.0, 3.0, 2.0, 7.0, 1.0, 0.0]));

        let cmp = compare_countries(&records, "Freedonia", "Sylvania").unwrap();
        assert_eq!(cmp.first.dates[0], COMPARISON_START);
        assert_eq!(cmp.first.dates.len(), 3);
        assert_eq!(cmp.first.latest_total_cases().unwrap().1, 55.0);
        assert_eq!(cmp.second.peak_new_cases().unwrap().1, 7.0);
    }

    #[test]
    fn absent_country_is_empty_series() {
        let records = rows("Freedonia", COMPARISON_START, &[1.0]);
        assert!(matches!(
            compare_countries(&records, "Freedonia", "Sylvania"),
            Err(AnalysisError::EmptySeries { .. })
        ));
    }
}
