//! Explorer view: raw country data with a user-sized moving average of new cases.

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

use crate::domain::DailyRecord;
use crate::error::AnalysisError;
use crate::process::rolling_mean;

pub const TABLE_DAYS_RANGE: (usize, usize) = (3, 15);
pub const MOVING_AVERAGE_RANGE: (usize, usize) = (5, 14);

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct ExplorerOptions {
    /// Rows shown in the summary table.
    pub table_days: usize,
    /// Window of the new-cases moving average.
    pub moving_average_days: usize,
}

impl Default for ExplorerOptions {
    fn default() -> Self {
        Self {
            table_days: 5,
            moving_average_days: 7,
        }
    }
}

impl ExplorerOptions {
    /// Clamp both settings into their slider ranges.
    pub fn clamped(self) -> Self {
        Self {
            table_days: self.table_days.clamp(TABLE_DAYS_RANGE.0, TABLE_DAYS_RANGE.1),
            moving_average_days: self
                .moving_average_days
                .clamp(MOVING_AVERAGE_RANGE.0, MOVING_AVERAGE_RANGE.1),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ExplorerRow {
    pub date: NaiveDate,
    pub total_cases: Option<f64>,
    pub new_cases: Option<f64>,
    pub total_deaths: Option<f64>,
    pub moving_average: Option<f64>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ExplorerView {
    pub country: String,
    pub options: ExplorerOptions,
    pub rows: Vec<ExplorerRow>,
}

impl ExplorerView {
    /// The last `table_days` rows.
    pub fn summary(&self) -> &[ExplorerRow] {
        let n = self.options.table_days.min(self.rows.len());
        &self.rows[self.rows.len() - n..]
    }

    pub fn total_cases(&self) -> Vec<(NaiveDate, Option<f64>)> {
        self.rows.iter().map(|r| (r.date, r.total_cases)).collect()
    }

    pub fn moving_average(&self) -> Vec<(NaiveDate, Option<f64>)> {
        self.rows.iter().map(|r| (r.date, r.moving_average)).collect()
    }

    pub fn total_deaths(&self) -> Vec<(NaiveDate, Option<f64>)> {
        self.rows.iter().map(|r| (r.date, r.total_deaths)).collect()
    }
}

/// Build the explorer view for one country over its full history.
pub fn explore(
    records: &[DailyRecord],
    country: &str,
    options: ExplorerOptions,
) -> Result<ExplorerView, AnalysisError> {
    let options = options.clamped();

    let mut rows: Vec<&DailyRecord> = records.iter().filter(|r| r.location == country).collect();
    if rows.is_empty() {
        return Err(AnalysisError::EmptySeries {
            country: country.to_string(),
        });
    }
    rows.sort_by_key(|r| r.date);
    rows.dedup_by_key(|r| r.date);

    let new_cases: Vec<Option<f64>> = rows.iter().map(|r| r.new_cases).collect();
    let moving = rolling_mean(&new_cases, options.moving_average_days);

    let rows = rows
        .iter()
        .zip(moving)
        .map(|(r, moving_average)| ExplorerRow {
            date: r.date,
            total_cases: r.total_cases,
            new_cases: r.new_cases,
            total_deaths: r.total_deaths,
            moving_average,
        })
        .collect();

    Ok(ExplorerView {
        country: country.to_string(),
        options,
        rows,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Duration;

    fn records(n: i64) -> Vec<DailyRecord> {
        let start = NaiveDate::from_ymd_opt(2020, 1, 22).unwrap();
        (0..n)
            .map(|i| {
                let mut r = DailyRecord::empty("Freedonia", start + Duration::days(i));
                r.new_cases = Some(i as f64);
                r.total_cases = Some((i * (i + 1) / 2) as f64);
                r
            })
            .collect()
    }

    #[test]
    fn summary_is_the_tail_and_options_are_clamped() {
        let view = explore(
            &records(30),
            "Freedonia",
            ExplorerOptions {
                table_days: 100,
                moving_average_days: 2,
            },
        )
        .unwrap();
        assert_eq!(view.options.table_days, 15);
        assert_eq!(view.options.moving_average_days, 5);
        assert_eq!(view.summary().len(), 15);
        assert_eq!(view.summary().last().unwrap().date, view.rows.last().unwrap().date);
    }

    #[test]
    fn moving_average_uses_raw_new_cases() {
        let view = explore(&records(20), "Freedonia", ExplorerOptions::default()).unwrap();
        assert!(view.rows[5].moving_average.is_none());
        // mean of 0..=6
        assert!((view.rows[6].moving_average.unwrap() - 3.0).abs() < 1e-12);
        assert!(view.rows.iter().all(|r| r.total_deaths.is_none()));
    }

    #[test]
    fn unknown_country_is_empty_series() {
        assert!(matches!(
            explore(&records(5), "Sylvania", ExplorerOptions::default()),
            Err(AnalysisError::EmptySeries { .. })
        ));
    }
}
