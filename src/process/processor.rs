//! Country series derivation.
//!
//! Pipeline for one location:
//! filter -> sort/dedup -> cutoff -> 7-day smoothing -> positivity ->
//! prevalence ratio -> IFR / recovered estimate -> drop incomplete rows

use chrono::NaiveDate;
use tracing::{debug, warn};

use crate::domain::{
    CountrySeries, DailyRecord, RecordField, SeriesRow, SERIES_CUTOFF, SMOOTHING_WINDOW, days_since_epoch,
};
use crate::error::AnalysisError;
use crate::process::prevalence::prevalence_ratios;
use crate::process::rolling::{checked_ratio, rolling_mean};

/// Columns smoothed with the trailing window before any derivation.
///
/// `new_cases` is deliberately absent: the fatality-rate formula uses the raw
/// daily count.
pub const SMOOTHED_FIELDS: [RecordField; 7] = [
    RecordField::NewTests,
    RecordField::TotalDeaths,
    RecordField::NewDeaths,
    RecordField::HospPatients,
    RecordField::TotalTests,
    RecordField::IcuPatients,
    RecordField::TotalCases,
];

/// Turns raw dataset rows into a derived [`CountrySeries`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SeriesProcessor {
    pub cutoff: NaiveDate,
    pub window: usize,
}

impl Default for SeriesProcessor {
    fn default() -> Self {
        Self {
            cutoff: SERIES_CUTOFF,
            window: SMOOTHING_WINDOW,
        }
    }
}

/// Per-column intermediate values; every vector is aligned with `dates`.
struct Columns {
    dates: Vec<NaiveDate>,
    new_cases: Vec<Option<f64>>,
    smoothed: Vec<(RecordField, Vec<Option<f64>>)>,
}

impl Columns {
    fn smoothed(&self, field: RecordField) -> &[Option<f64>] {
        self.smoothed
            .iter()
            .find(|(f, _)| *f == field)
            .map(|(_, v)| v.as_slice())
            .unwrap_or(&[])
    }
}

impl SeriesProcessor {
    pub fn process(&self, records: &[DailyRecord], country: &str) -> Result<CountrySeries, AnalysisError> {
        let mut rows: Vec<&DailyRecord> = records.iter().filter(|r| r.location == country).collect();
        if rows.is_empty() {
            return Err(AnalysisError::EmptySeries {
                country: country.to_string(),
            });
        }

        rows.sort_by_key(|r| r.date);
        let before = rows.len();
        rows.dedup_by_key(|r| r.date);
        if rows.len() != before {
            warn!(country, duplicates = before - rows.len(), "dropped duplicate dates");
        }

        rows.retain(|r| r.date >= self.cutoff);
        if rows.is_empty() {
            return Err(AnalysisError::InvalidDateRange {
                country: country.to_string(),
                cutoff: self.cutoff,
            });
        }

        let columns = self.smooth(&rows);
        let n = columns.dates.len();

        let ratio: Vec<Option<f64>> = columns
            .smoothed(RecordField::NewTests)
            .iter()
            .zip(columns.smoothed(RecordField::TotalTests))
            .map(|(&num, &den)| checked_ratio(num, den))
            .collect();
        let positivity = rolling_mean(&ratio, self.window);

        let prevalence = prevalence_ratios(&columns.dates, &positivity)?;

        let new_deaths = columns.smoothed(RecordField::NewDeaths);
        let total_cases = columns.smoothed(RecordField::TotalCases);
        let total_deaths = columns.smoothed(RecordField::TotalDeaths);

        let mut out = Vec::with_capacity(n);
        for i in 0..n {
            let pr = prevalence[i];
            let ifr = match (new_deaths[i], columns.new_cases[i], pr) {
                (Some(d), Some(c), Some(pr)) => Some(d / (c * pr) * 100.0),
                _ => None,
            };
            let recovered = match (total_cases[i], pr, total_deaths[i]) {
                (Some(tc), Some(pr), Some(td)) => Some(tc * pr - td),
                _ => None,
            };

            if let Some(row) = assemble_row(&columns, i, positivity[i].map(|p| p * 100.0), pr, ifr, recovered) {
                out.push(row);
            }
        }

        debug!(
            country,
            retained = n,
            complete = out.len(),
            dropped = n - out.len(),
            "processed country series"
        );

        Ok(CountrySeries {
            country: country.to_string(),
            rows: out,
        })
    }

    fn smooth(&self, rows: &[&DailyRecord]) -> Columns {
        let smoothed = SMOOTHED_FIELDS
            .iter()
            .map(|&field| {
                let raw: Vec<Option<f64>> = rows.iter().map(|r| r.field(field)).collect();
                (field, rolling_mean(&raw, self.window))
            })
            .collect();

        Columns {
            dates: rows.iter().map(|r| r.date).collect(),
            new_cases: rows.iter().map(|r| r.new_cases).collect(),
            smoothed,
        }
    }
}

/// Build the output row, or `None` when any value is missing or not finite.
fn assemble_row(
    columns: &Columns,
    i: usize,
    percent_positive: Option<f64>,
    prevalence_ratio: Option<f64>,
    infection_fatality_rate: Option<f64>,
    cumulative_recovered_estimate: Option<f64>,
) -> Option<SeriesRow> {
    let finite = |v: Option<f64>| v.filter(|x| x.is_finite());
    let smoothed = |field| finite(columns.smoothed(field).get(i).copied().flatten());

    let date = columns.dates[i];
    Some(SeriesRow {
        date,
        days_since_epoch: days_since_epoch(date),
        total_cases: smoothed(RecordField::TotalCases)?,
        new_cases: finite(columns.new_cases[i])?,
        total_deaths: smoothed(RecordField::TotalDeaths)?,
        new_deaths: smoothed(RecordField::NewDeaths)?,
        hosp_patients: smoothed(RecordField::HospPatients)?,
        icu_patients: smoothed(RecordField::IcuPatients)?,
        new_tests: smoothed(RecordField::NewTests)?,
        total_tests: smoothed(RecordField::TotalTests)?,
        percent_positive: finite(percent_positive)?,
        prevalence_ratio: finite(prevalence_ratio)?,
        infection_fatality_rate: finite(infection_fatality_rate)?,
        cumulative_recovered_estimate: finite(cumulative_recovered_estimate)?,
    })
}

/// Process one country with the default cutoff and window.
pub fn process(records: &[DailyRecord], country: &str) -> Result<CountrySeries, AnalysisError> {
    SeriesProcessor::default().process(records, country)
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Duration;

    fn date(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).unwrap()
    }

    /// A steadily growing outbreak with every column populated.
    fn synthetic(country: &str, start: NaiveDate, days: i64) -> Vec<DailyRecord> {
        (0..days)
            .map(|i| {
                let t = i as f64;
                let mut r = DailyRecord::empty(country, start + Duration::days(i));
                r.new_cases = Some(100.0 + 5.0 * t);
                r.total_cases = Some(1000.0 + 100.0 * t + 2.5 * t * t);
                r.new_deaths = Some(2.0 + 0.1 * t);
                r.total_deaths = Some(20.0 + 2.0 * t + 0.05 * t * t);
                r.hosp_patients = Some(50.0 + t);
                r.icu_patients = Some(10.0 + 0.2 * t);
                r.new_tests = Some(1000.0 + 10.0 * t);
                r.total_tests = Some(10_000.0 + 1000.0 * t);
                r
            })
            .collect()
    }

    #[test]
    fn unknown_country_is_empty_series() {
        let records = synthetic("Freedonia", date(2020, 3, 1), 30);
        let err = process(&records, "Sylvania").unwrap_err();
        assert_eq!(
            err,
            AnalysisError::EmptySeries {
                country: "Sylvania".to_string()
            }
        );
    }

    #[test]
    fn all_rows_before_cutoff_is_invalid_date_range() {
        let records = synthetic("Freedonia", date(2020, 1, 1), 40);
        let err = process(&records, "Freedonia").unwrap_err();
        assert!(matches!(err, AnalysisError::InvalidDateRange { .. }));
    }

    #[test]
    fn output_is_strictly_ascending_and_complete() {
        let mut records = synthetic("Freedonia", date(2020, 2, 20), 60);
        records.reverse();
        // duplicate date and a foreign country row mixed in
        records.push(records[3].clone());
        records.extend(synthetic("Sylvania", date(2020, 3, 1), 10));

        let series = process(&records, "Freedonia").unwrap();
        assert!(!series.is_empty());
        assert!(series.rows.windows(2).all(|w| w[0].date < w[1].date));
        assert!(series.rows.iter().all(|r| r.date >= SERIES_CUTOFF));
        for r in &series.rows {
            for v in [
                r.percent_positive,
                r.prevalence_ratio,
                r.infection_fatality_rate,
                r.cumulative_recovered_estimate,
            ] {
                assert!(v.is_finite());
            }
        }
    }

    #[test]
    fn smoothing_only_sees_retained_history() {
        // Starts before the cutoff: smoothing windows restart at the cutoff, and the
        // positivity mean needs another window on top of the smoothed columns.
        let records = synthetic("Freedonia", date(2020, 2, 1), 80);
        let series = process(&records, "Freedonia").unwrap();
        let first = series.first_date().unwrap();
        assert_eq!(first, SERIES_CUTOFF + Duration::days(12));
    }

    #[test]
    fn derived_columns_follow_their_formulas() {
        let records = synthetic("Freedonia", date(2020, 3, 1), 40);
        let series = process(&records, "Freedonia").unwrap();
        let row = &series.rows[5];
        let idx = (row.date - date(2020, 3, 1)).num_days() as usize;

        // Smoothed total_cases is the mean of the 7 raw values ending at idx.
        let expected_tc: f64 =
            records[idx - 6..=idx].iter().map(|r| r.total_cases.unwrap()).sum::<f64>() / 7.0;
        assert!((row.total_cases - expected_tc).abs() < 1e-9);

        // new_cases stays raw.
        assert_eq!(row.new_cases, records[idx].new_cases.unwrap());

        let ifr = row.new_deaths / (row.new_cases * row.prevalence_ratio) * 100.0;
        assert!((row.infection_fatality_rate - ifr).abs() < 1e-9);

        let rec = row.total_cases * row.prevalence_ratio - row.total_deaths;
        assert!((row.cumulative_recovered_estimate - rec).abs() < 1e-6);

        let pr = 1250.0 / (row.days_since_epoch as f64 + 25.0) * (row.percent_positive / 100.0).sqrt() + 2.0;
        assert!((row.prevalence_ratio - pr).abs() < 1e-9);
    }

    #[test]
    fn zero_new_cases_rows_are_dropped() {
        let mut records = synthetic("Freedonia", date(2020, 3, 1), 40);
        records[20].new_cases = Some(0.0);
        let series = process(&records, "Freedonia").unwrap();
        assert!(series.rows.iter().all(|r| r.date != records[20].date));
        assert!(series.rows.iter().any(|r| r.date == records[21].date));
    }

    #[test]
    fn missing_hospital_data_drops_affected_windows() {
        let mut records = synthetic("Freedonia", date(2020, 3, 1), 40);
        records[25].hosp_patients = None;
        let series = process(&records, "Freedonia").unwrap();
        let dropped: Vec<NaiveDate> = (25..32).map(|i| records[i].date).collect();
        assert!(series.rows.iter().all(|r| !dropped.contains(&r.date)));
        assert!(series.rows.iter().any(|r| r.date == records[32].date));
    }
}
