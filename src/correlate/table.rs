//! Pairwise correlation table over the analysis columns.

use rayon::prelude::*;
use serde::{Deserialize, Serialize};

use crate::correlate::pearson::pearson_pairwise;
use crate::domain::{AnalysisColumns, CountrySeries, MIN_OVERLAP, Metric};

/// Symmetric matrix of Pearson correlations; undefined cells are `None`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CorrelationTable {
    pub columns: Vec<Metric>,
    pub values: Vec<Vec<Option<f64>>>,
}

/// One unordered column pair and its correlation.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct CorrelatedPair {
    pub a: Metric,
    pub b: Metric,
    pub r: Option<f64>,
}

/// Build the table with the default minimum overlap.
pub fn correlation_table(series: &CountrySeries, columns: &AnalysisColumns) -> CorrelationTable {
    correlation_table_with(series, columns, MIN_OVERLAP)
}

pub fn correlation_table_with(
    series: &CountrySeries,
    columns: &AnalysisColumns,
    min_periods: usize,
) -> CorrelationTable {
    let cols = columns.as_slice().to_vec();
    let data: Vec<Vec<f64>> = cols.iter().map(|&m| series.column(m)).collect();
    let k = cols.len();

    // Upper triangle (diagonal included) in parallel, mirrored afterwards.
    let cells: Vec<(usize, usize)> = (0..k).flat_map(|i| (i..k).map(move |j| (i, j))).collect();
    let upper: Vec<(usize, usize, Option<f64>)> = cells
        .par_iter()
        .map(|&(i, j)| (i, j, pearson_pairwise(&data[i], &data[j], min_periods)))
        .collect();

    let mut values = vec![vec![None; k]; k];
    for (i, j, r) in upper {
        values[i][j] = r;
        values[j][i] = r;
    }

    CorrelationTable { columns: cols, values }
}

impl CorrelationTable {
    pub fn get(&self, a: Metric, b: Metric) -> Option<f64> {
        let i = self.columns.iter().position(|&m| m == a)?;
        let j = self.columns.iter().position(|&m| m == b)?;
        self.values[i][j]
    }

    /// Highest defined off-diagonal correlation, ignoring exact 1.0 duplicates.
    ///
    /// Ties keep the first pair in column order.
    pub fn top_pair(&self) -> Option<CorrelatedPair> {
        let mut best: Option<CorrelatedPair> = None;
        for pair in self.off_diagonal() {
            let Some(r) = pair.r else { continue };
            if best.and_then(|b| b.r).is_none_or(|cur| r > cur) {
                best = Some(pair);
            }
        }
        best
    }

    /// Each unordered pair once, sorted by r descending (undefined last).
    pub fn pairs(&self) -> Vec<CorrelatedPair> {
        let mut out = self.off_diagonal();
        out.sort_by(|x, y| match (x.r, y.r) {
            (Some(a), Some(b)) => b.partial_cmp(&a).unwrap_or(std::cmp::Ordering::Equal),
            (Some(_), None) => std::cmp::Ordering::Less,
            (None, Some(_)) => std::cmp::Ordering::Greater,
            (None, None) => std::cmp::Ordering::Equal,
        });
        out
    }

    fn off_diagonal(&self) -> Vec<CorrelatedPair> {
        let k = self.columns.len();
        let mut out = Vec::with_capacity(k * k.saturating_sub(1) / 2);
        for i in 0..k {
            for j in (i + 1)..k {
                let r = self.values[i][j];
                if r == Some(1.0) {
                    continue;
                }
                out.push(CorrelatedPair {
                    a: self.columns[i],
                    b: self.columns[j],
                    r,
                });
            }
        }
        out
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::SeriesRow;
    use chrono::{Duration, NaiveDate};

    fn series(n: usize) -> CountrySeries {
        let start = NaiveDate::from_ymd_opt(2020, 4, 1).unwrap();
        let rows = (0..n)
            .map(|i| {
                let t = i as f64;
                SeriesRow {
                    date: start + Duration::days(i as i64),
                    days_since_epoch: 49 + i as i64,
                    total_cases: 1000.0 + 10.0 * t,
                    new_cases: 50.0 + (t * 0.4).sin() * 20.0,
                    total_deaths: 10.0 + t,
                    new_deaths: 5.0 + (t * 0.4).sin() * 2.0 + (t * 1.3).cos(),
                    hosp_patients: 80.0 - t * 0.5 + (t * 0.9).sin(),
                    icu_patients: 7.0,
                    new_tests: 500.0 + (t * 0.2).cos() * 30.0,
                    total_tests: 20_000.0 + 500.0 * t,
                    percent_positive: 3.0 + (t * 0.25).sin(),
                    prevalence_ratio: 4.0,
                    infection_fatality_rate: 0.5 + (t * 0.3).cos() * 0.1,
                    cumulative_recovered_estimate: 1000.0 + 10.0 * t,
                }
            })
            .collect();
        CountrySeries {
            country: "Freedonia".to_string(),
            rows,
        }
    }

    #[test]
    fn table_is_symmetric_with_unit_or_undefined_diagonal() {
        let table = correlation_table(&series(60), &AnalysisColumns::default());
        for &a in &table.columns {
            for &b in &table.columns {
                assert_eq!(table.get(a, b), table.get(b, a));
            }
        }
        assert!((table.get(Metric::NewCases, Metric::NewCases).unwrap() - 1.0).abs() < 1e-12);
        // constant column
        assert_eq!(table.get(Metric::IcuPatients, Metric::IcuPatients), None);
    }

    #[test]
    fn too_few_rows_leaves_every_cell_undefined() {
        let table = correlation_table(&series(20), &AnalysisColumns::default());
        assert!(table.values.iter().flatten().all(Option::is_none));
        assert_eq!(table.top_pair(), None);
    }

    #[test]
    fn pairs_are_unique_sorted_and_skip_exact_duplicates() {
        let cols = AnalysisColumns::new(vec![
            Metric::TotalCases,
            Metric::CumulativeRecoveredEstimate,
            Metric::NewCases,
            Metric::NewDeaths,
            Metric::IcuPatients,
        ]);
        let table = correlation_table(&series(60), &cols);
        let pairs = table.pairs();

        // total_cases and the recovered estimate are identical columns.
        assert!(
            pairs
                .iter()
                .all(|p| !(p.a == Metric::TotalCases && p.b == Metric::CumulativeRecoveredEstimate))
        );
        for (i, p) in pairs.iter().enumerate() {
            for q in &pairs[i + 1..] {
                assert!(!(p.a == q.b && p.b == q.a) && !(p.a == q.a && p.b == q.b));
            }
        }
        let defined: Vec<f64> = pairs.iter().filter_map(|p| p.r).collect();
        assert!(defined.windows(2).all(|w| w[0] >= w[1]));
        // undefined pairs (constant ICU column) come last
        assert!(pairs.last().unwrap().r.is_none());

        let top = table.top_pair().unwrap();
        assert_eq!(top.r, defined.first().copied());
    }
}
