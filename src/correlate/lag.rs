//! Lag search: which forward shift of one series best tracks another?
//!
//! For every candidate shift `i` in `0..=len/5`, series A is moved `i` days
//! forward (its first `i` positions become missing) and correlated with the
//! unshifted series B over the overlapping pairs. Candidates with fewer than
//! [`MIN_OVERLAP`] pairs are skipped. The highest r wins; ties keep the
//! smallest shift.

use chrono::NaiveDate;
use rayon::prelude::*;
use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::correlate::pearson::{complete_pairs, pearson_pairwise};
use crate::domain::{CountrySeries, MIN_OVERLAP, Metric};
use crate::error::AnalysisError;

/// Best shift and the correlation it achieves.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Alignment {
    pub r: f64,
    pub shift: usize,
}

/// Find the forward shift of `a` that maximizes Pearson's r against `b`.
///
/// Non-finite values are treated as missing.
pub fn find_best_alignment(a: &[f64], b: &[f64]) -> Result<Alignment, AnalysisError> {
    find_best_alignment_with(a, b, MIN_OVERLAP)
}

/// [`find_best_alignment`] with an explicit minimum overlap.
pub fn find_best_alignment_with(a: &[f64], b: &[f64], min_overlap: usize) -> Result<Alignment, AnalysisError> {
    if a.len() != b.len() {
        return Err(AnalysisError::MisalignedSeries {
            left: a.len(),
            right: b.len(),
        });
    }

    let n = a.len();
    let max_shift = n / 5;

    // Shifting A forward by i pairs A[t - i] with B[t] for t >= i.
    let scores: Vec<(usize, Option<f64>)> = (0..=max_shift)
        .into_par_iter()
        .map(|i| (i, pearson_pairwise(&a[..n - i], &b[i..], min_overlap)))
        .collect();

    let mut best: Option<Alignment> = None;
    for (shift, r) in scores {
        let Some(r) = r else { continue };
        if best.is_none_or(|b| r > b.r) {
            best = Some(Alignment { r, shift });
        }
    }

    let best = best.ok_or_else(|| AnalysisError::InsufficientData {
        needed: min_overlap,
        available: complete_pairs(a, b),
    })?;
    debug!(r = best.r, shift = best.shift, candidates = max_shift + 1, "best alignment");
    Ok(best)
}

/// Result of a lag search between two columns of a country series.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LaggedCorrelation {
    pub a: Metric,
    pub b: Metric,
    pub lookback: usize,
    pub alignment: Alignment,
    pub dates: Vec<NaiveDate>,
    /// Column A moved forward by the best shift (leading positions missing).
    pub shifted_a: Vec<Option<f64>>,
    pub b_values: Vec<f64>,
}

/// Default lookback offered by the UI: everything but the first 90 days.
pub fn default_lookback(len: usize) -> usize {
    len.saturating_sub(90)
}

/// Run the lag search on the last `lookback` rows of columns `a` and `b`.
///
/// A lookback of 0, or one longer than the series, uses the whole series.
pub fn search_columns(
    series: &CountrySeries,
    a: Metric,
    b: Metric,
    lookback: usize,
) -> Result<LaggedCorrelation, AnalysisError> {
    let len = series.len();
    let lookback = if lookback == 0 || lookback > len { len } else { lookback };
    let start = len - lookback;

    let rows = &series.rows[start..];
    let a_values: Vec<f64> = rows.iter().map(|r| a.value(r)).collect();
    let b_values: Vec<f64> = rows.iter().map(|r| b.value(r)).collect();

    let alignment = find_best_alignment(&a_values, &b_values)?;
    let shifted_a = shift_forward(&a_values, alignment.shift);

    Ok(LaggedCorrelation {
        a,
        b,
        lookback,
        alignment,
        dates: rows.iter().map(|r| r.date).collect(),
        shifted_a,
        b_values,
    })
}

/// Move values `shift` positions forward, padding the front with missing values.
pub fn shift_forward(values: &[f64], shift: usize) -> Vec<Option<f64>> {
    let shift = shift.min(values.len());
    std::iter::repeat_n(None, shift)
        .chain(values[..values.len() - shift].iter().map(|&v| Some(v)))
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::SeedableRng;
    use rand::rngs::StdRng;
    use rand_distr::{Distribution, Normal};

    fn wiggly(n: usize) -> Vec<f64> {
        (0..n)
            .map(|t| {
                let t = t as f64;
                (t * 0.35).sin() * 10.0 + (t * 0.11).cos() * 4.0 + t * 0.2
            })
            .collect()
    }

    #[test]
    fn self_alignment_is_zero_shift_with_unit_r() {
        let x = wiggly(60);
        let best = find_best_alignment(&x, &x).unwrap();
        assert_eq!(best.shift, 0);
        assert!((best.r - 1.0).abs() < 1e-12);
    }

    #[test]
    fn recovers_a_three_day_lag_under_noise() {
        let mut rng = StdRng::seed_from_u64(7);
        let step = Normal::new(0.0, 1.0).unwrap();
        let noise = Normal::new(0.0, 0.01).unwrap();

        // Random walk w; A[t] = w[t + 3], B[t] = w[t] + noise => B[t] ~ A[t - 3].
        let mut w = vec![0.0f64; 43];
        for t in 1..w.len() {
            w[t] = w[t - 1] + step.sample(&mut rng);
        }
        let a: Vec<f64> = (0..40).map(|t| w[t + 3]).collect();
        let b: Vec<f64> = (0..40).map(|t| w[t] + noise.sample(&mut rng)).collect();

        let best = find_best_alignment(&a, &b).unwrap();
        assert_eq!(best.shift, 3);
        assert!(best.r > 0.9);
    }

    #[test]
    fn result_stays_within_bounds() {
        let a = wiggly(75);
        let b: Vec<f64> = wiggly(80)[5..].iter().map(|v| -v).collect();
        let best = find_best_alignment(&a, &b).unwrap();
        assert!((-1.0..=1.0).contains(&best.r));
        assert!(best.shift <= a.len() / 5);
    }

    #[test]
    fn short_series_is_insufficient_data() {
        let x = wiggly(20);
        let err = find_best_alignment(&x, &x).unwrap_err();
        assert_eq!(
            err,
            AnalysisError::InsufficientData {
                needed: MIN_OVERLAP,
                available: 20
            }
        );
    }

    #[test]
    fn shifts_without_enough_overlap_are_skipped() {
        // 35 points: shift i leaves 35 - i overlapping pairs.
        let a = wiggly(40);
        let b: Vec<f64> = a.iter().map(|v| v * 2.0).collect();
        let best = find_best_alignment_with(&a[..35], &b[..35], 31).unwrap();
        assert_eq!(best.shift, 0);
        assert!(find_best_alignment_with(&a[..35], &b[..35], 36).is_err());
    }

    #[test]
    fn mismatched_lengths_are_rejected() {
        let err = find_best_alignment(&[1.0; 40], &[1.0; 39]).unwrap_err();
        assert_eq!(err, AnalysisError::MisalignedSeries { left: 40, right: 39 });
    }

    #[test]
    fn shift_forward_pads_front() {
        assert_eq!(
            shift_forward(&[1.0, 2.0, 3.0], 1),
            vec![None, Some(1.0), Some(2.0)]
        );
        assert_eq!(shift_forward(&[1.0], 4), vec![None]);
    }
}
