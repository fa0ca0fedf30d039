//! Prevalence ratio: estimated multiplier between confirmed and true infections.
//!
//! ```text
//! prevalence_ratio(day_i) = (1250 / (day_i + 25)) * positivity_rate(day_i)^0.5 + 2
//! ```
//!
//! where `day_i` counts days since 2020-02-12 and `positivity_rate` is the
//! smoothed share of positive tests (a fraction, not a percentage).
//!
//! Rows where the formula cannot be evaluated reuse the previous row's ratio,
//! so the ratios must be produced by a strictly sequential scan.

use chrono::NaiveDate;

use crate::domain::days_since_epoch;
use crate::error::AnalysisError;

const NUMERATOR: f64 = 1250.0;
const DAY_OFFSET: i64 = 25;
const FLOOR: f64 = 2.0;

/// Result of evaluating the formula on one row.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum RatioEval {
    Value(f64),
    /// The positivity rate is missing for this row.
    MissingOperand,
    /// Negative square-root argument, zero denominator or non-finite result.
    Undefined,
}

/// Evaluate the formula for a single day.
pub fn prevalence_formula(days_since_epoch: i64, positivity: Option<f64>) -> RatioEval {
    let Some(p) = positivity.filter(|p| !p.is_nan()) else {
        return RatioEval::MissingOperand;
    };

    let denom = days_since_epoch + DAY_OFFSET;
    if denom == 0 || p < 0.0 {
        return RatioEval::Undefined;
    }

    let ratio = (NUMERATOR / denom as f64) * p.sqrt() + FLOOR;
    if ratio.is_finite() {
        RatioEval::Value(ratio)
    } else {
        RatioEval::Undefined
    }
}

/// Compute the ratio for every row, in date order.
///
/// - a defined formula yields its value
/// - a missing operand carries the previous row's ratio (missing on the first row)
/// - an undefined formula carries the previous row's ratio; on the first row
///   there is nothing to carry and the scan fails
pub fn prevalence_ratios(
    dates: &[NaiveDate],
    positivity: &[Option<f64>],
) -> Result<Vec<Option<f64>>, AnalysisError> {
    // `None` until the first row has been evaluated.
    let mut previous: Option<Option<f64>> = None;
    let mut out = Vec::with_capacity(dates.len());

    for (&date, &p) in dates.iter().zip(positivity) {
        let value = match prevalence_formula(days_since_epoch(date), p) {
            RatioEval::Value(v) => Some(v),
            RatioEval::MissingOperand => previous.flatten(),
            RatioEval::Undefined => match previous {
                Some(prev) => prev,
                None => return Err(AnalysisError::UndefinedInitialRatio { date }),
            },
        };
        out.push(value);
        previous = Some(value);
    }

    Ok(out)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn day(offset: i64) -> NaiveDate {
        crate::domain::PREVALENCE_EPOCH + chrono::Duration::days(offset)
    }

    #[test]
    fn formula_matches_reference_value() {
        // day 100, 4% positive: 1250/125 * 0.2 + 2 = 4
        match prevalence_formula(100, Some(0.04)) {
            RatioEval::Value(v) => assert!((v - 4.0).abs() < 1e-12),
            other => panic!("unexpected {other:?}"),
        }
    }

    #[test]
    fn formula_flags_domain_failures() {
        assert_eq!(prevalence_formula(-25, Some(0.1)), RatioEval::Undefined);
        assert_eq!(prevalence_formula(10, Some(-0.1)), RatioEval::Undefined);
        assert_eq!(prevalence_formula(10, None), RatioEval::MissingOperand);
        assert_eq!(prevalence_formula(10, Some(f64::NAN)), RatioEval::MissingOperand);
    }

    #[test]
    fn undefined_rows_reuse_previous_value() {
        let dates: Vec<NaiveDate> = (20..26).map(day).collect();
        let positivity = vec![Some(0.04), Some(-1.0), Some(0.09), None, Some(-0.5), Some(0.01)];
        let out = prevalence_ratios(&dates, &positivity).unwrap();

        assert!(out[0].is_some());
        for i in [1usize, 3, 4] {
            assert_eq!(out[i], out[i - 1], "row {i} should carry the previous ratio");
        }
        assert_ne!(out[2], out[1]);
        assert_ne!(out[5], out[4]);
    }

    #[test]
    fn undefined_first_row_is_an_error() {
        let dates = vec![day(30), day(31)];
        let err = prevalence_ratios(&dates, &[Some(-0.2), Some(0.1)]).unwrap_err();
        assert_eq!(err, AnalysisError::UndefinedInitialRatio { date: day(30) });
    }

    #[test]
    fn leading_missing_rows_stay_missing_until_first_value() {
        let dates: Vec<NaiveDate> = (18..22).map(day).collect();
        let out = prevalence_ratios(&dates, &[None, None, Some(0.04), None]).unwrap();
        assert_eq!(out[0], None);
        assert_eq!(out[1], None);
        assert!(out[2].is_some());
        assert_eq!(out[3], out[2]);
    }

    #[test]
    fn undefined_after_missing_rows_carries_missing() {
        let dates: Vec<NaiveDate> = (18..20).map(day).collect();
        let out = prevalence_ratios(&dates, &[None, Some(-0.3)]).unwrap();
        assert_eq!(out, vec![None, None]);
    }
}
