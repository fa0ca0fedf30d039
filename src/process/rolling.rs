//! Trailing-window smoothing over columns with missing values.

/// Trailing simple moving average.
///
/// Position `i` holds the mean of `values[i + 1 - window ..= i]`. The value is
/// missing when fewer than `window` samples precede it (inclusive) or when any
/// sample inside the window is missing.
pub fn rolling_mean(values: &[Option<f64>], window: usize) -> Vec<Option<f64>> {
    if window == 0 {
        return vec![None; values.len()];
    }

    (0..values.len())
        .map(|i| {
            if i + 1 < window {
                return None;
            }
            let slice = &values[i + 1 - window..=i];
            let mut sum = 0.0;
            for v in slice {
                sum += (*v)?;
            }
            Some(sum / window as f64)
        })
        .collect()
}

/// `num / den`, missing when either side is missing or the result is not finite.
pub fn checked_ratio(num: Option<f64>, den: Option<f64>) -> Option<f64> {
    let (num, den) = (num?, den?);
    if den == 0.0 {
        return None;
    }
    let r = num / den;
    r.is_finite().then_some(r)
}
