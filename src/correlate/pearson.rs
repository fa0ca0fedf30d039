//! Pearson correlation over pairwise-complete observations.

/// Pearson's r over the positions where both `x[i]` and `y[i]` are finite.
///
/// Returns `None` when fewer than `min_periods` (and at least 2) complete pairs
/// exist, or when either side is constant over those pairs.
pub fn pearson_pairwise(x: &[f64], y: &[f64], min_periods: usize) -> Option<f64> {
    let pairs: Vec<(f64, f64)> = x
        .iter()
        .zip(y)
        .filter(|(a, b)| a.is_finite() && b.is_finite())
        .map(|(&a, &b)| (a, b))
        .collect();

    let n = pairs.len();
    if n < min_periods.max(2) {
        return None;
    }

    let nf = n as f64;
    let mean_x = pairs.iter().map(|p| p.0).sum::<f64>() / nf;
    let mean_y = pairs.iter().map(|p| p.1).sum::<f64>() / nf;

    let mut sum_xy = 0.0;
    let mut sum_xx = 0.0;
    let mut sum_yy = 0.0;
    for &(a, b) in &pairs {
        let dx = a - mean_x;
        let dy = b - mean_y;
        sum_xy += dx * dy;
        sum_xx += dx * dx;
        sum_yy += dy * dy;
    }

    if sum_xx <= 0.0 || sum_yy <= 0.0 {
        return None;
    }

    // sqrt of the product keeps identical columns at exactly 1.0.
    let r = sum_xy / (sum_xx * sum_yy).sqrt();
    r.is_finite().then(|| r.clamp(-1.0, 1.0))
}

/// Number of positions where both sides are finite.
pub fn complete_pairs(x: &[f64], y: &[f64]) -> usize {
    x.iter()
        .zip(y)
        .filter(|(a, b)| a.is_finite() && b.is_finite())
        .count()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn perfect_linear_relationships() {
        let x: Vec<f64> = (0..10).map(|v| v as f64).collect();
        let up: Vec<f64> = x.iter().map(|v| 3.0 * v + 1.0).collect();
        let down: Vec<f64> = x.iter().map(|v| -2.0 * v).collect();
        assert!((pearson_pairwise(&x, &up, 2).unwrap() - 1.0).abs() < 1e-12);
        assert!((pearson_pairwise(&x, &down, 2).unwrap() + 1.0).abs() < 1e-12);
    }

    #[test]
    fn missing_values_are_excluded_pairwise() {
        let x = [1.0, 2.0, f64::NAN, 4.0, 5.0];
        let y = [2.0, 4.0, 100.0, 8.0, f64::NAN];
        assert_eq!(complete_pairs(&x, &y), 3);
        assert!((pearson_pairwise(&x, &y, 3).unwrap() - 1.0).abs() < 1e-12);
        assert_eq!(pearson_pairwise(&x, &y, 4), None);
    }

    #[test]
    fn constant_series_is_undefined() {
        let x = [1.0, 2.0, 3.0, 4.0];
        let y = [5.0; 4];
        assert_eq!(pearson_pairwise(&x, &y, 2), None);
    }
}
