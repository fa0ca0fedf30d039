//! Least squares solver.
//!
//! Trend fits regress a daily value on the day index:
//!
//! ```text
//! minimize Σ (y_i - x_i^T β)^2
//! ```
//!
//! Implementation choices:
//! - SVD handles tall design matrices (many days, two columns) without
//!   forming the normal equations.
//! - Cumulative counts reach the hundreds of millions, so a failed strict
//!   solve is retried with looser tolerances before giving up.

use nalgebra::{DMatrix, DVector};

/// Solve a least squares problem using SVD.
///
/// Returns `None` if the system is too ill-conditioned to solve robustly.
pub fn solve_least_squares(x: &DMatrix<f64>, y: &DVector<f64>) -> Option<DVector<f64>> {
    let svd = x.clone().svd(true, true);

    for &tol in &[1e-10, 1e-8, 1e-6] {
        if let Ok(beta) = svd.solve(y, tol) {
            if beta.iter().all(|v| v.is_finite()) {
                return Some(beta);
            }
        }
    }

    None
}

/// Design matrix `[1, x_i]` for a straight-line fit.
pub fn line_design(xs: &[f64]) -> DMatrix<f64> {
    DMatrix::from_fn(xs.len(), 2, |r, c| if c == 0 { 1.0 } else { xs[r] })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn least_squares_solves_simple_system() {
        // Fit y = 2 + 3x on x = [0,1,2]
        let x = line_design(&[0.0, 1.0, 2.0]);
        let y = DVector::from_row_slice(&[2.0, 5.0, 8.0]);

        let beta = solve_least_squares(&x, &y).unwrap();
        assert!((beta[0] - 2.0).abs() < 1e-10);
        assert!((beta[1] - 3.0).abs() < 1e-10);
    }

    #[test]
    fn overdetermined_noisy_line() {
        let xs: Vec<f64> = (0..50).map(|v| v as f64).collect();
        let ys: Vec<f64> = xs
            .iter()
            .enumerate()
            .map(|(i, x)| 10.0 - 0.5 * x + if i % 2 == 0 { 0.1 } else { -0.1 })
            .collect();
        let beta = solve_least_squares(&line_design(&xs), &DVector::from_vec(ys)).unwrap();
        assert!((beta[0] - 10.0).abs() < 0.05);
        assert!((beta[1] + 0.5).abs() < 1e-3);
    }
}
