//! Weighted least squares solvers.
//!
//! Two flavours are used in this project:
//!
//! ```text
//! minimize Σ w_i (y_i - x_i^T β)^2
//! ```
//!
//! - the general solver scales rows by `sqrt(w_i)` and solves an ordinary least
//!   squares problem via SVD (robust for tall, nearly collinear designs)
//! - the straight-line solver additionally returns standard errors and R² for
//!   the Eyring/Arrhenius plot, where the uncertainty of ΔH‡ and ΔS‡ matters
//!
//! The abscissa of an Eyring plot is `1/T ≈ 3e-3`, so the intercept column and
//! the slope column differ by almost three decades. The straight-line solver
//! centres `x` before solving to keep the normal equations well conditioned.

use nalgebra::{DMatrix, DVector};

/// Solve a least squares problem using SVD.
///
/// Returns `None` if the system is too ill-conditioned to solve robustly.
pub fn solve_least_squares(x: &DMatrix<f64>, y: &DVector<f64>) -> Option<DVector<f64>> {
    let svd = x.clone().svd(true, true);

    // Try progressively looser tolerances if strict solve fails.
    for &tol in &[1e-10, 1e-8, 1e-6] {
        if let Ok(beta) = svd.solve(y, tol) {
            if beta.iter().all(|v| v.is_finite()) {
                return Some(beta);
            }
        }
    }

    None
}

/// Straight-line weighted fit `y = intercept + slope * x`.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct LineFit {
    pub intercept: f64,
    pub slope: f64,
    pub se_intercept: f64,
    pub se_slope: f64,
    pub r_squared: f64,
    /// Weighted sum of squared residuals.
    pub sse: f64,
    pub n: usize,
}

impl LineFit {
    pub fn predict(&self, x: f64) -> f64 {
        self.intercept + self.slope * x
    }
}

/// Fit a weighted straight line and its parameter standard errors.
///
/// Standard errors use `σ² = SSE / (n - 2)` and the covariance `σ² (XᵀWX)⁻¹`.
/// With exactly two points the errors are reported as `0`.
///
/// Returns `None` when fewer than two usable points remain, when all `x` are
/// equal, or when any input is non-finite.
pub fn weighted_linear_fit(x: &[f64], y: &[f64], w: &[f64]) -> Option<LineFit> {
    let n = x.len();
    if n < 2 || y.len() != n || w.len() != n {
        return None;
    }
    if x.iter().chain(y).any(|v| !v.is_finite()) || w.iter().any(|v| !v.is_finite() || *v <= 0.0) {
        return None;
    }

    let sw: f64 = w.iter().sum();
    let x_bar = x.iter().zip(w).map(|(xi, wi)| xi * wi).sum::<f64>() / sw;

    // Spread at rounding level means every x is the same value.
    let (x_min, x_max) = x
        .iter()
        .fold((f64::INFINITY, f64::NEG_INFINITY), |(lo, hi), &v| (lo.min(v), hi.max(v)));
    if x_max - x_min <= 1e-12 * x_bar.abs().max(f64::MIN_POSITIVE) {
        return None;
    }

    let mut xw = DMatrix::<f64>::zeros(n, 2);
    let mut yw = DVector::<f64>::zeros(n);
    for i in 0..n {
        let sq = w[i].sqrt();
        xw[(i, 0)] = sq;
        xw[(i, 1)] = (x[i] - x_bar) * sq;
        yw[i] = y[i] * sq;
    }

    let beta = solve_least_squares(&xw, &yw)?;
    let (b0c, slope) = (beta[0], beta[1]);

    let sxx: f64 = x.iter().zip(w).map(|(xi, wi)| wi * (xi - x_bar).powi(2)).sum();
    if sxx <= 0.0 || !sxx.is_finite() {
        return None;
    }

    let y_bar = y.iter().zip(w).map(|(yi, wi)| yi * wi).sum::<f64>() / sw;
    let mut sse = 0.0;
    let mut sst = 0.0;
    for i in 0..n {
        let r = y[i] - (b0c + slope * (x[i] - x_bar));
        sse += w[i] * r * r;
        sst += w[i] * (y[i] - y_bar).powi(2);
    }

    // Centred covariance is diagonal: var(b0c) = σ²/Σw, var(slope) = σ²/Sxx.
    let sigma2 = if n > 2 { sse / (n as f64 - 2.0) } else { 0.0 };
    let var_b0c = sigma2 / sw;
    let var_slope = sigma2 / sxx;

    // Back to the uncentred intercept: b0 = b0c - slope * x̄.
    let intercept = b0c - slope * x_bar;
    let var_intercept = var_b0c + x_bar * x_bar * var_slope;

    let r_squared = if sst > 0.0 { 1.0 - sse / sst } else { 1.0 };

    Some(LineFit {
        intercept,
        slope,
        se_intercept: var_intercept.sqrt(),
        se_slope: var_slope.sqrt(),
        r_squared,
        sse,
        n,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    #[test]
    fn least_squares_solves_simple_system() {
        // Fit y = 2 + 3x on x = [0,1,2]
        let x = DMatrix::from_row_slice(3, 2, &[1.0, 0.0, 1.0, 1.0, 1.0, 2.0]);
        let y = DVector::from_row_slice(&[2.0, 5.0, 8.0]);

        let beta = solve_least_squares(&x, &y).unwrap();
        assert!((beta[0] - 2.0).abs() < 1e-10);
        assert!((beta[1] - 3.0).abs() < 1e-10);
    }

    #[test]
    fn line_fit_recovers_eyring_scale_line() {
        // Typical Eyring-plot magnitudes: x = 1/T, slope = -ΔH/R.
        let x: Vec<f64> = (0..12).map(|i| 1.0 / (310.0 + 5.0 * i as f64)).collect();
        let y: Vec<f64> = x.iter().map(|xi| 20.0 - 12_000.0 * xi).collect();
        let w = vec![1.0; x.len()];

        let fit = weighted_linear_fit(&x, &y, &w).unwrap();
        assert_relative_eq!(fit.slope, -12_000.0, max_relative = 1e-8);
        assert_relative_eq!(fit.intercept, 20.0, max_relative = 1e-8);
        assert_relative_eq!(fit.r_squared, 1.0, epsilon = 1e-12);
        assert!(fit.se_slope < 1e-6);
    }

    #[test]
    fn line_fit_standard_errors_match_textbook_values() {
        // x = 0..4, y = [1, 3, 2, 5, 4]: slope 0.8, intercept 1.4, SSE 3.6.
        let x = [0.0, 1.0, 2.0, 3.0, 4.0];
        let y = [1.0, 3.0, 2.0, 5.0, 4.0];
        let w = [1.0; 5];
        let fit = weighted_linear_fit(&x, &y, &w).unwrap();

        assert_relative_eq!(fit.slope, 0.8, epsilon = 1e-12);
        assert_relative_eq!(fit.intercept, 1.4, epsilon = 1e-12);
        assert_relative_eq!(fit.sse, 3.6, epsilon = 1e-12);
        // σ² = 1.2, Sxx = 10 → se(slope) = sqrt(0.12)
        assert_relative_eq!(fit.se_slope, 0.12_f64.sqrt(), epsilon = 1e-12);
        // se(intercept) = sqrt(σ² (1/n + x̄²/Sxx)) = sqrt(1.2 * 0.6)
        assert_relative_eq!(fit.se_intercept, 0.72_f64.sqrt(), epsilon = 1e-12);
    }

    #[test]
    fn line_fit_rejects_degenerate_inputs() {
        assert!(weighted_linear_fit(&[1.0], &[1.0], &[1.0]).is_none());
        assert!(weighted_linear_fit(&[2.0, 2.0, 2.0], &[1.0, 2.0, 3.0], &[1.0; 3]).is_none());
        assert!(weighted_linear_fit(&[1.0, 2.0], &[f64::NAN, 2.0], &[1.0; 2]).is_none());
    }

    #[test]
    fn line_fit_rejects_constant_inverse_temperature() {
        // 1/T at a hold plateau: centring leaves only rounding noise.
        let x = vec![1.0 / 373.15; 10];
        let y: Vec<f64> = (0..10).map(|i| -8.0 + 0.01 * i as f64).collect();
        let w: Vec<f64> = (0..10).map(|i| 0.5 + 0.1 * i as f64).collect();
        assert!(weighted_linear_fit(&x, &y, &w).is_none());
    }
}
