//! Start/end absorbance estimation.
//!
//! A0 and A∞ anchor the conversion scale used by the rate-point extraction and
//! seed the integrated fit. Medians of a few edge points keep a single noisy
//! reading from shifting the whole conversion axis.

use crate::domain::{Baseline, FitConfig, RampPoint};
use crate::error::AppError;
use crate::math::median;

/// Smallest usable absorbance change between start and end.
const MIN_AMPLITUDE: f64 = 1e-9;

/// Number of edge points used when `--baseline-points` is not given.
pub fn default_edge_points(n: usize) -> usize {
    (n / 20).max(3)
}

/// Estimate A0 / A∞ from the edges of the trace (or take the overrides).
pub fn estimate_baseline(points: &[RampPoint], config: &FitConfig) -> Result<Baseline, AppError> {
    if points.is_empty() {
        return Err(AppError::new(3, "No data points to fit."));
    }
    let m = config
        .baseline_points
        .unwrap_or_else(|| default_edge_points(points.len()))
        .clamp(1, points.len());

    let a0 = match config.a0 {
        Some(v) => v,
        None => median(points[..m].iter().map(|p| p.absorbance))
            .ok_or_else(|| AppError::new(3, "Could not estimate A0 from the first points."))?,
    };
    let a_inf = match config.a_inf {
        Some(v) => v,
        None => median(points[points.len() - m..].iter().map(|p| p.absorbance))
            .ok_or_else(|| AppError::new(3, "Could not estimate A∞ from the last points."))?,
    };

    if !(a0.is_finite() && a_inf.is_finite()) || (a_inf - a0).abs() < MIN_AMPLITUDE {
        return Err(AppError::new(
            3,
            format!("Absorbance does not change over the run (A0={a0:.6}, A∞={a_inf:.6}); nothing to fit."),
        ));
    }

    Ok(Baseline { a0, a_inf })
}
