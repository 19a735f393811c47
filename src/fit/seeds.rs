//! Starting points for the integrated fit.
//!
//! The integrated objective has one awkward direction: for a fixed activation
//! energy, `ln k_ref` must put the reaction somewhere inside the observed run or
//! the trace is flat and the simplex has nothing to follow. Each seed therefore
//! fixes the energy from a log-spaced grid and solves for the `ln k_ref` that
//! brings the extent to [`TARGET_EXTENT`] at the last observation.

use crate::domain::{Baseline, RampPoint, RateLaw};
use crate::error::AppError;
use crate::models::extent;

/// Extent `Φ` reached at the end of the trace by a seed (≈95% conversion).
pub const TARGET_EXTENT: f64 = 3.0;

/// Generate `steps` log-spaced points between `min` and `max` (inclusive).
pub fn log_space(min: f64, max: f64, steps: usize) -> Result<Vec<f64>, AppError> {
    if !(min.is_finite() && max.is_finite() && min > 0.0 && max > 0.0 && max > min) {
        return Err(AppError::new(
            2,
            format!("Invalid seed energy range: min={min}, max={max} (must be finite, >0, and max>min)."),
        ));
    }
    if steps < 2 {
        return Err(AppError::new(2, "Seed steps must be >= 2."));
    }

    let ln_min = min.ln();
    let ln_max = max.ln();
    let step = (ln_max - ln_min) / (steps as f64 - 1.0);

    let mut out = Vec::with_capacity(steps);
    for i in 0..steps {
        out.push((ln_min + step * i as f64).exp());
    }
    Ok(out)
}

/// `ln k_ref` such that the extent at the last point equals [`TARGET_EXTENT`].
pub fn ln_k_ref_for_extent(law: RateLaw, energy_j_mol: f64, t_ref_k: f64, points: &[RampPoint]) -> Option<f64> {
    let phi_end = *extent(law, energy_j_mol, 0.0, t_ref_k, points).last()?;
    if !(phi_end.is_finite() && phi_end > 0.0) {
        return None;
    }
    let ln_k_ref = TARGET_EXTENT.ln() - phi_end.ln();
    ln_k_ref.is_finite().then_some(ln_k_ref)
}

/// Simplex start vectors `[A0, A∞, E (kJ/mol), ln k_ref]`.
///
/// `extra` seeds (e.g. from the linearized fit) come first so they win ties.
pub fn integrated_seeds(
    law: RateLaw,
    points: &[RampPoint],
    baseline: &Baseline,
    t_ref_k: f64,
    energies_kj: &[f64],
    extra: &[(f64, f64)],
) -> Vec<[f64; 4]> {
    let mut out: Vec<[f64; 4]> = extra
        .iter()
        .filter(|(e_kj, ln_k)| e_kj.is_finite() && *e_kj > 0.0 && ln_k.is_finite())
        .map(|&(e_kj, ln_k)| [baseline.a0, baseline.a_inf, e_kj, ln_k])
        .collect();

    for &e_kj in energies_kj {
        if let Some(ln_k) = ln_k_ref_for_extent(law, e_kj * 1000.0, t_ref_k, points) {
            out.push([baseline.a0, baseline.a_inf, e_kj, ln_k]);
        }
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn log_space_has_expected_endpoints() {
        let v = log_space(40.0, 250.0, 12).unwrap();
        assert_eq!(v.len(), 12);
        assert!((v[0] - 40.0).abs() < 1e-9);
        assert!((v[11] - 250.0).abs() < 1e-9);
        assert!(v.windows(2).all(|w| w[1] > w[0]));
    }

    #[test]
    fn log_space_rejects_bad_ranges() {
        assert_eq!(log_space(0.0, 10.0, 5).unwrap_err().exit_code(), 2);
        assert!(log_space(10.0, 5.0, 5).is_err());
        assert!(log_space(1.0, 5.0, 1).is_err());
    }

    #[test]
    fn seeds_reach_the_target_extent() {
        let points: Vec<RampPoint> = (0..61)
            .map(|i| RampPoint {
                index: i,
                time_s: 60.0 * i as f64,
                temperature_k: 313.15 + i as f64,
                absorbance: 0.0,
                weight: 1.0,
            })
            .collect();
        let baseline = Baseline { a0: 0.1, a_inf: 0.9 };
        let seeds = integrated_seeds(RateLaw::Eyring, &points, &baseline, 343.15, &[60.0, 120.0], &[(95.0, -7.0)]);
        assert_eq!(seeds.len(), 3);
        assert_eq!(seeds[0], [0.1, 0.9, 95.0, -7.0]);
        for s in &seeds[1..] {
            let phi = extent(RateLaw::Eyring, s[2] * 1000.0, s[3], 343.15, &points);
            assert!((phi[60] - TARGET_EXTENT).abs() < 1e-9);
        }
    }
}
