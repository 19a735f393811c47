//! Integrated first-order absorbance under a measured temperature trace.
//!
//! For a first-order reaction whose rate constant follows the temperature trace:
//!
//! ```text
//! Φ(t) = ∫₀ᵗ k(T(s)) ds
//! A(t) = A∞ + (A0 - A∞) · exp(-Φ(t))
//! ```
//!
//! `Φ` is integrated with the trapezoid rule over the observation times, so the
//! model is evaluated at exactly the points it is compared against.

use crate::domain::{KineticParams, RampPoint, RateLaw};
use crate::math::cumulative_trapezoid;
use crate::models::rate_law::ln_rate_constant;

/// Extent `Φ` at each observation time.
pub fn extent(law: RateLaw, energy_j_mol: f64, ln_k_ref: f64, t_ref_k: f64, points: &[RampPoint]) -> Vec<f64> {
    let times: Vec<f64> = points.iter().map(|p| p.time_s).collect();
    let rates: Vec<f64> = points
        .iter()
        .map(|p| ln_rate_constant(law, energy_j_mol, ln_k_ref, t_ref_k, p.temperature_k).exp())
        .collect();
    cumulative_trapezoid(&times, &rates)
}

/// Predicted absorbance at every observation point.
pub fn predict_trace(law: RateLaw, params: &KineticParams, points: &[RampPoint]) -> Vec<f64> {
    extent(law, params.energy_j_mol, params.ln_k_ref, params.t_ref_k, points)
        .into_iter()
        .map(|phi| params.a_inf + (params.a0 - params.a_inf) * (-phi).exp())
        .collect()
}

/// Weighted sum of squared absorbance residuals.
pub fn trace_sse(law: RateLaw, params: &KineticParams, points: &[RampPoint]) -> f64 {
    predict_trace(law, params, points)
        .iter()
        .zip(points)
        .map(|(fit, p)| {
            let r = p.absorbance - fit;
            p.weight * r * r
        })
        .sum()
}

/// Weighted mean temperature (K), used as the reference temperature of a fit.
pub fn reference_temperature(points: &[RampPoint]) -> f64 {
    let sw: f64 = points.iter().map(|p| p.weight).sum();
    if sw <= 0.0 {
        return f64::NAN;
    }
    points.iter().map(|p| p.weight * p.temperature_k).sum::<f64>() / sw
}
