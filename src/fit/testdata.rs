//! Synthetic traces shared by the fitting tests.

use crate::domain::{celsius_to_kelvin, KineticParams, RampPoint, RateLaw};
use crate::models::{eyring_from_activation, predict_trace, reference_temperature};

/// ΔH‡ = 100 kJ/mol, ΔS‡ = -30 J/(mol·K), A0 = 0.2, A∞ = 1.0.
pub fn eyring_truth(t_ref_k: f64) -> KineticParams {
    let (energy_j_mol, ln_k_ref) = eyring_from_activation(100_000.0, -30.0, t_ref_k);
    KineticParams { a0: 0.2, a_inf: 1.0, energy_j_mol, ln_k_ref, t_ref_k }
}

/// 40 → 100 °C at 1 °C/min, then one hour at 100 °C, sampled every 30 s.
///
/// `noise` adds a deterministic alternating offset of that amplitude.
pub fn ramp_and_hold(noise: f64) -> (Vec<RampPoint>, KineticParams) {
    let mut points: Vec<RampPoint> = (0..=240)
        .map(|i| {
            let time_s = 30.0 * i as f64;
            let t_c = (40.0 + time_s / 60.0).min(100.0);
            RampPoint {
                index: i,
                time_s,
                temperature_k: celsius_to_kelvin(t_c),
                absorbance: 0.0,
                weight: 1.0,
            }
        })
        .collect();

    let truth = eyring_truth(reference_temperature(&points));
    let trace = predict_trace(RateLaw::Eyring, &truth, &points);
    for (i, (p, a)) in points.iter_mut().zip(trace).enumerate() {
        let sign = if i % 2 == 0 { 1.0 } else { -1.0 };
        p.absorbance = a + sign * noise;
    }
    (points, truth)
}
