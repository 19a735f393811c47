//! Synthetic temperature-ramp datasets with known activation parameters.

use rand::SeedableRng;
use rand::rngs::StdRng;
use rand_distr::{Distribution, Normal};

use crate::domain::{celsius_to_kelvin, KineticParams, RampPoint, RateLaw};
use crate::error::AppError;
use crate::io::TraceSample;
use crate::models::{eyring_from_activation, predict_trace};

/// Largest dataset `generate_dataset` will build.
pub const MAX_SYNTHETIC_SAMPLES: usize = 10_000_000;

/// Experiment design and ground truth for a synthetic run.
#[derive(Debug, Clone)]
pub struct SyntheticSpec {
    pub start_c: f64,
    pub end_c: f64,
    /// Ramp rate (°C/min, > 0).
    pub ramp_c_per_min: f64,
    /// Isothermal hold at `end_c` after the ramp (min).
    pub hold_min: f64,
    pub interval_s: f64,
    pub dh_kj_mol: f64,
    pub ds_j_mol_k: f64,
    pub a0: f64,
    pub a_inf: f64,
    pub noise_sd: f64,
    pub seed: u64,
}

impl Default for SyntheticSpec {
    fn default() -> Self {
        Self {
            start_c: 40.0,
            end_c: 100.0,
            ramp_c_per_min: 1.0,
            hold_min: 60.0,
            interval_s: 30.0,
            dh_kj_mol: 100.0,
            ds_j_mol_k: -30.0,
            a0: 0.2,
            a_inf: 1.0,
            noise_sd: 0.002,
            seed: 42,
        }
    }
}

impl SyntheticSpec {
    /// The generating parameters in reference form (`T_ref` = start temperature).
    pub fn truth(&self) -> KineticParams {
        let t_ref_k = celsius_to_kelvin(self.start_c);
        let (energy_j_mol, ln_k_ref) = eyring_from_activation(self.dh_kj_mol * 1000.0, self.ds_j_mol_k, t_ref_k);
        KineticParams { a0: self.a0, a_inf: self.a_inf, energy_j_mol, ln_k_ref, t_ref_k }
    }
}

/// Generate a noisy Eyring trace for `spec`.
pub fn generate_dataset(spec: &SyntheticSpec) -> Result<Vec<TraceSample>, AppError> {
    if !(spec.start_c.is_finite() && spec.end_c.is_finite() && spec.end_c > spec.start_c) {
        return Err(AppError::new(2, "End temperature must exceed start temperature."));
    }
    let design = [spec.ramp_c_per_min, spec.interval_s, spec.hold_min];
    if design.iter().any(|v| !v.is_finite())
        || !(spec.ramp_c_per_min > 0.0 && spec.interval_s > 0.0 && spec.hold_min >= 0.0)
    {
        return Err(AppError::new(2, "Ramp rate and interval must be finite and > 0, hold finite and >= 0."));
    }
    if !(spec.noise_sd.is_finite() && spec.noise_sd >= 0.0) {
        return Err(AppError::new(2, "Noise must be finite and >= 0."));
    }

    let ramp_s = (spec.end_c - spec.start_c) / spec.ramp_c_per_min * 60.0;
    let total_s = ramp_s + spec.hold_min * 60.0;
    let steps = (total_s / spec.interval_s).floor();
    if !steps.is_finite() || steps >= MAX_SYNTHETIC_SAMPLES as f64 {
        return Err(AppError::new(
            2,
            format!("Design asks for more than {MAX_SYNTHETIC_SAMPLES} samples; raise the interval or ramp rate."),
        ));
    }
    let n = steps as usize + 1;

    let points: Vec<RampPoint> = (0..n)
        .map(|i| {
            let time_s = i as f64 * spec.interval_s;
            let t_c = (spec.start_c + spec.ramp_c_per_min * time_s / 60.0).min(spec.end_c);
            RampPoint { index: i, time_s, temperature_k: celsius_to_kelvin(t_c), absorbance: 0.0, weight: 1.0 }
        })
        .collect();

    let clean = predict_trace(RateLaw::Eyring, &spec.truth(), &points);

    let mut rng = StdRng::seed_from_u64(spec.seed);
    let normal = Normal::new(0.0, spec.noise_sd)
        .map_err(|e| AppError::new(4, format!("Noise distribution error: {e}")))?;

    Ok(points
        .iter()
        .zip(clean)
        .map(|(p, a)| TraceSample {
            time_s: p.time_s,
            temperature_c: p.temperature_c(),
            absorbance: a + normal.sample(&mut rng),
        })
        .collect())
}
