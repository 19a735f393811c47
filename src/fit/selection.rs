//! Candidate fitting and model selection using BIC with guardrails.
//!
//! Every (rate law, method) candidate is scored on the absorbance trace, so the
//! linearized and integrated fits compete on the same data:
//! - SSE / RMSE of the predicted trace
//! - BIC = n * ln(SSE/n) + k * ln(n) with `k = 4` (A0, A∞, E, ln k_ref)
//!
//! Selection rules:
//! 1. Exclude underdetermined candidates: require `n >= k + 5`
//! 2. Choose the candidate with minimum BIC
//! 3. If a more preferred candidate is within ΔBIC < 2 of the best, pick it
//!    (Eyring before Arrhenius, integrated before linear)

use crate::domain::{
    Baseline, FitConfig, FitMethod, FitQuality, FitResult, KineticParams, LinearStats, MethodSpec, ModelSpec,
    RampPoint, RateLaw, RatePoint,
};
use crate::error::AppError;
use crate::fit::baseline::estimate_baseline;
use crate::fit::integrated::{fit_integrated, IntegratedOptions};
use crate::fit::linear::{fit_linear, LinearOptions};
use crate::fit::rates::rate_points;
use crate::models::{activation, trace_sse};

/// Minimum number of extra observations beyond parameter count.
const MIN_N_BUFFER: usize = 5;
/// Parameters of the absorbance model.
const TRACE_PARAMS: usize = 4;
/// Parameters of the linearized regression.
const LINE_PARAMS: usize = 2;

/// Output of fitting + selection.
#[derive(Debug, Clone)]
pub struct FitSelection {
    pub baseline: Baseline,
    /// Rate points used by the linearized fits.
    pub rates: Vec<RatePoint>,
    pub best: FitResult,
    /// Fits for all attempted candidates (after guardrails).
    pub fits: Vec<FitResult>,
    /// Candidates that were skipped and why (for diagnostics).
    pub skipped: Vec<(String, String)>,
}

fn candidate_label(law: RateLaw, method: FitMethod) -> String {
    format!("{} ({})", law.display_name(), method.display_name())
}

/// Lower is preferred when candidates are statistically indistinguishable.
pub fn preference_rank(law: RateLaw, method: FitMethod) -> usize {
    let law_rank = match law {
        RateLaw::Eyring => 0,
        RateLaw::Arrhenius => 1,
    };
    let method_rank = match method {
        FitMethod::Integrated => 0,
        FitMethod::Linear => 1,
    };
    law_rank * 2 + method_rank
}

/// Fit every enabled candidate and select the best one.
pub fn fit_and_select(points: &[RampPoint], config: &FitConfig) -> Result<FitSelection, AppError> {
    if !(config.alpha_min >= 0.0 && config.alpha_max <= 1.0 && config.alpha_min < config.alpha_max) {
        return Err(AppError::new(
            2,
            format!(
                "Invalid conversion band: {}..{} (need 0 <= min < max <= 1).",
                config.alpha_min, config.alpha_max
            ),
        ));
    }
    if !(config.rate_window_s.is_finite() && config.rate_window_s > 0.0) {
        return Err(AppError::new(2, "Rate window must be a positive number of seconds."));
    }

    let n = points.len();
    let baseline = estimate_baseline(points, config)?;
    let rates = rate_points(points, &baseline, config.rate_window_s, config.alpha_min, config.alpha_max);

    let laws = config.model_spec.rate_laws();
    let methods = config.method_spec.methods();
    let linear_opts = LinearOptions {
        robust: config.robust,
        robust_iters: config.robust_iters,
        robust_k: config.robust_k,
    };
    let integrated_opts = IntegratedOptions {
        seed_energy_min_kj: config.seed_energy_min_kj,
        seed_energy_max_kj: config.seed_energy_max_kj,
        seed_steps: config.seed_steps,
        max_iters: config.max_iters,
    };

    let mut fits = Vec::new();
    let mut skipped = Vec::new();

    for law in laws {
        // The linearized estimate also seeds the integrated fit, so it is
        // attempted whenever there are enough rate points.
        let linear = if rates.len() >= LINE_PARAMS + MIN_N_BUFFER {
            match fit_linear(law, &rates, points, &baseline, &linear_opts) {
                Ok(fit) => Some(fit),
                Err(e) => {
                    if methods.contains(&FitMethod::Linear) {
                        skipped.push((candidate_label(law, FitMethod::Linear), e.message().to_string()));
                    }
                    None
                }
            }
        } else {
            if methods.contains(&FitMethod::Linear) {
                skipped.push((
                    candidate_label(law, FitMethod::Linear),
                    format!(
                        "Underdetermined: {} rate points < k+{MIN_N_BUFFER}={}",
                        rates.len(),
                        LINE_PARAMS + MIN_N_BUFFER
                    ),
                ));
            }
            None
        };

        for &method in &methods {
            match method {
                FitMethod::Linear => {
                    if let Some(lf) = &linear {
                        fits.push(assess(law, FitMethod::Linear, lf.params, Some(lf.stats), points));
                    }
                }
                FitMethod::Integrated => {
                    if n < TRACE_PARAMS + MIN_N_BUFFER {
                        skipped.push((
                            candidate_label(law, method),
                            format!(
                                "Underdetermined: n={n} < k+{MIN_N_BUFFER}={}",
                                TRACE_PARAMS + MIN_N_BUFFER
                            ),
                        ));
                        continue;
                    }
                    let extra: Vec<(f64, f64)> = linear
                        .iter()
                        .map(|lf| (lf.params.energy_j_mol / 1000.0, lf.params.ln_k_ref))
                        .collect();
                    match fit_integrated(law, points, &baseline, &extra, &integrated_opts) {
                        Ok(fit) => fits.push(assess(law, method, fit.params, None, points)),
                        Err(e) if e.exit_code() == 2 => return Err(e),
                        Err(e) => skipped.push((candidate_label(law, method), e.message().to_string())),
                    }
                }
            }
        }
    }

    if fits.is_empty() {
        return Err(AppError::new(
            3,
            "Insufficient data to fit any model after guardrails.",
        ));
    }

    // If the user requested a single candidate, it's already the best.
    let single = matches!(config.model_spec, ModelSpec::Eyring | ModelSpec::Arrhenius)
        && matches!(config.method_spec, MethodSpec::Linear | MethodSpec::Integrated);
    let best = if single { fits[0].clone() } else { select_by_bic(&fits) };

    Ok(FitSelection {
        baseline,
        rates,
        best,
        fits,
        skipped,
    })
}

/// Score a parameter set on the absorbance trace.
pub fn assess(
    law: RateLaw,
    method: FitMethod,
    params: KineticParams,
    linear: Option<LinearStats>,
    points: &[RampPoint],
) -> FitResult {
    let n = points.len();
    let sse = trace_sse(law, &params, points);
    let rmse = (sse / n.max(1) as f64).sqrt();
    FitResult {
        law,
        method,
        params,
        activation: activation(law, &params),
        quality: FitQuality {
            sse,
            rmse,
            bic: bic(n, sse, TRACE_PARAMS),
            n,
        },
        linear,
    }
}

fn bic(n: usize, sse: f64, k: usize) -> f64 {
    let n_f = n as f64;
    let sse_per = (sse / n_f).max(1e-12);
    n_f * sse_per.ln() + (k as f64) * n_f.ln()
}

fn select_by_bic(fits: &[FitResult]) -> FitResult {
    // Find minimum BIC (NaN never wins).
    let mut best = &fits[0];
    for f in &fits[1..] {
        if f.quality.bic < best.quality.bic || best.quality.bic.is_nan() {
            best = f;
        }
    }

    let best_bic = best.quality.bic;

    // Prefer the conventional model if within 2 BIC points.
    let mut ordered: Vec<&FitResult> = fits.iter().collect();
    ordered.sort_by_key(|f| preference_rank(f.law, f.method));
    for f in ordered {
        if f.quality.bic < best_bic + 2.0 {
            return f.clone();
        }
    }

    best.clone()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::fit::testdata::ramp_and_hold;
    use std::path::PathBuf;

    fn candidate(law: RateLaw, method: FitMethod, bic: f64) -> FitResult {
        let params = KineticParams { a0: 0.0, a_inf: 1.0, energy_j_mol: 1.0, ln_k_ref: 0.0, t_ref_k: 300.0 };
        FitResult {
            law,
            method,
            params,
            activation: activation(law, &params),
            quality: FitQuality { sse: 1.0, rmse: 0.0, bic, n: 200 },
            linear: None,
        }
    }

    #[test]
    fn bic_prefers_eyring_integrated_when_close() {
        let fits = vec![
            candidate(RateLaw::Arrhenius, FitMethod::Linear, 10.0),
            candidate(RateLaw::Eyring, FitMethod::Integrated, 11.5),
            candidate(RateLaw::Eyring, FitMethod::Linear, 10.2),
        ];
        let chosen = select_by_bic(&fits);
        assert_eq!((chosen.law, chosen.method), (RateLaw::Eyring, FitMethod::Integrated));
    }

    #[test]
    fn clear_bic_winner_is_kept() {
        let fits = vec![
            candidate(RateLaw::Eyring, FitMethod::Integrated, 20.0),
            candidate(RateLaw::Arrhenius, FitMethod::Integrated, 10.0),
        ];
        let chosen = select_by_bic(&fits);
        assert_eq!(chosen.law, RateLaw::Arrhenius);
    }

    #[test]
    fn bic_floors_perfect_fits() {
        assert_eq!(bic(100, 0.0, 4), bic(100, 1e-20, 4));
        assert!(bic(100, 1.0, 4) > bic(100, 0.5, 4));
    }

    #[test]
    fn fit_and_select_skips_underdetermined() {
        let points: Vec<RampPoint> = (0..5)
            .map(|i| RampPoint {
                index: i,
                time_s: 60.0 * i as f64,
                temperature_k: 330.0 + i as f64,
                absorbance: 0.2 + 0.1 * i as f64,
                weight: 1.0,
            })
            .collect();
        let config = FitConfig::for_path(PathBuf::from("tiny.csv"));
        let err = fit_and_select(&points, &config).unwrap_err();
        assert_eq!(err.exit_code(), 3);
    }

    #[test]
    fn auto_selects_eyring_integrated_on_eyring_data() {
        let (points, truth) = ramp_and_hold(0.002);
        let config = FitConfig::for_path(PathBuf::from("synthetic.csv"));
        let sel = fit_and_select(&points, &config).unwrap();

        assert_eq!(sel.fits.len(), 4);
        assert!(sel.skipped.is_empty());
        assert!(!sel.rates.is_empty());
        assert_eq!((sel.best.law, sel.best.method), (RateLaw::Eyring, FitMethod::Integrated));
        let rel = (sel.best.params.energy_j_mol - truth.energy_j_mol).abs() / truth.energy_j_mol;
        assert!(rel < 0.05);

        let linear = sel
            .fits
            .iter()
            .find(|f| f.law == RateLaw::Eyring && f.method == FitMethod::Linear)
            .unwrap();
        let rel = (linear.params.energy_j_mol - truth.energy_j_mol).abs() / truth.energy_j_mol;
        assert!(rel < 0.10, "linear ΔH = {}", linear.params.energy_j_mol);
        assert!(linear.linear.is_some());
    }

    #[test]
    fn explicit_single_candidate_is_returned() {
        let (points, _) = ramp_and_hold(0.0);
        let mut config = FitConfig::for_path(PathBuf::from("synthetic.csv"));
        config.model_spec = ModelSpec::Arrhenius;
        config.method_spec = MethodSpec::Linear;
        let sel = fit_and_select(&points, &config).unwrap();
        assert_eq!(sel.fits.len(), 1);
        assert_eq!((sel.best.law, sel.best.method), (RateLaw::Arrhenius, FitMethod::Linear));
    }

    #[test]
    fn invalid_conversion_band_is_a_usage_error() {
        let (points, _) = ramp_and_hold(0.0);
        let mut config = FitConfig::for_path(PathBuf::from("synthetic.csv"));
        config.alpha_min = 0.9;
        config.alpha_max = 0.1;
        assert_eq!(fit_and_select(&points, &config).unwrap_err().exit_code(), 2);
    }
}
