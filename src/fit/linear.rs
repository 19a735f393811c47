//! Linearized (Eyring / Arrhenius plot) calibration.
//!
//! Each rate point contributes one observation:
//!
//! ```text
//! x = 1/T
//! y = ln(k/T)   (Eyring)
//! y = ln k      (Arrhenius)
//! ```
//!
//! and a straight line `y = intercept + slope · x` is fitted by weighted least
//! squares. Robust mode repeats the fit with Huber weights derived from the
//! line residuals, the same outer loop the absorbance fitter uses.

use crate::domain::{Baseline, KineticParams, LinearStats, RampPoint, RateLaw, RatePoint, RobustKind};
use crate::error::AppError;
use crate::math::{huber_reweight, weighted_linear_fit, LineFit};
use crate::models::{from_linear, reference_temperature};

/// Options for the linearized regression.
#[derive(Debug, Clone, Copy)]
pub struct LinearOptions {
    pub robust: RobustKind,
    pub robust_iters: usize,
    pub robust_k: f64,
}

/// A calibrated line plus the equivalent reference-form parameters.
#[derive(Debug, Clone)]
pub struct LinearFit {
    pub law: RateLaw,
    pub params: KineticParams,
    pub stats: LinearStats,
    /// Final regression weights of the rate points (after reweighting).
    pub weights: Vec<f64>,
}

/// Ordinate of a rate point on the linearized plot.
pub fn linear_ordinate(law: RateLaw, rate: &RatePoint) -> f64 {
    match law {
        RateLaw::Eyring => (rate.rate_k / rate.temperature_k).ln(),
        RateLaw::Arrhenius => rate.rate_k.ln(),
    }
}

/// Fit the linearized plot for one rate law.
///
/// `points` supply the reference temperature so linear and integrated fits of
/// the same dataset share `T_ref`.
pub fn fit_linear(
    law: RateLaw,
    rates: &[RatePoint],
    points: &[RampPoint],
    baseline: &Baseline,
    opts: &LinearOptions,
) -> Result<LinearFit, AppError> {
    if rates.len() < 2 {
        return Err(AppError::new(3, "Not enough rate points for a linearized fit."));
    }

    let x: Vec<f64> = rates.iter().map(|r| 1.0 / r.temperature_k).collect();
    let y: Vec<f64> = rates.iter().map(|r| linear_ordinate(law, r)).collect();
    let w_base = vec![1.0; rates.len()];

    let n_refits = match opts.robust {
        RobustKind::None => 1,
        RobustKind::Huber => opts.robust_iters.saturating_add(1).max(1),
    };

    let mut w_work = w_base.clone();
    let mut best: Option<LineFit> = None;
    for _ in 0..n_refits {
        let line = weighted_linear_fit(&x, &y, &w_work).ok_or_else(|| {
            AppError::new(
                4,
                format!(
                    "{} plot regression failed (rate points span no temperature range?).",
                    law.display_name()
                ),
            )
        })?;
        best = Some(line);

        if opts.robust == RobustKind::None {
            break;
        }
        let residuals: Vec<f64> = x.iter().zip(&y).map(|(&xi, &yi)| yi - line.predict(xi)).collect();
        w_work = huber_reweight(&w_base, &residuals, opts.robust_k);
    }

    let Some(line) = best else {
        return Err(AppError::new(4, "Linearized fit produced no result."));
    };

    let t_ref_k = reference_temperature(points);
    if !t_ref_k.is_finite() {
        return Err(AppError::new(3, "No weighted points to define a reference temperature."));
    }
    let (energy_j_mol, ln_k_ref) = from_linear(law, line.slope, line.intercept, t_ref_k);

    Ok(LinearFit {
        law,
        params: KineticParams {
            a0: baseline.a0,
            a_inf: baseline.a_inf,
            energy_j_mol,
            ln_k_ref,
            t_ref_k,
        },
        stats: LinearStats {
            slope: line.slope,
            intercept: line.intercept,
            se_slope: line.se_slope,
            se_intercept: line.se_intercept,
            r_squared: line.r_squared,
            n_rate_points: line.n,
        },
        weights: w_work,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{eyring_from_activation, rate_constant, GAS_CONSTANT};
    use approx::assert_relative_eq;

    fn rates_for(law: RateLaw, params: &KineticParams) -> Vec<RatePoint> {
        (0..30)
            .map(|i| {
                let t = 320.0 + 1.5 * i as f64;
                RatePoint {
                    time_s: 60.0 * i as f64,
                    temperature_k: t,
                    conversion: 0.5,
                    rate_k: rate_constant(law, params, t),
                }
            })
            .collect()
    }

    fn ramp_points(t_ref: f64) -> Vec<RampPoint> {
        vec![RampPoint {
            index: 0,
            time_s: 0.0,
            temperature_k: t_ref,
            absorbance: 0.0,
            weight: 1.0,
        }]
    }

    fn plain() -> LinearOptions {
        LinearOptions { robust: RobustKind::None, robust_iters: 0, robust_k: 1.5 }
    }

    #[test]
    fn eyring_line_recovers_enthalpy() {
        let (e, ln_k_ref) = eyring_from_activation(100_000.0, -30.0, 340.0);
        let truth = KineticParams { a0: 0.0, a_inf: 1.0, energy_j_mol: e, ln_k_ref, t_ref_k: 340.0 };
        let rates = rates_for(RateLaw::Eyring, &truth);
        let baseline = Baseline { a0: 0.0, a_inf: 1.0 };

        let fit = fit_linear(RateLaw::Eyring, &rates, &ramp_points(340.0), &baseline, &plain()).unwrap();
        assert_relative_eq!(fit.params.energy_j_mol, 100_000.0, max_relative = 1e-8);
        assert_relative_eq!(fit.params.ln_k_ref, ln_k_ref, epsilon = 1e-8);
        assert_relative_eq!(fit.stats.slope, -100_000.0 / GAS_CONSTANT, max_relative = 1e-8);
        assert_eq!(fit.stats.n_rate_points, 30);
    }

    #[test]
    fn huber_limits_the_pull_of_a_wild_rate_point() {
        let truth = KineticParams { a0: 0.0, a_inf: 1.0, energy_j_mol: 90_000.0, ln_k_ref: -8.0, t_ref_k: 340.0 };
        let mut rates = rates_for(RateLaw::Arrhenius, &truth);
        rates[29].rate_k *= 50.0;
        let baseline = Baseline { a0: 0.0, a_inf: 1.0 };
        let pts = ramp_points(340.0);

        let plain_fit = fit_linear(RateLaw::Arrhenius, &rates, &pts, &baseline, &plain()).unwrap();
        let robust = LinearOptions { robust: RobustKind::Huber, robust_iters: 5, robust_k: 1.5 };
        let robust_fit = fit_linear(RateLaw::Arrhenius, &rates, &pts, &baseline, &robust).unwrap();

        let err_plain = (plain_fit.params.energy_j_mol - 90_000.0).abs();
        let err_robust = (robust_fit.params.energy_j_mol - 90_000.0).abs();
        assert!(err_robust < err_plain, "robust {err_robust} vs plain {err_plain}");
        assert!(robust_fit.weights[29] < 0.5);
    }

    #[test]
    fn isothermal_rates_cannot_be_linearized() {
        let rates: Vec<RatePoint> = (0..10)
            .map(|i| RatePoint { time_s: i as f64, temperature_k: 330.0, conversion: 0.5, rate_k: 1e-3 })
            .collect();
        let baseline = Baseline { a0: 0.0, a_inf: 1.0 };
        let err = fit_linear(RateLaw::Eyring, &rates, &ramp_points(330.0), &baseline, &plain()).unwrap_err();
        assert_eq!(err.exit_code(), 4);
    }
}
