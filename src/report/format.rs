//! Residuals, rankings, and formatted terminal output.
//!
//! We keep formatting code in one place so:
//! - the math/fitting code stays clean and testable
//! - output changes are localized

use crate::domain::{Activation, FitConfig, FitResult, HalfLife, PointResidual, RampPoint};
use crate::error::AppError;
use crate::fit::selection::FitSelection;
use crate::io::ingest::{IngestedData, InputSpec};
use crate::models::predict_trace;

/// Row errors echoed in the summary before truncating.
const MAX_ROW_ERRORS_SHOWN: usize = 5;

/// Compute fitted absorbance and residuals for each observation.
pub fn compute_residuals(points: &[RampPoint], fit: &FitResult) -> Result<Vec<PointResidual>, AppError> {
    let predicted = predict_trace(fit.law, &fit.params, points);
    let amplitude = fit.params.a_inf - fit.params.a0;

    let mut out = Vec::with_capacity(points.len());
    for (p, a_fit) in points.iter().zip(predicted) {
        if !a_fit.is_finite() {
            return Err(AppError::new(4, "Non-finite model prediction during residual computation."));
        }
        let conversion = if amplitude != 0.0 { (p.absorbance - fit.params.a0) / amplitude } else { f64::NAN };
        out.push(PointResidual {
            point: p.clone(),
            a_fit,
            residual: p.absorbance - a_fit,
            conversion,
        });
    }
    Ok(out)
}

/// The `top_n` observations with the largest |residual|, largest first.
pub fn largest_residuals(residuals: &[PointResidual], top_n: usize) -> Vec<PointResidual> {
    let mut sorted = residuals.to_vec();
    sorted.sort_by(|a, b| {
        b.residual
            .abs()
            .partial_cmp(&a.residual.abs())
            .unwrap_or(std::cmp::Ordering::Equal)
            .then(a.point.index.cmp(&b.point.index))
    });
    sorted.truncate(top_n);
    sorted
}

/// One line describing the activation parameters of a fit.
pub fn format_activation(fit: &FitResult) -> String {
    match fit.activation {
        Activation::Eyring { dh_kj_mol, ds_j_mol_k, dg_298_kj_mol } => format!(
            "ΔH‡={dh_kj_mol:.2} kJ/mol  ΔS‡={ds_j_mol_k:.2} J/(mol·K)  ΔG‡(298 K)={dg_298_kj_mol:.2} kJ/mol"
        ),
        Activation::Arrhenius { ea_kj_mol, ln_a } => {
            format!("Ea={ea_kj_mol:.2} kJ/mol  ln A={ln_a:.3}  (A={:.3e} 1/s)", ln_a.exp())
        }
    }
}

/// Standard errors of the linearized fit translated to activation parameters.
pub fn format_linear_errors(fit: &FitResult) -> Option<String> {
    let stats = fit.linear?;
    let r = crate::models::GAS_CONSTANT;
    let se_energy = stats.se_slope * r / 1000.0;
    Some(match fit.activation {
        Activation::Eyring { .. } => format!(
            "±ΔH‡={se_energy:.2} kJ/mol  ±ΔS‡={:.2} J/(mol·K)  R²={:.4}  rate points={}",
            stats.se_intercept * r,
            stats.r_squared,
            stats.n_rate_points
        ),
        Activation::Arrhenius { .. } => format!(
            "±Ea={se_energy:.2} kJ/mol  ±ln A={:.3}  R²={:.4}  rate points={}",
            stats.se_intercept, stats.r_squared, stats.n_rate_points
        ),
    })
}

/// Format the full run summary (dataset stats + fit diagnostics + chosen model).
pub fn format_run_summary(
    ingest: &IngestedData,
    selection: &FitSelection,
    half_lives: &[HalfLife],
    config: &FitConfig,
) -> String {
    let mut out = String::new();

    out.push_str("=== ramp - Temperature-Ramp Kinetics Fit ===\n");
    out.push_str(&format!("Data: {}\n", config.csv_path.display()));
    out.push_str(&format!("Columns: {}\n", describe_columns(&ingest.input_spec)));
    if let Some(note) = &ingest.input_spec.unit_note {
        out.push_str(&format!("Note: {note}\n"));
    }
    out.push_str(&format!(
        "Points: n={} (rows read {}, used {}) | t=[0, {:.1}] min | T=[{:.2}, {:.2}] °C | A=[{:.4}, {:.4}]\n",
        ingest.stats.n_points,
        ingest.rows_read,
        ingest.rows_used,
        ingest.stats.time_max_s / 60.0,
        crate::domain::kelvin_to_celsius(ingest.stats.temp_min_k),
        crate::domain::kelvin_to_celsius(ingest.stats.temp_max_k),
        ingest.stats.abs_min,
        ingest.stats.abs_max
    ));
    if !ingest.row_errors.is_empty() {
        out.push_str(&format!("Skipped rows: {}\n", ingest.row_errors.len()));
        for e in ingest.row_errors.iter().take(MAX_ROW_ERRORS_SHOWN) {
            out.push_str(&format!("  line {}: {}\n", e.line, e.message));
        }
        if ingest.row_errors.len() > MAX_ROW_ERRORS_SHOWN {
            out.push_str(&format!("  ... and {} more\n", ingest.row_errors.len() - MAX_ROW_ERRORS_SHOWN));
        }
    }

    out.push_str(&format!(
        "Baseline: A0={:.4} A∞={:.4} | rate points={} (α {:.2}..{:.2}, window {:.0} s)\n",
        selection.baseline.a0,
        selection.baseline.a_inf,
        selection.rates.len(),
        config.alpha_min,
        config.alpha_max,
        config.rate_window_s
    ));

    out.push_str("\nModel diagnostics:\n");
    for fit in &selection.fits {
        let chosen = if fit.law == selection.best.law && fit.method == selection.best.method { "*" } else { " " };
        out.push_str(&format!(
            "{chosen} {:<24} SSE={:.4e} RMSE={:.5} BIC={:.3}\n",
            fit.label(),
            fit.quality.sse,
            fit.quality.rmse,
            fit.quality.bic
        ));
    }
    for (label, reason) in &selection.skipped {
        out.push_str(&format!("  (skipped {label}) {reason}\n"));
    }

    let best = &selection.best;
    out.push_str("\nChosen model:\n");
    out.push_str(&format!("- {}\n", best.label()));
    out.push_str(&format!("- {}\n", format_activation(best)));
    if let Some(errors) = format_linear_errors(best) {
        out.push_str(&format!("- {errors}\n"));
    }
    out.push_str(&format!(
        "- A0={:.4} A∞={:.4} k(T_ref={:.2} °C)={:.4e} 1/s\n",
        best.params.a0,
        best.params.a_inf,
        crate::domain::kelvin_to_celsius(best.params.t_ref_k),
        best.params.ln_k_ref.exp()
    ));

    if !half_lives.is_empty() {
        out.push_str("\nHalf-lives:\n");
        for h in half_lives {
            out.push_str(&format!(
                "  {:>7.2} °C  k={:.4e} 1/s  t½={}\n",
                h.temperature_c,
                h.rate_k_per_s,
                format_duration(h.half_life_s)
            ));
        }
    }
    out.push('\n');

    out
}

/// Format the largest-residual table.
pub fn format_residual_table(rows: &[PointResidual]) -> String {
    let mut out = String::new();
    out.push_str("Largest residuals:\n");
    out.push_str(
        format!(
            "{:>6} {:>10} {:>9} {:>10} {:>10} {:>11} {:>7}\n",
            "row", "t_min", "T_C", "A_obs", "A_fit", "residual", "alpha"
        )
        .trim_end(),
    );
    out.push('\n');
    out.push_str(
        format!(
            "{:-<6} {:-<10} {:-<9} {:-<10} {:-<10} {:-<11} {:-<7}\n",
            "", "", "", "", "", "", ""
        )
        .trim_end(),
    );
    out.push('\n');

    for r in rows {
        let p = &r.point;
        out.push_str(
            format!(
                "{:>6} {:>10.2} {:>9.2} {:>10.5} {:>10.5} {:>+11.5} {:>7.3}\n",
                p.index,
                p.time_s / 60.0,
                p.temperature_c(),
                p.absorbance,
                r.a_fit,
                r.residual,
                r.conversion
            )
            .trim_end(),
        );
        out.push('\n');
    }

    out
}

fn describe_columns(spec: &InputSpec) -> String {
    format!(
        "time={} ({:?}), temperature={} ({:?}), absorbance={}",
        spec.time_column, spec.time_unit, spec.temp_column, spec.temp_unit, spec.abs_column
    )
}

/// Human-scale duration (s, min, h or days).
pub fn format_duration(seconds: f64) -> String {
    if !seconds.is_finite() {
        return "n/a".to_string();
    }
    if seconds < 120.0 {
        format!("{seconds:.1} s")
    } else if seconds < 7200.0 {
        format!("{:.1} min", seconds / 60.0)
    } else if seconds < 172_800.0 {
        format!("{:.2} h", seconds / 3600.0)
    } else {
        format!("{:.2} d", seconds / 86_400.0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::{FitMethod, FitQuality, KineticParams, RateLaw};
    use crate::models::activation;

    fn point(index: usize, absorbance: f64) -> RampPoint {
        RampPoint {
            index,
            time_s: 60.0 * index as f64,
            temperature_k: 330.0,
            absorbance,
            weight: 1.0,
        }
    }

    fn frozen_fit() -> FitResult {
        // k ≈ 0: the predicted trace stays at A0.
        let params = KineticParams { a0: 0.5, a_inf: 1.5, energy_j_mol: 80_000.0, ln_k_ref: -60.0, t_ref_k: 330.0 };
        FitResult {
            law: RateLaw::Arrhenius,
            method: FitMethod::Integrated,
            params,
            activation: activation(RateLaw::Arrhenius, &params),
            quality: FitQuality { sse: 0.0, rmse: 0.0, bic: 0.0, n: 3 },
            linear: None,
        }
    }

    #[test]
    fn compute_residuals_basic() {
        let points = vec![point(0, 0.5), point(1, 0.6), point(2, 0.4)];
        let residuals = compute_residuals(&points, &frozen_fit()).unwrap();
        assert_eq!(residuals.len(), 3);
        assert!(residuals[0].residual.abs() < 1e-9);
        assert!((residuals[1].residual - 0.1).abs() < 1e-9);
        assert!((residuals[1].conversion - 0.1).abs() < 1e-9);
        assert!((residuals[2].residual + 0.1).abs() < 1e-9);
    }

    #[test]
    fn largest_residuals_rank_by_magnitude() {
        let points = vec![point(0, 0.5), point(1, 0.52), point(2, 0.2), point(3, 0.6)];
        let residuals = compute_residuals(&points, &frozen_fit()).unwrap();
        let top = largest_residuals(&residuals, 2);
        assert_eq!(top.len(), 2);
        assert_eq!(top[0].point.index, 2);
        assert_eq!(top[1].point.index, 3);
    }

    #[test]
    fn residual_table_has_header_and_rows() {
        let points = vec![point(0, 0.5), point(1, 0.6)];
        let residuals = compute_residuals(&points, &frozen_fit()).unwrap();
        let table = format_residual_table(&residuals);
        assert!(table.starts_with("Largest residuals:\n"));
        assert_eq!(table.lines().count(), 5);
        assert!(table.contains("+0.10000"));
    }

    #[test]
    fn durations_pick_a_readable_unit() {
        assert_eq!(format_duration(30.0), "30.0 s");
        assert_eq!(format_duration(600.0), "10.0 min");
        assert_eq!(format_duration(7200.0), "2.00 h");
        assert_eq!(format_duration(f64::INFINITY), "n/a");
    }
}
