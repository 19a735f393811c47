//! Nonlinear least squares on the integrated absorbance trace.
//!
//! Parameters are `[A0, A∞, E (kJ/mol), ln k_ref]` with `T_ref` fixed to the
//! weighted mean temperature. Each seed runs its own Nelder-Mead simplex; seeds
//! are independent so they are evaluated in parallel and the best one is picked
//! deterministically (lowest SSE, ties by seed index). The winner is polished by
//! one restart with a smaller simplex.

use rayon::prelude::*;

use crate::domain::{Baseline, KineticParams, RampPoint, RateLaw};
use crate::error::AppError;
use crate::fit::seeds::{integrated_seeds, log_space};
use crate::math::{NelderMead, OptimizationResult};
use crate::models::{reference_temperature, trace_sse};

/// Options for the multi-start optimizer.
#[derive(Debug, Clone, Copy)]
pub struct IntegratedOptions {
    pub seed_energy_min_kj: f64,
    pub seed_energy_max_kj: f64,
    pub seed_steps: usize,
    pub max_iters: usize,
}

/// Best integrated fit for a single rate law.
#[derive(Debug, Clone)]
pub struct IntegratedFit {
    pub law: RateLaw,
    pub params: KineticParams,
    pub sse: f64,
    pub iterations: usize,
    pub converged: bool,
    pub seeds_tried: usize,
}

#[derive(Debug, Clone)]
struct Candidate {
    idx: usize,
    result: OptimizationResult,
}

fn params_from(v: &[f64], t_ref_k: f64) -> KineticParams {
    KineticParams {
        a0: v[0],
        a_inf: v[1],
        energy_j_mol: v[2] * 1000.0,
        ln_k_ref: v[3],
        t_ref_k,
    }
}

fn cost(law: RateLaw, v: &[f64], t_ref_k: f64, points: &[RampPoint]) -> f64 {
    if !(v[2] > 0.0) {
        return f64::INFINITY;
    }
    trace_sse(law, &params_from(v, t_ref_k), points)
}

fn simplex_steps(baseline: &Baseline, scale: f64) -> [f64; 4] {
    let span = (baseline.a_inf - baseline.a0).abs().max(1e-6);
    [0.02 * span * scale, 0.02 * span * scale, 5.0 * scale, 0.5 * scale]
}

fn run_simplex(
    law: RateLaw,
    start: &[f64],
    steps: &[f64],
    t_ref_k: f64,
    points: &[RampPoint],
    max_iters: usize,
) -> Option<OptimizationResult> {
    let mut nm = NelderMead::around(start, steps).ok()?.with_max_iters(max_iters);
    nm.run(|v| cost(law, v, t_ref_k, points)).ok()
}

/// Fit one rate law to the absorbance trace.
///
/// `extra_seeds` are `(E kJ/mol, ln k_ref)` pairs tried before the energy grid,
/// typically the linearized estimate.
pub fn fit_integrated(
    law: RateLaw,
    points: &[RampPoint],
    baseline: &Baseline,
    extra_seeds: &[(f64, f64)],
    opts: &IntegratedOptions,
) -> Result<IntegratedFit, AppError> {
    if points.len() < 2 {
        return Err(AppError::new(3, "Not enough points for an integrated fit."));
    }
    let t_ref_k = reference_temperature(points);
    if !t_ref_k.is_finite() {
        return Err(AppError::new(3, "No weighted points to define a reference temperature."));
    }

    let energies = log_space(opts.seed_energy_min_kj, opts.seed_energy_max_kj, opts.seed_steps)?;
    let seeds = integrated_seeds(law, points, baseline, t_ref_k, &energies, extra_seeds);
    if seeds.is_empty() {
        return Err(AppError::new(
            4,
            format!("No usable starting points for the {} integrated fit.", law.display_name()),
        ));
    }

    let steps = simplex_steps(baseline, 1.0);
    let candidates: Vec<Candidate> = seeds
        .par_iter()
        .enumerate()
        .filter_map(|(idx, seed)| {
            run_simplex(law, seed, &steps, t_ref_k, points, opts.max_iters)
                .filter(|r| r.best_cost.is_finite())
                .map(|result| Candidate { idx, result })
        })
        .collect();

    if candidates.is_empty() {
        return Err(AppError::new(
            4,
            format!("No valid fit candidates for the {} integrated fit.", law.display_name()),
        ));
    }

    // Deterministic selection: pick the minimum SSE; break ties by seed index.
    let mut best = &candidates[0];
    for c in &candidates[1..] {
        if c.result.best_cost < best.result.best_cost
            || (c.result.best_cost == best.result.best_cost && c.idx < best.idx)
        {
            best = c;
        }
    }
    let mut result = best.result.clone();

    let polish_steps = simplex_steps(baseline, 0.5);
    if let Some(polished) = run_simplex(law, &result.best_param, &polish_steps, t_ref_k, points, opts.max_iters) {
        if polished.best_cost <= result.best_cost {
            let iterations = result.iterations + polished.iterations;
            result = OptimizationResult { iterations, ..polished };
        }
    }

    Ok(IntegratedFit {
        law,
        params: params_from(&result.best_param, t_ref_k),
        sse: result.best_cost,
        iterations: result.iterations,
        converged: result.converged,
        seeds_tried: seeds.len(),
    })
}
