//! Read/write fit JSON files.
//!
//! Fit JSON is the "portable" representation of a kinetic fit:
//! - rate law, method and parameters (reference form + activation parameters)
//! - fit quality and any requested half-lives
//! - a precomputed fitted trace for quick plotting
//!
//! The schema is defined by `domain::FitFile`.

use std::fs::File;
use std::path::Path;

use chrono::Local;

use crate::domain::{FitFile, FitGrid, FitResult, HalfLife, RampPoint, celsius_to_kelvin};
use crate::error::AppError;
use crate::models::{predict_trace, rate_constant};

/// Maximum number of grid samples stored in a fit file.
const GRID_MAX_POINTS: usize = 201;

/// Build the fit file document for a fit over `points`.
pub fn build_fit_file(source: &Path, fit: &FitResult, points: &[RampPoint], half_life_at_c: &[f64]) -> FitFile {
    FitFile {
        tool: "ramp".to_string(),
        source: source.display().to_string(),
        generated: Local::now(),
        fit: fit.clone(),
        half_lives: half_lives(fit, half_life_at_c),
        grid: build_grid(fit, points, GRID_MAX_POINTS),
    }
}

/// Write a fit JSON file.
pub fn write_fit_json(path: &Path, fit_file: &FitFile) -> Result<(), AppError> {
    let file = File::create(path)
        .map_err(|e| AppError::new(2, format!("Failed to create fit JSON '{}': {e}", path.display())))?;

    serde_json::to_writer_pretty(file, fit_file)
        .map_err(|e| AppError::new(2, format!("Failed to write fit JSON: {e}")))?;

    Ok(())
}

/// Read a fit JSON file.
pub fn read_fit_json(path: &Path) -> Result<FitFile, AppError> {
    let file = File::open(path)
        .map_err(|e| AppError::new(2, format!("Failed to open fit JSON '{}': {e}", path.display())))?;
    let fit_file: FitFile =
        serde_json::from_reader(file).map_err(|e| AppError::new(2, format!("Invalid fit JSON: {e}")))?;
    if fit_file.grid.time_s.len() != fit_file.grid.absorbance.len()
        || fit_file.grid.temperature_c.len() != fit_file.grid.absorbance.len()
    {
        return Err(AppError::new(2, "Invalid fit JSON: grid columns have different lengths."));
    }
    Ok(fit_file)
}

/// Half-lives at the requested temperatures (°C).
pub fn half_lives(fit: &FitResult, temperatures_c: &[f64]) -> Vec<HalfLife> {
    temperatures_c
        .iter()
        .map(|&temperature_c| {
            let k = rate_constant(fit.law, &fit.params, celsius_to_kelvin(temperature_c));
            HalfLife {
                temperature_c,
                rate_k_per_s: k,
                half_life_s: std::f64::consts::LN_2 / k,
            }
        })
        .collect()
}

fn build_grid(fit: &FitResult, points: &[RampPoint], max_points: usize) -> FitGrid {
    let fitted = predict_trace(fit.law, &fit.params, points);
    let stride = points.len().div_ceil(max_points.max(2)).max(1);

    let mut grid = FitGrid {
        time_s: Vec::new(),
        temperature_c: Vec::new(),
        absorbance: Vec::new(),
    };
    for (i, (p, a)) in points.iter().zip(&fitted).enumerate() {
        // Always keep the final point so the plotted trace spans the full run.
        if i % stride == 0 || i + 1 == points.len() {
            grid.time_s.push(p.time_s);
            grid.temperature_c.push(p.temperature_c());
            grid.absorbance.push(*a);
        }
    }
    grid
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::{Activation, FitMethod, FitQuality, KineticParams, RateLaw};

    fn fit() -> FitResult {
        let params = KineticParams {
            a0: 0.1,
            a_inf: 0.9,
            energy_j_mol: 90_000.0,
            ln_k_ref: -8.0,
            t_ref_k: 340.0,
        };
        FitResult {
            law: RateLaw::Eyring,
            method: FitMethod::Integrated,
            params,
            activation: crate::models::activation(RateLaw::Eyring, &params),
            quality: FitQuality {
                sse: 1e-4,
                rmse: 1e-3,
                bic: -500.0,
                n: 100,
            },
            linear: None,
        }
    }

    fn points(n: usize) -> Vec<RampPoint> {
        (0..n)
            .map(|i| RampPoint {
                index: i,
                time_s: i as f64 * 30.0,
                temperature_k: 313.15 + i as f64 * 0.5,
                absorbance: 0.0,
                weight: 1.0,
            })
            .collect()
    }

    #[test]
    fn fit_json_round_trips() {
        let path = std::env::temp_dir().join(format!("ramp-fit-{}.json", std::process::id()));
        let doc = build_fit_file(Path::new("data.csv"), &fit(), &points(50), &[60.0]);
        write_fit_json(&path, &doc).unwrap();
        let back = read_fit_json(&path).unwrap();
        let _ = std::fs::remove_file(&path);

        assert_eq!(back.tool, "ramp");
        assert_eq!(back.fit.law, RateLaw::Eyring);
        assert_eq!(back.grid.absorbance.len(), 50);
        assert_eq!(back.half_lives.len(), 1);
        assert!(matches!(back.fit.activation, Activation::Eyring { .. }));
    }

    #[test]
    fn grid_is_downsampled_but_keeps_the_last_point() {
        let pts = points(1000);
        let grid = build_grid(&fit(), &pts, 201);
        assert!(grid.time_s.len() <= 202);
        assert_eq!(grid.time_s.last().copied(), Some(999.0 * 30.0));
    }

    #[test]
    fn half_life_matches_rate_constant() {
        let f = fit();
        let hl = half_lives(&f, &[67.0]);
        assert!((hl[0].half_life_s * hl[0].rate_k_per_s - std::f64::consts::LN_2).abs() < 1e-12);
    }
}
