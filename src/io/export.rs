//! Export per-point and per-rate-point results to CSV.
//!
//! The exports are meant to be easy to consume in spreadsheets or downstream
//! scripts (e.g. thesis figures re-drawn in another plotting tool).

use std::path::Path;

use serde::Serialize;

use crate::domain::{PointResidual, RateLaw, RatePoint};
use crate::error::AppError;

#[derive(Debug, Serialize)]
struct ResultRow {
    time_s: f64,
    temperature_c: f64,
    absorbance_obs: f64,
    absorbance_fit: f64,
    residual: f64,
    conversion: f64,
    weight: f64,
}

#[derive(Debug, Serialize)]
struct RateRow {
    time_s: f64,
    temperature_c: f64,
    conversion: f64,
    rate_k_per_s: f64,
    inv_t: f64,
    y_linear: f64,
}

/// Write per-point results to a CSV file.
pub fn write_results_csv(path: &Path, residuals: &[PointResidual]) -> Result<(), AppError> {
    let mut writer = csv::Writer::from_path(path)
        .map_err(|e| AppError::new(2, format!("Failed to create export CSV '{}': {e}", path.display())))?;

    for r in residuals {
        writer
            .serialize(ResultRow {
                time_s: r.point.time_s,
                temperature_c: r.point.temperature_c(),
                absorbance_obs: r.point.absorbance,
                absorbance_fit: r.a_fit,
                residual: r.residual,
                conversion: r.conversion,
                weight: r.point.weight,
            })
            .map_err(|e| AppError::new(2, format!("Failed to write export CSV row: {e}")))?;
    }

    writer
        .flush()
        .map_err(|e| AppError::new(2, format!("Failed to flush export CSV: {e}")))
}

/// Write the rate points (and their linearized ordinate for `law`) to a CSV file.
pub fn write_rates_csv(path: &Path, rates: &[RatePoint], law: RateLaw) -> Result<(), AppError> {
    let mut writer = csv::Writer::from_path(path)
        .map_err(|e| AppError::new(2, format!("Failed to create rates CSV '{}': {e}", path.display())))?;

    for r in rates {
        writer
            .serialize(RateRow {
                time_s: r.time_s,
                temperature_c: crate::domain::kelvin_to_celsius(r.temperature_k),
                conversion: r.conversion,
                rate_k_per_s: r.rate_k,
                inv_t: 1.0 / r.temperature_k,
                y_linear: crate::fit::linear_ordinate(law, r),
            })
            .map_err(|e| AppError::new(2, format!("Failed to write rates CSV row: {e}")))?;
    }

    writer
        .flush()
        .map_err(|e| AppError::new(2, format!("Failed to flush rates CSV: {e}")))
}
