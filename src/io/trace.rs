//! Sampled (time, temperature, absorbance) traces.
//!
//! Both `ramp simulate` and `ramp control --trace` write this format, and
//! `ramp fit` reads it back through the regular ingest path.

use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::error::AppError;

/// One sample of a ramp experiment.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct TraceSample {
    pub time_s: f64,
    pub temperature_c: f64,
    pub absorbance: f64,
}

/// Write a trace CSV (`time_s,temperature_c,absorbance`).
pub fn write_trace_csv(path: &Path, samples: &[TraceSample]) -> Result<(), AppError> {
    let mut writer = csv::Writer::from_path(path)
        .map_err(|e| AppError::new(2, format!("Failed to create trace CSV '{}': {e}", path.display())))?;
    for s in samples {
        writer
            .serialize(s)
            .map_err(|e| AppError::new(2, format!("Failed to write trace CSV row: {e}")))?;
    }
    writer
        .flush()
        .map_err(|e| AppError::new(2, format!("Failed to flush trace CSV: {e}")))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::FitConfig;

    #[test]
    fn written_trace_is_readable_by_ingest() {
        let path = std::env::temp_dir().join(format!("ramp-trace-{}.csv", std::process::id()));
        let samples: Vec<TraceSample> = (0..5)
            .map(|i| TraceSample {
                time_s: i as f64 * 10.0,
                temperature_c: 40.0 + i as f64,
                absorbance: 0.1 * i as f64,
            })
            .collect();
        write_trace_csv(&path, &samples).unwrap();

        let data = crate::io::ingest::load_ramp_points(&FitConfig::for_path(path.clone())).unwrap();
        let _ = std::fs::remove_file(&path);

        assert_eq!(data.rows_used, 5);
        assert_eq!(data.input_spec.time_column, "time_s");
        assert_eq!(data.input_spec.temp_column, "temperature_c");
        assert!((data.points[4].temperature_c() - 44.0).abs() < 1e-9);
    }
}
