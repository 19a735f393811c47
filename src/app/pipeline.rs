//! Shared fit pipeline used by both CLI and TUI front-ends.
//!
//! ingest -> baseline/rate points -> candidate fits -> selection -> residuals -> half-lives
//!
//! The CLI and the TUI then focus on presentation (printing vs widgets).

use crate::domain::{FitConfig, HalfLife, PointResidual};
use crate::error::AppError;
use crate::fit::FitSelection;
use crate::io::IngestedData;

/// All computed outputs of a single fit run.
#[derive(Debug, Clone)]
pub struct RunOutput {
    pub ingest: IngestedData,
    pub selection: FitSelection,
    pub residuals: Vec<PointResidual>,
    pub half_lives: Vec<HalfLife>,
}

/// Load the dataset named by `config` and fit it.
pub fn run_fit(config: &FitConfig) -> Result<RunOutput, AppError> {
    let ingest = crate::io::load_ramp_points(config)?;
    run_fit_on(ingest, config)
}

/// Fit already-ingested data.
///
/// The TUI uses this to refit with new settings without re-reading the file.
pub fn run_fit_on(ingest: IngestedData, config: &FitConfig) -> Result<RunOutput, AppError> {
    let selection = crate::fit::fit_and_select(&ingest.points, config)?;
    let residuals = crate::report::compute_residuals(&ingest.points, &selection.best)?;
    let half_lives = crate::io::half_lives(&selection.best, &config.half_life_at_c);

    Ok(RunOutput {
        ingest,
        selection,
        residuals,
        half_lives,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::{FitMethod, RateLaw};
    use crate::io::{TraceSample, write_trace_csv};
    use crate::sim::{SyntheticSpec, generate_dataset};

    #[test]
    fn synthetic_dataset_fits_end_to_end() {
        let samples: Vec<TraceSample> = generate_dataset(&SyntheticSpec::default()).unwrap();
        let path = std::env::temp_dir().join(format!("ramp-pipeline-{}.csv", std::process::id()));
        write_trace_csv(&path, &samples).unwrap();

        let mut config = FitConfig::for_path(path.clone());
        config.half_life_at_c = vec![60.0];
        let run = run_fit(&config).unwrap();

        assert_eq!(run.ingest.points.len(), samples.len());
        assert_eq!(run.residuals.len(), samples.len());
        assert_eq!(run.half_lives.len(), 1);
        assert_eq!(run.selection.best.method, FitMethod::Integrated);
        assert!(run.selection.fits.iter().any(|f| f.law == RateLaw::Eyring));
        std::fs::remove_file(&path).unwrap();
    }
}
