//! Shared domain types.
//!
//! These types are intentionally kept lightweight and serializable so they can be:
//!
//! - used in-memory during fitting
//! - exported to JSON/CSV
//! - reloaded later for plotting or comparisons

use std::path::PathBuf;

use chrono::{DateTime, Local};
use clap::ValueEnum;
use serde::{Deserialize, Serialize};

/// Offset between the Celsius and Kelvin scales.
pub const KELVIN_OFFSET: f64 = 273.15;

/// Convert °C to K.
pub fn celsius_to_kelvin(c: f64) -> f64 {
    c + KELVIN_OFFSET
}

/// Convert K to °C.
pub fn kelvin_to_celsius(k: f64) -> f64 {
    k - KELVIN_OFFSET
}

/// Unit of the time column.
///
/// `Auto` picks minutes when the time header ends with `_min`, otherwise seconds.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, ValueEnum)]
#[serde(rename_all = "lowercase")]
pub enum TimeUnit {
    Auto,
    S,
    Min,
}

/// Unit of the temperature column.
///
/// `Auto` heuristic (deterministic):
/// - header ending in `_k` means kelvin
/// - otherwise, if every value exceeds 200, assume kelvin
/// - otherwise assume Celsius
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, ValueEnum)]
#[serde(rename_all = "lowercase")]
pub enum TempUnit {
    Auto,
    C,
    K,
}

/// Temperature dependence of the first-order rate constant.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum RateLaw {
    Eyring,
    Arrhenius,
}

impl RateLaw {
    pub fn display_name(self) -> &'static str {
        match self {
            RateLaw::Eyring => "Eyring",
            RateLaw::Arrhenius => "Arrhenius",
        }
    }

    /// Label of the linearized ordinate (`ln(k/T)` or `ln k`).
    pub fn linear_label(self) -> &'static str {
        match self {
            RateLaw::Eyring => "ln(k/T)",
            RateLaw::Arrhenius => "ln k",
        }
    }
}

/// Which rate law(s) to fit.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, ValueEnum)]
#[serde(rename_all = "lowercase")]
pub enum ModelSpec {
    Auto,
    Eyring,
    Arrhenius,
    All,
}

impl ModelSpec {
    pub fn rate_laws(self) -> Vec<RateLaw> {
        match self {
            ModelSpec::Eyring => vec![RateLaw::Eyring],
            ModelSpec::Arrhenius => vec![RateLaw::Arrhenius],
            ModelSpec::Auto | ModelSpec::All => vec![RateLaw::Eyring, RateLaw::Arrhenius],
        }
    }
}

/// How a rate law is calibrated against the data.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum FitMethod {
    /// Regression on the linearized plot of local rate constants.
    Linear,
    /// Nonlinear least squares on the integrated absorbance trace.
    Integrated,
}

impl FitMethod {
    pub fn display_name(self) -> &'static str {
        match self {
            FitMethod::Linear => "linear",
            FitMethod::Integrated => "integrated",
        }
    }
}

/// Which fitting method(s) to run.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, ValueEnum)]
#[serde(rename_all = "lowercase")]
pub enum MethodSpec {
    Linear,
    Integrated,
    Both,
}

impl MethodSpec {
    pub fn methods(self) -> Vec<FitMethod> {
        match self {
            MethodSpec::Linear => vec![FitMethod::Linear],
            MethodSpec::Integrated => vec![FitMethod::Integrated],
            MethodSpec::Both => vec![FitMethod::Linear, FitMethod::Integrated],
        }
    }
}

/// Outlier-robust fitting mode for the linearized regression.
///
/// When enabled, the fitter iteratively reweights rate points based on residuals
/// (Huber IRLS). Numerical differentiation of a noisy trace produces a handful of
/// wild rate points near the conversion limits; this keeps them from dominating.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, ValueEnum)]
#[serde(rename_all = "lowercase")]
pub enum RobustKind {
    None,
    Huber,
}

/// Abscissa of the trace plot.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, ValueEnum)]
#[serde(rename_all = "lowercase")]
pub enum PlotAxis {
    Temperature,
    Time,
}

/// A raw row of CSV inputs.
#[derive(Debug, Clone)]
pub struct RampRow {
    pub time: f64,
    pub temperature: f64,
    pub absorbance: f64,
    pub weight: Option<f64>,
}

/// A normalized observation point used for fitting.
#[derive(Debug, Clone, PartialEq)]
pub struct RampPoint {
    /// Position in the time-sorted dataset.
    pub index: usize,
    /// Seconds since the first retained observation.
    pub time_s: f64,
    pub temperature_k: f64,
    pub absorbance: f64,
    /// Observation weight (higher means more influence).
    pub weight: f64,
}

impl RampPoint {
    pub fn temperature_c(&self) -> f64 {
        kelvin_to_celsius(self.temperature_k)
    }
}

/// Summary stats about the points actually used for fitting.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DatasetStats {
    pub n_points: usize,
    pub time_max_s: f64,
    pub temp_min_k: f64,
    pub temp_max_k: f64,
    pub abs_min: f64,
    pub abs_max: f64,
}

/// A local first-order rate constant derived from the trace slope.
#[derive(Debug, Clone, PartialEq)]
pub struct RatePoint {
    pub time_s: f64,
    /// Mean temperature over the slope window.
    pub temperature_k: f64,
    pub conversion: f64,
    /// Rate constant in 1/s.
    pub rate_k: f64,
}

/// Absorbance at the start and at the end of the reaction.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Baseline {
    pub a0: f64,
    pub a_inf: f64,
}

impl Baseline {
    /// Fraction of the absorbance change completed at `absorbance`.
    pub fn conversion(&self, absorbance: f64) -> f64 {
        (absorbance - self.a0) / (self.a_inf - self.a0)
    }
}

/// Kinetic parameters in reference-temperature form.
///
/// `energy_j_mol` is ΔH‡ for Eyring and Ea for Arrhenius. The rate constant at
/// `t_ref_k` is stored as a logarithm because it spans many decades.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct KineticParams {
    pub a0: f64,
    pub a_inf: f64,
    pub energy_j_mol: f64,
    pub ln_k_ref: f64,
    pub t_ref_k: f64,
}

/// Activation parameters reported to the user.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(tag = "law", rename_all = "lowercase")]
pub enum Activation {
    Eyring {
        dh_kj_mol: f64,
        ds_j_mol_k: f64,
        dg_298_kj_mol: f64,
    },
    Arrhenius {
        ea_kj_mol: f64,
        ln_a: f64,
    },
}

/// Regression statistics of the linearized plot.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct LinearStats {
    pub slope: f64,
    pub intercept: f64,
    pub se_slope: f64,
    pub se_intercept: f64,
    pub r_squared: f64,
    pub n_rate_points: usize,
}

/// Fit quality diagnostics measured on the absorbance trace.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FitQuality {
    pub sse: f64,
    pub rmse: f64,
    pub bic: f64,
    pub n: usize,
}

/// Fit output for a single (rate law, method) candidate.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FitResult {
    pub law: RateLaw,
    pub method: FitMethod,
    pub params: KineticParams,
    pub activation: Activation,
    pub quality: FitQuality,
    pub linear: Option<LinearStats>,
}

impl FitResult {
    pub fn label(&self) -> String {
        format!("{} ({})", self.law.display_name(), self.method.display_name())
    }
}

/// A per-point fitted result (used for tables, plots and exports).
#[derive(Debug, Clone)]
pub struct PointResidual {
    pub point: RampPoint,
    pub a_fit: f64,
    pub residual: f64,
    pub conversion: f64,
}

/// A full run's configuration as understood by the pipeline.
///
/// This is derived from CLI flags (plus defaults).
#[derive(Debug, Clone)]
pub struct FitConfig {
    pub csv_path: PathBuf,
    pub time_unit: TimeUnit,
    pub temp_unit: TempUnit,
    pub temp_min_c: Option<f64>,
    pub temp_max_c: Option<f64>,

    pub model_spec: ModelSpec,
    pub method_spec: MethodSpec,

    /// Width of the centred slope window (seconds).
    pub rate_window_s: f64,
    pub alpha_min: f64,
    pub alpha_max: f64,
    /// Points averaged at each end to estimate A0 / A∞ (`None` = automatic).
    pub baseline_points: Option<usize>,
    pub a0: Option<f64>,
    pub a_inf: Option<f64>,

    pub robust: RobustKind,
    /// Number of IRLS reweight iterations (0 disables reweighting even if robust!=none).
    pub robust_iters: usize,
    /// Huber tuning constant (larger = less downweighting).
    pub robust_k: f64,

    pub seed_energy_min_kj: f64,
    pub seed_energy_max_kj: f64,
    pub seed_steps: usize,
    pub max_iters: usize,

    /// Temperatures (°C) at which half-lives are reported.
    pub half_life_at_c: Vec<f64>,

    pub top_n: usize,
    pub plot: bool,
    pub plot_rates: bool,
    pub plot_x: PlotAxis,
    pub plot_width: usize,
    pub plot_height: usize,

    pub export_results: Option<PathBuf>,
    pub export_rates: Option<PathBuf>,
    pub export_fit: Option<PathBuf>,
    pub report: Option<PathBuf>,
    pub svg: Option<PathBuf>,
}

impl FitConfig {
    /// Defaults for a dataset path, matching the CLI defaults.
    pub fn for_path(csv_path: PathBuf) -> Self {
        Self {
            csv_path,
            time_unit: TimeUnit::Auto,
            temp_unit: TempUnit::Auto,
            temp_min_c: None,
            temp_max_c: None,
            model_spec: ModelSpec::Auto,
            method_spec: MethodSpec::Both,
            rate_window_s: 300.0,
            alpha_min: 0.1,
            alpha_max: 0.9,
            baseline_points: None,
            a0: None,
            a_inf: None,
            robust: RobustKind::None,
            robust_iters: 3,
            robust_k: 1.5,
            seed_energy_min_kj: 40.0,
            seed_energy_max_kj: 250.0,
            seed_steps: 12,
            max_iters: 4000,
            half_life_at_c: Vec::new(),
            top_n: 10,
            plot: true,
            plot_rates: false,
            plot_x: PlotAxis::Temperature,
            plot_width: 100,
            plot_height: 25,
            export_results: None,
            export_rates: None,
            export_fit: None,
            report: None,
            svg: None,
        }
    }
}

/// Half-life of the fitted reaction at one temperature.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct HalfLife {
    pub temperature_c: f64,
    pub rate_k_per_s: f64,
    pub half_life_s: f64,
}

/// A saved fit file (JSON).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FitFile {
    pub tool: String,
    pub source: String,
    pub generated: DateTime<Local>,
    pub fit: FitResult,
    pub half_lives: Vec<HalfLife>,
    pub grid: FitGrid,
}

/// The fitted absorbance trace, sampled at observation points.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FitGrid {
    pub time_s: Vec<f64>,
    pub temperature_c: Vec<f64>,
    pub absorbance: Vec<f64>,
}
