//! Command-line parsing for the ramp kinetics tool.
//!
//! The goal of this module is to keep **argument parsing** separate from the
//! fitting, control and simulation code. Each `*Args` struct converts into the
//! library's own configuration type in exactly one place.

use std::path::PathBuf;

use clap::{Parser, Subcommand};

use crate::control::{ControllerConfig, PidGains};
use crate::domain::{FitConfig, MethodSpec, ModelSpec, PlotAxis, RobustKind, TempUnit, TimeUnit};
use crate::sim::{PlantConfig, SyntheticSpec};

pub mod picker;

/// Top-level CLI.
#[derive(Debug, Parser)]
#[command(
    name = "ramp",
    version,
    about = "Temperature-ramp kinetics: Eyring/Arrhenius fitting and absorbance-driven ramp control"
)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Command,
}

/// CLI subcommands.
#[derive(Debug, Subcommand)]
pub enum Command {
    /// Fit Eyring/Arrhenius kinetics to a ramp CSV, print diagnostics and optionally plot/export.
    Fit(FitArgs),
    /// Plot a previously exported fit JSON.
    Plot(PlotArgs),
    /// Generate a synthetic temperature-ramp dataset from known activation parameters.
    Simulate(SimulateArgs),
    /// Run the absorbance-driven ramp controller against a simulated or replayed instrument.
    Control(ControlArgs),
    /// Launch the interactive TUI.
    ///
    /// This uses the same fit pipeline as `ramp fit`, but renders results in a
    /// terminal UI using Ratatui.
    Tui(FitArgs),
}

/// Options for fitting a dataset.
#[derive(Debug, Parser, Clone)]
pub struct FitArgs {
    /// Ramp CSV (time, temperature, absorbance[, weight]). Prompts when omitted.
    #[arg(short = 'f', long = "file", value_name = "CSV")]
    pub file: Option<PathBuf>,

    /// Unit of the time column.
    #[arg(long, value_enum, default_value_t = TimeUnit::Auto)]
    pub time_unit: TimeUnit,

    /// Unit of the temperature column.
    #[arg(long, value_enum, default_value_t = TempUnit::Auto)]
    pub temp_unit: TempUnit,

    /// Drop rows below this temperature (°C).
    #[arg(long)]
    pub temp_min: Option<f64>,

    /// Drop rows above this temperature (°C).
    #[arg(long)]
    pub temp_max: Option<f64>,

    /// Which rate law(s) to fit.
    #[arg(long, value_enum, default_value_t = ModelSpec::Auto)]
    pub model: ModelSpec,

    /// Which fitting method(s) to run.
    #[arg(long, value_enum, default_value_t = MethodSpec::Both)]
    pub method: MethodSpec,

    /// Width of the centred slope window for rate points (seconds).
    #[arg(long, default_value_t = 300.0)]
    pub rate_window: f64,

    /// Lowest conversion used for rate points.
    #[arg(long, default_value_t = 0.1)]
    pub alpha_min: f64,

    /// Highest conversion used for rate points.
    #[arg(long, default_value_t = 0.9)]
    pub alpha_max: f64,

    /// Points averaged at each end of the trace for A0 / A∞ (default: max(n/20, 3)).
    #[arg(long)]
    pub baseline_points: Option<usize>,

    /// Fix the initial absorbance instead of estimating it.
    #[arg(long)]
    pub a0: Option<f64>,

    /// Fix the final absorbance instead of estimating it.
    #[arg(long)]
    pub a_inf: Option<f64>,

    /// Robust reweighting of the linearized regression.
    #[arg(long, value_enum, default_value_t = RobustKind::None)]
    pub robust: RobustKind,

    /// IRLS iterations when `--robust huber` is active.
    #[arg(long, default_value_t = 3)]
    pub robust_iters: usize,

    /// Huber tuning constant.
    #[arg(long, default_value_t = 1.5)]
    pub robust_k: f64,

    /// Lowest activation energy (kJ/mol) of the integrated seed grid.
    #[arg(long, default_value_t = 40.0)]
    pub seed_energy_min: f64,

    /// Highest activation energy (kJ/mol) of the integrated seed grid.
    #[arg(long, default_value_t = 250.0)]
    pub seed_energy_max: f64,

    /// Number of log-spaced seed energies.
    #[arg(long, default_value_t = 12)]
    pub seed_steps: usize,

    /// Nelder-Mead iteration cap per seed.
    #[arg(long, default_value_t = 4000)]
    pub max_iters: usize,

    /// Report the half-life at these temperatures (°C, comma separated).
    #[arg(long = "half-life-at", value_delimiter = ',', value_name = "C")]
    pub half_life_at: Vec<f64>,

    /// Show the N largest residuals.
    #[arg(long, default_value_t = 10)]
    pub top: usize,

    /// Disable the terminal plot.
    #[arg(long)]
    pub no_plot: bool,

    /// Also plot the linearized (Eyring/Arrhenius) rate plot.
    #[arg(long)]
    pub plot_rates: bool,

    /// Abscissa of the trace plot.
    #[arg(long, value_enum, default_value_t = PlotAxis::Temperature)]
    pub plot_x: PlotAxis,

    /// Plot width (columns).
    #[arg(long, default_value_t = 100)]
    pub width: usize,

    /// Plot height (rows).
    #[arg(long, default_value_t = 25)]
    pub height: usize,

    /// Export per-point results to CSV.
    #[arg(long)]
    pub export: Option<PathBuf>,

    /// Export rate points to CSV.
    #[arg(long = "export-rates")]
    pub export_rates: Option<PathBuf>,

    /// Export the chosen fit (params + fitted grid) to JSON.
    #[arg(long = "export-fit")]
    pub export_fit: Option<PathBuf>,

    /// Write a Markdown report.
    #[arg(long)]
    pub report: Option<PathBuf>,

    /// Write a two-panel SVG plot.
    #[arg(long)]
    pub svg: Option<PathBuf>,
}

impl FitArgs {
    /// Build the fit configuration for a resolved dataset path.
    pub fn to_config(&self, csv_path: PathBuf) -> FitConfig {
        FitConfig {
            csv_path,
            time_unit: self.time_unit,
            temp_unit: self.temp_unit,
            temp_min_c: self.temp_min,
            temp_max_c: self.temp_max,
            model_spec: self.model,
            method_spec: self.method,
            rate_window_s: self.rate_window,
            alpha_min: self.alpha_min,
            alpha_max: self.alpha_max,
            baseline_points: self.baseline_points,
            a0: self.a0,
            a_inf: self.a_inf,
            robust: self.robust,
            robust_iters: self.robust_iters,
            robust_k: self.robust_k,
            seed_energy_min_kj: self.seed_energy_min,
            seed_energy_max_kj: self.seed_energy_max,
            seed_steps: self.seed_steps,
            max_iters: self.max_iters,
            half_life_at_c: self.half_life_at.clone(),
            top_n: self.top,
            plot: !self.no_plot,
            plot_rates: self.plot_rates,
            plot_x: self.plot_x,
            plot_width: self.width,
            plot_height: self.height,
            export_results: self.export.clone(),
            export_rates: self.export_rates.clone(),
            export_fit: self.export_fit.clone(),
            report: self.report.clone(),
            svg: self.svg.clone(),
        }
    }
}

/// Options for plotting a saved fit.
#[derive(Debug, Parser)]
pub struct PlotArgs {
    /// Fit JSON file produced by `ramp fit --export-fit`.
    #[arg(long, value_name = "JSON")]
    pub fit: PathBuf,

    /// Abscissa of the plot.
    #[arg(long, value_enum, default_value_t = PlotAxis::Temperature)]
    pub plot_x: PlotAxis,

    /// Plot width (columns).
    #[arg(long, default_value_t = 100)]
    pub width: usize,

    /// Plot height (rows).
    #[arg(long, default_value_t = 25)]
    pub height: usize,

    /// Also write a two-panel SVG figure.
    #[arg(long, value_name = "PATH")]
    pub svg: Option<PathBuf>,
}

/// Kinetic parameters shared by the simulator and the synthetic dataset.
#[derive(Debug, Parser, Clone)]
pub struct KineticArgs {
    /// Activation enthalpy ΔH‡ (kJ/mol).
    #[arg(long, env = "RAMP_DH", default_value_t = 100.0)]
    pub dh: f64,

    /// Activation entropy ΔS‡ (J/(mol·K)).
    #[arg(long, env = "RAMP_DS", default_value_t = -30.0, allow_hyphen_values = true)]
    pub ds: f64,

    /// Initial absorbance (AU).
    #[arg(long = "sim-a0", env = "RAMP_A0", default_value_t = 0.2)]
    pub a0: f64,

    /// Final absorbance (AU).
    #[arg(long = "sim-a-inf", env = "RAMP_A_INF", default_value_t = 1.0)]
    pub a_inf: f64,

    /// Gaussian read noise σ (AU).
    #[arg(long, env = "RAMP_NOISE")]
    pub noise: Option<f64>,

    /// Noise RNG seed.
    #[arg(long, env = "RAMP_SEED", default_value_t = 42)]
    pub seed: u64,
}

/// Options for generating a synthetic dataset.
#[derive(Debug, Parser)]
pub struct SimulateArgs {
    /// Output trace CSV (readable by `ramp fit`).
    #[arg(short = 'o', long, value_name = "CSV")]
    pub out: PathBuf,

    /// Start temperature (°C).
    #[arg(long, default_value_t = 40.0)]
    pub start: f64,

    /// End temperature of the ramp (°C).
    #[arg(long, default_value_t = 100.0)]
    pub end: f64,

    /// Ramp rate (°C/min).
    #[arg(long, default_value_t = 1.0)]
    pub ramp: f64,

    /// Hold at the end temperature (minutes).
    #[arg(long, default_value_t = 60.0)]
    pub hold: f64,

    /// Sampling interval (seconds).
    #[arg(long, default_value_t = 30.0)]
    pub interval: f64,

    #[command(flatten)]
    pub kinetics: KineticArgs,
}

impl SimulateArgs {
    pub fn to_spec(&self) -> SyntheticSpec {
        let defaults = SyntheticSpec::default();
        SyntheticSpec {
            start_c: self.start,
            end_c: self.end,
            ramp_c_per_min: self.ramp,
            hold_min: self.hold,
            interval_s: self.interval,
            dh_kj_mol: self.kinetics.dh,
            ds_j_mol_k: self.kinetics.ds,
            a0: self.kinetics.a0,
            a_inf: self.kinetics.a_inf,
            noise_sd: self.kinetics.noise.unwrap_or(defaults.noise_sd),
            seed: self.kinetics.seed,
        }
    }
}

/// Options for a controller run.
#[derive(Debug, Parser)]
pub struct ControlArgs {
    /// Replay the absorbance of this CSV instead of simulating the reaction.
    #[arg(long, value_name = "CSV")]
    pub replay: Option<PathBuf>,

    /// Run against the wall clock instead of fast-forwarding.
    #[arg(long)]
    pub realtime: bool,

    /// Stop after this many ticks.
    #[arg(long)]
    pub max_ticks: Option<usize>,

    /// Write the per-tick updates to CSV.
    #[arg(long, value_name = "CSV")]
    pub log: Option<PathBuf>,

    /// Write the sampled trace to CSV (readable by `ramp fit`).
    #[arg(long, value_name = "CSV")]
    pub trace: Option<PathBuf>,

    /// Interval of the recorded trace (seconds).
    #[arg(long, default_value_t = 10.0)]
    pub trace_every: f64,

    /// Write sent instrument commands here (default: stdout).
    #[arg(long, value_name = "FILE")]
    pub commands: Option<PathBuf>,

    /// Suppress the per-tick log lines.
    #[arg(short = 'q', long)]
    pub quiet: bool,

    /// Start (and cool-down) temperature (°C).
    #[arg(long, env = "RAMP_START_TEMP", default_value_t = 45.0)]
    pub start_temp: f64,

    /// Maximum temperature (°C).
    #[arg(long, env = "RAMP_MAX_TEMP", default_value_t = 100.0)]
    pub max_temp: f64,

    /// Ramp rate before the reaction is detected (°C/min).
    #[arg(long, env = "RAMP_FAST_RAMP", default_value_t = 2.0)]
    pub fast_ramp: f64,

    /// Ramp rate of the final cool-down (°C/min).
    #[arg(long, env = "RAMP_COOL_RAMP", default_value_t = -1.0, allow_hyphen_values = true)]
    pub cool_ramp: f64,

    /// Controller period (seconds).
    #[arg(long, env = "RAMP_TICK", default_value_t = 30.0)]
    pub tick: f64,

    /// Absorbance sampling interval (seconds).
    #[arg(long, env = "RAMP_SAMPLE_INTERVAL", default_value_t = 0.1)]
    pub sample_interval: f64,

    /// Absorbance expected at full conversion (AU).
    #[arg(long, env = "RAMP_EXPECTED_MAX_ABS", default_value_t = 1.0)]
    pub expected_max_abs: f64,

    /// Hours over which the reaction should complete.
    #[arg(long, env = "RAMP_SWITCH_TIME_HRS", default_value_t = 5.0)]
    pub switch_time_hrs: f64,

    #[arg(long, env = "RAMP_KP", default_value_t = 80.0)]
    pub kp: f64,

    #[arg(long, env = "RAMP_KI", default_value_t = 10.0)]
    pub ki: f64,

    #[arg(long, env = "RAMP_KD", default_value_t = 5.0)]
    pub kd: f64,

    #[command(flatten)]
    pub kinetics: KineticArgs,
}

impl ControlArgs {
    pub fn controller_config(&self) -> ControllerConfig {
        ControllerConfig {
            start_temp_c: self.start_temp,
            max_temp_c: self.max_temp,
            fast_ramp: self.fast_ramp,
            cool_ramp: self.cool_ramp,
            pid: PidGains { kp: self.kp, ki: self.ki, kd: self.kd, ..PidGains::default() },
            tick_s: self.tick,
            sample_interval_s: self.sample_interval,
            expected_max_abs: self.expected_max_abs,
            switch_time_hrs: self.switch_time_hrs,
            ..ControllerConfig::default()
        }
    }

    pub fn plant_config(&self) -> PlantConfig {
        let defaults = PlantConfig::default();
        PlantConfig {
            start_temp_c: self.start_temp,
            dh_kj_mol: self.kinetics.dh,
            ds_j_mol_k: self.kinetics.ds,
            a0: self.kinetics.a0,
            a_inf: self.kinetics.a_inf,
            noise_sd: self.kinetics.noise.unwrap_or(defaults.noise_sd),
            seed: self.kinetics.seed,
            ..defaults
        }
    }
}
