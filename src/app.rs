//! Top-level application orchestration.
//!
//! `src/main.rs` is intentionally tiny; this module is the "real main" that:
//! - loads `.env` and parses CLI arguments
//! - runs fits and prints reports/plots, writing optional exports
//! - generates synthetic datasets
//! - drives the ramp controller against a simulated or replayed instrument

use std::fs::File;
use std::io::{self, BufWriter, Write};

use clap::Parser;

use crate::cli::{Command, ControlArgs, FitArgs, PlotArgs, SimulateArgs};
use crate::control::{Clock, RampController, RampInstrument, RunOptions, SimClock, StopReason, WallClock};
use crate::domain::{FitConfig, FitMethod, PointResidual};
use crate::error::AppError;
use crate::sim::{ReplayInstrument, SimulatedInstrument};

pub mod pipeline;

/// Entry point for the `ramp` binary.
pub fn run() -> Result<(), AppError> {
    // A missing .env is the normal case.
    dotenvy::dotenv().ok();

    let argv = rewrite_args(std::env::args().collect());
    let cli = crate::cli::Cli::parse_from(argv);

    match cli.command {
        Command::Fit(args) => handle_fit(args),
        Command::Plot(args) => handle_plot(args),
        Command::Simulate(args) => handle_simulate(args),
        Command::Control(args) => handle_control(args),
        Command::Tui(args) => handle_tui(args),
    }
}

fn handle_fit(args: FitArgs) -> Result<(), AppError> {
    let path = crate::cli::picker::resolve_csv_path(args.file.as_deref())?;
    let config = args.to_config(path);
    let run = pipeline::run_fit(&config)?;

    println!(
        "{}",
        crate::report::format_run_summary(&run.ingest, &run.selection, &run.half_lives, &config)
    );

    let largest = crate::report::largest_residuals(&run.residuals, config.top_n);
    if let Some(table) = residual_section(&largest) {
        println!("{table}");
    }

    if config.plot {
        let plot = crate::plot::render_trace_plot(
            &run.residuals,
            config.plot_x,
            config.plot_width,
            config.plot_height,
            Some(&largest),
        );
        println!("{plot}");
        if config.plot_rates {
            print_rate_plot(&run, &config);
        }
    }

    write_fit_exports(&run, &config)
}

/// The largest-residual table, or nothing when there are no rows.
fn residual_section(largest: &[PointResidual]) -> Option<String> {
    if largest.is_empty() {
        return None;
    }
    Some(crate::report::format_residual_table(largest))
}

fn print_rate_plot(run: &pipeline::RunOutput, config: &FitConfig) {
    if run.selection.rates.len() < 2 {
        eprintln!("Warning: too few rate points for a rate plot.");
        return;
    }
    // The rate plot shows the best fit of the chosen law, which may be integrated.
    let best = &run.selection.best;
    if best.method != FitMethod::Linear {
        eprintln!(
            "Note: rate plot line uses the {} parameters.",
            best.label()
        );
    }
    println!(
        "{}",
        crate::plot::render_rate_plot(&run.selection.rates, best, config.plot_width, config.plot_height)
    );
}

fn write_fit_exports(run: &pipeline::RunOutput, config: &FitConfig) -> Result<(), AppError> {
    let best = &run.selection.best;
    if let Some(path) = &config.export_results {
        crate::io::write_results_csv(path, &run.residuals)?;
        eprintln!("Wrote {}", path.display());
    }
    if let Some(path) = &config.export_rates {
        crate::io::write_rates_csv(path, &run.selection.rates, best.law)?;
        eprintln!("Wrote {}", path.display());
    }
    if let Some(path) = &config.export_fit {
        let fit_file =
            crate::io::build_fit_file(&config.csv_path, best, &run.ingest.points, &config.half_life_at_c);
        crate::io::write_fit_json(path, &fit_file)?;
        eprintln!("Wrote {}", path.display());
    }
    if let Some(path) = &config.report {
        crate::report::write_markdown_report(path, &run.ingest, &run.selection, &run.half_lives, config)?;
        eprintln!("Wrote {}", path.display());
    }
    if let Some(path) = &config.svg {
        crate::plot::write_fit_svg(path, &run.residuals, &run.selection.rates, best, config.plot_x)?;
        eprintln!("Wrote {}", path.display());
    }
    Ok(())
}

fn handle_plot(args: PlotArgs) -> Result<(), AppError> {
    let fit_file = crate::io::read_fit_json(&args.fit)?;
    println!("Fit: {} | source: {}", fit_file.fit.label(), fit_file.source);
    println!(
        "{}",
        crate::plot::render_fit_file_plot(&fit_file, args.plot_x, args.width, args.height)
    );
    if let Some(path) = &args.svg {
        crate::plot::write_fit_file_svg(path, &fit_file, args.plot_x)?;
        eprintln!("Wrote {}", path.display());
    }
    Ok(())
}

fn handle_simulate(args: SimulateArgs) -> Result<(), AppError> {
    let spec = args.to_spec();
    let samples = crate::sim::generate_dataset(&spec)?;
    crate::io::write_trace_csv(&args.out, &samples)?;
    eprintln!(
        "Wrote {} samples ({:.0}-{:.0} °C at {} °C/min, hold {} min) to {}",
        samples.len(),
        spec.start_c,
        spec.end_c,
        spec.ramp_c_per_min,
        spec.hold_min,
        args.out.display()
    );
    Ok(())
}

fn handle_control(args: ControlArgs) -> Result<(), AppError> {
    let mut controller = RampController::new(args.controller_config());
    let options = RunOptions {
        max_ticks: args.max_ticks,
        trace_every_s: args.trace.as_ref().map(|_| args.trace_every),
        verbose: !args.quiet,
    };

    let mut commands_out: Box<dyn Write> = match &args.commands {
        Some(path) => {
            let file = File::create(path).map_err(|e| {
                AppError::new(2, format!("Failed to create commands file '{}': {e}", path.display()))
            })?;
            Box::new(BufWriter::new(file))
        }
        None => Box::new(io::stdout().lock()),
    };

    let mut instrument: Box<dyn RampInstrument> = match &args.replay {
        Some(path) => {
            let path = crate::cli::picker::validate_csv_path(path)?;
            let ingest = crate::io::load_ramp_points(&FitConfig::for_path(path))?;
            let replay = ReplayInstrument::new(ingest.points)?;
            eprintln!("Replaying {:.1} min of data.", replay.duration_s() / 60.0);
            Box::new(replay)
        }
        None => Box::new(SimulatedInstrument::new(&args.plant_config())?),
    };

    let mut clock: Box<dyn Clock> = if args.realtime {
        Box::new(WallClock::default())
    } else {
        Box::new(SimClock::new())
    };

    let run = crate::control::run_controller(
        &mut controller,
        instrument.as_mut(),
        clock.as_mut(),
        &options,
        commands_out.as_mut(),
    )?;
    commands_out
        .flush()
        .map_err(|e| AppError::new(2, format!("Failed to write commands: {e}")))?;

    let reason = match run.stop {
        StopReason::Done => "controller finished",
        StopReason::MaxTicks => "tick limit reached",
        StopReason::SourceExhausted => "replay data exhausted",
    };
    eprintln!(
        "Stopped after {} ticks ({}): {} commands sent, {} failed, final state {}.",
        run.ticks,
        reason,
        run.commands_sent,
        run.send_failures,
        controller.state().as_str()
    );

    if let Some(path) = &args.log {
        crate::control::write_control_log(path, &run.updates)?;
        eprintln!("Wrote {}", path.display());
    }
    if let Some(path) = &args.trace {
        crate::io::write_trace_csv(path, &run.trace)?;
        eprintln!("Wrote {} trace samples to {}", run.trace.len(), path.display());
    }
    Ok(())
}

fn handle_tui(args: FitArgs) -> Result<(), AppError> {
    crate::tui::run(args)
}

/// Rewrite argv so `ramp` defaults to `ramp fit`.
///
/// Rules:
/// - `ramp`                      -> `ramp fit`
/// - `ramp -f data.csv ...`      -> `ramp fit -f data.csv ...`
/// - `ramp --help/--version/-h`  -> unchanged (show top-level help/version)
fn rewrite_args(mut argv: Vec<String>) -> Vec<String> {
    let Some(arg1) = argv.get(1).cloned() else {
        argv.push("fit".to_string());
        return argv;
    };

    if matches!(arg1.as_str(), "-h" | "--help" | "-V" | "--version" | "help") {
        return argv;
    }
    if matches!(arg1.as_str(), "fit" | "plot" | "simulate" | "control" | "tui") {
        return argv;
    }
    if arg1.starts_with('-') {
        argv.insert(1, "fit".to_string());
    }
    argv
}
