//! Two-panel SVG figure (`--svg`).
//!
//! Left: absorbance trace with the fitted curve. Right: the linearized rate
//! plot with the fitted line (omitted when there is nothing to draw).

use std::error::Error;
use std::path::Path;

use plotters::prelude::*;

use crate::domain::{FitFile, FitResult, PlotAxis, PointResidual, RatePoint, celsius_to_kelvin};
use crate::error::AppError;
use crate::fit::linear_ordinate;
use crate::plot::ascii::{rate_line, rate_line_between};

/// Figure size in pixels.
pub const SVG_SIZE: (u32, u32) = (1200, 500);

/// Series for one figure, already in plot coordinates.
struct Figure<'a> {
    fit: &'a FitResult,
    x_desc: &'static str,
    observed: Vec<(f64, f64)>,
    curve: Vec<(f64, f64)>,
    rate_observed: Vec<(f64, f64)>,
    rate_line: Vec<(f64, f64)>,
}

fn bounds(values: impl Iterator<Item = f64>) -> (f64, f64) {
    let mut lo = f64::INFINITY;
    let mut hi = f64::NEG_INFINITY;
    for v in values.filter(|v| v.is_finite()) {
        lo = lo.min(v);
        hi = hi.max(v);
    }
    if !(lo.is_finite() && hi.is_finite()) {
        return (0.0, 1.0);
    }
    let pad = ((hi - lo) * 0.05).max(1e-9);
    (lo - pad, hi + pad)
}

fn x_value(axis: PlotAxis, time_s: f64, temperature_c: f64) -> f64 {
    match axis {
        PlotAxis::Temperature => temperature_c,
        PlotAxis::Time => time_s / 60.0,
    }
}

fn x_desc(axis: PlotAxis) -> &'static str {
    match axis {
        PlotAxis::Temperature => "Temperature (°C)",
        PlotAxis::Time => "Time (min)",
    }
}

/// Write the figure for a finished fit.
pub fn write_fit_svg(
    path: &Path,
    residuals: &[PointResidual],
    rates: &[RatePoint],
    fit: &FitResult,
    axis: PlotAxis,
) -> Result<(), AppError> {
    let x_of = |r: &PointResidual| x_value(axis, r.point.time_s, r.point.temperature_c());
    let figure = Figure {
        fit,
        x_desc: x_desc(axis),
        observed: residuals.iter().map(|r| (x_of(r), r.point.absorbance)).collect(),
        curve: residuals.iter().map(|r| (x_of(r), r.a_fit)).collect(),
        rate_observed: rates
            .iter()
            .map(|r| (1000.0 / r.temperature_k, linear_ordinate(fit.law, r)))
            .collect(),
        rate_line: rate_line(rates, fit, 50),
    };
    write(path, &figure)
}

/// Write the figure for a saved fit file.
///
/// The file keeps no observations, so the trace panel shows the fitted grid
/// and the rate panel shows the rate-law line across the grid's temperatures.
pub fn write_fit_file_svg(path: &Path, fit_file: &FitFile, axis: PlotAxis) -> Result<(), AppError> {
    let grid = &fit_file.grid;
    let (t_lo, t_hi) = grid
        .temperature_c
        .iter()
        .filter(|t| t.is_finite())
        .fold((f64::INFINITY, f64::NEG_INFINITY), |(lo, hi), &t| (lo.min(t), hi.max(t)));

    let figure = Figure {
        fit: &fit_file.fit,
        x_desc: x_desc(axis),
        observed: Vec::new(),
        curve: grid
            .time_s
            .iter()
            .zip(&grid.temperature_c)
            .zip(&grid.absorbance)
            .map(|((&t, &c), &a)| (x_value(axis, t, c), a))
            .collect(),
        rate_observed: Vec::new(),
        rate_line: rate_line_between(&fit_file.fit, celsius_to_kelvin(t_lo), celsius_to_kelvin(t_hi), 50),
    };
    write(path, &figure)
}

fn write(path: &Path, figure: &Figure<'_>) -> Result<(), AppError> {
    draw(path, figure).map_err(|e| AppError::new(4, format!("Failed to render SVG '{}': {e}", path.display())))
}

fn draw(path: &Path, figure: &Figure<'_>) -> Result<(), Box<dyn Error>> {
    let root = SVGBackend::new(path, SVG_SIZE).into_drawing_area();
    root.fill(&WHITE)?;
    let (left, right) = root.split_horizontally(SVG_SIZE.0 / 2);
    let fit = figure.fit;

    let (x0, x1) = bounds(figure.observed.iter().chain(&figure.curve).map(|p| p.0));
    let (y0, y1) = bounds(figure.observed.iter().chain(&figure.curve).map(|p| p.1));

    let mut trace = ChartBuilder::on(&left)
        .caption(format!("Absorbance: {}", fit.label()), ("sans-serif", 20))
        .margin(10)
        .set_label_area_size(LabelAreaPosition::Left, 60)
        .set_label_area_size(LabelAreaPosition::Bottom, 40)
        .build_cartesian_2d(x0..x1, y0..y1)?;
    trace.configure_mesh().x_desc(figure.x_desc).y_desc("Absorbance").draw()?;
    trace.draw_series(figure.observed.iter().map(|&xy| Circle::new(xy, 2, BLACK.filled())))?;
    trace.draw_series(LineSeries::new(figure.curve.iter().copied(), &RED))?;

    if !figure.rate_observed.is_empty() || !figure.rate_line.is_empty() {
        let (rx0, rx1) = bounds(figure.rate_observed.iter().chain(&figure.rate_line).map(|p| p.0));
        let (ry0, ry1) = bounds(figure.rate_observed.iter().chain(&figure.rate_line).map(|p| p.1));

        let mut linear = ChartBuilder::on(&right)
            .caption(format!("{} plot", fit.law.display_name()), ("sans-serif", 20))
            .margin(10)
            .set_label_area_size(LabelAreaPosition::Left, 60)
            .set_label_area_size(LabelAreaPosition::Bottom, 40)
            .build_cartesian_2d(rx0..rx1, ry0..ry1)?;
        linear
            .configure_mesh()
            .x_desc("1000/T (1/K)")
            .y_desc(fit.law.linear_label())
            .draw()?;
        linear.draw_series(figure.rate_observed.iter().map(|&xy| Circle::new(xy, 2, BLUE.filled())))?;
        linear.draw_series(LineSeries::new(figure.rate_line.iter().copied(), &RED))?;
    }

    root.present()?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::fit::selection::fit_and_select;
    use crate::fit::testdata::ramp_and_hold;
    use crate::domain::{FitConfig, MethodSpec, ModelSpec};
    use crate::report::compute_residuals;
    use std::path::PathBuf;

    #[test]
    fn writes_an_svg_document() {
        let (points, _) = ramp_and_hold(0.0);
        let mut config = FitConfig::for_path(PathBuf::from("synthetic.csv"));
        config.model_spec = ModelSpec::Eyring;
        config.method_spec = MethodSpec::Linear;
        let sel = fit_and_select(&points, &config).unwrap();
        let residuals = compute_residuals(&points, &sel.best).unwrap();

        let path = std::env::temp_dir().join(format!("ramp_svg_test_{}.svg", std::process::id()));
        write_fit_svg(&path, &residuals, &sel.rates, &sel.best, PlotAxis::Temperature).unwrap();
        let body = std::fs::read_to_string(&path).unwrap();
        let _ = std::fs::remove_file(&path);
        assert!(body.contains("<svg"));
        assert!(body.contains("Eyring plot"));
    }

    #[test]
    fn saved_fit_renders_both_panels() {
        let (points, _) = ramp_and_hold(0.0);
        let mut config = FitConfig::for_path(PathBuf::from("synthetic.csv"));
        config.model_spec = ModelSpec::Eyring;
        config.method_spec = MethodSpec::Linear;
        let sel = fit_and_select(&points, &config).unwrap();
        let fit_file = crate::io::build_fit_file(&config.csv_path, &sel.best, &points, &[]);

        let line = rate_line_between(&fit_file.fit, 313.15, 373.15, 10);
        assert_eq!(line.len(), 10);
        assert!(line[0].0 > line[9].0);

        let path = std::env::temp_dir().join(format!("ramp_fit_file_svg_{}.svg", std::process::id()));
        write_fit_file_svg(&path, &fit_file, PlotAxis::Time).unwrap();
        let body = std::fs::read_to_string(&path).unwrap();
        let _ = std::fs::remove_file(&path);
        assert!(body.contains("<svg"));
        assert!(body.contains("Absorbance: Eyring (linear)"));
        assert!(body.contains("Eyring plot"));
    }
}
