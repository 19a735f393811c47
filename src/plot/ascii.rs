//! ASCII/Unicode plotting for terminal output.
//!
//! This is intentionally "dumb" (fixed-size grid), optimized for:
//! - quick visual sanity checks in a terminal
//! - deterministic output (helpful for golden tests)
//!
//! Plot elements:
//! - observed points: `o`
//! - fitted curve: `-` line
//! - optional highlights: `X` (largest residuals)

use std::collections::HashSet;

use crate::domain::{FitFile, FitResult, PlotAxis, PointResidual, RatePoint};
use crate::fit::linear_ordinate;
use crate::models::ln_rate_constant;

/// Axis labels and data for one plot.
struct Frame<'a> {
    x_label: &'a str,
    y_label: &'a str,
    observed: Vec<(f64, f64)>,
    highlighted: Vec<(f64, f64)>,
    curve: Vec<(f64, f64)>,
}

fn trace_x(axis: PlotAxis, time_s: f64, temperature_c: f64) -> f64 {
    match axis {
        PlotAxis::Temperature => temperature_c,
        PlotAxis::Time => time_s / 60.0,
    }
}

fn axis_label(axis: PlotAxis) -> &'static str {
    match axis {
        PlotAxis::Temperature => "T(°C)",
        PlotAxis::Time => "t(min)",
    }
}

/// Absorbance trace with the fitted curve.
///
/// `highlights` marks observations (by dataset index) with `X`.
pub fn render_trace_plot(
    residuals: &[PointResidual],
    axis: PlotAxis,
    width: usize,
    height: usize,
    highlights: Option<&[PointResidual]>,
) -> String {
    let marked: HashSet<usize> = highlights
        .map(|h| h.iter().map(|r| r.point.index).collect())
        .unwrap_or_default();

    let mut observed = Vec::with_capacity(residuals.len());
    let mut highlighted = Vec::new();
    for r in residuals {
        let xy = (trace_x(axis, r.point.time_s, r.point.temperature_c()), r.point.absorbance);
        if marked.contains(&r.point.index) {
            highlighted.push(xy);
        } else {
            observed.push(xy);
        }
    }
    let curve = residuals
        .iter()
        .map(|r| (trace_x(axis, r.point.time_s, r.point.temperature_c()), r.a_fit))
        .collect();

    render(
        &Frame { x_label: axis_label(axis), y_label: "A", observed, highlighted, curve },
        width,
        height,
    )
}

/// Linearized rate plot (`1000/T` against `ln(k/T)` or `ln k`) with the fitted line.
pub fn render_rate_plot(rates: &[RatePoint], fit: &FitResult, width: usize, height: usize) -> String {
    let observed: Vec<(f64, f64)> = rates
        .iter()
        .map(|r| (1000.0 / r.temperature_k, linear_ordinate(fit.law, r)))
        .collect();
    let curve = rate_line(rates, fit, width.max(2));
    render(
        &Frame {
            x_label: "1000/T",
            y_label: fit.law.linear_label(),
            observed,
            highlighted: Vec::new(),
            curve,
        },
        width,
        height,
    )
}

/// Curve-only plot of a saved fit file.
pub fn render_fit_file_plot(fit_file: &FitFile, axis: PlotAxis, width: usize, height: usize) -> String {
    let grid = &fit_file.grid;
    let curve = grid
        .time_s
        .iter()
        .zip(&grid.temperature_c)
        .zip(&grid.absorbance)
        .map(|((&t, &c), &a)| (trace_x(axis, t, c), a))
        .collect();
    render(
        &Frame { x_label: axis_label(axis), y_label: "A", observed: Vec::new(), highlighted: Vec::new(), curve },
        width,
        height,
    )
}

/// Fitted line of the linearized plot over the temperature span of the rate points.
pub fn rate_line(rates: &[RatePoint], fit: &FitResult, n: usize) -> Vec<(f64, f64)> {
    let mut t_lo = f64::INFINITY;
    let mut t_hi = f64::NEG_INFINITY;
    for r in rates {
        t_lo = t_lo.min(r.temperature_k);
        t_hi = t_hi.max(r.temperature_k);
    }
    rate_line_between(fit, t_lo, t_hi, n)
}

/// Fitted line of the linearized plot between two absolute temperatures.
///
/// Points are `(1000/T, linearized ordinate)`; an invalid span yields no points.
pub fn rate_line_between(fit: &FitResult, t_lo_k: f64, t_hi_k: f64, n: usize) -> Vec<(f64, f64)> {
    if !(t_lo_k.is_finite() && t_hi_k.is_finite() && t_lo_k > 0.0 && t_hi_k >= t_lo_k) {
        return Vec::new();
    }

    let p = &fit.params;
    let n = n.max(2);
    (0..n)
        .map(|i| {
            let u = i as f64 / (n as f64 - 1.0);
            let t = t_lo_k + u * (t_hi_k - t_lo_k);
            let line_point = RatePoint {
                time_s: 0.0,
                temperature_k: t,
                conversion: 0.5,
                rate_k: ln_rate_constant(fit.law, p.energy_j_mol, p.ln_k_ref, p.t_ref_k, t).exp(),
            };
            (1000.0 / t, linear_ordinate(fit.law, &line_point))
        })
        .collect()
}

fn render(frame: &Frame<'_>, width: usize, height: usize) -> String {
    let width = width.max(10);
    let height = height.max(5);

    let all = || frame.observed.iter().chain(&frame.highlighted).chain(&frame.curve);
    let (x_min, x_max) = span(all().map(|p| p.0)).unwrap_or((0.0, 1.0));
    let (y_min, y_max) = span(all().map(|p| p.1)).unwrap_or((0.0, 1.0));
    let (y_min, y_max) = pad_range(y_min, y_max, 0.05);

    let mut grid = vec![vec![' '; width]; height];

    // Draw curve first (so points can overlay).
    draw_curve(&mut grid, &frame.curve, x_min, x_max, y_min, y_max);

    for &(x, y) in &frame.observed {
        grid[map_y(y, y_min, y_max, height)][map_x(x, x_min, x_max, width)] = 'o';
    }
    for &(x, y) in &frame.highlighted {
        grid[map_y(y, y_min, y_max, height)][map_x(x, x_min, x_max, width)] = 'X';
    }

    // Build final string. We include a small header with ranges.
    let mut out = String::new();
    out.push_str(&format!(
        "Plot: {}=[{x_min:.3}, {x_max:.3}] | {}=[{y_min:.4}, {y_max:.4}]\n",
        frame.x_label, frame.y_label
    ));

    for row in grid {
        out.push_str(&row.into_iter().collect::<String>());
        out.push('\n');
    }

    out
}

fn span(values: impl Iterator<Item = f64>) -> Option<(f64, f64)> {
    let mut lo = f64::INFINITY;
    let mut hi = f64::NEG_INFINITY;
    for v in values.filter(|v| v.is_finite()) {
        lo = lo.min(v);
        hi = hi.max(v);
    }
    if lo.is_finite() && hi.is_finite() && hi > lo {
        Some((lo, hi))
    } else {
        None
    }
}

fn pad_range(min: f64, max: f64, frac: f64) -> (f64, f64) {
    let span = (max - min).abs();
    let pad = (span * frac).max(1e-12);
    (min - pad, max + pad)
}

fn map_x(x: f64, x_min: f64, x_max: f64, width: usize) -> usize {
    let width = width.max(2);
    let u = ((x - x_min) / (x_max - x_min)).clamp(0.0, 1.0);
    if !u.is_finite() {
        return 0;
    }
    (u * (width as f64 - 1.0)).round() as usize
}

fn map_y(y: f64, y_min: f64, y_max: f64, height: usize) -> usize {
    let height = height.max(2);
    let u = ((y - y_min) / (y_max - y_min)).clamp(0.0, 1.0);
    if !u.is_finite() {
        return height - 1;
    }
    // y=top is max -> row 0
    (height as f64 - 1.0 - (u * (height as f64 - 1.0))).round() as usize
}

fn draw_curve(grid: &mut [Vec<char>], curve: &[(f64, f64)], x_min: f64, x_max: f64, y_min: f64, y_max: f64) {
    if curve.len() < 2 {
        return;
    }
    let height = grid.len();
    let width = grid[0].len();

    let mut prev = None;
    for &(x, y) in curve {
        if !(x.is_finite() && y.is_finite()) {
            prev = None;
            continue;
        }
        let xx = map_x(x, x_min, x_max, width);
        let yy = map_y(y, y_min, y_max, height);
        if let Some((x0, y0)) = prev {
            draw_line(grid, x0, y0, xx, yy, '-');
        } else {
            grid[yy][xx] = '-';
        }
        prev = Some((xx, yy));
    }
}

/// Integer line drawing (Bresenham-ish).
fn draw_line(grid: &mut [Vec<char>], x0: usize, y0: usize, x1: usize, y1: usize, ch: char) {
    let mut x0 = x0 as isize;
    let mut y0 = y0 as isize;
    let x1 = x1 as isize;
    let y1 = y1 as isize;

    let dx = (x1 - x0).abs();
    let sx = if x0 < x1 { 1 } else { -1 };
    let dy = -(y1 - y0).abs();
    let sy = if y0 < y1 { 1 } else { -1 };
    let mut err = dx + dy;

    loop {
        if y0 >= 0
            && (y0 as usize) < grid.len()
            && x0 >= 0
            && (x0 as usize) < grid[0].len()
            && grid[y0 as usize][x0 as usize] == ' '
        {
            grid[y0 as usize][x0 as usize] = ch;
        }

        if x0 == x1 && y0 == y1 {
            break;
        }
        let e2 = 2 * err;
        if e2 >= dy {
            err += dy;
            x0 += sx;
        }
        if e2 <= dx {
            err += dx;
            y0 += sy;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::{Activation, FitMethod, FitQuality, KineticParams, RampPoint, RateLaw};

    #[test]
    fn plot_golden_snapshot_small() {
        let frame = Frame {
            x_label: "x",
            y_label: "y",
            observed: vec![(1.0, 100.0), (10.0, 110.0)],
            highlighted: Vec::new(),
            curve: vec![(1.0, 100.0), (10.0, 100.0)],
        };
        let txt = render(&frame, 10, 5);
        let expected = concat!(
            "Plot: x=[1.000, 10.000] | y=[99.5000, 110.5000]\n",
            "         o\n",
            "          \n",
            "          \n",
            "          \n",
            "o---------\n",
        );
        assert_eq!(txt, expected);
    }

    #[test]
    fn highlighted_residuals_are_marked() {
        let residuals: Vec<PointResidual> = (0..3)
            .map(|i| PointResidual {
                point: RampPoint {
                    index: i,
                    time_s: 60.0 * i as f64,
                    temperature_k: 300.0 + i as f64,
                    absorbance: 0.1 * i as f64,
                    weight: 1.0,
                },
                a_fit: 0.1 * i as f64,
                residual: 0.0,
                conversion: 0.0,
            })
            .collect();
        let txt = render_trace_plot(&residuals, PlotAxis::Time, 20, 6, Some(&residuals[2..]));
        assert!(txt.starts_with("Plot: t(min)=[0.000, 2.000] | A=["));
        let body: String = txt.lines().skip(1).collect();
        assert_eq!(body.matches('X').count(), 1);
        assert_eq!(body.matches('o').count(), 2);
    }

    #[test]
    fn rate_line_is_straight_on_arrhenius_axes() {
        let params = KineticParams { a0: 0.0, a_inf: 1.0, energy_j_mol: 90_000.0, ln_k_ref: -8.0, t_ref_k: 340.0 };
        let fit = FitResult {
            law: RateLaw::Arrhenius,
            method: FitMethod::Linear,
            params,
            activation: Activation::Arrhenius { ea_kj_mol: 90.0, ln_a: 0.0 },
            quality: FitQuality { sse: 0.0, rmse: 0.0, bic: 0.0, n: 0 },
            linear: None,
        };
        let rates = [
            RatePoint { time_s: 0.0, temperature_k: 320.0, conversion: 0.2, rate_k: 1e-4 },
            RatePoint { time_s: 60.0, temperature_k: 360.0, conversion: 0.8, rate_k: 1e-2 },
        ];
        let line = rate_line(&rates, &fit, 5);
        assert_eq!(line.len(), 5);
        let slope = |a: (f64, f64), b: (f64, f64)| (b.1 - a.1) / (b.0 - a.0);
        let s0 = slope(line[0], line[1]);
        let s1 = slope(line[3], line[4]);
        assert!((s0 - s1).abs() < 1e-9 * s0.abs());
        // slope in 1000/T units is -Ea/R/1000
        assert!((s0 + 90_000.0 / crate::models::GAS_CONSTANT / 1000.0).abs() < 1e-6);
    }
}
