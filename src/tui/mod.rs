//! Ratatui-based terminal UI.
//!
//! The TUI shows one dataset and its selected fit: a header with the chosen
//! model and activation parameters, a chart (absorbance trace or linearized
//! rate plot), and a settings list that refits on every change.

use std::io;
use std::path::PathBuf;
use std::time::Duration;

use crossterm::{
    event::{self, Event, KeyCode, KeyEventKind},
    execute,
    terminal::{EnterAlternateScreen, LeaveAlternateScreen, disable_raw_mode, enable_raw_mode},
};
use ratatui::{
    Terminal,
    backend::CrosstermBackend,
    layout::{Alignment, Constraint, Direction, Layout, Rect},
    style::{Color, Modifier, Style},
    text::{Line, Span, Text},
    widgets::{Block, Borders, Clear, List, ListItem, ListState, Paragraph},
};

use crate::app::pipeline::{RunOutput, run_fit_on};
use crate::cli::FitArgs;
use crate::domain::{FitConfig, MethodSpec, ModelSpec, PlotAxis};
use crate::error::AppError;
use crate::fit::linear_ordinate;
use crate::io::IngestedData;

mod chart;

use chart::FitChart;

const SETTINGS: usize = 5;
const RATE_WINDOW_STEP_S: f64 = 60.0;
const ALPHA_STEP: f64 = 0.05;

/// Start the TUI for the dataset named by `args` (prompting if none).
pub fn run(args: FitArgs) -> Result<(), AppError> {
    // The picker needs a normal terminal, so resolve the path first.
    let path = crate::cli::picker::resolve_csv_path(args.file.as_deref())?;
    let config = args.to_config(path);

    let _guard = TerminalGuard::new()?;
    let backend = CrosstermBackend::new(io::stdout());
    let mut terminal = Terminal::new(backend)
        .map_err(|e| AppError::new(4, format!("Failed to initialize terminal: {e}")))?;

    let mut app = App::new(config);
    app.reload();
    app.event_loop(&mut terminal)
}

/// Ensures the terminal is restored (raw mode, alternate screen) on exit.
struct TerminalGuard;

impl TerminalGuard {
    fn new() -> Result<Self, AppError> {
        enable_raw_mode().map_err(|e| AppError::new(4, format!("Failed to enable raw mode: {e}")))?;
        if let Err(e) = execute!(io::stdout(), EnterAlternateScreen) {
            let _ = disable_raw_mode();
            return Err(AppError::new(4, format!("Failed to enter alternate screen: {e}")));
        }
        Ok(Self)
    }
}

impl Drop for TerminalGuard {
    fn drop(&mut self) {
        let _ = disable_raw_mode();
        let _ = execute!(io::stdout(), LeaveAlternateScreen);
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum View {
    Trace,
    Rates,
}

struct App {
    config: FitConfig,
    selected_field: usize,
    view: View,
    status: String,
    ingest: Option<IngestedData>,
    run: Option<RunOutput>,
}

impl App {
    fn new(config: FitConfig) -> Self {
        Self {
            config,
            selected_field: 0,
            view: View::Trace,
            status: String::new(),
            ingest: None,
            run: None,
        }
    }

    fn event_loop<B: ratatui::backend::Backend>(&mut self, terminal: &mut Terminal<B>) -> Result<(), AppError> {
        let mut needs_redraw = true;
        loop {
            if needs_redraw {
                terminal
                    .draw(|f| self.draw(f))
                    .map_err(|e| AppError::new(4, format!("Terminal draw error: {e}")))?;
                needs_redraw = false;
            }

            if !event::poll(Duration::from_millis(100))
                .map_err(|e| AppError::new(4, format!("Event poll error: {e}")))?
            {
                continue;
            }

            match event::read().map_err(|e| AppError::new(4, format!("Event read error: {e}")))? {
                Event::Key(key) => {
                    if key.kind != KeyEventKind::Press {
                        continue;
                    }
                    if self.handle_key(key.code) {
                        break;
                    }
                    needs_redraw = true;
                }
                Event::Resize(_, _) => needs_redraw = true,
                _ => {}
            }
        }
        Ok(())
    }

    /// Returns `true` when the user asked to quit.
    fn handle_key(&mut self, code: KeyCode) -> bool {
        match code {
            KeyCode::Char('q') | KeyCode::Esc => return true,
            KeyCode::Up => self.selected_field = self.selected_field.saturating_sub(1),
            KeyCode::Down => self.selected_field = (self.selected_field + 1).min(SETTINGS - 1),
            KeyCode::Left => self.adjust_field(-1),
            KeyCode::Right => self.adjust_field(1),
            KeyCode::Char('r') => self.reload(),
            KeyCode::Char('v') => {
                self.view = match self.view {
                    View::Trace => View::Rates,
                    View::Rates => View::Trace,
                };
            }
            KeyCode::Char('e') => self.write_report(),
            _ => {}
        }
        false
    }

    fn adjust_field(&mut self, delta: i32) {
        let forward = delta >= 0;
        let cfg = &mut self.config;
        match self.selected_field {
            0 => cfg.model_spec = cycle_model(cfg.model_spec, forward),
            1 => cfg.method_spec = cycle_method(cfg.method_spec, forward),
            2 => {
                let step = if forward { RATE_WINDOW_STEP_S } else { -RATE_WINDOW_STEP_S };
                cfg.rate_window_s = (cfg.rate_window_s + step).max(RATE_WINDOW_STEP_S);
            }
            3 => cfg.alpha_min = step_alpha(cfg.alpha_min, forward, 0.0, cfg.alpha_max - ALPHA_STEP),
            4 => cfg.alpha_max = step_alpha(cfg.alpha_max, forward, cfg.alpha_min + ALPHA_STEP, 1.0),
            _ => return,
        }
        self.refit();
    }

    /// Re-read the dataset from disk and refit.
    fn reload(&mut self) {
        match crate::io::load_ramp_points(&self.config) {
            Ok(ingest) => {
                self.ingest = Some(ingest);
                self.refit();
            }
            Err(err) => {
                self.ingest = None;
                self.run = None;
                self.status = format!("Load failed: {err}");
            }
        }
    }

    /// Refit the cached dataset with the current settings.
    ///
    /// A failed fit keeps the previous result on screen.
    fn refit(&mut self) {
        let Some(ingest) = &self.ingest else {
            self.status = "No data loaded (r to reload).".to_string();
            return;
        };
        match run_fit_on(ingest.clone(), &self.config) {
            Ok(run) => {
                self.status = format!(
                    "{} candidate(s), {} rate points",
                    run.selection.fits.len(),
                    run.selection.rates.len()
                );
                self.run = Some(run);
            }
            Err(err) => self.status = format!("Fit failed: {err}"),
        }
    }

    fn write_report(&mut self) {
        let Some(run) = &self.run else {
            self.status = "Nothing to report yet.".to_string();
            return;
        };
        let path = self
            .config
            .report
            .clone()
            .unwrap_or_else(|| default_report_path(&self.config.csv_path));
        self.status = match crate::report::write_markdown_report(
            &path,
            &run.ingest,
            &run.selection,
            &run.half_lives,
            &self.config,
        ) {
            Ok(()) => format!("Wrote {}", path.display()),
            Err(err) => format!("Report failed: {err}"),
        };
    }

    fn draw(&mut self, frame: &mut ratatui::Frame<'_>) {
        let chunks = Layout::default()
            .direction(Direction::Vertical)
            .constraints([Constraint::Length(5), Constraint::Min(0), Constraint::Length(3)])
            .split(frame.area());

        self.draw_header(frame, chunks[0]);
        self.draw_body(frame, chunks[1]);
        self.draw_footer(frame, chunks[2]);
    }

    fn draw_header(&self, frame: &mut ratatui::Frame<'_>, area: Rect) {
        let gray = Style::default().fg(Color::Gray);
        let mut lines = vec![Line::from(vec![
            Span::styled("ramp", Style::default().fg(Color::Cyan)),
            Span::raw(format!(" - {}", self.config.csv_path.display())),
        ])];

        match &self.run {
            Some(run) => {
                let best = &run.selection.best;
                lines.push(Line::from(Span::styled(
                    format!(
                        "model: {} | n={} | rmse={:.5} | bic={:.2}",
                        best.label(),
                        best.quality.n,
                        best.quality.rmse,
                        best.quality.bic
                    ),
                    gray,
                )));
                lines.push(Line::from(Span::styled(crate::report::format_activation(best), gray)));
            }
            None => lines.push(Line::from(Span::styled("model: -", gray))),
        }

        let p = Paragraph::new(Text::from(lines)).block(Block::default().borders(Borders::ALL));
        frame.render_widget(p, area);
    }

    fn draw_body(&self, frame: &mut ratatui::Frame<'_>, area: Rect) {
        let chunks = Layout::default()
            .direction(Direction::Vertical)
            .constraints([Constraint::Min(0), Constraint::Length(SETTINGS as u16 + 2)])
            .split(area);

        self.draw_chart(frame, chunks[0]);
        self.draw_settings(frame, chunks[1]);
    }

    fn draw_chart(&self, frame: &mut ratatui::Frame<'_>, area: Rect) {
        let title = match self.view {
            View::Trace => "Absorbance trace",
            View::Rates => "Rate plot",
        };
        let block = Block::default().title(title).borders(Borders::ALL);
        let inner = block.inner(area);
        frame.render_widget(block, area);
        frame.render_widget(Clear, inner);

        let Some(run) = &self.run else {
            let msg = Paragraph::new("No fit available.").style(Style::default().fg(Color::Yellow));
            frame.render_widget(msg, inner);
            return;
        };

        let series = match self.view {
            View::Trace => trace_series(run, self.config.plot_x, self.config.top_n),
            View::Rates => rate_series(run),
        };
        let Some((x_bounds, y_bounds)) = series_bounds(&series) else {
            let msg = Paragraph::new("Not enough points to plot.").style(Style::default().fg(Color::Yellow));
            frame.render_widget(msg, inner);
            return;
        };

        let (chart_rect, insets) = chart_layout(inner);
        let widget = FitChart {
            fit: &series.fit,
            points: &series.points,
            highlights: &series.highlights,
            x_bounds,
            y_bounds,
            x_label: series.x_label,
            y_label: series.y_label,
            fmt_x: fmt_axis,
            fmt_y: fmt_axis,
        };
        frame.render_widget(widget, chart_rect);
        if let Some(insets) = insets {
            draw_axis_ticks(frame, inner, chart_rect, insets, x_bounds, y_bounds, &series);
        }
    }

    fn draw_settings(&self, frame: &mut ratatui::Frame<'_>, area: Rect) {
        let cfg = &self.config;
        let items = vec![
            ListItem::new(format!("Rate law: {}", model_label(cfg.model_spec))),
            ListItem::new(format!("Method: {}", method_label(cfg.method_spec))),
            ListItem::new(format!("Rate window: {:.0} s", cfg.rate_window_s)),
            ListItem::new(format!("α min: {:.2}", cfg.alpha_min)),
            ListItem::new(format!("α max: {:.2}", cfg.alpha_max)),
        ];

        let list = List::new(items)
            .block(Block::default().title("Settings").borders(Borders::ALL))
            .highlight_style(Style::default().fg(Color::Black).bg(Color::White))
            .highlight_symbol("» ");

        let mut state = ListState::default();
        state.select(Some(self.selected_field));
        frame.render_stateful_widget(list, area, &mut state);
    }

    fn draw_footer(&self, frame: &mut ratatui::Frame<'_>, area: Rect) {
        let help = "↑/↓ select  ←/→ adjust  v view  r reload  e report  q quit";
        let line = Line::from(vec![
            Span::styled(help, Style::default().fg(Color::Gray)),
            Span::raw(" | "),
            Span::styled(
                &self.status,
                Style::default().fg(Color::Yellow).add_modifier(Modifier::BOLD),
            ),
        ]);
        let p = Paragraph::new(line).block(Block::default().borders(Borders::ALL));
        frame.render_widget(p, area);
    }
}

/// Chart data for one view.
struct Series {
    fit: Vec<(f64, f64)>,
    points: Vec<(f64, f64)>,
    highlights: Vec<(f64, f64)>,
    x_label: &'static str,
    y_label: &'static str,
}

fn trace_x(axis: PlotAxis, r: &crate::domain::PointResidual) -> f64 {
    match axis {
        PlotAxis::Temperature => r.point.temperature_c(),
        PlotAxis::Time => r.point.time_s / 60.0,
    }
}

fn trace_series(run: &RunOutput, axis: PlotAxis, top_n: usize) -> Series {
    let points = run
        .residuals
        .iter()
        .map(|r| (trace_x(axis, r), r.point.absorbance))
        .collect();
    let fit = run.residuals.iter().map(|r| (trace_x(axis, r), r.a_fit)).collect();
    let highlights = crate::report::largest_residuals(&run.residuals, top_n)
        .iter()
        .map(|r| (trace_x(axis, r), r.point.absorbance))
        .collect();
    Series {
        fit,
        points,
        highlights,
        x_label: match axis {
            PlotAxis::Temperature => "T (°C)",
            PlotAxis::Time => "t (min)",
        },
        y_label: "A",
    }
}

fn rate_series(run: &RunOutput) -> Series {
    let best = &run.selection.best;
    let rates = &run.selection.rates;
    Series {
        fit: crate::plot::rate_line(rates, best, 100),
        points: rates
            .iter()
            .map(|r| (1000.0 / r.temperature_k, linear_ordinate(best.law, r)))
            .collect(),
        highlights: Vec::new(),
        x_label: "1000/T",
        y_label: best.law.linear_label(),
    }
}

/// Padded bounds over every finite point of a series.
fn series_bounds(series: &Series) -> Option<([f64; 2], [f64; 2])> {
    let (mut x_min, mut x_max) = (f64::INFINITY, f64::NEG_INFINITY);
    let (mut y_min, mut y_max) = (f64::INFINITY, f64::NEG_INFINITY);
    for &(x, y) in series.points.iter().chain(&series.fit) {
        if !(x.is_finite() && y.is_finite()) {
            continue;
        }
        x_min = x_min.min(x);
        x_max = x_max.max(x);
        y_min = y_min.min(y);
        y_max = y_max.max(y);
    }
    if !(x_max > x_min && y_max > y_min) {
        return None;
    }
    let y_pad = (y_max - y_min) * 0.05;
    Some(([x_min, x_max], [y_min - y_pad, y_max + y_pad]))
}

fn cycle_model(cur: ModelSpec, forward: bool) -> ModelSpec {
    const ORDER: [ModelSpec; 4] = [ModelSpec::Auto, ModelSpec::Eyring, ModelSpec::Arrhenius, ModelSpec::All];
    cycle(&ORDER, cur, forward)
}

fn cycle_method(cur: MethodSpec, forward: bool) -> MethodSpec {
    const ORDER: [MethodSpec; 3] = [MethodSpec::Both, MethodSpec::Integrated, MethodSpec::Linear];
    cycle(&ORDER, cur, forward)
}

fn cycle<T: Copy + PartialEq>(order: &[T], cur: T, forward: bool) -> T {
    let i = order.iter().position(|v| *v == cur).unwrap_or(0);
    let n = order.len();
    if forward { order[(i + 1) % n] } else { order[(i + n - 1) % n] }
}

fn step_alpha(cur: f64, forward: bool, lo: f64, hi: f64) -> f64 {
    let next = if forward { cur + ALPHA_STEP } else { cur - ALPHA_STEP };
    // Snap to the step grid.
    ((next / ALPHA_STEP).round() * ALPHA_STEP).clamp(lo.min(cur), hi.max(cur))
}

fn model_label(spec: ModelSpec) -> &'static str {
    match spec {
        ModelSpec::Auto => "auto",
        ModelSpec::Eyring => "Eyring",
        ModelSpec::Arrhenius => "Arrhenius",
        ModelSpec::All => "all",
    }
}

fn method_label(spec: MethodSpec) -> &'static str {
    match spec {
        MethodSpec::Both => "both",
        MethodSpec::Integrated => "integrated",
        MethodSpec::Linear => "linear",
    }
}

fn default_report_path(csv_path: &std::path::Path) -> PathBuf {
    let stem = csv_path.file_stem().and_then(|s| s.to_str()).unwrap_or("ramp");
    csv_path.with_file_name(format!("{stem}_report.md"))
}

fn fmt_axis(v: f64) -> String {
    format!("{v:.2}")
}

#[derive(Debug, Clone, Copy)]
struct AxisInsets {
    left: u16,
    right: u16,
    top: u16,
    bottom: u16,
}

fn chart_layout(inner: Rect) -> (Rect, Option<AxisInsets>) {
    let insets = AxisInsets {
        left: 8,
        right: 2,
        top: 1,
        bottom: 2,
    };

    if inner.width <= insets.left + insets.right + 10 || inner.height <= insets.top + insets.bottom + 5 {
        return (inner, None);
    }

    let rect = Rect {
        x: inner.x + insets.left,
        y: inner.y + insets.top,
        width: inner.width - insets.left - insets.right,
        height: inner.height - insets.top - insets.bottom,
    };
    (rect, Some(insets))
}

fn draw_axis_ticks(
    frame: &mut ratatui::Frame<'_>,
    inner: Rect,
    chart: Rect,
    insets: AxisInsets,
    x_bounds: [f64; 2],
    y_bounds: [f64; 2],
    series: &Series,
) {
    let ticks = 5usize;
    let style = Style::default().fg(Color::Gray);

    for i in 0..ticks {
        let u = i as f64 / (ticks as f64 - 1.0);
        let label = format!("{:.1}", x_bounds[0] + u * (x_bounds[1] - x_bounds[0]));
        let x = chart.x + ((chart.width - 1) as f64 * u).round() as u16;
        let y = chart.y + chart.height;
        if y >= inner.y + inner.height - 1 {
            continue;
        }
        let rect = Rect {
            x: x.saturating_sub((label.len() / 2) as u16),
            y,
            width: label.len() as u16,
            height: 1,
        };
        frame.render_widget(Paragraph::new(label).style(style), rect);
    }

    for i in 0..ticks {
        let u = i as f64 / (ticks as f64 - 1.0);
        let label = format!("{:.3}", y_bounds[0] + u * (y_bounds[1] - y_bounds[0]));
        let y = chart.y + (chart.height - 1) - ((chart.height - 1) as f64 * u).round() as u16;
        let start = (inner.x + insets.left.saturating_sub(1)).saturating_sub(label.len() as u16);
        if start < inner.x {
            continue;
        }
        let rect = Rect {
            x: start,
            y,
            width: label.len() as u16,
            height: 1,
        };
        frame.render_widget(Paragraph::new(label).style(style), rect);
    }

    let x_rect = Rect {
        x: chart.x,
        y: chart.y + chart.height + 1,
        width: chart.width,
        height: 1,
    };
    if x_rect.y < inner.y + inner.height {
        frame.render_widget(
            Paragraph::new(series.x_label).alignment(Alignment::Center).style(style),
            x_rect,
        );
    }

    let y_rect = Rect {
        x: inner.x,
        y: inner.y,
        width: insets.left.saturating_sub(1),
        height: 1,
    };
    frame.render_widget(
        Paragraph::new(series.y_label).style(style.add_modifier(Modifier::BOLD)),
        y_rect,
    );
}
