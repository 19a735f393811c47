//! Markdown report writer (`--report`).

use std::path::Path;

use chrono::Local;

use crate::domain::{FitConfig, HalfLife};
use crate::error::AppError;
use crate::fit::selection::FitSelection;
use crate::io::ingest::IngestedData;
use crate::report::format::{format_activation, format_duration, format_linear_errors};

/// Render the Markdown report for a finished fit.
pub fn render_markdown_report(
    ingest: &IngestedData,
    selection: &FitSelection,
    half_lives: &[HalfLife],
    config: &FitConfig,
) -> String {
    let mut out = String::new();

    out.push_str("# ramp kinetics report\n\n");
    out.push_str(&format!("- generated: {}\n", Local::now().to_rfc3339()));
    out.push_str(&format!("- data: `{}`\n", config.csv_path.display()));
    out.push_str(&format!(
        "- columns: time=`{}` ({:?}), temperature=`{}` ({:?}), absorbance=`{}`\n",
        ingest.input_spec.time_column,
        ingest.input_spec.time_unit,
        ingest.input_spec.temp_column,
        ingest.input_spec.temp_unit,
        ingest.input_spec.abs_column
    ));
    out.push_str(&format!(
        "- points: {} used of {} rows ({} skipped)\n",
        ingest.rows_used,
        ingest.rows_read,
        ingest.row_errors.len()
    ));
    out.push_str(&format!(
        "- models: {:?} | methods: {:?} | robust: {:?}\n",
        config.model_spec, config.method_spec, config.robust
    ));
    out.push_str(&format!(
        "- rate window: {:.0} s, conversion band {:.2}..{:.2}\n",
        config.rate_window_s, config.alpha_min, config.alpha_max
    ));
    out.push_str(&format!(
        "- baseline: A0={:.5}, A∞={:.5}; rate points: {}\n",
        selection.baseline.a0,
        selection.baseline.a_inf,
        selection.rates.len()
    ));

    out.push_str("\n## Candidates\n\n");
    out.push_str("| model | SSE | RMSE | BIC | chosen |\n");
    out.push_str("| - | - | - | - | - |\n");
    for fit in &selection.fits {
        let chosen = fit.law == selection.best.law && fit.method == selection.best.method;
        out.push_str(&format!(
            "| {} | {:.4e} | {:.5} | {:.3} | {} |\n",
            fit.label(),
            fit.quality.sse,
            fit.quality.rmse,
            fit.quality.bic,
            if chosen { "yes" } else { "" }
        ));
    }
    if !selection.skipped.is_empty() {
        out.push('\n');
        for (label, reason) in &selection.skipped {
            out.push_str(&format!("- skipped {label}: {reason}\n"));
        }
    }

    let best = &selection.best;
    out.push_str(&format!("\n## Activation parameters ({})\n\n", best.label()));
    out.push_str(&format!("{}\n", format_activation(best)));
    if let Some(errors) = format_linear_errors(best) {
        out.push_str(&format!("\n{errors}\n"));
    }

    if !half_lives.is_empty() {
        out.push_str("\n## Half-lives\n\n");
        out.push_str("| T (°C) | k (1/s) | t½ |\n");
        out.push_str("| - | - | - |\n");
        for h in half_lives {
            out.push_str(&format!(
                "| {:.2} | {:.4e} | {} |\n",
                h.temperature_c,
                h.rate_k_per_s,
                format_duration(h.half_life_s)
            ));
        }
    }

    out
}

/// Write the Markdown report to `path`.
pub fn write_markdown_report(
    path: &Path,
    ingest: &IngestedData,
    selection: &FitSelection,
    half_lives: &[HalfLife],
    config: &FitConfig,
) -> Result<(), AppError> {
    let body = render_markdown_report(ingest, selection, half_lives, config);
    std::fs::write(path, body)
        .map_err(|e| AppError::new(2, format!("Failed to write report '{}': {e}", path.display())))
}
