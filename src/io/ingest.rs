//! CSV ingest and normalization.
//!
//! This module is responsible for turning an instrument export (or a trace
//! written by `ramp simulate` / `ramp control`) into a clean, time-sorted set of
//! `(time, temperature, absorbance, weight)` points that are safe to fit.
//!
//! Design goals:
//! - **Strict schema** for required fields (clear errors + exit code 2)
//! - **Row-level validation** (skip bad rows, but report what happened)
//! - **Deterministic behavior** (no hidden randomness)
//! - **Separation of concerns**: no fitting logic here

use std::cmp::Ordering;
use std::collections::HashMap;
use std::fs::File;
use std::io::Read;

use csv::StringRecord;

use crate::domain::{
    DatasetStats, FitConfig, RampPoint, RampRow, TempUnit, TimeUnit, celsius_to_kelvin,
};
use crate::error::AppError;

const TIME_COLUMNS: &[&str] = &["time", "time_s", "t", "time_min", "t_min"];
const TEMP_COLUMNS: &[&str] = &[
    "temperature",
    "temp",
    "temperature_c",
    "temp_c",
    "temperature_k",
    "temp_k",
];
const ABS_COLUMNS: &[&str] = &["absorbance", "abs", "a", "absorbance_au"];

/// Values above this are taken as kelvin by the `auto` temperature heuristic.
const AUTO_KELVIN_THRESHOLD: f64 = 200.0;

/// High-level, resolved input conventions for the run.
#[derive(Debug, Clone)]
pub struct InputSpec {
    pub time_column: String,
    pub temp_column: String,
    pub abs_column: String,
    pub time_unit: TimeUnit,
    pub temp_unit: TempUnit,
    /// Optional informational note about how input units were interpreted.
    pub unit_note: Option<String>,
}

/// A row-level error encountered during ingest.
#[derive(Debug, Clone)]
pub struct RowError {
    pub line: usize,
    pub message: String,
}

/// Ingest output: normalized points + resolved spec + stats + row errors.
#[derive(Debug, Clone)]
pub struct IngestedData {
    pub points: Vec<RampPoint>,
    pub input_spec: InputSpec,
    pub stats: DatasetStats,
    pub row_errors: Vec<RowError>,
    pub rows_read: usize,
    pub rows_used: usize,
}

/// Load and normalize the CSV named by `config.csv_path`, applying filters.
pub fn load_ramp_points(config: &FitConfig) -> Result<IngestedData, AppError> {
    let file = File::open(&config.csv_path).map_err(|e| {
        AppError::new(
            2,
            format!("Failed to open CSV '{}': {e}", config.csv_path.display()),
        )
    })?;
    read_ramp_points(file, config)
}

/// Load and normalize ramp points from any reader.
pub fn read_ramp_points<R: Read>(source: R, config: &FitConfig) -> Result<IngestedData, AppError> {
    let mut reader = csv::ReaderBuilder::new()
        .flexible(true)
        .trim(csv::Trim::All)
        .comment(Some(b'#'))
        .from_reader(source);

    let headers = reader
        .headers()
        .map_err(|e| AppError::new(2, format!("Failed to read CSV headers: {e}")))?
        .clone();

    let header_map = build_header_map(&headers);

    let time_column = find_column(&header_map, TIME_COLUMNS, "time")?;
    let temp_column = find_column(&header_map, TEMP_COLUMNS, "temperature")?;
    let abs_column = find_column(&header_map, ABS_COLUMNS, "absorbance")?;

    let mut rows = Vec::new();
    let mut row_errors = Vec::new();
    let mut rows_read = 0usize;

    for (idx, result) in reader.records().enumerate() {
        // +2 because:
        // - records() starts at line 1 after headers
        // - CSV is 1-based line numbers
        let line = idx + 2;
        rows_read += 1;

        let record = match result {
            Ok(r) => r,
            Err(e) => {
                row_errors.push(RowError {
                    line,
                    message: format!("CSV parse error: {e}"),
                });
                continue;
            }
        };

        match parse_row(&record, &header_map, &time_column, &temp_column, &abs_column) {
            Ok(row) => rows.push((line, row)),
            Err(message) => row_errors.push(RowError { line, message }),
        }
    }

    let time_unit = resolve_time_unit(config.time_unit, &time_column);
    let (temp_unit, temp_note) = resolve_temp_unit(config.temp_unit, &temp_column, &rows);

    let mut input_spec = InputSpec {
        time_column,
        temp_column,
        abs_column,
        time_unit,
        temp_unit,
        unit_note: temp_note,
    };
    if time_unit == TimeUnit::Min {
        let note = "time column interpreted as minutes".to_string();
        input_spec.unit_note = Some(match input_spec.unit_note.take() {
            Some(prev) => format!("{prev}; {note}"),
            None => note,
        });
    }

    let mut normalized: Vec<(usize, RampRow)> = Vec::with_capacity(rows.len());
    for (line, row) in rows {
        match normalize_row(row, &input_spec, config) {
            Ok(Some(row)) => normalized.push((line, row)),
            Ok(None) => {} // filtered out
            Err(message) => row_errors.push(RowError { line, message }),
        }
    }

    // Time-sort (stable, so file order breaks nothing) and reject duplicate stamps.
    normalized.sort_by(|a, b| a.1.time.partial_cmp(&b.1.time).unwrap_or(Ordering::Equal));
    let mut points: Vec<RampPoint> = Vec::with_capacity(normalized.len());
    let mut last_time: Option<f64> = None;
    for (line, row) in normalized {
        if last_time == Some(row.time) {
            row_errors.push(RowError {
                line,
                message: format!("Duplicate timestamp {}.", row.time),
            });
            continue;
        }
        last_time = Some(row.time);
        points.push(RampPoint {
            index: points.len(),
            time_s: row.time,
            temperature_k: row.temperature,
            absorbance: row.absorbance,
            weight: row.weight.unwrap_or(1.0),
        });
    }
    row_errors.sort_by_key(|e| e.line);

    let rows_used = points.len();
    if rows_used == 0 {
        return Err(AppError::new(
            3,
            "No valid rows remain after normalization/filtering.",
        ));
    }

    // Rebase so the first retained observation is t = 0.
    let t0 = points[0].time_s;
    for p in &mut points {
        p.time_s -= t0;
    }

    let stats = compute_stats(&points).ok_or_else(|| {
        AppError::new(
            3,
            "No valid points remain after normalization/filtering.",
        )
    })?;

    Ok(IngestedData {
        points,
        input_spec,
        stats,
        row_errors,
        rows_read,
        rows_used,
    })
}

fn build_header_map(headers: &StringRecord) -> HashMap<String, usize> {
    headers
        .iter()
        .enumerate()
        .map(|(idx, name)| (normalize_header_name(name), idx))
        .collect()
}

fn normalize_header_name(name: &str) -> String {
    // Excel and other tools sometimes emit UTF-8 CSVs with a BOM prefix on the
    // first header. If we don't strip it, schema validation will incorrectly
    // report missing columns.
    let name = name.trim().trim_start_matches('\u{feff}');
    name.to_ascii_lowercase()
}

fn find_column(
    header_map: &HashMap<String, usize>,
    aliases: &[&str],
    what: &str,
) -> Result<String, AppError> {
    aliases
        .iter()
        .find(|name| header_map.contains_key(**name))
        .map(|name| name.to_string())
        .ok_or_else(|| {
            AppError::new(
                2,
                format!(
                    "Missing required {what} column (accepted names: {}).",
                    aliases.join(", ")
                ),
            )
        })
}

fn resolve_time_unit(unit: TimeUnit, column: &str) -> TimeUnit {
    match unit {
        TimeUnit::Auto if column.ends_with("_min") => TimeUnit::Min,
        TimeUnit::Auto => TimeUnit::S,
        other => other,
    }
}

fn resolve_temp_unit(unit: TempUnit, column: &str, rows: &[(usize, RampRow)]) -> (TempUnit, Option<String>) {
    match unit {
        TempUnit::Auto if column.ends_with("_k") => (TempUnit::K, None),
        TempUnit::Auto => {
            let all_high = !rows.is_empty()
                && rows.iter().all(|(_, r)| r.temperature > AUTO_KELVIN_THRESHOLD);
            if all_high {
                (
                    TempUnit::K,
                    Some(format!(
                        "temperatures all exceed {AUTO_KELVIN_THRESHOLD}; interpreted as kelvin"
                    )),
                )
            } else {
                (TempUnit::C, None)
            }
        }
        other => (other, None),
    }
}

fn parse_row(
    record: &StringRecord,
    header_map: &HashMap<String, usize>,
    time_column: &str,
    temp_column: &str,
    abs_column: &str,
) -> Result<RampRow, String> {
    let time = parse_required_f64(record, header_map, time_column)?;
    let temperature = parse_required_f64(record, header_map, temp_column)?;
    let absorbance = parse_required_f64(record, header_map, abs_column)?;
    let weight = match get_optional(record, header_map, "weight") {
        Some(raw) => Some(
            raw.parse::<f64>()
                .map_err(|_| format!("Invalid `weight` value '{raw}'."))?,
        ),
        None => None,
    };

    Ok(RampRow {
        time,
        temperature,
        absorbance,
        weight,
    })
}

fn normalize_row(row: RampRow, spec: &InputSpec, config: &FitConfig) -> Result<Option<RampRow>, String> {
    let time = match spec.time_unit {
        TimeUnit::Min => row.time * 60.0,
        _ => row.time,
    };

    let (temp_c, temp_k) = match spec.temp_unit {
        TempUnit::K => (row.temperature - crate::domain::KELVIN_OFFSET, row.temperature),
        _ => (row.temperature, celsius_to_kelvin(row.temperature)),
    };
    if temp_k <= 0.0 {
        return Err(format!("Non-positive absolute temperature ({temp_k} K)."));
    }

    if let Some(w) = row.weight {
        if !(w.is_finite() && w > 0.0) {
            return Err(format!("Weight must be finite and > 0 (got {w})."));
        }
    }

    if config.temp_min_c.is_some_and(|lo| temp_c < lo) || config.temp_max_c.is_some_and(|hi| temp_c > hi) {
        return Ok(None);
    }

    Ok(Some(RampRow {
        time,
        temperature: temp_k,
        absorbance: row.absorbance,
        weight: row.weight,
    }))
}

fn get_optional<'a>(record: &'a StringRecord, header_map: &HashMap<String, usize>, key: &str) -> Option<&'a str> {
    let idx = *header_map.get(key)?;
    let value = record.get(idx)?.trim();
    if value.is_empty() { None } else { Some(value) }
}

fn parse_required_f64(
    record: &StringRecord,
    header_map: &HashMap<String, usize>,
    key: &str,
) -> Result<f64, String> {
    let raw = get_optional(record, header_map, key).ok_or_else(|| format!("Missing `{key}` value."))?;
    let value = raw
        .parse::<f64>()
        .map_err(|_| format!("Invalid `{key}` value '{raw}'."))?;
    if !value.is_finite() {
        return Err(format!("Non-finite `{key}` value."));
    }
    Ok(value)
}

/// Summary statistics for a set of points (`None` when empty).
pub fn compute_stats(points: &[RampPoint]) -> Option<DatasetStats> {
    let first = points.first()?;
    let mut stats = DatasetStats {
        n_points: points.len(),
        time_max_s: first.time_s,
        temp_min_k: first.temperature_k,
        temp_max_k: first.temperature_k,
        abs_min: first.absorbance,
        abs_max: first.absorbance,
    };
    for p in points {
        stats.time_max_s = stats.time_max_s.max(p.time_s);
        stats.temp_min_k = stats.temp_min_k.min(p.temperature_k);
        stats.temp_max_k = stats.temp_max_k.max(p.temperature_k);
        stats.abs_min = stats.abs_min.min(p.absorbance);
        stats.abs_max = stats.abs_max.max(p.absorbance);
    }
    Some(stats)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::path::PathBuf;

    fn config() -> FitConfig {
        FitConfig::for_path(PathBuf::from("inline.csv"))
    }

    #[test]
    fn reads_celsius_seconds_with_bom_and_mixed_case_headers() {
        let csv = "\u{feff}Time_s,Temperature_C,Absorbance\n0,40,0.10\n30,40.5,0.11\n60,41,0.12\n";
        let data = read_ramp_points(csv.as_bytes(), &config()).unwrap();
        assert_eq!(data.rows_used, 3);
        assert_eq!(data.input_spec.time_unit, TimeUnit::S);
        assert_eq!(data.input_spec.temp_unit, TempUnit::C);
        assert!((data.points[1].temperature_k - 313.65).abs() < 1e-9);
        assert!((data.stats.time_max_s - 60.0).abs() < 1e-12);
    }

    #[test]
    fn minutes_and_kelvin_are_resolved_from_headers() {
        let csv = "time_min,temp_k,abs\n1,320,0.2\n2,321,0.25\n";
        let data = read_ramp_points(csv.as_bytes(), &config()).unwrap();
        assert_eq!(data.input_spec.time_unit, TimeUnit::Min);
        assert_eq!(data.input_spec.temp_unit, TempUnit::K);
        // Rebased: first point at 0 s, second 60 s later.
        assert_eq!(data.points[0].time_s, 0.0);
        assert!((data.points[1].time_s - 60.0).abs() < 1e-12);
        assert!((data.points[1].temperature_k - 321.0).abs() < 1e-12);
    }

    #[test]
    fn auto_kelvin_when_all_values_are_high() {
        let csv = "time,temperature,absorbance\n0,310,0.2\n10,311,0.25\n";
        let data = read_ramp_points(csv.as_bytes(), &config()).unwrap();
        assert_eq!(data.input_spec.temp_unit, TempUnit::K);
        assert!(data.input_spec.unit_note.is_some());
    }

    #[test]
    fn bad_rows_are_reported_not_fatal() {
        let csv = "time,temperature,absorbance,weight\n0,40,0.1,\n10,abc,0.2,\n20,41,0.3,-1\n20,42,0.4,\n30,43,0.5,2\n30,44,0.6,\n";
        let data = read_ramp_points(csv.as_bytes(), &config()).unwrap();
        assert_eq!(data.rows_read, 6);
        assert_eq!(data.rows_used, 3);
        let lines: Vec<usize> = data.row_errors.iter().map(|e| e.line).collect();
        assert_eq!(lines, vec![3, 4, 7]);
        assert_eq!(data.points[2].weight, 2.0);
    }

    #[test]
    fn non_positive_absolute_temperatures_are_row_errors() {
        let csv = "time,temperature,absorbance\n0,40,0.1\n10,-300,0.2\n20,42,0.3\n";
        let mut cfg = config();
        cfg.temp_unit = TempUnit::C;
        let data = read_ramp_points(csv.as_bytes(), &cfg).unwrap();
        assert_eq!(data.rows_used, 2);
        assert_eq!(data.row_errors.len(), 1);
        assert_eq!(data.row_errors[0].line, 3);
        assert!(data.row_errors[0].message.contains("absolute temperature"));

        let csv = "time,temperature,absorbance\n0,313,0.1\n10,0,0.2\n20,315,0.3\n";
        cfg.temp_unit = TempUnit::K;
        let data = read_ramp_points(csv.as_bytes(), &cfg).unwrap();
        assert_eq!(data.rows_used, 2);
        assert_eq!(data.row_errors.iter().map(|e| e.line).collect::<Vec<_>>(), vec![3]);
    }

    #[test]
    fn rows_are_sorted_by_time() {
        let csv = "time,temperature,absorbance\n20,42,0.3\n0,40,0.1\n10,41,0.2\n";
        let data = read_ramp_points(csv.as_bytes(), &config()).unwrap();
        let abs: Vec<f64> = data.points.iter().map(|p| p.absorbance).collect();
        assert_eq!(abs, vec![0.1, 0.2, 0.3]);
        assert_eq!(data.points[2].index, 2);
    }

    #[test]
    fn temperature_window_filters_rows() {
        let csv = "time,temperature,absorbance\n0,40,0.1\n10,50,0.2\n20,60,0.3\n";
        let mut cfg = config();
        cfg.temp_min_c = Some(45.0);
        let data = read_ramp_points(csv.as_bytes(), &cfg).unwrap();
        assert_eq!(data.rows_used, 2);
        assert_eq!(data.points[0].time_s, 0.0);
    }

    #[test]
    fn missing_absorbance_column_is_a_usage_error() {
        let csv = "time,temperature\n0,40\n";
        let err = read_ramp_points(csv.as_bytes(), &config()).unwrap_err();
        assert_eq!(err.exit_code(), 2);
        assert!(err.message().contains("absorbance"));
    }

    #[test]
    fn no_usable_rows_is_insufficient_data() {
        let csv = "time,temperature,absorbance\nx,y,z\n";
        let err = read_ramp_points(csv.as_bytes(), &config()).unwrap_err();
        assert_eq!(err.exit_code(), 3);
    }
}
