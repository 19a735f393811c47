//! Interactive dataset picker.
//!
//! clap handles structured flags; the picker provides the "run `ramp` and
//! choose a dataset" flow. It lists `*.csv` files under the working directory
//! in lexical order.

use std::fs;
use std::io::{self, BufRead, Write};
use std::path::{Path, PathBuf};

use crate::error::AppError;

/// Directory recursion depth for finding datasets.
const DEFAULT_SEARCH_DEPTH: usize = 4;

/// Resolve the dataset path: the explicit flag if given, otherwise prompt.
pub fn resolve_csv_path(explicit: Option<&Path>) -> Result<PathBuf, AppError> {
    match explicit {
        Some(path) => validate_csv_path(path),
        None => prompt_for_csv_path(),
    }
}

/// Prompt on stdin/stdout for a dataset from the current directory tree.
pub fn prompt_for_csv_path() -> Result<PathBuf, AppError> {
    let files = discover_csv_files();
    let stdin = io::stdin();
    let stdout = io::stdout();
    pick_from(&files, &mut stdin.lock(), &mut stdout.lock())
}

/// Core of the prompt: accepts a list number, an explicit path, or `q`.
fn pick_from<R: BufRead, W: Write>(files: &[PathBuf], input: &mut R, out: &mut W) -> Result<PathBuf, AppError> {
    let io_err = |e: io::Error| AppError::new(2, format!("Failed to use the terminal: {e}"));

    if files.is_empty() {
        return Err(AppError::new(
            2,
            "No ramp datasets (.csv) found. Provide one with `ramp fit -f <file.csv>`.",
        ));
    }

    writeln!(out, "Found {} ramp dataset(s):", files.len()).map_err(io_err)?;
    for (idx, path) in files.iter().enumerate() {
        writeln!(out, "{:>3}) {}", idx + 1, pretty_path(path)).map_err(io_err)?;
    }

    loop {
        write!(out, "Dataset number (1-{}) or path, q to quit: ", files.len()).map_err(io_err)?;
        out.flush().map_err(io_err)?;

        let mut line = String::new();
        if input.read_line(&mut line).map_err(io_err)? == 0 {
            return Err(AppError::new(
                2,
                "No input received. Provide a dataset with `ramp fit -f <file.csv>`.",
            ));
        }

        let line = line.trim();
        if line.eq_ignore_ascii_case("q") {
            return Err(AppError::new(2, "Canceled."));
        }

        if let Ok(choice) = line.parse::<usize>() {
            if (1..=files.len()).contains(&choice) {
                return validate_csv_path(&files[choice - 1]);
            }
            writeln!(out, "No dataset #{choice}.").map_err(io_err)?;
            continue;
        }

        match validate_csv_path(Path::new(line)) {
            Ok(path) => return Ok(path),
            Err(err) => writeln!(out, "{err}").map_err(io_err)?,
        }
    }
}

/// Check that `path` is an existing `.csv` file.
pub fn validate_csv_path(path: &Path) -> Result<PathBuf, AppError> {
    if !path.exists() {
        return Err(AppError::new(2, format!("Dataset not found: {}", path.display())));
    }
    if path.is_dir() {
        return Err(AppError::new(
            2,
            format!("Expected a file, got a directory: {}", path.display()),
        ));
    }
    if !has_csv_extension(path) {
        return Err(AppError::new(
            2,
            format!("Expected a .csv dataset (got: {}).", path.display()),
        ));
    }
    Ok(path.to_path_buf())
}

/// Discover `*.csv` files under the current directory (deterministic order).
pub fn discover_csv_files() -> Vec<PathBuf> {
    find_csv_files(Path::new("."), DEFAULT_SEARCH_DEPTH)
}

fn find_csv_files(root: &Path, max_depth: usize) -> Vec<PathBuf> {
    let mut out = Vec::new();
    walk(root, 0, max_depth, &mut out);
    out.sort_by_key(|p| pretty_path(p));
    out
}

fn walk(dir: &Path, depth: usize, max_depth: usize, out: &mut Vec<PathBuf>) {
    if depth > max_depth {
        return;
    }
    let Ok(entries) = fs::read_dir(dir) else {
        return;
    };

    for entry in entries.flatten() {
        let path = entry.path();
        let Ok(file_type) = entry.file_type() else {
            continue;
        };
        if file_type.is_dir() {
            if !should_skip_dir(&path) {
                walk(&path, depth + 1, max_depth, out);
            }
        } else if file_type.is_file() && has_csv_extension(&path) {
            out.push(path);
        }
    }
}

fn has_csv_extension(path: &Path) -> bool {
    path.extension()
        .and_then(|ext| ext.to_str())
        .is_some_and(|ext| ext.eq_ignore_ascii_case("csv"))
}

fn should_skip_dir(path: &Path) -> bool {
    let name = path.file_name().and_then(|s| s.to_str()).unwrap_or("");
    name.starts_with('.') || matches!(name, "target" | "node_modules")
}

fn pretty_path(path: &Path) -> String {
    path.strip_prefix("./").unwrap_or(path).display().to_string()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn temp_dir(tag: &str) -> PathBuf {
        let dir = std::env::temp_dir().join(format!("ramp-picker-{tag}-{}", std::process::id()));
        let _ = fs::remove_dir_all(&dir);
        fs::create_dir_all(dir.join("nested")).unwrap();
        dir
    }

    #[test]
    fn finds_csv_files_recursively_in_order() {
        let dir = temp_dir("find");
        fs::write(dir.join("b.csv"), "").unwrap();
        fs::write(dir.join("nested").join("a.CSV"), "").unwrap();
        fs::write(dir.join("notes.txt"), "").unwrap();

        let found = find_csv_files(&dir, 2);
        assert_eq!(found.len(), 2);
        assert!(found[0].ends_with("b.csv"));
        assert!(found[1].ends_with("nested/a.CSV"));
        fs::remove_dir_all(&dir).unwrap();
    }

    #[test]
    fn prompt_accepts_number_after_bad_choice() {
        let dir = temp_dir("pick");
        let file = dir.join("run1.csv");
        fs::write(&file, "").unwrap();

        let mut input = io::Cursor::new("7\n1\n");
        let mut out = Vec::new();
        let picked = pick_from(std::slice::from_ref(&file), &mut input, &mut out).unwrap();
        assert_eq!(picked, file);
        assert!(String::from_utf8(out).unwrap().contains("No dataset #7."));
        fs::remove_dir_all(&dir).unwrap();
    }

    #[test]
    fn quitting_and_eof_are_usage_errors() {
        let files = vec![PathBuf::from("x.csv")];
        let err = pick_from(&files, &mut io::Cursor::new("q\n"), &mut Vec::new()).unwrap_err();
        assert_eq!(err.exit_code(), 2);
        let err = pick_from(&files, &mut io::Cursor::new(""), &mut Vec::new()).unwrap_err();
        assert_eq!(err.exit_code(), 2);
    }

    #[test]
    fn rejects_non_csv_paths() {
        let dir = temp_dir("validate");
        let txt = dir.join("data.txt");
        fs::write(&txt, "").unwrap();
        assert!(validate_csv_path(&txt).is_err());
        assert!(validate_csv_path(&dir).is_err());
        assert!(validate_csv_path(&dir.join("missing.csv")).is_err());
        fs::remove_dir_all(&dir).unwrap();
    }
}
