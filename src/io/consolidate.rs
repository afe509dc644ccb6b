//! Master-table consolidation.
//!
//! A run walks `Scanning -> LoadingFile(i) -> Concatenating -> Retyping -> Persisted`.
//! Unreadable files are skipped with a warning; the run only fails if no
//! file could be loaded or a date cell cannot be re-typed.

use std::path::{Path, PathBuf};

use tracing::{debug, info, warn};

use crate::error::{AppError, ErrorKind};
use crate::io::frame::Frame;

/// A CSV file that was left out of the master table.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SkippedFile {
    pub file: String,
    pub reason: String,
}

/// Outcome of a successful consolidation.
#[derive(Debug, Clone)]
pub struct ConsolidationReport {
    pub output: PathBuf,
    pub files_loaded: Vec<String>,
    pub skipped: Vec<SkippedFile>,
    pub dropped_columns: Vec<String>,
    pub rows: usize,
    pub columns: Vec<String>,
}

/// `<master_dir>/<name>.csv`.
pub fn master_output_path(master_dir: &Path, name: &str) -> PathBuf {
    master_dir.join(format!("{name}.csv"))
}

/// Rebuild the master table at `output` from every CSV file in `source_dir`.
pub fn consolidate(source_dir: &Path, output: &Path) -> Result<ConsolidationReport, AppError> {
    let files = scan_csv_files(source_dir, output)?;
    info!(dir = %source_dir.display(), files = files.len(), "scanning");

    let mut frames = Vec::new();
    let mut files_loaded = Vec::new();
    let mut skipped = Vec::new();

    for (i, path) in files.iter().enumerate() {
        let name = file_label(path);
        debug!(index = i, file = %name, "loading");
        match load_table_frame(path) {
            Ok(frame) => {
                debug!(file = %name, rows = frame.num_rows(), "loaded");
                files_loaded.push(name);
                frames.push(frame);
            }
            Err(e) => {
                warn!(file = %name, error = %e, "skipping unreadable table");
                skipped.push(SkippedFile {
                    file: name,
                    reason: e.to_string(),
                });
            }
        }
    }

    if frames.is_empty() {
        return Err(AppError::new(
            ErrorKind::EmptyResultSet,
            format!(
                "No CSV tables could be loaded from '{}' ({} skipped); master table not written.",
                source_dir.display(),
                skipped.len()
            ),
        ));
    }

    let mut master = Frame::concat(frames);
    let dropped_columns = master.drop_index_columns();
    if !dropped_columns.is_empty() {
        debug!(columns = ?dropped_columns, "dropped index columns");
    }

    master.retype_dates("period")?;
    master.retype_dates("forecastPeriod")?;

    master.write_csv(output)?;
    info!(
        path = %output.display(),
        rows = master.num_rows(),
        columns = master.num_columns(),
        loaded = files_loaded.len(),
        skipped = skipped.len(),
        "master table written"
    );

    Ok(ConsolidationReport {
        output: output.to_path_buf(),
        files_loaded,
        skipped,
        dropped_columns,
        rows: master.num_rows(),
        columns: master.columns,
    })
}

/// CSV files directly inside `dir`, sorted by name, excluding `output`.
fn scan_csv_files(dir: &Path, output: &Path) -> Result<Vec<PathBuf>, AppError> {
    let entries = std::fs::read_dir(dir).map_err(|e| {
        AppError::new(
            ErrorKind::FileLoadFailure,
            format!("Failed to list '{}': {e}", dir.display()),
        )
    })?;

    let output_canonical = output.canonicalize().ok();
    let mut files: Vec<PathBuf> = entries
        .filter_map(Result::ok)
        .map(|entry| entry.path())
        .filter(|path| path.is_file())
        .filter(|path| {
            path.extension()
                .and_then(|ext| ext.to_str())
                .is_some_and(|ext| ext.eq_ignore_ascii_case("csv"))
        })
        .filter(|path| match (&output_canonical, path.canonicalize()) {
            (Some(out), Ok(p)) => &p != out,
            _ => true,
        })
        .collect();

    files.sort();
    Ok(files)
}

fn load_table_frame(path: &Path) -> Result<Frame, AppError> {
    let frame = Frame::read_csv(path)?;
    let Some(period) = frame.column_index("period") else {
        return Err(AppError::new(
            ErrorKind::FileLoadFailure,
            format!("{}: missing `period` column", path.display()),
        ));
    };
    // Every master row must carry a period, or the table cannot be read back.
    if let Some(idx) = frame.rows.iter().position(|row| row[period].trim().is_empty()) {
        return Err(AppError::new(
            ErrorKind::FileLoadFailure,
            format!("{}: line {}: blank `period`", path.display(), idx + 2),
        ));
    }
    Ok(frame)
}

fn file_label(path: &Path) -> String {
    path.file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_else(|| path.display().to_string())
}
