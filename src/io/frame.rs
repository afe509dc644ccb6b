//! Untyped, column-aligned table used while consolidating vintage files.
//!
//! Cells are kept as text so that columns unknown to this crate survive a
//! consolidation unchanged. Only date columns are re-typed.

use std::collections::HashMap;
use std::fs::File;
use std::path::Path;

use crate::domain::parse_period;
use crate::error::{AppError, ErrorKind};
use crate::io::table::{normalize_header_name, write_atomic};

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Frame {
    pub columns: Vec<String>,
    pub rows: Vec<Vec<String>>,
}

impl Frame {
    /// Strict CSV load: every record must have as many fields as the header.
    pub fn read_csv(path: &Path) -> Result<Self, AppError> {
        let file = File::open(path).map_err(|e| load_error(path, format!("open failed: {e}")))?;
        let mut reader = csv::ReaderBuilder::new().from_reader(file);

        let columns: Vec<String> = reader
            .headers()
            .map_err(|e| load_error(path, format!("bad header: {e}")))?
            .iter()
            .map(|h| h.trim().trim_start_matches('\u{feff}').to_string())
            .collect();
        if columns.iter().all(|c| c.is_empty()) {
            return Err(load_error(path, "no header row".to_string()));
        }

        let mut rows = Vec::new();
        for (idx, result) in reader.records().enumerate() {
            let record = result.map_err(|e| load_error(path, format!("line {}: {e}", idx + 2)))?;
            rows.push(record.iter().map(str::to_string).collect());
        }

        Ok(Self { columns, rows })
    }

    /// Stack frames row-wise over the union of their columns.
    ///
    /// Columns are matched by normalized name and keep the spelling and
    /// position in which they were first seen. Cells a frame lacks are empty.
    pub fn concat(frames: Vec<Frame>) -> Frame {
        let mut out = Frame::default();
        let mut index: HashMap<String, usize> = HashMap::new();

        for frame in frames {
            let mapping: Vec<usize> = frame
                .columns
                .iter()
                .map(|name| {
                    *index.entry(normalize_header_name(name)).or_insert_with(|| {
                        out.columns.push(name.clone());
                        out.columns.len() - 1
                    })
                })
                .collect();

            for row in frame.rows {
                let mut cells = vec![String::new(); out.columns.len()];
                for (cell, &target) in row.into_iter().zip(&mapping) {
                    cells[target] = cell;
                }
                out.rows.push(cells);
            }
        }

        let width = out.columns.len();
        for row in &mut out.rows {
            row.resize(width, String::new());
        }
        out
    }

    pub fn column_index(&self, name: &str) -> Option<usize> {
        let key = normalize_header_name(name);
        self.columns.iter().position(|c| normalize_header_name(c) == key)
    }

    /// Remove positional-index columns left behind by earlier tooling.
    ///
    /// Returns the names that were dropped.
    pub fn drop_index_columns(&mut self) -> Vec<String> {
        let keep: Vec<bool> = self.columns.iter().map(|c| !is_index_column(c)).collect();
        if keep.iter().all(|k| *k) {
            return Vec::new();
        }

        let dropped = self
            .columns
            .iter()
            .zip(&keep)
            .filter(|(_, k)| !**k)
            .map(|(c, _)| c.clone())
            .collect();

        self.columns = retain_by_mask(std::mem::take(&mut self.columns), &keep);
        for row in &mut self.rows {
            *row = retain_by_mask(std::mem::take(row), &keep);
        }
        dropped
    }

    /// Rewrite every non-empty cell of `column` as an ISO date.
    pub fn retype_dates(&mut self, column: &str) -> Result<(), AppError> {
        let Some(idx) = self.column_index(column) else {
            return Ok(());
        };

        for (row_no, row) in self.rows.iter_mut().enumerate() {
            let cell = row[idx].trim();
            if cell.is_empty() {
                continue;
            }
            let date = parse_period(cell).ok_or_else(|| {
                AppError::new(
                    ErrorKind::TypeCoercionFailure,
                    format!("Cannot parse {column} '{cell}' in row {row_no} as a date."),
                )
            })?;
            row[idx] = date.format("%Y-%m-%d").to_string();
        }
        Ok(())
    }

    pub fn write_csv(&self, path: &Path) -> Result<(), AppError> {
        write_atomic(path, |out| {
            let mut writer = csv::Writer::from_writer(out);
            writer.write_record(&self.columns).map_err(|e| write_error(path, e))?;
            for row in &self.rows {
                writer.write_record(row).map_err(|e| write_error(path, e))?;
            }
            writer.flush().map_err(|e| write_error(path, e))
        })
    }

    pub fn num_rows(&self) -> usize {
        self.rows.len()
    }

    pub fn num_columns(&self) -> usize {
        self.columns.len()
    }
}

fn is_index_column(name: &str) -> bool {
    let name = name.trim();
    name.is_empty() || name.eq_ignore_ascii_case("index") || name.to_ascii_lowercase().starts_with("unnamed:")
}

fn retain_by_mask(values: Vec<String>, keep: &[bool]) -> Vec<String> {
    values
        .into_iter()
        .zip(keep)
        .filter(|(_, k)| **k)
        .map(|(v, _)| v)
        .collect()
}

fn load_error(path: &Path, message: String) -> AppError {
    AppError::new(ErrorKind::FileLoadFailure, format!("{}: {message}", path.display()))
}

fn write_error(path: &Path, e: impl std::fmt::Display) -> AppError {
    AppError::new(
        ErrorKind::FileWriteFailure,
        format!("Failed to write '{}': {e}", path.display()),
    )
}
