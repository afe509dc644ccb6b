//! Query surface for chart front-ends.
//!
//! Front-ends receive a [`DataSource`] at start-up instead of loading a file
//! themselves, and call [`DataSource::reload`] when the master table is
//! rebuilt. Filtering mirrors what the dashboards offer: all vintages side
//! by side, or only the latest one, narrowed by series and period range.

use std::path::{Path, PathBuf};

use chrono::NaiveDate;
use clap::ValueEnum;
use tracing::info;

use crate::domain::ObservationRow;
use crate::error::AppError;
use crate::io::table::read_table;

/// An in-memory table bound to the file it was loaded from.
#[derive(Debug, Clone)]
pub struct DataSource {
    path: PathBuf,
    rows: Vec<ObservationRow>,
}

impl DataSource {
    pub fn open(path: impl Into<PathBuf>) -> Result<Self, AppError> {
        let path = path.into();
        let rows = read_table(&path)?;
        info!(path = %path.display(), rows = rows.len(), "table loaded");
        Ok(Self { path, rows })
    }

    /// Re-read the backing file. On failure the previous rows are kept.
    pub fn reload(&mut self) -> Result<usize, AppError> {
        self.rows = read_table(&self.path)?;
        info!(path = %self.path.display(), rows = self.rows.len(), "table reloaded");
        Ok(self.rows.len())
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn rows(&self) -> &[ObservationRow] {
        &self.rows
    }

    pub fn select(&self, query: &ViewQuery) -> Vec<ObservationRow> {
        select(&self.rows, query)
    }
}

/// Rows belonging to the most recent forecast vintage present.
pub fn recent_forecast(rows: &[ObservationRow]) -> Vec<ObservationRow> {
    let Some(latest) = rows.iter().filter_map(|r| r.forecast_period).max() else {
        return Vec::new();
    };
    rows.iter()
        .filter(|r| r.forecast_period == Some(latest))
        .cloned()
        .collect()
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, ValueEnum)]
pub enum ViewMode {
    /// Every vintage, for tracking forecast revisions.
    #[default]
    Comparison,
    /// Only the latest vintage.
    Current,
}

/// Chart styles; `crate::plot` renders each of them as a terminal preview.
#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum PlotKind {
    Scatter,
    Line,
    Area,
    Bar,
    StackedArea,
}

#[derive(Debug, Clone, Default)]
pub struct ViewQuery {
    pub mode: ViewMode,
    /// Empty means every series.
    pub series_ids: Vec<String>,
    /// Inclusive period bounds.
    pub from: Option<NaiveDate>,
    pub to: Option<NaiveDate>,
}

pub fn select(rows: &[ObservationRow], query: &ViewQuery) -> Vec<ObservationRow> {
    let base = match query.mode {
        ViewMode::Comparison => rows.to_vec(),
        ViewMode::Current => recent_forecast(rows),
    };

    base.into_iter()
        .filter(|r| query.series_ids.is_empty() || query.series_ids.iter().any(|id| *id == r.series_id))
        .filter(|r| query.from.is_none_or(|from| r.period >= from))
        .filter(|r| query.to.is_none_or(|to| r.period <= to))
        .collect()
}
