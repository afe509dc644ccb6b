//! Shared domain types.
//!
//! Everything here is plain data. Network and filesystem concerns live in
//! `data` and `io`; these types only carry values between them.

use std::fmt;
use std::path::Path;

use chrono::{Datelike, NaiveDate, NaiveDateTime};
use serde::Serialize;

use crate::error::{AppError, ErrorKind};

/// Upstream hard limit on rows returned by one request.
pub const PAGE_LENGTH_MAX: u32 = 5000;

/// Sampling frequency of a requested series.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Frequency {
    Monthly,
    Quarterly,
    Annual,
}

impl Frequency {
    pub fn as_str(self) -> &'static str {
        match self {
            Frequency::Monthly => "monthly",
            Frequency::Quarterly => "quarterly",
            Frequency::Annual => "annual",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SortDirection {
    Asc,
    Desc,
}

impl SortDirection {
    pub fn as_str(self) -> &'static str {
        match self {
            SortDirection::Asc => "asc",
            SortDirection::Desc => "desc",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SortKey {
    pub column: String,
    pub direction: SortDirection,
}

/// Canonical query for one upstream request.
///
/// `end_period` is stamped when the record is built and is informational:
/// the request URL never carries it, since forecast series extend past the
/// current month.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct QueryParams {
    pub frequency: Frequency,
    pub fields: Vec<String>,
    pub series_filter: Vec<String>,
    pub start_period: String,
    pub end_period: String,
    pub sort: Vec<SortKey>,
    pub offset: u32,
    pub page_length: u32,
}

impl QueryParams {
    /// The only facet value that is sent upstream.
    pub fn first_series(&self) -> Option<&str> {
        self.series_filter.first().map(String::as_str)
    }
}

/// The month a forecast snapshot was retrieved in.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct Vintage(NaiveDate);

impl Vintage {
    pub fn from_ym(year: i32, month: u32) -> Option<Self> {
        NaiveDate::from_ymd_opt(year, month, 1).map(Self)
    }

    /// The vintage containing `date`.
    pub fn of_month(date: NaiveDate) -> Self {
        Self(date.with_day(1).unwrap_or(date))
    }

    /// Parse a `YYYY_MM` or `YYYY-MM` label.
    pub fn parse(label: &str) -> Result<Self, AppError> {
        let label = label.trim();
        parse_year_month(label, '_')
            .or_else(|| parse_year_month(label, '-'))
            .map(Self)
            .ok_or_else(|| {
                AppError::new(
                    ErrorKind::InvalidInput,
                    format!("Invalid vintage '{label}'. Expected YYYY_MM or YYYY-MM."),
                )
            })
    }

    /// Read the vintage from a `<name>_YYYY_MM.csv` file path.
    ///
    /// Paths without that exact suffix are rejected.
    pub fn from_path(path: &Path) -> Result<Self, AppError> {
        let reject = || {
            AppError::new(
                ErrorKind::InvalidInput,
                format!(
                    "Cannot derive a vintage from '{}': file name must end in _YYYY_MM.csv (or pass --vintage).",
                    path.display()
                ),
            )
        };

        let name = path.file_name().and_then(|n| n.to_str()).ok_or_else(reject)?;
        let stem = name.strip_suffix(".csv").ok_or_else(reject)?;
        if stem.len() < 8 || !stem.is_char_boundary(stem.len() - 8) {
            return Err(reject());
        }
        let token = stem[stem.len() - 8..].strip_prefix('_').ok_or_else(reject)?;
        parse_year_month(token, '_').map(Self).ok_or_else(reject)
    }

    pub fn date(self) -> NaiveDate {
        self.0
    }

    /// File-name form, e.g. `2024_03`.
    pub fn label(self) -> String {
        format!("{:04}_{:02}", self.0.year(), self.0.month())
    }
}

impl fmt::Display for Vintage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:04}-{:02}", self.0.year(), self.0.month())
    }
}

/// Destination file name for a named vintage table.
pub fn vintage_file_name(name: &str, vintage: Vintage) -> String {
    format!("{name}_{}.csv", vintage.label())
}

/// A `value` cell exactly as the upstream API returned it.
#[derive(Debug, Clone, PartialEq)]
pub enum RawValue {
    Number(f64),
    Text(String),
    Missing,
}

/// One record of an API response, before value coercion.
#[derive(Debug, Clone, PartialEq)]
pub struct RawObservation {
    pub period: NaiveDate,
    pub series_id: String,
    pub series_description: String,
    pub unit: String,
    pub value: RawValue,
}

/// One normalized table row.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ObservationRow {
    pub period: NaiveDate,
    pub series_id: String,
    pub series_description: String,
    pub unit: String,
    pub value: f64,
    pub forecast_period: Option<NaiveDate>,
}

/// Rows produced by one aggregator run, all sharing `vintage`.
#[derive(Debug, Clone)]
pub struct VintageTable {
    pub vintage: Vintage,
    pub rows: Vec<ObservationRow>,
}

impl VintageTable {
    pub fn len(&self) -> usize {
        self.rows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }
}

/// Strict `YYYY<sep>MM` parser returning the first of the month.
pub fn parse_year_month(s: &str, sep: char) -> Option<NaiveDate> {
    let bytes = s.as_bytes();
    if bytes.len() != 7 || bytes[4] != sep as u8 {
        return None;
    }
    let (year, month) = (&s[0..4], &s[5..7]);
    if !year.bytes().all(|b| b.is_ascii_digit()) || !month.bytes().all(|b| b.is_ascii_digit()) {
        return None;
    }
    NaiveDate::from_ymd_opt(year.parse().ok()?, month.parse().ok()?, 1)
}

/// Parse a period cell into a calendar date.
///
/// Accepts ISO dates (optionally with a time part), `YYYY-MM`, `YYYY-Qn`
/// and bare `YYYY`. Coarser periods map to their first day.
pub fn parse_period(raw: &str) -> Option<NaiveDate> {
    let s = raw.trim();
    if let Ok(d) = NaiveDate::parse_from_str(s, "%Y-%m-%d") {
        return Some(d);
    }
    for fmt in ["%Y-%m-%d %H:%M:%S", "%Y-%m-%dT%H:%M:%S"] {
        if let Ok(dt) = NaiveDateTime::parse_from_str(s, fmt) {
            return Some(dt.date());
        }
    }
    if let Some(d) = parse_year_month(s, '-') {
        return Some(d);
    }
    if let Some((year, quarter)) = s.split_once("-Q") {
        let year: i32 = year.parse().ok()?;
        let quarter: u32 = quarter.parse().ok()?;
        if !(1..=4).contains(&quarter) {
            return None;
        }
        return NaiveDate::from_ymd_opt(year, (quarter - 1) * 3 + 1, 1);
    }
    if s.len() == 4 && s.bytes().all(|b| b.is_ascii_digit()) {
        return NaiveDate::from_ymd_opt(s.parse().ok()?, 1, 1);
    }
    None
}
