//! Observation tables on disk.
//!
//! Vintage and master files share one layout:
//! `period,seriesId,seriesDescription,unit,value,forecastPeriod`, ISO dates.
//!
//! Reads are header-driven so files written by older tooling (snake_case
//! headers, a BOM, extra columns, column order changes) still load.

use std::collections::HashMap;
use std::fs::File;
use std::io::{BufWriter, Write};
use std::path::Path;

use chrono::NaiveDate;
use csv::StringRecord;

use crate::domain::{ObservationRow, parse_period};
use crate::error::{AppError, ErrorKind};

pub const TABLE_COLUMNS: [&str; 6] = [
    "period",
    "seriesId",
    "seriesDescription",
    "unit",
    "value",
    "forecastPeriod",
];

/// Write `rows` to `path`, replacing any existing file atomically.
pub fn write_table(path: &Path, rows: &[ObservationRow]) -> Result<(), AppError> {
    write_atomic(path, |out| {
        let mut writer = csv::WriterBuilder::new().has_headers(false).from_writer(out);
        writer
            .write_record(TABLE_COLUMNS)
            .map_err(|e| write_error(path, e))?;
        for row in rows {
            writer.serialize(row).map_err(|e| write_error(path, e))?;
        }
        writer.flush().map_err(|e| write_error(path, e))
    })
}

/// Load a vintage or master table into typed rows.
pub fn read_table(path: &Path) -> Result<Vec<ObservationRow>, AppError> {
    let file = File::open(path).map_err(|e| {
        AppError::new(
            ErrorKind::FileLoadFailure,
            format!("Failed to open table '{}': {e}", path.display()),
        )
    })?;

    let mut reader = csv::ReaderBuilder::new().trim(csv::Trim::All).from_reader(file);
    let headers = reader
        .headers()
        .map_err(|e| load_error(path, format!("Failed to read CSV headers: {e}")))?
        .clone();
    let header_map = build_header_map(&headers);

    if !header_map.contains_key("period") {
        return Err(load_error(path, "Missing required column: `period`".to_string()));
    }

    let mut rows = Vec::new();
    for (idx, result) in reader.records().enumerate() {
        // records() starts after the header; CSV lines are 1-based.
        let line = idx + 2;
        let record = result.map_err(|e| load_error(path, format!("CSV parse error on line {line}: {e}")))?;
        let row = parse_row(&record, &header_map).map_err(|e| load_error(path, format!("Line {line}: {e}")))?;
        rows.push(row);
    }

    Ok(rows)
}

/// Write through a temp file in the destination directory, then rename over `path`.
pub fn write_atomic<F>(path: &Path, write: F) -> Result<(), AppError>
where
    F: FnOnce(&mut BufWriter<&mut File>) -> Result<(), AppError>,
{
    let parent = match path.parent() {
        Some(p) if !p.as_os_str().is_empty() => p,
        _ => Path::new("."),
    };
    std::fs::create_dir_all(parent).map_err(|e| write_error(parent, e))?;

    let mut tmp = tempfile::NamedTempFile::new_in(parent).map_err(|e| write_error(path, e))?;
    {
        let mut out = BufWriter::new(tmp.as_file_mut());
        write(&mut out)?;
        out.flush().map_err(|e| write_error(path, e))?;
    }
    tmp.as_file().sync_all().map_err(|e| write_error(path, e))?;
    tmp.persist(path).map_err(|e| write_error(path, e.error))?;
    Ok(())
}

/// Canonical key for a header name: BOM, case and underscores are ignored.
pub fn normalize_header_name(name: &str) -> String {
    name.trim()
        .trim_start_matches('\u{feff}')
        .chars()
        .filter(|c| *c != '_')
        .flat_map(char::to_lowercase)
        .collect()
}

fn build_header_map(headers: &StringRecord) -> HashMap<String, usize> {
    let mut map = HashMap::new();
    for (idx, name) in headers.iter().enumerate() {
        map.entry(normalize_header_name(name)).or_insert(idx);
    }
    map
}

fn parse_row(record: &StringRecord, header_map: &HashMap<String, usize>) -> Result<ObservationRow, String> {
    let period_raw = get_optional(record, header_map, "period").ok_or("Missing required value: `period`")?;
    let period = parse_date(period_raw)?;

    let value = match get_optional(record, header_map, "value") {
        None => f64::NAN,
        Some(s) => s.parse::<f64>().map_err(|_| format!("Non-numeric value '{s}'."))?,
    };

    let forecast_period = get_optional(record, header_map, "forecastperiod")
        .map(parse_date)
        .transpose()?;

    Ok(ObservationRow {
        period,
        series_id: get_optional(record, header_map, "seriesid").unwrap_or_default().to_string(),
        series_description: get_optional(record, header_map, "seriesdescription")
            .unwrap_or_default()
            .to_string(),
        unit: get_optional(record, header_map, "unit").unwrap_or_default().to_string(),
        value,
        forecast_period,
    })
}

fn get_optional<'a>(record: &'a StringRecord, header_map: &HashMap<String, usize>, name: &str) -> Option<&'a str> {
    let idx = header_map.get(name)?;
    record.get(*idx).map(str::trim).filter(|s| !s.is_empty())
}

fn parse_date(s: &str) -> Result<NaiveDate, String> {
    parse_period(s).ok_or_else(|| format!("Invalid date '{s}'. Expected YYYY-MM-DD or YYYY-MM."))
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

#[cfg(test)]
mod tests {
    use super::*;

    fn row(period: (i32, u32), id: &str, value: f64, vintage: (i32, u32)) -> ObservationRow {
        ObservationRow {
            period: NaiveDate::from_ymd_opt(period.0, period.1, 1).unwrap(),
            series_id: id.to_string(),
            series_description: "Wind, electricity generation, U.S.".to_string(),
            unit: "billion kilowatthours".to_string(),
            value,
            forecast_period: NaiveDate::from_ymd_opt(vintage.0, vintage.1, 1),
        }
    }

    #[test]
    fn write_then_read_is_row_for_row_equal() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("wind_2024_03.csv");
        let rows = vec![
            row((2025, 12), "WNEPGEN_US", 45.123456789, (2024, 3)),
            row((2024, 1), "WNEPGEN_US", 0.1 + 0.2, (2024, 3)),
            row((2024, 1), "SOEPGEN_US", -3.0, (2024, 3)),
        ];
        write_table(&path, &rows).unwrap();
        let back = read_table(&path).unwrap();

        assert_eq!(back.len(), rows.len());
        for (a, b) in rows.iter().zip(&back) {
            assert_eq!(a.period, b.period);
            assert_eq!(a.forecast_period, b.forecast_period);
            assert_eq!(a.series_id, b.series_id);
            assert!((a.value - b.value).abs() < 1e-12);
        }
    }

    #[test]
    fn header_row_is_canonical() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("t.csv");
        write_table(&path, &[row((2024, 1), "A", 1.0, (2024, 3))]).unwrap();
        let text = std::fs::read_to_string(&path).unwrap();
        let mut lines = text.lines();
        assert_eq!(lines.next().unwrap(), "period,seriesId,seriesDescription,unit,value,forecastPeriod");
        assert!(lines.next().unwrap().starts_with("2024-01-01,A,"));
        assert!(text.trim_end().ends_with("2024-03-01"));
    }

    #[test]
    fn reads_legacy_snake_case_headers() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("legacy.csv");
        std::fs::write(
            &path,
            "\u{feff}period,seriesId,seriesDescription,value,unit,forecast_period\n\
             2024-02-01,A,desc,2.5,mbd,2024-03-01\n",
        )
        .unwrap();
        let rows = read_table(&path).unwrap();
        assert_eq!(rows[0].value, 2.5);
        assert_eq!(rows[0].unit, "mbd");
        assert_eq!(rows[0].forecast_period, NaiveDate::from_ymd_opt(2024, 3, 1));
    }

    #[test]
    fn missing_period_column_is_load_failure() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("bad.csv");
        std::fs::write(&path, "seriesId,value\nA,1\n").unwrap();
        let err = read_table(&path).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::FileLoadFailure);
    }

    #[test]
    fn atomic_write_replaces_existing_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("nested").join("out.csv");
        write_table(&path, &[row((2024, 1), "A", 1.0, (2024, 3))]).unwrap();
        write_table(&path, &[row((2024, 2), "B", 2.0, (2024, 4))]).unwrap();
        let rows = read_table(&path).unwrap();
        assert_eq!(rows.len(), 1);
        assert_eq!(rows[0].series_id, "B");
        let leftovers = std::fs::read_dir(path.parent().unwrap()).unwrap().count();
        assert_eq!(leftovers, 1);
    }

    #[test]
    fn header_normalization() {
        assert_eq!(normalize_header_name("forecast_period"), "forecastperiod");
        assert_eq!(normalize_header_name(" forecastPeriod "), "forecastperiod");
        assert_eq!(normalize_header_name("\u{feff}Period"), "period");
    }
}
