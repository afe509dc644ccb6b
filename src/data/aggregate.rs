//! Multi-series aggregation into one vintage table.
//!
//! Workflow for one run:
//! validate inputs -> fetch every series (bounded pool, list order kept)
//! -> concatenate -> coerce values -> stamp vintage -> atomic write.
//!
//! Nothing is written unless every step succeeds.

use std::path::PathBuf;

use chrono::NaiveDate;
use rayon::prelude::*;
use tracing::{info, warn};

use crate::data::eia::ObservationSource;
use crate::data::params::{build_params, validate_start_period};
use crate::domain::{ObservationRow, RawObservation, RawValue, Vintage, VintageTable};
use crate::error::{AppError, ErrorKind};

/// Inputs of one aggregator run.
#[derive(Debug, Clone)]
pub struct AggregateRequest {
    pub series_ids: Vec<String>,
    /// `YYYY-MM`.
    pub start_period: String,
    pub vintage: Vintage,
    pub destination: PathBuf,
    /// Date used for the request window and start-period validation.
    pub today: NaiveDate,
    pub workers: usize,
}

/// Fetch all series, build the vintage table and persist it to `request.destination`.
pub fn aggregate_series<S>(source: &S, request: &AggregateRequest) -> Result<VintageTable, AppError>
where
    S: ObservationSource + Sync,
{
    if request.series_ids.is_empty() {
        return Err(AppError::new(ErrorKind::InvalidInput, "No series identifiers given."));
    }
    if let Some(blank) = request.series_ids.iter().position(|id| id.trim().is_empty()) {
        return Err(AppError::new(
            ErrorKind::InvalidInput,
            format!("Series identifier #{} is blank.", blank + 1),
        ));
    }
    validate_start_period(&request.start_period, request.today)?;

    let batches = fetch_all(source, request)?;

    let mut raw = Vec::new();
    for (series_id, batch) in request.series_ids.iter().zip(batches) {
        if batch.is_empty() {
            warn!(series_id = %series_id, "no observations returned");
        }
        raw.extend(batch);
    }

    if raw.is_empty() {
        return Err(AppError::new(
            ErrorKind::EmptyResultSet,
            format!(
                "No observations returned for any of {} series; nothing written.",
                request.series_ids.len()
            ),
        ));
    }

    let table = VintageTable {
        vintage: request.vintage,
        rows: coerce_rows(raw, request.vintage)?,
    };

    crate::io::table::write_table(&request.destination, &table.rows)?;
    info!(
        path = %request.destination.display(),
        vintage = %table.vintage,
        rows = table.len(),
        series = request.series_ids.len(),
        "vintage table written"
    );

    Ok(table)
}

fn fetch_all<S>(source: &S, request: &AggregateRequest) -> Result<Vec<Vec<RawObservation>>, AppError>
where
    S: ObservationSource + Sync,
{
    let fetch_one = |series_id: &String| -> Result<Vec<RawObservation>, AppError> {
        let params = build_params(series_id, &request.start_period, request.today);
        let rows = source.fetch(&params)?;
        info!(series_id = %series_id, rows = rows.len(), "fetched");
        Ok(rows)
    };

    if request.workers <= 1 || request.series_ids.len() == 1 {
        return request.series_ids.iter().map(fetch_one).collect();
    }

    let pool = rayon::ThreadPoolBuilder::new()
        .num_threads(request.workers)
        .build()
        .map_err(|e| AppError::new(ErrorKind::Config, format!("Failed to start fetch workers: {e}")))?;

    // Indexed collect keeps identifier-list order.
    pool.install(|| request.series_ids.par_iter().map(fetch_one).collect())
}

/// Turn fetched records into table rows stamped with `vintage`.
pub fn coerce_rows(raw: Vec<RawObservation>, vintage: Vintage) -> Result<Vec<ObservationRow>, AppError> {
    let forecast_period = Some(vintage.date());
    raw.into_iter()
        .map(|obs| {
            let value = coerce_value(&obs.value).ok_or_else(|| {
                AppError::new(
                    ErrorKind::TypeCoercionFailure,
                    format!(
                        "Non-numeric value {:?} for series {} at {}.",
                        obs.value, obs.series_id, obs.period
                    ),
                )
            })?;
            Ok(ObservationRow {
                period: obs.period,
                series_id: obs.series_id,
                series_description: obs.series_description,
                unit: obs.unit,
                value,
                forecast_period,
            })
        })
        .collect()
}

/// Missing and blank values become NaN; text must parse as a float.
fn coerce_value(raw: &RawValue) -> Option<f64> {
    match raw {
        RawValue::Number(v) => Some(*v),
        RawValue::Missing => Some(f64::NAN),
        RawValue::Text(s) => {
            let s = s.trim();
            if s.is_empty() { Some(f64::NAN) } else { s.parse::<f64>().ok() }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;
    use std::sync::Mutex;

    use crate::domain::QueryParams;

    /// Serves canned observations per series id and records the calls made.
    struct StubSource {
        responses: HashMap<String, Result<Vec<RawObservation>, AppError>>,
        calls: Mutex<Vec<String>>,
    }

    impl StubSource {
        fn new() -> Self {
            Self {
                responses: HashMap::new(),
                calls: Mutex::new(Vec::new()),
            }
        }

        fn with(mut self, id: &str, values: &[(&str, RawValue)]) -> Self {
            let rows = values
                .iter()
                .map(|(period, value)| RawObservation {
                    period: crate::domain::parse_period(period).unwrap(),
                    series_id: id.to_string(),
                    series_description: format!("{id} description"),
                    unit: "billion kilowatthours".to_string(),
                    value: value.clone(),
                })
                .collect();
            self.responses.insert(id.to_string(), Ok(rows));
            self
        }

        fn failing(mut self, id: &str) -> Self {
            self.responses.insert(
                id.to_string(),
                Err(AppError::new(ErrorKind::NetworkFailure, "connection reset")),
            );
            self
        }
    }

    impl ObservationSource for StubSource {
        fn fetch(&self, params: &QueryParams) -> Result<Vec<RawObservation>, AppError> {
            let id = params.first_series().unwrap_or_default().to_string();
            self.calls.lock().unwrap().push(id.clone());
            self.responses.get(&id).cloned().unwrap_or_else(|| Ok(Vec::new()))
        }
    }

    fn request(dir: &std::path::Path, ids: &[&str], workers: usize) -> AggregateRequest {
        let destination = dir.join("forecast_2024_03.csv");
        AggregateRequest {
            series_ids: ids.iter().map(|s| s.to_string()).collect(),
            start_period: "2023-01".to_string(),
            vintage: Vintage::from_path(&destination).unwrap(),
            destination,
            today: NaiveDate::from_ymd_opt(2024, 3, 20).unwrap(),
            workers,
        }
    }

    fn two_series() -> StubSource {
        StubSource::new()
            .with("A", &[("2023-02", RawValue::Text("1.5".into())), ("2023-01", RawValue::Number(1.0))])
            .with("B", &[("2023-02", RawValue::Text(" 7 ".into())), ("2023-01", RawValue::Number(6.5))])
    }

    #[test]
    fn scenario_two_series_stamped_and_ordered() {
        let dir = tempfile::tempdir().unwrap();
        let req = request(dir.path(), &["A", "B"], 1);
        let table = aggregate_series(&two_series(), &req).unwrap();

        let march = NaiveDate::from_ymd_opt(2024, 3, 1).unwrap();
        assert_eq!(table.len(), 4);
        assert!(table.rows.iter().all(|r| r.forecast_period == Some(march)));
        let ids: Vec<&str> = table.rows.iter().map(|r| r.series_id.as_str()).collect();
        assert_eq!(ids, vec!["A", "A", "B", "B"]);
        let values: Vec<f64> = table.rows.iter().map(|r| r.value).collect();
        assert_eq!(values, vec![1.5, 1.0, 7.0, 6.5]);

        let reloaded = crate::io::table::read_table(&req.destination).unwrap();
        assert_eq!(reloaded, table.rows);
    }

    #[test]
    fn worker_pool_preserves_list_order() {
        let dir = tempfile::tempdir().unwrap();
        let ids = ["A", "B", "C", "D", "E", "F"];
        let mut source = StubSource::new();
        for id in ids {
            source = source.with(id, &[("2023-01", RawValue::Number(1.0))]);
        }
        let table = aggregate_series(&source, &request(dir.path(), &ids, 4)).unwrap();
        let got: Vec<&str> = table.rows.iter().map(|r| r.series_id.as_str()).collect();
        assert_eq!(got, ids.to_vec());
        assert_eq!(source.calls.lock().unwrap().len(), ids.len());
    }

    #[test]
    fn non_numeric_value_aborts_without_writing() {
        let dir = tempfile::tempdir().unwrap();
        let source = two_series().with("C", &[("2023-01", RawValue::Text("n/a".into()))]);
        let req = request(dir.path(), &["A", "C"], 1);
        let err = aggregate_series(&source, &req).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::TypeCoercionFailure);
        assert!(!req.destination.exists());
    }

    #[test]
    fn network_failure_aborts_without_writing() {
        let dir = tempfile::tempdir().unwrap();
        let source = two_series().failing("B");
        let req = request(dir.path(), &["A", "B"], 1);
        let err = aggregate_series(&source, &req).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::NetworkFailure);
        assert!(!req.destination.exists());
    }

    #[test]
    fn all_empty_is_empty_result_set() {
        let dir = tempfile::tempdir().unwrap();
        let req = request(dir.path(), &["X", "Y"], 1);
        let err = aggregate_series(&StubSource::new(), &req).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::EmptyResultSet);
        assert!(!req.destination.exists());
    }

    #[test]
    fn one_empty_series_is_tolerated() {
        let dir = tempfile::tempdir().unwrap();
        let req = request(dir.path(), &["A", "EMPTY"], 1);
        let table = aggregate_series(&two_series(), &req).unwrap();
        assert_eq!(table.len(), 2);
    }

    #[test]
    fn invalid_start_fails_before_any_fetch() {
        let dir = tempfile::tempdir().unwrap();
        let source = two_series();
        let mut req = request(dir.path(), &["A"], 1);
        req.start_period = "2025-01".to_string();
        let err = aggregate_series(&source, &req).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::InvalidInput);
        assert!(source.calls.lock().unwrap().is_empty());
    }

    #[test]
    fn missing_values_become_nan() {
        let vintage = Vintage::from_ym(2024, 3).unwrap();
        let raw = vec![RawObservation {
            period: NaiveDate::from_ymd_opt(2024, 1, 1).unwrap(),
            series_id: "A".to_string(),
            series_description: String::new(),
            unit: String::new(),
            value: RawValue::Missing,
        }];
        let rows = coerce_rows(raw, vintage).unwrap();
        assert!(rows[0].value.is_nan());
    }
}
