//! Reporting utilities: per-series summaries and formatted terminal output.

use std::collections::{BTreeSet, HashMap};

use chrono::NaiveDate;

use crate::domain::ObservationRow;

pub mod format;
pub use format::*;

/// What a table holds for one series.
#[derive(Debug, Clone, PartialEq)]
pub struct SeriesSummary {
    pub series_id: String,
    pub unit: String,
    pub rows: usize,
    /// Rows whose value is missing (NaN).
    pub missing: usize,
    pub first_period: NaiveDate,
    pub last_period: NaiveDate,
    pub vintages: usize,
    pub latest_vintage: Option<NaiveDate>,
}

/// Summarize `rows` per series, in first-seen order.
pub fn summarize_series(rows: &[ObservationRow]) -> Vec<SeriesSummary> {
    let mut out: Vec<SeriesSummary> = Vec::new();
    let mut vintages: Vec<BTreeSet<NaiveDate>> = Vec::new();
    let mut index: HashMap<&str, usize> = HashMap::new();

    for r in rows {
        let i = *index.entry(r.series_id.as_str()).or_insert_with(|| {
            out.push(SeriesSummary {
                series_id: r.series_id.clone(),
                unit: r.unit.clone(),
                rows: 0,
                missing: 0,
                first_period: r.period,
                last_period: r.period,
                vintages: 0,
                latest_vintage: None,
            });
            vintages.push(BTreeSet::new());
            out.len() - 1
        });

        let s = &mut out[i];
        s.rows += 1;
        if r.value.is_nan() {
            s.missing += 1;
        }
        s.first_period = s.first_period.min(r.period);
        s.last_period = s.last_period.max(r.period);
        if let Some(v) = r.forecast_period {
            vintages[i].insert(v);
        }
    }

    for (s, set) in out.iter_mut().zip(&vintages) {
        s.vintages = set.len();
        s.latest_vintage = set.last().copied();
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    fn row(id: &str, period: (i32, u32), value: f64, vintage: (i32, u32)) -> ObservationRow {
        ObservationRow {
            period: NaiveDate::from_ymd_opt(period.0, period.1, 1).unwrap(),
            series_id: id.to_string(),
            series_description: String::new(),
            unit: "mbd".to_string(),
            value,
            forecast_period: NaiveDate::from_ymd_opt(vintage.0, vintage.1, 1),
        }
    }

    #[test]
    fn summarize_series_basic() {
        let rows = vec![
            row("B", (2024, 3), 1.0, (2024, 2)),
            row("A", (2024, 5), 1.0, (2024, 2)),
            row("B", (2024, 1), f64::NAN, (2024, 3)),
            row("B", (2025, 1), 2.0, (2024, 3)),
        ];
        let out = summarize_series(&rows);

        assert_eq!(out.len(), 2);
        assert_eq!(out[0].series_id, "B");
        assert_eq!(out[0].rows, 3);
        assert_eq!(out[0].missing, 1);
        assert_eq!(out[0].first_period, NaiveDate::from_ymd_opt(2024, 1, 1).unwrap());
        assert_eq!(out[0].last_period, NaiveDate::from_ymd_opt(2025, 1, 1).unwrap());
        assert_eq!(out[0].vintages, 2);
        assert_eq!(out[0].latest_vintage, NaiveDate::from_ymd_opt(2024, 3, 1));
        assert_eq!(out[1].series_id, "A");
        assert_eq!(out[1].vintages, 1);
    }

    #[test]
    fn summarize_empty_table() {
        assert!(summarize_series(&[]).is_empty());
    }
}
