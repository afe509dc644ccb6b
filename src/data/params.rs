//! Request parameter construction.

use chrono::{Datelike, NaiveDate};

use crate::domain::{Frequency, PAGE_LENGTH_MAX, QueryParams, SortDirection, SortKey, parse_year_month};
use crate::error::{AppError, ErrorKind};

/// Build the canonical monthly query for one series.
///
/// `start_period` is passed through as given; see [`validate_start_period`].
pub fn build_params(series_id: &str, start_period: &str, today: NaiveDate) -> QueryParams {
    QueryParams {
        frequency: Frequency::Monthly,
        fields: vec!["value".to_string()],
        series_filter: vec![series_id.to_string()],
        start_period: start_period.to_string(),
        end_period: today.format("%Y-%m").to_string(),
        sort: vec![SortKey {
            column: "period".to_string(),
            direction: SortDirection::Desc,
        }],
        offset: 0,
        page_length: PAGE_LENGTH_MAX,
    }
}

/// Check that `start_period` is `YYYY-MM` and not after the month of `today`.
pub fn validate_start_period(start_period: &str, today: NaiveDate) -> Result<NaiveDate, AppError> {
    let start = parse_year_month(start_period.trim(), '-').ok_or_else(|| {
        AppError::new(
            ErrorKind::InvalidInput,
            format!("Invalid start period '{start_period}'. Expected YYYY-MM."),
        )
    })?;

    if start > today.with_day(1).unwrap_or(today) {
        return Err(AppError::new(
            ErrorKind::InvalidInput,
            format!(
                "Start period {start_period} is after the current month {}.",
                today.format("%Y-%m")
            ),
        ));
    }
    Ok(start)
}
