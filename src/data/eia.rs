//! EIA Open Data API integration for Short-Term Energy Outlook series.

use reqwest::Url;
use reqwest::blocking::Client;
use serde::Deserialize;
use serde_json::Value;
use tracing::{debug, warn};

use crate::config::Settings;
use crate::data::limiter::RateLimiter;
use crate::domain::{QueryParams, RawObservation, RawValue, parse_period};
use crate::error::{AppError, ErrorKind};

/// Anything that can answer a `QueryParams` with observation records.
///
/// `EiaClient` is the production implementation; the aggregator only sees
/// this trait.
pub trait ObservationSource {
    fn fetch(&self, params: &QueryParams) -> Result<Vec<RawObservation>, AppError>;
}

pub struct EiaClient {
    client: Client,
    base_url: Url,
    api_key: String,
    limiter: RateLimiter,
}

impl EiaClient {
    pub fn new(settings: &Settings, api_key: String) -> Result<Self, AppError> {
        let base_url = Url::parse(&settings.base_url).map_err(|e| {
            AppError::new(
                ErrorKind::Config,
                format!("Invalid base URL '{}': {e}", settings.base_url),
            )
        })?;
        let client = Client::builder()
            .timeout(settings.timeout)
            .build()
            .map_err(|e| AppError::new(ErrorKind::Config, format!("Failed to build HTTP client: {e}")))?;

        let limiter = RateLimiter::new(settings.min_request_interval);
        debug!(base_url = %base_url, interval = ?limiter.interval(), "EIA client ready");

        Ok(Self {
            client,
            base_url,
            api_key,
            limiter,
        })
    }
}

impl ObservationSource for EiaClient {
    /// One GET, no retry, no pagination.
    fn fetch(&self, params: &QueryParams) -> Result<Vec<RawObservation>, AppError> {
        let url = build_request_url(&self.base_url, params, &self.api_key);
        self.limiter.acquire();
        debug!(url = %redacted_url(&url), "GET");

        let resp = self.client.get(url).send().map_err(|e| {
            AppError::new(
                ErrorKind::NetworkFailure,
                format!("EIA request failed: {}", e.without_url()),
            )
        })?;

        let status = resp.status();
        let body = resp.text().map_err(|e| {
            AppError::new(
                ErrorKind::NetworkFailure,
                format!("Failed to read EIA response body: {}", e.without_url()),
            )
        })?;

        if !status.is_success() {
            let detail = error_message(&body)
                .map(|m| format!(": {m}"))
                .unwrap_or_default();
            return Err(AppError::new(
                ErrorKind::NetworkFailure,
                format!("EIA request failed with status {status}{detail}"),
            ));
        }

        parse_response(&body, params.page_length)
    }
}

/// Serialize `params` into a request URL.
///
/// Segments are appended in a fixed order: `api_key`, `frequency`, `data[i]`,
/// `facets[seriesId][]` (first series only, omitted when the filter is
/// empty), `start`, `sort[i][column]`, `sort[i][direction]`, `offset`,
/// `length`.
pub fn build_request_url(base: &Url, params: &QueryParams, api_key: &str) -> Url {
    let mut url = base.clone();
    {
        let mut query = url.query_pairs_mut();
        query.append_pair("api_key", api_key);
        query.append_pair("frequency", params.frequency.as_str());
        for (i, field) in params.fields.iter().enumerate() {
            query.append_pair(&format!("data[{i}]"), field);
        }

        match facet_filter(params) {
            FacetFilter::Single(series_id) => {
                debug!(series_id, "facet filter applied");
                query.append_pair("facets[seriesId][]", series_id);
            }
            FacetFilter::FirstOf { sent, requested } => {
                warn!(requested, sent, "only the first series facet is sent upstream");
                query.append_pair("facets[seriesId][]", sent);
            }
            FacetFilter::Empty => {
                warn!("series facet is empty; request is unfiltered");
            }
        }

        query.append_pair("start", &params.start_period);
        for (i, key) in params.sort.iter().enumerate() {
            query.append_pair(&format!("sort[{i}][column]"), &key.column);
            query.append_pair(&format!("sort[{i}][direction]"), key.direction.as_str());
        }
        query.append_pair("offset", &params.offset.to_string());
        query.append_pair("length", &params.page_length.to_string());
    }
    url
}

/// How the series facet of a query goes upstream.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FacetFilter<'a> {
    Single(&'a str),
    /// More than one series was asked for; only `sent` is applied.
    FirstOf { sent: &'a str, requested: usize },
    /// No facet at all: the request covers every series.
    Empty,
}

pub fn facet_filter(params: &QueryParams) -> FacetFilter<'_> {
    match params.first_series() {
        None => FacetFilter::Empty,
        Some(sent) if params.series_filter.len() > 1 => FacetFilter::FirstOf {
            sent,
            requested: params.series_filter.len(),
        },
        Some(sent) => FacetFilter::Single(sent),
    }
}

/// The request URL with the API key masked, for logs.
pub fn redacted_url(url: &Url) -> String {
    let mut masked = url.clone();
    let pairs: Vec<(String, String)> = url
        .query_pairs()
        .map(|(k, v)| {
            let v = if k == "api_key" { "***".to_string() } else { v.into_owned() };
            (k.into_owned(), v)
        })
        .collect();
    masked.query_pairs_mut().clear().extend_pairs(pairs);
    masked.to_string()
}

#[derive(Debug, Deserialize)]
struct Envelope {
    response: Option<ResponseBody>,
}

#[derive(Debug, Deserialize)]
struct ResponseBody {
    data: Option<Vec<ApiRecord>>,
    #[serde(default)]
    total: Option<Value>,
    #[serde(default)]
    warnings: Vec<ApiWarning>,
}

#[derive(Debug, Deserialize)]
struct ApiWarning {
    #[serde(default)]
    warning: String,
    #[serde(default)]
    description: String,
}

#[derive(Debug, Deserialize)]
struct ApiRecord {
    period: String,
    #[serde(rename = "seriesId")]
    series_id: String,
    #[serde(rename = "seriesDescription", default)]
    series_description: Option<String>,
    #[serde(default)]
    unit: Option<String>,
    #[serde(default)]
    value: Value,
}

/// Parse a response body into at most `page_length` observations.
pub fn parse_response(body: &str, page_length: u32) -> Result<Vec<RawObservation>, AppError> {
    let envelope: Envelope = serde_json::from_str(body).map_err(|e| {
        AppError::new(
            ErrorKind::ResponseParseFailure,
            format!("Failed to parse EIA response: {e}"),
        )
    })?;

    let missing = || {
        let detail = error_message(body)
            .map(|m| format!(" (upstream error: {m})"))
            .unwrap_or_default();
        AppError::new(
            ErrorKind::ResponseParseFailure,
            format!("EIA response has no response.data array{detail}"),
        )
    };
    let response = envelope.response.ok_or_else(missing)?;
    let mut records = response.data.ok_or_else(missing)?;

    for w in &response.warnings {
        warn!(warning = %w.warning, description = %w.description, "EIA response warning");
    }

    let total = response.total.as_ref().and_then(total_rows);
    let limit = page_length as usize;
    if total.is_some_and(|t| t > limit) || records.len() > limit {
        warn!(
            total = total.unwrap_or(records.len()),
            page_length, "more rows available than one page; keeping the first page only"
        );
    }
    records.truncate(limit);

    records
        .into_iter()
        .map(|r| {
            let period = parse_period(&r.period).ok_or_else(|| {
                AppError::new(
                    ErrorKind::ResponseParseFailure,
                    format!("Invalid period '{}' for series {}", r.period, r.series_id),
                )
            })?;
            Ok(RawObservation {
                period,
                series_id: r.series_id,
                series_description: r.series_description.unwrap_or_default(),
                unit: r.unit.unwrap_or_default(),
                value: raw_value(r.value),
            })
        })
        .collect()
}

fn raw_value(value: Value) -> RawValue {
    match value {
        Value::Null => RawValue::Missing,
        Value::Number(n) => n.as_f64().map(RawValue::Number).unwrap_or(RawValue::Missing),
        Value::String(s) => RawValue::Text(s),
        other => RawValue::Text(other.to_string()),
    }
}

/// `response.total` is sometimes a number, sometimes a numeric string.
fn total_rows(value: &Value) -> Option<usize> {
    match value {
        Value::Number(n) => n.as_u64().map(|n| n as usize),
        Value::String(s) => s.trim().parse().ok(),
        _ => None,
    }
}

/// Extract the message from an EIA error payload (`{"error": ...}`).
fn error_message(body: &str) -> Option<String> {
    let value: Value = serde_json::from_str(body).ok()?;
    match value.get("error")? {
        Value::String(s) => Some(s.clone()),
        Value::Object(obj) => obj
            .get("message")
            .and_then(Value::as_str)
            .map(str::to_string)
            .or_else(|| Some(Value::Object(obj.clone()).to_string())),
        other => Some(other.to_string()),
    }
}
