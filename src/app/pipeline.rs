//! Shared fetch/consolidate workflow.
//!
//! Keeping this separate from argument handling means the whole path
//! credentials -> client -> aggregate -> write
//! can be driven from tests or other front-ends with a plain `Settings`.

use std::path::Path;

use tracing::info;

use crate::config::Settings;
use crate::data::{AggregateRequest, EiaClient, aggregate_series, load_api_key};
use crate::domain::VintageTable;
use crate::error::AppError;
use crate::io::{ConsolidationReport, consolidate, master_output_path};

/// Load the API key, build the client and write one vintage table.
pub fn run_fetch(settings: &Settings, request: &AggregateRequest) -> Result<VintageTable, AppError> {
    settings.validate()?;
    let api_key = load_api_key(&settings.api_key_file, settings.api_key_line)?;
    let client = EiaClient::new(settings, api_key)?;

    info!(
        series = request.series_ids.len(),
        start = %request.start_period,
        vintage = %request.vintage,
        workers = request.workers,
        "fetching"
    );
    aggregate_series(&client, request)
}

/// Rebuild `<master_dir>/<name>.csv` from the tables in `source_dir`.
pub fn run_consolidate(settings: &Settings, source_dir: &Path, name: &str) -> Result<ConsolidationReport, AppError> {
    let output = master_output_path(&settings.master_dir, name);
    consolidate(source_dir, &output)
}
