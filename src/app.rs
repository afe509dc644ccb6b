//! Top-level application orchestration.
//!
//! `src/main.rs` is intentionally tiny; this module is the "real main" that:
//! - initializes logging
//! - parses CLI arguments and merges them over `Settings`
//! - runs the fetch / consolidate / show workflows
//! - prints reports and charts

use std::path::PathBuf;
use std::time::Duration;

use chrono::NaiveDate;
use clap::Parser;
use tracing::{info, warn};
use tracing_subscriber::EnvFilter;

use crate::cli::{Cli, Command, ConsolidateArgs, FetchArgs, ShowArgs};
use crate::config::Settings;
use crate::data::AggregateRequest;
use crate::domain::{Vintage, vintage_file_name};
use crate::error::{AppError, ErrorKind};
use crate::view::{DataSource, ViewMode, ViewQuery};

pub mod pipeline;

/// Entry point for the `steo` binary.
pub fn run() -> Result<(), AppError> {
    init_logging();
    let cli = Cli::parse();
    let settings = Settings::from_env()?;

    match cli.command {
        Command::Fetch(args) => handle_fetch(args, settings),
        Command::Consolidate(args) => handle_consolidate(args, settings),
        Command::Show(args) => handle_show(args),
    }
}

/// Logs go to stderr so stdout carries only reports.
fn init_logging() {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    let _ = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .with_writer(std::io::stderr)
        .try_init();
}

fn handle_fetch(args: FetchArgs, settings: Settings) -> Result<(), AppError> {
    let settings = apply_fetch_overrides(settings, &args);
    let today = chrono::Local::now().date_naive();
    let (destination, vintage) = resolve_destination(&args, today)?;

    let request = AggregateRequest {
        series_ids: args.series,
        start_period: args.start,
        vintage,
        destination,
        today,
        workers: settings.workers,
    };
    let table = pipeline::run_fetch(&settings, &request)?;

    println!("{}", crate::report::format_vintage_summary(&table, &request.destination));
    Ok(())
}

fn handle_consolidate(args: ConsolidateArgs, mut settings: Settings) -> Result<(), AppError> {
    if let Some(dir) = args.master_dir {
        settings.master_dir = dir;
    }
    let report = pipeline::run_consolidate(&settings, &args.source, &args.name)?;

    println!("{}", crate::report::format_consolidation_report(&report));
    Ok(())
}

fn handle_show(args: ShowArgs) -> Result<(), AppError> {
    let source = DataSource::open(&args.table)?;
    let query = ViewQuery {
        mode: if args.current { ViewMode::Current } else { ViewMode::Comparison },
        series_ids: args.series,
        from: args.from,
        to: args.to,
    };
    let rows = source.select(&query);
    if rows.is_empty() {
        warn!(path = %source.path().display(), "selection is empty");
    }

    let summaries = crate::report::summarize_series(&rows);
    println!(
        "{}",
        crate::report::format_table_summary(source.path(), rows.len(), &summaries)
    );

    if let Some(kind) = args.chart {
        let series = crate::plot::group_rows(&rows, query.mode);
        println!("{}", crate::plot::render_chart(&series, kind, args.width, args.height));
    }
    Ok(())
}

pub fn apply_fetch_overrides(mut settings: Settings, args: &FetchArgs) -> Settings {
    if let Some(path) = &args.key_file {
        settings.api_key_file = path.clone();
    }
    if let Some(line) = args.key_line {
        settings.api_key_line = line;
    }
    if let Some(workers) = args.workers {
        settings.workers = workers;
    }
    if let Some(secs) = args.timeout_secs {
        settings.timeout = Duration::from_secs(secs);
    }
    settings
}

/// Where the vintage table goes and which vintage it is stamped with.
///
/// `--output` takes the vintage from `--vintage` or else from the file name,
/// and the two must agree when both are present;
/// `--name` builds `<out-dir>/<name>_<YYYY_MM>.csv`, defaulting to the
/// current month.
pub fn resolve_destination(args: &FetchArgs, today: NaiveDate) -> Result<(PathBuf, Vintage), AppError> {
    let explicit = args.vintage.as_deref().map(Vintage::parse).transpose()?;

    if let Some(path) = &args.output {
        let stamped = Vintage::from_path(path);
        let vintage = match (explicit, stamped) {
            (Some(v), Ok(named)) if v != named => {
                return Err(AppError::new(
                    ErrorKind::InvalidInput,
                    format!(
                        "--vintage {v} conflicts with the vintage {named} in the file name '{}'.",
                        path.display()
                    ),
                ));
            }
            (Some(v), _) => v,
            (None, stamped) => stamped?,
        };
        return Ok((path.clone(), vintage));
    }

    let name = args.name.as_deref().map(str::trim).unwrap_or_default();
    if name.is_empty() {
        return Err(AppError::new(
            ErrorKind::InvalidInput,
            "Either --output or a non-empty --name is required.",
        ));
    }
    let vintage = explicit.unwrap_or_else(|| Vintage::of_month(today));
    let path = args.out_dir.join(vintage_file_name(name, vintage));
    info!(path = %path.display(), vintage = %vintage, "resolved destination");
    Ok((path, vintage))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn fetch_args(argv: &[&str]) -> FetchArgs {
        let mut full = vec!["steo", "fetch", "--series", "PATC_WORLD", "--start", "2024-01"];
        full.extend_from_slice(argv);
        match Cli::try_parse_from(full).unwrap().command {
            Command::Fetch(args) => args,
            other => panic!("unexpected command {other:?}"),
        }
    }

    fn today() -> NaiveDate {
        NaiveDate::from_ymd_opt(2024, 3, 20).unwrap()
    }

    #[test]
    fn name_uses_current_month_vintage() {
        let args = fetch_args(&["--name", "oil", "--out-dir", "vintages"]);
        let (path, vintage) = resolve_destination(&args, today()).unwrap();
        assert_eq!(path, PathBuf::from("vintages/oil_2024_03.csv"));
        assert_eq!(vintage, Vintage::from_ym(2024, 3).unwrap());
    }

    #[test]
    fn name_with_explicit_vintage() {
        let args = fetch_args(&["--name", "oil", "--vintage", "2023_12"]);
        let (path, vintage) = resolve_destination(&args, today()).unwrap();
        assert_eq!(path, PathBuf::from("./oil_2023_12.csv"));
        assert_eq!(vintage, Vintage::from_ym(2023, 12).unwrap());
    }

    #[test]
    fn output_takes_vintage_from_file_name() {
        let args = fetch_args(&["--output", "data/wind_2024_02.csv"]);
        let (path, vintage) = resolve_destination(&args, today()).unwrap();
        assert_eq!(path, PathBuf::from("data/wind_2024_02.csv"));
        assert_eq!(vintage, Vintage::from_ym(2024, 2).unwrap());
    }

    #[test]
    fn output_without_stamp_is_rejected() {
        let args = fetch_args(&["--output", "data/wind.csv"]);
        let err = resolve_destination(&args, today()).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::InvalidInput);

        let args = fetch_args(&["--output", "data/wind.csv", "--vintage", "2024_02"]);
        assert!(resolve_destination(&args, today()).is_ok());
    }

    #[test]
    fn output_stamp_must_match_explicit_vintage() {
        let args = fetch_args(&["--output", "data/wind_2024_02.csv", "--vintage", "2023_12"]);
        let err = resolve_destination(&args, today()).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::InvalidInput);
        assert!(err.to_string().contains("2023-12"));

        let args = fetch_args(&["--output", "data/wind_2024_02.csv", "--vintage", "2024-02"]);
        let (_, vintage) = resolve_destination(&args, today()).unwrap();
        assert_eq!(vintage, Vintage::from_ym(2024, 2).unwrap());
    }

    #[test]
    fn cli_flags_override_settings() {
        let args = fetch_args(&["--name", "oil", "--workers", "4", "--timeout-secs", "5", "--key-line", "2"]);
        let settings = apply_fetch_overrides(Settings::default(), &args);
        assert_eq!(settings.workers, 4);
        assert_eq!(settings.timeout, Duration::from_secs(5));
        assert_eq!(settings.api_key_line, 2);
        assert_eq!(settings.api_key_file, PathBuf::from("api_key.txt"));
    }
}
