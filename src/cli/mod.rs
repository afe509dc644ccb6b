//! Command-line parsing for the STEO forecast pipeline.
//!
//! Argument parsing and command dispatch stay separate from the fetch and
//! consolidation code; `crate::app` turns these structs into requests.

use std::path::PathBuf;

use chrono::NaiveDate;
use clap::{Args, Parser, Subcommand};

use crate::view::PlotKind;

/// Top-level CLI.
#[derive(Debug, Parser)]
#[command(name = "steo", version, about = "EIA Short-Term Energy Outlook forecast archiver")]
pub struct Cli {
    #[command(subcommand)]
    pub command: Command,
}

/// CLI subcommands.
#[derive(Debug, Subcommand)]
pub enum Command {
    /// Fetch series from the EIA STEO API and write one vintage table.
    Fetch(FetchArgs),
    /// Rebuild a master table from every vintage table in a directory.
    Consolidate(ConsolidateArgs),
    /// Summarize (and optionally chart) a vintage or master table.
    Show(ShowArgs),
}

/// Options for `steo fetch`.
#[derive(Debug, Args, Clone)]
pub struct FetchArgs {
    /// Series identifiers, e.g. `PATC_WORLD`. Repeat or comma-separate.
    #[arg(long = "series", value_name = "ID", required = true, num_args = 1.., value_delimiter = ',')]
    pub series: Vec<String>,

    /// First period to request (YYYY-MM).
    #[arg(long, value_name = "YYYY-MM")]
    pub start: String,

    /// Destination file; its name must end in `_YYYY_MM.csv` unless `--vintage` is given.
    #[arg(long, value_name = "CSV", conflicts_with_all = ["name", "out_dir"], required_unless_present = "name")]
    pub output: Option<PathBuf>,

    /// Table name; writes `<out-dir>/<name>_<YYYY_MM>.csv`.
    #[arg(long)]
    pub name: Option<String>,

    /// Directory for `--name` output.
    #[arg(long, value_name = "DIR", default_value = ".")]
    pub out_dir: PathBuf,

    /// Vintage stamp (YYYY_MM). Defaults to the current month for `--name`.
    #[arg(long, value_name = "YYYY_MM")]
    pub vintage: Option<String>,

    /// File holding the API key (overrides STEO_API_KEY_FILE).
    #[arg(long, value_name = "FILE")]
    pub key_file: Option<PathBuf>,

    /// Zero-based line of the key file to use (overrides STEO_API_KEY_LINE).
    #[arg(long, value_name = "N")]
    pub key_line: Option<usize>,

    /// Parallel requests (overrides STEO_WORKERS).
    #[arg(long, value_name = "N")]
    pub workers: Option<usize>,

    /// Per-request timeout in seconds (overrides STEO_TIMEOUT_SECS).
    #[arg(long, value_name = "SECS")]
    pub timeout_secs: Option<u64>,
}

/// Options for `steo consolidate`.
#[derive(Debug, Args, Clone)]
pub struct ConsolidateArgs {
    /// Directory holding the vintage tables.
    #[arg(long, value_name = "DIR")]
    pub source: PathBuf,

    /// Master table name; writes `<master-dir>/<name>.csv`.
    #[arg(long)]
    pub name: String,

    /// Output directory (overrides STEO_MASTER_DIR).
    #[arg(long, value_name = "DIR")]
    pub master_dir: Option<PathBuf>,
}

/// Options for `steo show`.
#[derive(Debug, Args, Clone)]
pub struct ShowArgs {
    /// Vintage or master table.
    #[arg(long, value_name = "CSV")]
    pub table: PathBuf,

    /// Only the latest vintage.
    #[arg(long)]
    pub current: bool,

    /// Restrict to these series. Repeat or comma-separate.
    #[arg(long = "series", value_name = "ID", num_args = 1.., value_delimiter = ',')]
    pub series: Vec<String>,

    /// First period to include (YYYY-MM-DD).
    #[arg(long, value_name = "DATE")]
    pub from: Option<NaiveDate>,

    /// Last period to include (YYYY-MM-DD).
    #[arg(long, value_name = "DATE")]
    pub to: Option<NaiveDate>,

    /// Render a terminal chart of the selection.
    #[arg(long, value_enum, value_name = "KIND")]
    pub chart: Option<PlotKind>,

    /// Chart width (columns).
    #[arg(long, default_value_t = 100)]
    pub width: usize,

    /// Chart height (rows).
    #[arg(long, default_value_t = 25)]
    pub height: usize,
}
