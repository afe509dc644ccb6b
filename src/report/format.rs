//! Formatted terminal output for fetch, consolidate and show runs.
//!
//! We keep formatting code in one place so:
//! - the pipeline code stays clean and testable
//! - output changes are localized (snapshot-style tests below)

use std::path::Path;

use crate::domain::VintageTable;
use crate::io::ConsolidationReport;

use super::SeriesSummary;

/// Summary printed after a vintage table was written.
pub fn format_vintage_summary(table: &VintageTable, path: &Path) -> String {
    let mut out = String::new();
    out.push_str("=== steo - vintage table ===\n");
    out.push_str(&format!("Vintage: {}\n", table.vintage));
    out.push_str(&format!("Rows: {}\n", table.len()));

    let missing = table.rows.iter().filter(|r| r.value.is_nan()).count();
    if missing > 0 {
        out.push_str(&format!("Missing values: {missing}\n"));
    }
    out.push_str(&format!("Written: {}\n", path.display()));
    out
}

/// Summary printed after the master table was rebuilt.
pub fn format_consolidation_report(report: &ConsolidationReport) -> String {
    let mut out = String::new();
    out.push_str("=== steo - master table ===\n");
    out.push_str(&format!(
        "Files: loaded={} | skipped={}\n",
        report.files_loaded.len(),
        report.skipped.len()
    ));
    out.push_str(&format!("Shape: rows={} | columns={}\n", report.rows, report.columns.len()));
    out.push_str(&format!("Columns: {}\n", report.columns.join(", ")));
    if !report.dropped_columns.is_empty() {
        out.push_str(&format!("Dropped index columns: {}\n", report.dropped_columns.join(", ")));
    }
    for skipped in &report.skipped {
        out.push_str(&format!("  (skipped {}) {}\n", skipped.file, skipped.reason));
    }
    out.push_str(&format!("Written: {}\n", report.output.display()));
    out
}

/// Per-series table for `steo show`.
pub fn format_table_summary(path: &Path, shown: usize, summaries: &[SeriesSummary]) -> String {
    let mut out = String::new();
    out.push_str(&format!("Table: {} | rows shown={shown}\n", path.display()));

    out.push_str(
        format!(
            "{:<20} {:>6} {:>7} {:<10} {:<10} {:>8} {:<10} {:<16}\n",
            "series", "rows", "missing", "first", "last", "vintages", "latest", "unit"
        )
        .trim_end(),
    );
    out.push('\n');
    out.push_str(
        format!(
            "{:-<20} {:-<6} {:-<7} {:-<10} {:-<10} {:-<8} {:-<10} {:-<16}\n",
            "", "", "", "", "", "", "", ""
        )
        .trim_end(),
    );
    out.push('\n');

    for s in summaries {
        let latest = s.latest_vintage.map(|d| d.to_string()).unwrap_or_else(|| "-".to_string());
        out.push_str(
            format!(
                "{:<20} {:>6} {:>7} {:<10} {:<10} {:>8} {:<10} {:<16}\n",
                truncate(&s.series_id, 20),
                s.rows,
                s.missing,
                s.first_period,
                s.last_period,
                s.vintages,
                latest,
                truncate(&s.unit, 16),
            )
            .trim_end(),
        );
        out.push('\n');
    }

    out
}

fn truncate(s: &str, max: usize) -> String {
    if s.chars().count() <= max {
        return s.to_string();
    }
    let mut out: String = s.chars().take(max.saturating_sub(1)).collect();
    out.push('.');
    out
}
