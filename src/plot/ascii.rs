//! ASCII charts for terminal previews of a table view.
//!
//! This is intentionally "dumb" (fixed-size grid), optimized for:
//! - quick visual sanity checks after a fetch or consolidation
//! - deterministic output (helpful for golden tests)
//!
//! Each series gets its own glyph; each `PlotKind` has its own renderer.

use std::collections::HashMap;

use chrono::{Datelike, NaiveDate};

use crate::domain::ObservationRow;
use crate::view::{PlotKind, ViewMode};

const GLYPHS: [char; 8] = ['*', '+', '#', 'x', 'o', '@', '%', '&'];
const FILL: char = '.';

/// One drawable line: a label and its points in period order.
#[derive(Debug, Clone, PartialEq)]
pub struct ChartSeries {
    pub label: String,
    pub points: Vec<(NaiveDate, f64)>,
}

/// Split rows into chart series.
///
/// In comparison mode every (series, vintage) pair is its own line so
/// forecast revisions can be told apart. Non-finite values are skipped.
pub fn group_rows(rows: &[ObservationRow], mode: ViewMode) -> Vec<ChartSeries> {
    let mut out: Vec<ChartSeries> = Vec::new();
    let mut index: HashMap<String, usize> = HashMap::new();

    for r in rows.iter().filter(|r| r.value.is_finite()) {
        let label = match (mode, r.forecast_period) {
            (ViewMode::Comparison, Some(v)) => format!("{} @ {:04}-{:02}", r.series_id, v.year(), v.month()),
            _ => r.series_id.clone(),
        };
        let i = *index.entry(label.clone()).or_insert_with(|| {
            out.push(ChartSeries {
                label,
                points: Vec::new(),
            });
            out.len() - 1
        });
        out[i].points.push((r.period, r.value));
    }

    for s in &mut out {
        s.points.sort_by_key(|(d, _)| *d);
    }
    out
}

/// Render `series` as a `width` x `height` character chart with a legend.
pub fn render_chart(series: &[ChartSeries], kind: PlotKind, width: usize, height: usize) -> String {
    let width = width.max(10);
    let height = height.max(5);

    let series = match kind {
        PlotKind::StackedArea => stack(series),
        _ => series.to_vec(),
    };

    let Some((d_min, d_max)) = date_range(&series) else {
        return "Chart: no data\n".to_string();
    };
    let (y_min, y_max) = y_range(&series, kind == PlotKind::Bar);
    let (y_min, y_max) = pad_range(y_min, y_max, 0.05);

    let axes = Axes {
        x_min: day_number(d_min),
        x_max: if d_max > d_min { day_number(d_max) } else { day_number(d_min) + 1.0 },
        y_min,
        y_max,
        width,
        height,
    };

    let mut grid = vec![vec![' '; width]; height];
    for (i, s) in series.iter().enumerate() {
        let glyph = GLYPHS[i % GLYPHS.len()];
        match kind {
            PlotKind::Scatter => draw_scatter(&mut grid, &axes, s, glyph),
            PlotKind::Line => draw_polyline(&mut grid, &axes, s, glyph),
            PlotKind::Area | PlotKind::StackedArea => draw_area(&mut grid, &axes, s, glyph),
            PlotKind::Bar => draw_bars(&mut grid, &axes, s, glyph, i),
        }
    }

    let mut out = String::new();
    out.push_str(&format!(
        "Chart: {} | period=[{d_min}, {d_max}] | value=[{y_min:.2}, {y_max:.2}]\n",
        kind_name(kind)
    ));
    for row in grid {
        out.push_str(&row.into_iter().collect::<String>());
        out.push('\n');
    }
    for (i, s) in series.iter().enumerate() {
        out.push_str(&format!("{} {}\n", GLYPHS[i % GLYPHS.len()], s.label));
    }
    out
}

fn kind_name(kind: PlotKind) -> &'static str {
    match kind {
        PlotKind::Scatter => "scatter",
        PlotKind::Line => "line",
        PlotKind::Area => "area",
        PlotKind::Bar => "bar",
        PlotKind::StackedArea => "stacked-area",
    }
}

struct Axes {
    x_min: f64,
    x_max: f64,
    y_min: f64,
    y_max: f64,
    width: usize,
    height: usize,
}

impl Axes {
    fn col(&self, d: NaiveDate) -> usize {
        map_x(day_number(d), self.x_min, self.x_max, self.width)
    }

    fn row(&self, y: f64) -> usize {
        map_y(y, self.y_min, self.y_max, self.height)
    }

    /// Day number at the centre of column `x`.
    fn x_value(&self, x: usize) -> f64 {
        let u = x as f64 / (self.width as f64 - 1.0);
        self.x_min + u * (self.x_max - self.x_min)
    }
}

fn draw_scatter(grid: &mut [Vec<char>], axes: &Axes, s: &ChartSeries, glyph: char) {
    for &(d, y) in &s.points {
        grid[axes.row(y)][axes.col(d)] = glyph;
    }
}

fn draw_polyline(grid: &mut [Vec<char>], axes: &Axes, s: &ChartSeries, glyph: char) {
    let mut prev = None;
    for &(d, y) in &s.points {
        let (x, yy) = (axes.col(d), axes.row(y));
        if let Some((x0, y0)) = prev {
            draw_line(grid, x0, y0, x, yy, glyph);
        }
        grid[yy][x] = glyph;
        prev = Some((x, yy));
    }
}

/// Line plus a fill reaching down to the next layer (or the bottom).
fn draw_area(grid: &mut [Vec<char>], axes: &Axes, s: &ChartSeries, glyph: char) {
    draw_polyline(grid, axes, s, glyph);
    let (Some(&(first, _)), Some(&(last, _))) = (s.points.first(), s.points.last()) else {
        return;
    };

    for x in axes.col(first)..=axes.col(last) {
        let Some(y) = interpolate(&s.points, axes.x_value(x)) else {
            continue;
        };
        for row in grid.iter_mut().skip(axes.row(y) + 1) {
            match row[x] {
                ' ' => row[x] = FILL,
                c if c == glyph => continue,
                _ => break,
            }
        }
    }
}

/// Vertical bars from the zero line; series are offset by one column each.
fn draw_bars(grid: &mut [Vec<char>], axes: &Axes, s: &ChartSeries, glyph: char, offset: usize) {
    let base = axes.row(0.0_f64.clamp(axes.y_min, axes.y_max));
    for &(d, y) in &s.points {
        let x = (axes.col(d) + offset).min(axes.width - 1);
        let top = axes.row(y);
        let (lo, hi) = if top <= base { (top, base) } else { (base, top) };
        for row in grid.iter_mut().take(hi + 1).skip(lo) {
            if row[x] == ' ' {
                row[x] = glyph;
            }
        }
        grid[top][x] = glyph;
    }
}

/// Cumulative sums per period, in series order.
fn stack(series: &[ChartSeries]) -> Vec<ChartSeries> {
    let mut running: HashMap<NaiveDate, f64> = HashMap::new();
    series
        .iter()
        .map(|s| ChartSeries {
            label: s.label.clone(),
            points: s
                .points
                .iter()
                .map(|&(d, v)| {
                    let total = running.entry(d).or_insert(0.0);
                    *total += v;
                    (d, *total)
                })
                .collect(),
        })
        .collect()
}

fn interpolate(points: &[(NaiveDate, f64)], x: f64) -> Option<f64> {
    if let [(d, y)] = points {
        return if (day_number(*d) - x).abs() < 1.0 { Some(*y) } else { None };
    }
    points.windows(2).find_map(|w| {
        let (x0, y0) = (day_number(w[0].0), w[0].1);
        let (x1, y1) = (day_number(w[1].0), w[1].1);
        if x < x0 || x > x1 {
            return None;
        }
        if x1 == x0 {
            return Some(y0);
        }
        Some(y0 + (y1 - y0) * (x - x0) / (x1 - x0))
    })
}

fn day_number(d: NaiveDate) -> f64 {
    d.num_days_from_ce() as f64
}

fn date_range(series: &[ChartSeries]) -> Option<(NaiveDate, NaiveDate)> {
    let dates = series.iter().flat_map(|s| s.points.iter().map(|(d, _)| *d));
    let min = dates.clone().min()?;
    let max = dates.max()?;
    Some((min, max))
}

fn y_range(series: &[ChartSeries], include_zero: bool) -> (f64, f64) {
    let mut min_y = if include_zero { 0.0 } else { f64::INFINITY };
    let mut max_y = if include_zero { 0.0 } else { f64::NEG_INFINITY };
    for s in series {
        for &(_, y) in &s.points {
            min_y = min_y.min(y);
            max_y = max_y.max(y);
        }
    }
    if !(min_y.is_finite() && max_y.is_finite()) {
        return (0.0, 1.0);
    }
    if max_y > min_y { (min_y, max_y) } else { (min_y - 1.0, max_y + 1.0) }
}

fn pad_range(min: f64, max: f64, frac: f64) -> (f64, f64) {
    let span = (max - min).abs();
    let pad = (span * frac).max(1e-12);
    (min - pad, max + pad)
}

fn map_x(t: f64, t_min: f64, t_max: f64, width: usize) -> usize {
    let width = width.max(2);
    let u = ((t - t_min) / (t_max - t_min)).clamp(0.0, 1.0);
    (u * (width as f64 - 1.0)).round() as usize
}

fn map_y(y: f64, y_min: f64, y_max: f64, height: usize) -> usize {
    let height = height.max(2);
    let u = ((y - y_min) / (y_max - y_min)).clamp(0.0, 1.0);
    // y=top is max -> row 0
    (height as f64 - 1.0 - (u * (height as f64 - 1.0))).round() as usize
}

/// Integer line drawing (Bresenham-ish).
fn draw_line(grid: &mut [Vec<char>], x0: usize, y0: usize, x1: usize, y1: usize, ch: char) {
    let mut x0 = x0 as isize;
    let mut y0 = y0 as isize;
    let x1 = x1 as isize;
    let y1 = y1 as isize;

    let dx = (x1 - x0).abs();
    let sx = if x0 < x1 { 1 } else { -1 };
    let dy = -(y1 - y0).abs();
    let sy = if y0 < y1 { 1 } else { -1 };
    let mut err = dx + dy;

    loop {
        if y0 >= 0
            && (y0 as usize) < grid.len()
            && x0 >= 0
            && (x0 as usize) < grid[0].len()
            && grid[y0 as usize][x0 as usize] == ' '
        {
            grid[y0 as usize][x0 as usize] = ch;
        }

        if x0 == x1 && y0 == y1 {
            break;
        }
        let e2 = 2 * err;
        if e2 >= dy {
            err += dy;
            x0 += sx;
        }
        if e2 <= dx {
            err += dx;
            y0 += sy;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn ymd(y: i32, m: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, 1).unwrap()
    }

    fn series(label: &str, points: &[((i32, u32), f64)]) -> ChartSeries {
        ChartSeries {
            label: label.to_string(),
            points: points.iter().map(|&((y, m), v)| (ymd(y, m), v)).collect(),
        }
    }

    #[test]
    fn scatter_golden_snapshot_small() {
        let s = series("A", &[((2024, 1), 100.0), ((2024, 12), 110.0)]);
        let txt = render_chart(&[s], PlotKind::Scatter, 10, 5);
        let expected = concat!(
            "Chart: scatter | period=[2024-01-01, 2024-12-01] | value=[99.50, 110.50]\n",
            "         *\n",
            "          \n",
            "          \n",
            "          \n",
            "*         \n",
            "* A\n",
        );
        assert_eq!(txt, expected);
    }

    #[test]
    fn line_covers_every_column_between_points() {
        let s = series("A", &[((2024, 1), 100.0), ((2024, 12), 110.0)]);
        let txt = render_chart(&[s], PlotKind::Line, 10, 5);
        let grid: Vec<&str> = txt.lines().skip(1).take(5).collect();
        for x in 0..10 {
            assert!(grid.iter().any(|row| row.as_bytes()[x] == b'*'), "column {x} empty");
        }
    }

    #[test]
    fn area_fills_below_the_line() {
        let s = series("A", &[((2024, 1), 100.0), ((2024, 12), 110.0)]);
        let txt = render_chart(&[s], PlotKind::Area, 10, 5);
        assert!(txt.contains(FILL));
        let bottom = txt.lines().nth(5).unwrap();
        assert!(bottom.chars().all(|c| c == '*' || c == FILL), "{bottom:?}");
    }

    #[test]
    fn bars_start_at_zero() {
        let s = series("A", &[((2024, 1), 4.0), ((2024, 12), 8.0)]);
        let txt = render_chart(&[s], PlotKind::Bar, 10, 5);
        assert!(txt.contains("value=[-0.40, 8.40]"));
        let bottom = txt.lines().nth(5).unwrap();
        assert_eq!(bottom.as_bytes()[0], b'*');
        assert_eq!(bottom.as_bytes()[9], b'*');
    }

    #[test]
    fn stacked_area_accumulates_in_series_order() {
        let a = series("A", &[((2024, 1), 1.0), ((2024, 2), 2.0)]);
        let b = series("B", &[((2024, 1), 3.0), ((2024, 2), 4.0)]);
        let stacked = stack(&[a, b]);
        assert_eq!(stacked[1].points, vec![(ymd(2024, 1), 4.0), (ymd(2024, 2), 6.0)]);
    }

    #[test]
    fn comparison_splits_by_vintage() {
        let row = |vintage: u32, value: f64| ObservationRow {
            period: ymd(2024, 6),
            series_id: "A".to_string(),
            series_description: String::new(),
            unit: String::new(),
            value,
            forecast_period: Some(ymd(2024, vintage)),
        };
        let rows = vec![row(2, 1.0), row(3, 2.0), row(3, f64::NAN)];

        let compared = group_rows(&rows, ViewMode::Comparison);
        let labels: Vec<&str> = compared.iter().map(|s| s.label.as_str()).collect();
        assert_eq!(labels, vec!["A @ 2024-02", "A @ 2024-03"]);

        let current = group_rows(&rows, ViewMode::Current);
        assert_eq!(current.len(), 1);
        assert_eq!(current[0].points.len(), 2);
    }

    #[test]
    fn empty_input_renders_placeholder() {
        assert_eq!(render_chart(&[], PlotKind::Line, 20, 5), "Chart: no data\n");
    }
}
