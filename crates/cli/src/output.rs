//! Output formatting utilities

use chrono::{DateTime, FixedOffset};
use clap::ValueEnum;
use colored::Colorize;
use dashboard_lib::{severity_name, Chart};
use serde::Serialize;
use tabled::{settings::Style, Table, Tabled};

/// Page sizes offered for tables
pub const ROWS_PER_PAGE_OPTIONS: [usize; 3] = [5, 10, 25];

const SPARK_LEVELS: [char; 8] = ['▁', '▂', '▃', '▄', '▅', '▆', '▇', '█'];

/// Output format for CLI commands
#[derive(Debug, Clone, Copy, Default, PartialEq, ValueEnum)]
pub enum OutputFormat {
    /// Table format (default)
    #[default]
    Table,
    /// JSON format
    Json,
}

/// clap value parser for `--rows-per-page`
pub fn parse_rows_per_page(raw: &str) -> Result<usize, String> {
    let rows: usize = raw
        .parse()
        .map_err(|_| format!("{} is not a number", raw))?;
    if ROWS_PER_PAGE_OPTIONS.contains(&rows) {
        Ok(rows)
    } else {
        Err(format!("rows per page must be one of 5, 10, 25 (got {})", rows))
    }
}

/// One page of a table
#[derive(Debug, PartialEq)]
pub struct Page<'a, T> {
    pub rows: &'a [T],
    /// 0-based page actually shown
    pub page: usize,
    pub total_pages: usize,
    pub total: usize,
}

/// Slice out one page; pages past the end clamp to the last page
pub fn paginate<T>(items: &[T], page: usize, rows_per_page: usize) -> Page<'_, T> {
    let rows_per_page = rows_per_page.max(1);
    let total_pages = items.len().div_ceil(rows_per_page).max(1);
    let page = page.min(total_pages - 1);
    let start = (page * rows_per_page).min(items.len());
    let end = (start + rows_per_page).min(items.len());

    Page {
        rows: &items[start..end],
        page,
        total_pages,
        total: items.len(),
    }
}

/// Print a titled, paginated table, or the empty message when there is nothing
pub fn print_paged_table<T, R, F>(
    title: &str,
    items: &[T],
    page: usize,
    rows_per_page: usize,
    empty: &str,
    to_row: F,
) where
    R: Tabled,
    F: Fn(&T) -> R,
{
    println!("\n{}", title.bold());
    if items.is_empty() {
        print_warning(empty);
        return;
    }

    let page = paginate(items, page, rows_per_page);
    let rows: Vec<R> = page.rows.iter().map(to_row).collect();
    println!("{}", Table::new(rows).with(Style::rounded()));
    println!(
        "Page {}/{} ({} total)",
        page.page + 1,
        page.total_pages,
        page.total
    );
}

/// Print any serializable value as pretty JSON
pub fn print_json<T: Serialize + ?Sized>(value: &T) -> anyhow::Result<()> {
    println!("{}", serde_json::to_string_pretty(value)?);
    Ok(())
}

/// Print a success message
pub fn print_success(message: &str) {
    println!("{} {}", "✓".green().bold(), message);
}

/// Print an error message
pub fn print_error(message: &str) {
    eprintln!("{} {}", "✗".red().bold(), message);
}

/// Print a warning message
pub fn print_warning(message: &str) {
    println!("{} {}", "⚠".yellow().bold(), message);
}

/// Print an info message
pub fn print_info(message: &str) {
    println!("{} {}", "ℹ".blue().bold(), message);
}

/// Format seconds of uptime as `Xd Yh Zm`
pub fn format_uptime(seconds: u64) -> String {
    let days = seconds / 86_400;
    let hours = (seconds % 86_400) / 3_600;
    let minutes = (seconds % 3_600) / 60;
    format!("{}d {}h {}m", days, hours, minutes)
}

/// Uptime cell for an item's raw `lastvalue`
pub fn format_uptime_value(raw: &str) -> String {
    match raw.trim().parse::<f64>() {
        Ok(secs) if secs.is_finite() && secs >= 0.0 => format_uptime(secs as u64),
        _ => raw.to_string(),
    }
}

/// Format a Unix timestamp string in the display offset; unparsable input is shown as-is
pub fn format_unix(raw: &str, offset: FixedOffset) -> String {
    raw.trim()
        .parse::<i64>()
        .ok()
        .and_then(|secs| DateTime::from_timestamp(secs, 0))
        .map(|at| {
            at.with_timezone(&offset)
                .format("%Y-%m-%d %H:%M:%S")
                .to_string()
        })
        .unwrap_or_else(|| raw.to_string())
}

/// Color a priority/severity code by level
pub fn color_priority(code: &str) -> String {
    let name = severity_name(code);
    match code.trim() {
        "1" => name.blue().to_string(),
        "2" => name.yellow().to_string(),
        "3" | "4" | "5" => name.red().to_string(),
        _ => name.to_string(),
    }
}

/// Color a trigger status
pub fn color_status(status: &str) -> String {
    match status.to_lowercase().as_str() {
        "0" | "enabled" => "enabled".green().to_string(),
        "1" | "disabled" => "disabled".red().to_string(),
        _ => status.to_string(),
    }
}

/// Chart value cell; missing readings show as `-`
pub fn format_value(value: Option<f64>) -> String {
    match value {
        Some(v) => format!("{:.2}", v),
        None => "-".to_string(),
    }
}

/// Render a series as a one-line sparkline scaled to its own range
pub fn sparkline(values: &[Option<f64>]) -> String {
    let present = values.iter().flatten().copied();
    let (min, max) = present.fold((f64::INFINITY, f64::NEG_INFINITY), |(lo, hi), v| {
        (lo.min(v), hi.max(v))
    });

    values
        .iter()
        .map(|value| match value {
            None => ' ',
            Some(v) if max > min => {
                let scaled = (v - min) / (max - min) * (SPARK_LEVELS.len() - 1) as f64;
                SPARK_LEVELS[(scaled.round() as usize).min(SPARK_LEVELS.len() - 1)]
            }
            Some(_) => SPARK_LEVELS[SPARK_LEVELS.len() / 2],
        })
        .collect()
}

#[derive(Tabled)]
struct ChartRow {
    #[tabled(rename = "Time")]
    time: String,
    #[tabled(rename = "CPU")]
    cpu: String,
    #[tabled(rename = "Memory %")]
    memory: String,
    #[tabled(rename = "Disk %")]
    disk: String,
}

/// Render the history chart: one row per record, then one sparkline per series
pub fn render_chart(chart: &Chart) -> String {
    let value_at = |series: usize, index: usize| {
        chart
            .series
            .get(series)
            .and_then(|s| s.values.get(index).copied())
            .flatten()
    };

    let rows: Vec<ChartRow> = chart
        .labels
        .iter()
        .enumerate()
        .map(|(i, label)| ChartRow {
            time: label.clone(),
            cpu: format_value(value_at(0, i)),
            memory: format_value(value_at(1, i)),
            disk: format_value(value_at(2, i)),
        })
        .collect();

    let mut out = Table::new(rows).with(Style::rounded()).to_string();
    for series in &chart.series {
        out.push('\n');
        out.push_str(&format!(
            "{:<34} {}",
            series.label,
            sparkline(&series.values).cyan()
        ));
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use dashboard_lib::HistoryBuffer;
    use chrono::{TimeZone, Utc};

    #[test]
    fn test_format_uptime() {
        assert_eq!(format_uptime(0), "0d 0h 0m");
        assert_eq!(format_uptime(93_784), "1d 2h 3m");
        assert_eq!(format_uptime_value("3661.7"), "0d 1h 1m");
        assert_eq!(format_uptime_value("n/a"), "n/a");
    }

    #[test]
    fn test_paginate() {
        let items: Vec<u32> = (0..12).collect();

        let first = paginate(&items, 0, 5);
        assert_eq!(first.rows, &[0, 1, 2, 3, 4]);
        assert_eq!(first.total_pages, 3);

        let last = paginate(&items, 2, 5);
        assert_eq!(last.rows, &[10, 11]);

        let clamped = paginate(&items, 9, 5);
        assert_eq!(clamped.page, 2);

        let empty: Vec<u32> = Vec::new();
        let page = paginate(&empty, 0, 5);
        assert!(page.rows.is_empty());
        assert_eq!(page.total_pages, 1);
    }

    #[test]
    fn test_parse_rows_per_page() {
        assert_eq!(parse_rows_per_page("10"), Ok(10));
        assert!(parse_rows_per_page("7").is_err());
        assert!(parse_rows_per_page("ten").is_err());
    }

    #[test]
    fn test_sparkline_scales_and_keeps_gaps() {
        let line = sparkline(&[Some(0.0), None, Some(10.0), Some(5.0)]);
        let chars: Vec<char> = line.chars().collect();
        assert_eq!(chars.len(), 4);
        assert_eq!(chars[0], '▁');
        assert_eq!(chars[1], ' ');
        assert_eq!(chars[2], '█');

        let flat = sparkline(&[Some(3.0), Some(3.0)]);
        assert_eq!(flat.chars().count(), 2);
        assert_eq!(sparkline(&[]), "");
    }

    #[test]
    fn test_format_unix_in_offset() {
        let ist = FixedOffset::east_opt(19_800).unwrap();
        assert_eq!(format_unix("1700000000", ist), "2023-11-15 03:43:20");
        assert_eq!(format_unix("soon", ist), "soon");
    }

    #[test]
    fn test_priority_names() {
        assert!(color_priority("4").contains("High"));
        assert_eq!(color_priority("0"), "Not classified");
        assert_eq!(format_value(None), "-");
        assert_eq!(format_value(Some(0.4234)), "0.42");
    }

    #[test]
    fn test_render_chart_shows_missing_as_dash() {
        let mut history = HistoryBuffer::new();
        let at = Utc.timestamp_opt(1_700_000_000, 0).unwrap();
        history.record_tick(Some(0.5), None, Some(40.0), at);

        let rendered = render_chart(&history.chart());
        assert!(rendered.contains("3:43:20 am"));
        assert!(rendered.contains("0.50"));
        assert!(rendered.contains(" - "));
        assert!(rendered.contains("Disk Utilization (% used)"));
    }
}
