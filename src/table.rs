//! Aligned terminal rendering of reports.

use std::borrow::Cow;
use std::fmt::Write as _;

use crate::{merge::Sentinel, report::TabularReport};

const HIGHLIGHT_START: &str = "\u{1b}[31m";
const HIGHLIGHT_END: &str = "\u{1b}[0m";

/// Renders up to `limit` rows (all rows when `None`). With `highlight`,
/// discrepancy sentinels are drawn in red.
pub fn render_report(report: &TabularReport, limit: Option<usize>, highlight: bool) -> String {
    let rows = report
        .display_rows()
        .into_iter()
        .take(limit.unwrap_or(usize::MAX))
        .map(|row| {
            row.into_iter()
                .map(|cell| {
                    if highlight && Sentinel::matches(&cell) {
                        format!("{HIGHLIGHT_START}{cell}{HIGHLIGHT_END}")
                    } else {
                        cell
                    }
                })
                .collect::<Vec<_>>()
        })
        .collect::<Vec<_>>();
    render_table(report.fields(), &rows)
}

pub fn print_report(report: &TabularReport, limit: Option<usize>, highlight: bool) {
    print!("{}", render_report(report, limit, highlight));
}

pub fn render_table(headers: &[String], rows: &[Vec<String>]) -> String {
    let mut widths = headers
        .iter()
        .map(|h| display_width(h).max(1))
        .collect::<Vec<_>>();
    for row in rows {
        for (width, cell) in widths.iter_mut().zip(row) {
            *width = (*width).max(display_width(cell));
        }
    }

    let mut output = String::new();
    let _ = writeln!(output, "{}", format_row(headers, &widths));
    let rule_widths = widths.iter().map(|w| (*w).max(3)).collect::<Vec<_>>();
    let rules = rule_widths
        .iter()
        .map(|w| "-".repeat(*w))
        .collect::<Vec<_>>();
    let _ = writeln!(output, "{}", format_row(&rules, &rule_widths));
    for row in rows {
        let _ = writeln!(output, "{}", format_row(row, &widths));
    }
    output
}

fn format_row(values: &[String], widths: &[usize]) -> String {
    let line = values
        .iter()
        .zip(widths)
        .map(|(value, width)| {
            let cleaned = sanitize_cell(value);
            let padding = width.saturating_sub(display_width(&cleaned));
            format!("{cleaned}{}", " ".repeat(padding))
        })
        .collect::<Vec<_>>()
        .join("  ");
    line.trim_end_matches(' ').to_string()
}

fn display_width(value: &str) -> usize {
    let mut width = 0usize;
    let mut chars = value.chars();
    while let Some(ch) = chars.next() {
        if ch == '\u{1b}' {
            // ANSI colour sequences end at 'm'
            for next in chars.by_ref() {
                if next == 'm' {
                    break;
                }
            }
        } else {
            width += 1;
        }
    }
    width
}

fn sanitize_cell(value: &str) -> Cow<'_, str> {
    if value.contains(['\n', '\r', '\t']) {
        Cow::Owned(value.replace(['\n', '\r', '\t'], " "))
    } else {
        Cow::Borrowed(value)
    }
}
