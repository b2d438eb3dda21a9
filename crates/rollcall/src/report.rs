//! Attendance reports.
//!
//! Joins records with the roster for display. The same rendering is used for
//! the live shift log, the current session and saved archives: one row per
//! record, in record order, with no aggregation.

use std::fmt::Write as _;

use serde::Serialize;

use crate::record::AttendanceRecord;
use crate::roster::Roster;

/// One displayable attendance line.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct DisplayRow {
    /// Student id.
    pub id: String,
    /// Roster name, or `Unknown`.
    pub name: String,
    /// Class at record time, falling back to the current roster class.
    pub class: String,
    /// `YYYY-MM-DD HH:MM:SS`.
    pub timestamp: String,
}

/// Join `records` with `roster`.
#[must_use]
pub fn render(records: &[AttendanceRecord], roster: &Roster) -> Vec<DisplayRow> {
    records
        .iter()
        .map(|record| DisplayRow {
            id: record.student_id.clone(),
            name: roster.name_of(&record.student_id).to_string(),
            class: record
                .class()
                .unwrap_or_else(|| roster.class_of(&record.student_id))
                .to_string(),
            timestamp: record.timestamp_string(),
        })
        .collect()
}

/// Keep only rows for `class`.
#[must_use]
pub fn filter_class(rows: Vec<DisplayRow>, class: &str) -> Vec<DisplayRow> {
    rows.into_iter().filter(|row| row.class == class).collect()
}

/// `id - name - class - timestamp`, one row per line.
#[must_use]
pub fn format_lines(rows: &[DisplayRow]) -> String {
    rows.iter().fold(String::new(), |mut out, row| {
        let _ = writeln!(
            out,
            "{} - {} - {} - {}",
            row.id, row.name, row.class, row.timestamp
        );
        out
    })
}

/// Column-aligned table with a header.
#[must_use]
pub fn format_table(rows: &[DisplayRow]) -> String {
    const HEADERS: [&str; 4] = ["ID", "NAME", "CLASS", "TIMESTAMP"];

    let mut widths = HEADERS.map(str::len);
    for row in rows {
        for (width, cell) in widths.iter_mut().zip(cells(row)) {
            *width = (*width).max(cell.chars().count());
        }
    }

    let mut out = String::new();
    push_line(&mut out, HEADERS, widths);
    push_line(&mut out, widths.map(|w| "-".repeat(w)), widths);
    for row in rows {
        push_line(&mut out, cells(row), widths);
    }
    out
}

/// Rows as a pretty-printed JSON array.
///
/// # Errors
///
/// Returns the serializer error, which does not happen for these rows in
/// practice.
pub fn to_json(rows: &[DisplayRow]) -> serde_json::Result<String> {
    serde_json::to_string_pretty(rows)
}

fn cells(row: &DisplayRow) -> [&str; 4] {
    [&row.id, &row.name, &row.class, &row.timestamp]
}

fn push_line<S: AsRef<str>>(out: &mut String, cells: [S; 4], widths: [usize; 4]) {
    let mut line = String::new();
    for (i, (cell, width)) in cells.iter().zip(widths).enumerate() {
        if i > 0 {
            line.push_str("  ");
        }
        let cell = cell.as_ref();
        line.push_str(cell);
        line.push_str(&" ".repeat(width.saturating_sub(cell.chars().count())));
    }
    out.push_str(line.trim_end());
    out.push('\n');
}
