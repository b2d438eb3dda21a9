//! Attendance records.
//!
//! A record is one accepted scan: who, when, and the class they belonged to
//! at the time. Records are immutable once written.

use chrono::{Local, NaiveDateTime, SubsecRound};
use serde::{Deserialize, Serialize};

/// Wall-clock timestamp format used in the shift log, archives and reports.
pub const TIMESTAMP_FORMAT: &str = "%Y-%m-%d %H:%M:%S";

/// One attendance event.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AttendanceRecord {
    /// Identifier decoded from the student's QR code.
    pub student_id: String,

    /// When the scan was accepted, second precision, local time.
    pub timestamp: NaiveDateTime,

    /// Class at record time. `None` for legacy two-column rows.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub class_name: Option<String>,
}

impl AttendanceRecord {
    /// Create a record. Sub-second precision is dropped.
    #[must_use]
    pub fn new(
        student_id: impl Into<String>,
        timestamp: NaiveDateTime,
        class_name: Option<String>,
    ) -> Self {
        Self {
            student_id: student_id.into(),
            timestamp: timestamp.trunc_subsecs(0),
            class_name,
        }
    }

    /// The timestamp rendered as `YYYY-MM-DD HH:MM:SS`.
    #[must_use]
    pub fn timestamp_string(&self) -> String {
        format_timestamp(&self.timestamp)
    }

    /// The stored class, ignoring blank values.
    #[must_use]
    pub fn class(&self) -> Option<&str> {
        self.class_name
            .as_deref()
            .map(str::trim)
            .filter(|c| !c.is_empty())
    }
}

/// Current local wall-clock time truncated to whole seconds.
#[must_use]
pub fn now_local() -> NaiveDateTime {
    Local::now().naive_local().trunc_subsecs(0)
}

/// Render a timestamp in the log format.
#[must_use]
pub fn format_timestamp(ts: &NaiveDateTime) -> String {
    ts.format(TIMESTAMP_FORMAT).to_string()
}

/// Parse a timestamp in the log format.
///
/// # Errors
///
/// Returns the chrono parse error when `s` is not `YYYY-MM-DD HH:MM:SS`.
pub fn parse_timestamp(s: &str) -> chrono::ParseResult<NaiveDateTime> {
    NaiveDateTime::parse_from_str(s.trim(), TIMESTAMP_FORMAT)
}
