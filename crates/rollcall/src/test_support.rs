//! Shared helpers for unit tests.

use std::path::PathBuf;

use chrono::{NaiveDate, NaiveDateTime};

/// A fresh, empty directory under the system temp dir, unique per test name
/// and process.
pub(crate) fn scratch_dir(name: &str) -> PathBuf {
    let dir = std::env::temp_dir().join(format!("rollcall_test_{}_{}", std::process::id(), name));
    let _ = std::fs::remove_dir_all(&dir);
    std::fs::create_dir_all(&dir).unwrap();
    dir
}

/// A timestamp on 2024-01-01.
pub(crate) fn at(h: u32, m: u32, s: u32) -> NaiveDateTime {
    NaiveDate::from_ymd_opt(2024, 1, 1)
        .unwrap()
        .and_hms_opt(h, m, s)
        .unwrap()
}
