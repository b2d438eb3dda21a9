//! File storage for attendance records.
//!
//! The shift log and the session archives share one CSV layout:
//! `student_id,timestamp[,class_name]`, no header. Readers are lenient so a
//! log that is being appended to, or that predates the class column, can
//! always be displayed.
//!
//! Functions here return `std::io::Result`; callers attach the path and
//! decide whether a missing file means "empty".

use std::fs::{self, File, OpenOptions};
use std::io::{self, Read, Seek, SeekFrom, Write};
use std::path::Path;

use csv::{ReaderBuilder, StringRecord, Trim, WriterBuilder};
use tracing::{debug, trace};

use crate::record::{parse_timestamp, AttendanceRecord};

/// Read every well-formed record from `path`, in file order.
///
/// Rows with fewer than two fields, an empty id, or a timestamp that does
/// not parse are skipped. A partially written trailing line falls in the
/// last category.
///
/// # Errors
///
/// Returns the underlying I/O error, including `NotFound` when the file
/// does not exist.
pub fn read_records(path: &Path) -> io::Result<Vec<AttendanceRecord>> {
    let file = File::open(path)?;
    let mut reader = ReaderBuilder::new()
        .has_headers(false)
        .flexible(true)
        .trim(Trim::All)
        .from_reader(file);

    let mut records = Vec::new();
    for (line, row) in reader.records().enumerate() {
        match row {
            Ok(row) => match parse_row(&row) {
                Some(record) => records.push(record),
                None => debug!("Skipping malformed row {} in {}", line + 1, path.display()),
            },
            Err(err) if err.is_io_error() => return Err(err.into()),
            Err(err) => debug!("Skipping unreadable row in {}: {}", path.display(), err),
        }
    }

    trace!("Read {} records from {}", records.len(), path.display());
    Ok(records)
}

/// Append one record to `path`, creating the file and its parent directory
/// if needed.
///
/// # Errors
///
/// Returns the underlying I/O error if the directory, file, or write fails.
pub fn append_record(path: &Path, record: &AttendanceRecord) -> io::Result<()> {
    ensure_parent_dir(path)?;

    let break_line = ends_mid_line(path);
    let mut file = OpenOptions::new().append(true).create(true).open(path)?;
    if break_line {
        file.write_all(b"\n")?;
    }

    let mut writer = WriterBuilder::new()
        .has_headers(false)
        .flexible(true)
        .from_writer(file);
    writer.write_record(&to_row(record))?;
    writer.flush()?;
    Ok(())
}

/// Write `records` to a new file at `path`.
///
/// # Errors
///
/// Returns `AlreadyExists` if the file is already there, or any other I/O
/// error from creating or writing it.
pub fn write_records(path: &Path, records: &[AttendanceRecord]) -> io::Result<()> {
    ensure_parent_dir(path)?;

    let file = OpenOptions::new().write(true).create_new(true).open(path)?;
    let mut writer = WriterBuilder::new()
        .has_headers(false)
        .flexible(true)
        .from_writer(file);
    for record in records {
        writer.write_record(&to_row(record))?;
    }
    writer.flush()?;
    Ok(())
}

/// Delete `path`. Returns `false` if it was already gone.
///
/// # Errors
///
/// Returns any I/O error other than `NotFound`.
pub fn remove_if_exists(path: &Path) -> io::Result<bool> {
    match fs::remove_file(path) {
        Ok(()) => Ok(true),
        Err(err) if err.kind() == io::ErrorKind::NotFound => Ok(false),
        Err(err) => Err(err),
    }
}

/// Create the parent directory of `path` if it is missing.
///
/// # Errors
///
/// Returns the I/O error from `create_dir_all`.
pub fn ensure_parent_dir(path: &Path) -> io::Result<()> {
    match path.parent() {
        Some(parent) if !parent.as_os_str().is_empty() && !parent.exists() => {
            debug!("Creating directory {}", parent.display());
            fs::create_dir_all(parent)
        }
        _ => Ok(()),
    }
}

fn parse_row(row: &StringRecord) -> Option<AttendanceRecord> {
    if row.len() < 2 {
        return None;
    }
    let student_id = row.get(0)?;
    if student_id.is_empty() {
        return None;
    }
    let timestamp = parse_timestamp(row.get(1)?).ok()?;
    let class_name = row
        .get(2)
        .filter(|class| !class.is_empty())
        .map(str::to_string);

    Some(AttendanceRecord {
        student_id: student_id.to_string(),
        timestamp,
        class_name,
    })
}

fn to_row(record: &AttendanceRecord) -> Vec<String> {
    let mut row = vec![record.student_id.clone(), record.timestamp_string()];
    if let Some(class) = record.class() {
        row.push(class.to_string());
    }
    row
}

/// Whether a previous interrupted append left `path` without a trailing
/// newline. A log that cannot be read is treated as terminated, so a
/// write-only log still accepts appends.
fn ends_mid_line(path: &Path) -> bool {
    let last_byte = || -> io::Result<Option<u8>> {
        let mut file = File::open(path)?;
        if file.metadata()?.len() == 0 {
            return Ok(None);
        }
        let mut last = [0u8; 1];
        file.seek(SeekFrom::End(-1))?;
        file.read_exact(&mut last)?;
        Ok(Some(last[0]))
    };
    matches!(last_byte(), Ok(Some(byte)) if byte != b'\n')
}
