//! Session archives.
//!
//! Saving a session copies the ledger's session buffer into a new file named
//! after the save time, then ends the shift. Archives are never modified
//! after they are written.
//!
//! File names are `attendance-YYYYMMDD_HHMMSS.csv`. A second save within the
//! same second gets a counter suffix (`attendance-YYYYMMDD_HHMMSS-1.csv`)
//! rather than overwriting the first.

use std::cmp::Ordering;
use std::fs;
use std::io;
use std::path::{Path, PathBuf};
use std::sync::OnceLock;

use chrono::NaiveDateTime;
use regex::Regex;
use tracing::{debug, info};

use crate::error::{Error, Result};
use crate::ledger::Ledger;
use crate::record::AttendanceRecord;
use crate::storage;

/// Name of the durable shift log inside the log directory.
pub const SHIFT_LOG_FILE: &str = "attendance.csv";

const ARCHIVE_STAMP_FORMAT: &str = "%Y%m%d_%H%M%S";

fn archive_name_pattern() -> &'static Regex {
    static PATTERN: OnceLock<Regex> = OnceLock::new();
    PATTERN.get_or_init(|| {
        Regex::new(r"^attendance-(\d{8}_\d{6})(?:-(\d+))?\.csv$")
            .expect("archive name pattern is valid")
    })
}

/// A saved session on disk.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ArchiveRef {
    /// Full path of the archive file.
    pub path: PathBuf,
    /// Save time parsed from the file name.
    pub saved_at: NaiveDateTime,
    /// Collision counter; 0 for the first save in a given second.
    pub sequence: u32,
}

impl ArchiveRef {
    /// Parse an archive file path. Returns `None` for files that are not
    /// archives (including the shift log).
    #[must_use]
    pub fn from_path(path: &Path) -> Option<Self> {
        let name = path.file_name()?.to_str()?;
        let caps = archive_name_pattern().captures(name)?;
        let saved_at = NaiveDateTime::parse_from_str(&caps[1], ARCHIVE_STAMP_FORMAT).ok()?;
        let sequence = match caps.get(2) {
            Some(n) => n.as_str().parse().ok()?,
            None => 0,
        };
        Some(Self {
            path: path.to_path_buf(),
            saved_at,
            sequence,
        })
    }

    /// The file name, e.g. `attendance-20240101_080500.csv`.
    #[must_use]
    pub fn name(&self) -> String {
        self.path
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_default()
    }
}

impl Ord for ArchiveRef {
    fn cmp(&self, other: &Self) -> Ordering {
        self.saved_at
            .cmp(&other.saved_at)
            .then(self.sequence.cmp(&other.sequence))
            .then_with(|| self.path.cmp(&other.path))
    }
}

impl PartialOrd for ArchiveRef {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

/// Result of [`Archiver::save_session`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SaveOutcome {
    /// The session was written to this archive and the shift ended.
    Saved(ArchiveRef),
    /// The session buffer was empty; nothing was written or cleared.
    NoOp,
}

/// Writes, lists and opens session archives in one directory.
#[derive(Debug, Clone)]
pub struct Archiver {
    dir: PathBuf,
}

impl Archiver {
    /// Create an archiver over `dir` (usually the log directory).
    #[must_use]
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }

    /// The archive directory.
    #[must_use]
    pub fn dir(&self) -> &Path {
        &self.dir
    }

    /// Archive the ledger's session buffer and end the shift.
    ///
    /// If the archive cannot be written the ledger is left as it was.
    ///
    /// # Errors
    ///
    /// Returns a storage error if the archive cannot be created, or if the
    /// shift log cannot be deleted afterwards (the archive is kept in that
    /// case).
    pub fn save_session(&self, ledger: &mut Ledger, now: NaiveDateTime) -> Result<SaveOutcome> {
        if ledger.session().is_empty() {
            debug!("Session buffer empty, nothing to archive");
            return Ok(SaveOutcome::NoOp);
        }

        let archive = self.write_new(now, ledger.session())?;
        info!(
            "Archived {} records to {}",
            ledger.session().len(),
            archive.path.display()
        );
        ledger.end_shift()?;
        Ok(SaveOutcome::Saved(archive))
    }

    /// Write `records` to the first free archive name for `now`.
    fn write_new(&self, now: NaiveDateTime, records: &[AttendanceRecord]) -> Result<ArchiveRef> {
        let stamp = now.format(ARCHIVE_STAMP_FORMAT).to_string();
        let mut sequence = 0u32;
        loop {
            let name = if sequence == 0 {
                format!("attendance-{stamp}.csv")
            } else {
                format!("attendance-{stamp}-{sequence}.csv")
            };
            let path = self.dir.join(name);
            match storage::write_records(&path, records) {
                Ok(()) => {
                    return ArchiveRef::from_path(&path)
                        .ok_or_else(|| Error::internal(format!("bad archive name {}", path.display())));
                }
                Err(err) if err.kind() == io::ErrorKind::AlreadyExists => {
                    debug!("{} exists, trying next suffix", path.display());
                    sequence += 1;
                }
                Err(err) => return Err(Error::storage_write(path, err)),
            }
        }
    }

    /// Every archive in the directory, oldest first. A missing directory has
    /// no archives.
    ///
    /// # Errors
    ///
    /// Returns a storage error if the directory exists but cannot be listed.
    pub fn list_archives(&self) -> Result<Vec<ArchiveRef>> {
        let entries = match fs::read_dir(&self.dir) {
            Ok(entries) => entries,
            Err(err) if err.kind() == io::ErrorKind::NotFound => return Ok(Vec::new()),
            Err(err) => return Err(Error::storage_read(&self.dir, err)),
        };

        let mut archives = Vec::new();
        for entry in entries {
            let entry = entry.map_err(|e| Error::storage_read(&self.dir, e))?;
            if let Some(archive) = ArchiveRef::from_path(&entry.path()) {
                archives.push(archive);
            }
        }
        archives.sort();
        Ok(archives)
    }

    /// Read the records in an archive, in file order.
    ///
    /// # Errors
    ///
    /// Returns a storage error if the archive cannot be read.
    pub fn open_archive(&self, archive: &ArchiveRef) -> Result<Vec<AttendanceRecord>> {
        storage::read_records(&archive.path).map_err(|e| Error::storage_read(&archive.path, e))
    }

    /// Resolve a selector: a 1-based position in [`Archiver::list_archives`]
    /// or a file name (with or without `.csv`).
    ///
    /// # Errors
    ///
    /// Returns [`Error::ArchiveNotFound`] if nothing matches.
    pub fn find(&self, selector: &str) -> Result<ArchiveRef> {
        let selector = selector.trim();
        let archives = self.list_archives()?;

        let found = match selector.parse::<usize>() {
            Ok(index) if index >= 1 => archives.into_iter().nth(index - 1),
            _ => archives.into_iter().find(|a| {
                let name = a.name();
                name == selector || name.strip_suffix(".csv") == Some(selector)
            }),
        };
        found.ok_or_else(|| Error::ArchiveNotFound {
            selector: selector.to_string(),
        })
    }
}
