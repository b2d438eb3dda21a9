//! The attendance ledger.
//!
//! Every accepted scan is written twice: appended to the durable shift log
//! on disk, and pushed onto the in-memory session buffer. The log is the
//! only source of truth for the cooldown check, so a restart in the middle
//! of a shift still blocks students who were just recorded. The session
//! buffer only exists to be archived.
//!
//! Each student moves between two states, *eligible* and *cooling down*,
//! purely as a function of the time since their last logged entry:
//!
//! ```text
//! eligible --record--> cooling down --(cooldown elapses)--> eligible
//! ```
//!
//! All mutation goes through `&mut self`, which keeps the read-then-append
//! in [`Ledger::record`] atomic with respect to any other writer in the
//! process.

use std::io;
use std::path::{Path, PathBuf};
use std::time::Duration;

use chrono::NaiveDateTime;
use tracing::{debug, info, warn};

use crate::config::LogErrorPolicy;
use crate::error::{Error, Result};
use crate::record::AttendanceRecord;
use crate::roster::Roster;
use crate::storage;

/// What the durable log says about a student's most recent scan.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum LastEvent {
    /// The most recent logged scan.
    Found(NaiveDateTime),
    /// No log yet, or no entry for this student.
    NoPriorRecord,
    /// The log exists but could not be read.
    Unknown(String),
}

/// Result of submitting a scan to the ledger.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RecordOutcome {
    /// The scan was written to the log and the session buffer.
    Recorded(AttendanceRecord),
    /// The student is still cooling down. Nothing was written.
    Blocked {
        /// The student that was refused.
        student_id: String,
        /// Whole seconds until the student is eligible again.
        remaining_secs: u64,
    },
}

impl RecordOutcome {
    /// Check if the scan was recorded.
    #[must_use]
    pub fn is_recorded(&self) -> bool {
        matches!(self, Self::Recorded(_))
    }
}

/// The cooldown-gated recorder for one shift.
#[derive(Debug)]
pub struct Ledger {
    log_path: PathBuf,
    cooldown: Duration,
    policy: LogErrorPolicy,
    session: Vec<AttendanceRecord>,
}

impl Ledger {
    /// Create a ledger over the shift log at `log_path`. The log and its
    /// directory are created on the first accepted scan.
    #[must_use]
    pub fn new(log_path: impl Into<PathBuf>, cooldown: Duration) -> Self {
        Self {
            log_path: log_path.into(),
            cooldown,
            policy: LogErrorPolicy::default(),
            session: Vec::new(),
        }
    }

    /// Set the policy for an unreadable shift log.
    #[must_use]
    pub fn with_policy(mut self, policy: LogErrorPolicy) -> Self {
        self.policy = policy;
        self
    }

    /// Path of the durable shift log.
    #[must_use]
    pub fn log_path(&self) -> &Path {
        &self.log_path
    }

    /// The cooldown window.
    #[must_use]
    pub fn cooldown(&self) -> Duration {
        self.cooldown
    }

    /// Records accepted during this run, oldest first.
    #[must_use]
    pub fn session(&self) -> &[AttendanceRecord] {
        &self.session
    }

    /// Find the most recent logged scan for `student_id`.
    ///
    /// The log is scanned from the end; the first match is the latest entry
    /// since the log is appended in time order.
    #[must_use]
    pub fn last_event_for(&self, student_id: &str) -> LastEvent {
        match storage::read_records(&self.log_path) {
            Ok(records) => records
                .iter()
                .rev()
                .find(|r| r.student_id == student_id)
                .map_or(LastEvent::NoPriorRecord, |r| LastEvent::Found(r.timestamp)),
            Err(err) if err.kind() == io::ErrorKind::NotFound => LastEvent::NoPriorRecord,
            Err(err) => LastEvent::Unknown(err.to_string()),
        }
    }

    /// Submit a scan of `student_id` at `now`.
    ///
    /// # Errors
    ///
    /// Returns [`Error::StorageWrite`] if the log append fails, in which case
    /// the session buffer is untouched. Returns
    /// [`Error::CooldownUnverifiable`] if the log is unreadable and the
    /// policy is [`LogErrorPolicy::FailClosed`].
    pub fn record(
        &mut self,
        roster: &Roster,
        student_id: &str,
        now: NaiveDateTime,
    ) -> Result<RecordOutcome> {
        let last = match self.last_event_for(student_id) {
            LastEvent::Found(ts) => Some(ts),
            LastEvent::NoPriorRecord => None,
            LastEvent::Unknown(reason) => match self.policy {
                LogErrorPolicy::FailOpen => {
                    warn!(
                        "Shift log {} unreadable ({}), recording {} without cooldown check",
                        self.log_path.display(),
                        reason,
                        student_id
                    );
                    None
                }
                LogErrorPolicy::FailClosed => {
                    return Err(Error::CooldownUnverifiable {
                        student_id: student_id.to_string(),
                        reason,
                    });
                }
            },
        };

        if let Some(remaining_secs) = last.and_then(|ts| self.remaining(ts, now)) {
            debug!("{} blocked, {}s of cooldown left", student_id, remaining_secs);
            return Ok(RecordOutcome::Blocked {
                student_id: student_id.to_string(),
                remaining_secs,
            });
        }

        let record = AttendanceRecord::new(
            student_id,
            now,
            Some(roster.class_of(student_id).to_string()),
        );
        storage::append_record(&self.log_path, &record)
            .map_err(|e| Error::storage_write(&self.log_path, e))?;
        self.session.push(record.clone());

        info!(
            "Recorded {} ({}) at {}",
            student_id,
            roster.name_of(student_id),
            record.timestamp_string()
        );
        Ok(RecordOutcome::Recorded(record))
    }

    /// Seconds of cooldown left after a scan at `last`, or `None` if the
    /// student is eligible. A clock that went backwards counts as no time
    /// elapsed.
    fn remaining(&self, last: NaiveDateTime, now: NaiveDateTime) -> Option<u64> {
        let elapsed = u64::try_from((now - last).num_seconds()).unwrap_or(0);
        let window = self.cooldown.as_secs();
        (elapsed < window).then(|| window - elapsed)
    }

    /// Every readable record in the shift log, in file order. A missing log
    /// is an empty shift.
    ///
    /// # Errors
    ///
    /// Returns a storage error if the log exists but cannot be read.
    pub fn shift_records(&self) -> Result<Vec<AttendanceRecord>> {
        match storage::read_records(&self.log_path) {
            Ok(records) => Ok(records),
            Err(err) if err.kind() == io::ErrorKind::NotFound => Ok(Vec::new()),
            Err(err) => Err(Error::storage_read(&self.log_path, err)),
        }
    }

    /// Close the shift: delete the durable log and clear the session buffer.
    ///
    /// # Errors
    ///
    /// Returns a storage error if the log exists and cannot be deleted. The
    /// buffer is kept in that case.
    pub fn end_shift(&mut self) -> Result<()> {
        let removed = storage::remove_if_exists(&self.log_path)
            .map_err(|e| Error::storage_write(&self.log_path, e))?;
        if removed {
            debug!("Deleted shift log {}", self.log_path.display());
        }
        info!("Shift ended, {} session records discarded", self.session.len());
        self.session.clear();
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::roster::Student;
    use crate::test_support::{at, scratch_dir};
    use std::fs;

    fn setup(name: &str) -> (PathBuf, Roster, Ledger) {
        let dir = scratch_dir(name);
        let mut roster = Roster::load(dir.join("students.json")).unwrap();
        roster.add(Student::new("001", "Ani", "kelas_a")).unwrap();
        let ledger = Ledger::new(dir.join("logs/attendance.csv"), Duration::from_secs(300));
        (dir, roster, ledger)
    }

    #[test]
    fn test_first_scan_is_recorded() {
        let (_dir, roster, mut ledger) = setup("ledger_first");

        let outcome = ledger.record(&roster, "001", at(8, 0, 0)).unwrap();
        assert_eq!(
            outcome,
            RecordOutcome::Recorded(AttendanceRecord::new(
                "001",
                at(8, 0, 0),
                Some("kelas_a".to_string())
            ))
        );
        assert_eq!(ledger.session().len(), 1);
        assert_eq!(
            fs::read_to_string(ledger.log_path()).unwrap(),
            "001,2024-01-01 08:00:00,kelas_a\n"
        );
    }

    #[test]
    fn test_cooldown_scenario() {
        let (_dir, roster, mut ledger) = setup("ledger_cooldown");

        assert!(ledger.record(&roster, "001", at(8, 0, 0)).unwrap().is_recorded());

        let blocked = ledger.record(&roster, "001", at(8, 2, 0)).unwrap();
        assert_eq!(
            blocked,
            RecordOutcome::Blocked {
                student_id: "001".to_string(),
                remaining_secs: 180,
            }
        );
        assert_eq!(ledger.session().len(), 1);
        assert_eq!(ledger.shift_records().unwrap().len(), 1);

        assert!(ledger.record(&roster, "001", at(8, 5, 0)).unwrap().is_recorded());
        assert_eq!(ledger.session().len(), 2);
        assert_eq!(ledger.shift_records().unwrap().len(), 2);
    }

    #[test]
    fn test_cooldown_is_per_student() {
        let (_dir, roster, mut ledger) = setup("ledger_per_student");

        assert!(ledger.record(&roster, "001", at(8, 0, 0)).unwrap().is_recorded());
        assert!(ledger.record(&roster, "002", at(8, 0, 30)).unwrap().is_recorded());
        assert!(!ledger.record(&roster, "001", at(8, 1, 0)).unwrap().is_recorded());
    }

    #[test]
    fn test_unknown_student_gets_default_class() {
        let (_dir, roster, mut ledger) = setup("ledger_unknown");

        match ledger.record(&roster, "X999", at(9, 0, 0)).unwrap() {
            RecordOutcome::Recorded(record) => {
                assert_eq!(record.class_name.as_deref(), Some("umum"));
            }
            other => panic!("expected a record, got {other:?}"),
        }
    }

    #[test]
    fn test_cooldown_survives_restart() {
        let (_dir, roster, mut ledger) = setup("ledger_restart");
        ledger.record(&roster, "001", at(8, 0, 0)).unwrap();

        let mut restarted = Ledger::new(ledger.log_path(), Duration::from_secs(300));
        assert!(restarted.session().is_empty());
        assert!(!restarted.record(&roster, "001", at(8, 1, 0)).unwrap().is_recorded());
    }

    #[test]
    fn test_clock_going_backwards_blocks_full_window() {
        let (_dir, roster, mut ledger) = setup("ledger_backwards");
        ledger.record(&roster, "001", at(8, 10, 0)).unwrap();

        let outcome = ledger.record(&roster, "001", at(8, 0, 0)).unwrap();
        assert_eq!(
            outcome,
            RecordOutcome::Blocked {
                student_id: "001".to_string(),
                remaining_secs: 300,
            }
        );
    }

    #[test]
    fn test_last_event_for() {
        let (_dir, roster, mut ledger) = setup("ledger_last_event");
        assert_eq!(ledger.last_event_for("001"), LastEvent::NoPriorRecord);

        ledger.record(&roster, "001", at(8, 0, 0)).unwrap();
        ledger.record(&roster, "002", at(8, 1, 0)).unwrap();
        ledger.record(&roster, "001", at(8, 6, 0)).unwrap();

        assert_eq!(ledger.last_event_for("001"), LastEvent::Found(at(8, 6, 0)));
        assert_eq!(ledger.last_event_for("002"), LastEvent::Found(at(8, 1, 0)));
        assert_eq!(ledger.last_event_for("003"), LastEvent::NoPriorRecord);
    }

    #[cfg(unix)]
    #[test]
    fn test_unreadable_log_fail_open_records() {
        use std::os::unix::fs::PermissionsExt;

        let (_dir, roster, mut ledger) = setup("ledger_fail_open_records");
        ledger.record(&roster, "001", at(8, 0, 0)).unwrap();
        let log_path = ledger.log_path().to_path_buf();
        fs::set_permissions(&log_path, fs::Permissions::from_mode(0o200)).unwrap();
        if fs::File::open(&log_path).is_ok() {
            // Running privileged: the log stays readable.
            return;
        }

        assert!(matches!(ledger.last_event_for("001"), LastEvent::Unknown(_)));
        assert!(ledger.record(&roster, "001", at(8, 1, 0)).unwrap().is_recorded());
        assert_eq!(ledger.session().len(), 2);

        fs::set_permissions(&log_path, fs::Permissions::from_mode(0o600)).unwrap();
        assert_eq!(ledger.shift_records().unwrap().len(), 2);
    }

    #[test]
    fn test_unwritable_log_fail_open_is_write_error() {
        let (dir, roster, _) = setup("ledger_fail_open");
        // A directory in place of the log: reads fail with something other
        // than NotFound, and so do appends.
        let log_path = dir.join("attendance.csv");
        fs::create_dir_all(&log_path).unwrap();
        let mut ledger = Ledger::new(&log_path, Duration::from_secs(300));

        assert!(matches!(ledger.last_event_for("001"), LastEvent::Unknown(_)));
        let err = ledger.record(&roster, "001", at(8, 0, 0)).unwrap_err();
        assert!(err.is_storage_write());
        assert!(ledger.session().is_empty());
    }

    #[test]
    fn test_unreadable_log_fail_closed() {
        let (dir, roster, _) = setup("ledger_fail_closed");
        let log_path = dir.join("attendance.csv");
        fs::create_dir_all(&log_path).unwrap();
        let mut ledger =
            Ledger::new(&log_path, Duration::from_secs(300)).with_policy(LogErrorPolicy::FailClosed);

        let err = ledger.record(&roster, "001", at(8, 0, 0)).unwrap_err();
        assert!(matches!(err, Error::CooldownUnverifiable { .. }));
        assert!(ledger.session().is_empty());
    }

    #[test]
    fn test_write_failure_leaves_buffer_untouched() {
        let (dir, roster, _) = setup("ledger_write_failure");
        // The log's parent is a regular file, so the directory can't be made.
        let blocker = dir.join("blocker");
        fs::write(&blocker, "").unwrap();
        let mut ledger = Ledger::new(blocker.join("attendance.csv"), Duration::from_secs(300));

        let err = ledger.record(&roster, "001", at(8, 0, 0)).unwrap_err();
        assert!(err.is_storage_write());
        assert!(ledger.session().is_empty());
    }

    #[test]
    fn test_shift_records_missing_log_is_empty() {
        let (_dir, _roster, ledger) = setup("ledger_shift_empty");
        assert!(ledger.shift_records().unwrap().is_empty());
    }

    #[test]
    fn test_end_shift() {
        let (_dir, roster, mut ledger) = setup("ledger_end_shift");
        ledger.record(&roster, "001", at(8, 0, 0)).unwrap();

        ledger.end_shift().unwrap();
        assert!(!ledger.log_path().exists());
        assert!(ledger.session().is_empty());
        // Ending an already-ended shift is fine.
        ledger.end_shift().unwrap();
        // And the student is eligible again.
        assert!(ledger.record(&roster, "001", at(8, 1, 0)).unwrap().is_recorded());
    }
}
