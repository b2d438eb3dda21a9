//! The attendance station.
//!
//! A [`Station`] owns everything one operator session works with: the
//! roster, the ledger for the current shift, the archiver, and the external
//! collaborators (QR encoder, audio cue). The menu and the CLI handlers drive
//! it; neither touches the components directly.

use std::path::{Path, PathBuf};

use chrono::NaiveDateTime;
use tracing::{debug, warn};

use crate::archive::{ArchiveRef, Archiver, SaveOutcome};
use crate::config::Config;
use crate::error::{Error, Result};
use crate::ledger::{Ledger, RecordOutcome};
use crate::qr::{self, QrEncoder, QrSummary, QrencodeCommand};
use crate::report::{self, DisplayRow};
use crate::roster::{Roster, Student};
use crate::scan::AudioCue;

/// What happened to a student's QR image after a roster change.
#[derive(Debug)]
pub enum QrStatus {
    /// The image was written here.
    Written(PathBuf),
    /// The encoder failed. The roster change itself still stands.
    Failed(Error),
    /// QR generation is turned off.
    Disabled,
}

/// One operator's working set.
#[derive(Debug)]
pub struct Station {
    config: Config,
    roster: Roster,
    ledger: Ledger,
    archiver: Archiver,
    encoder: Option<Box<dyn QrEncoder>>,
    cue: Box<dyn AudioCue>,
}

impl Station {
    /// Open a station from configuration: load the roster and attach to the
    /// shift log.
    ///
    /// # Errors
    ///
    /// Returns an error if the roster file exists but cannot be loaded.
    pub fn open(config: Config, cue: Box<dyn AudioCue>) -> Result<Self> {
        let roster = Roster::load(config.roster_path())?;
        let ledger = Ledger::new(config.shift_log_path(), config.cooldown())
            .with_policy(config.attendance.on_log_error);
        let archiver = Archiver::new(config.log_dir());
        let encoder: Option<Box<dyn QrEncoder>> = if config.qr.enabled {
            Some(Box::new(QrencodeCommand::new(config.qr.program.clone())))
        } else {
            None
        };

        debug!(
            "Station open: {} students, shift log {}",
            roster.len(),
            ledger.log_path().display()
        );
        Ok(Self {
            config,
            roster,
            ledger,
            archiver,
            encoder,
            cue,
        })
    }

    /// Replace the QR encoder (`None` disables QR output).
    #[must_use]
    pub fn with_encoder(mut self, encoder: Option<Box<dyn QrEncoder>>) -> Self {
        self.encoder = encoder;
        self
    }

    /// The configuration the station was opened with.
    #[must_use]
    pub fn config(&self) -> &Config {
        &self.config
    }

    /// The student roster.
    #[must_use]
    pub fn roster(&self) -> &Roster {
        &self.roster
    }

    /// The ledger for the current shift.
    #[must_use]
    pub fn ledger(&self) -> &Ledger {
        &self.ledger
    }

    /// The archiver.
    #[must_use]
    pub fn archiver(&self) -> &Archiver {
        &self.archiver
    }

    /// Submit a scan.
    ///
    /// # Errors
    ///
    /// See [`Ledger::record`].
    pub fn record(&mut self, student_id: &str, now: NaiveDateTime) -> Result<RecordOutcome> {
        self.ledger.record(&self.roster, student_id, now)
    }

    /// Play the accepted-scan cue.
    pub fn play_cue(&self) {
        self.cue.play();
    }

    /// The current shift log joined with the roster.
    ///
    /// # Errors
    ///
    /// Returns a storage error if the shift log cannot be read.
    pub fn shift_report(&self) -> Result<Vec<DisplayRow>> {
        Ok(report::render(&self.ledger.shift_records()?, &self.roster))
    }

    /// Records accepted in this run joined with the roster.
    #[must_use]
    pub fn session_report(&self) -> Vec<DisplayRow> {
        report::render(self.ledger.session(), &self.roster)
    }

    /// Saved sessions, oldest first.
    ///
    /// # Errors
    ///
    /// Returns a storage error if the log directory cannot be listed.
    pub fn list_archives(&self) -> Result<Vec<ArchiveRef>> {
        self.archiver.list_archives()
    }

    /// A saved session joined with the current roster.
    ///
    /// # Errors
    ///
    /// Returns [`Error::ArchiveNotFound`] for an unknown selector, or a
    /// storage error if the archive cannot be read.
    pub fn archive_report(&self, selector: &str) -> Result<(ArchiveRef, Vec<DisplayRow>)> {
        let archive = self.archiver.find(selector)?;
        let records = self.archiver.open_archive(&archive)?;
        Ok((archive, report::render(&records, &self.roster)))
    }

    /// Archive the session buffer and end the shift.
    ///
    /// # Errors
    ///
    /// See [`Archiver::save_session`].
    pub fn save_session(&mut self, now: NaiveDateTime) -> Result<SaveOutcome> {
        self.archiver.save_session(&mut self.ledger, now)
    }

    /// Discard the shift without archiving it.
    ///
    /// # Errors
    ///
    /// See [`Ledger::end_shift`].
    pub fn end_shift(&mut self) -> Result<()> {
        self.ledger.end_shift()
    }

    /// Add or update a student, then write their QR image.
    ///
    /// # Errors
    ///
    /// Returns a storage error if the roster cannot be saved. Encoder
    /// failures are reported through [`QrStatus::Failed`] instead.
    pub fn add_student(&mut self, student: Student) -> Result<(Option<Student>, QrStatus)> {
        let previous = self.roster.add(student.clone())?;

        // A class change leaves the old image behind otherwise.
        if let Some(old) = previous.as_ref().filter(|old| old.class_name != student.class_name) {
            let stale = qr::image_path(&self.config.qr_dir(), old);
            if let Err(err) = crate::storage::remove_if_exists(&stale) {
                warn!("Could not delete stale QR image {}: {}", stale.display(), err);
            }
        }

        let status = match &self.encoder {
            Some(encoder) => match qr::generate(encoder.as_ref(), &self.config.qr_dir(), &student) {
                Ok(path) => QrStatus::Written(path),
                Err(err) => {
                    warn!("QR generation failed for {}: {}", student.id, err);
                    QrStatus::Failed(err)
                }
            },
            None => QrStatus::Disabled,
        };
        Ok((previous, status))
    }

    /// Remove a student and their QR image.
    ///
    /// # Errors
    ///
    /// Returns a storage error if the roster cannot be saved.
    pub fn remove_student(&mut self, student_id: &str) -> Result<Option<Student>> {
        self.roster.remove(student_id, &self.config.qr_dir())
    }

    /// Merge a roster file, then regenerate every QR image.
    ///
    /// # Errors
    ///
    /// See [`Roster::import`].
    pub fn import_students(&mut self, source: &Path) -> Result<(usize, Option<QrSummary>)> {
        let count = self.roster.import(source)?;
        Ok((count, self.generate_qr_images()))
    }

    /// Write QR images for the whole roster, per class. `None` if QR output
    /// is disabled.
    #[must_use]
    pub fn generate_qr_images(&self) -> Option<QrSummary> {
        self.encoder
            .as_ref()
            .map(|encoder| qr::generate_all(encoder.as_ref(), &self.config.qr_dir(), &self.roster))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::qr::tests::RecordingEncoder;
    use crate::scan::SilentCue;
    use crate::test_support::{at, scratch_dir};
    use std::fs;

    fn station(name: &str) -> Station {
        let dir = scratch_dir(name);
        let mut config = Config::default();
        config.storage.data_dir = Some(dir);
        Station::open(config, Box::new(SilentCue))
            .unwrap()
            .with_encoder(Some(Box::new(RecordingEncoder::default())))
    }

    #[test]
    fn test_open_uses_config_paths() {
        let dir = scratch_dir("station_paths");
        let mut config = Config::default();
        config.storage.data_dir = Some(dir.clone());
        config.attendance.cooldown_secs = 60;

        let station = Station::open(config, Box::new(SilentCue)).unwrap();
        assert_eq!(station.roster().path(), dir.join("students.json"));
        assert_eq!(station.ledger().log_path(), dir.join("logs/attendance.csv"));
        assert_eq!(station.archiver().dir(), dir.join("logs"));
        assert_eq!(station.ledger().cooldown().as_secs(), 60);
    }

    #[test]
    fn test_open_rejects_corrupt_roster() {
        let dir = scratch_dir("station_corrupt");
        fs::write(dir.join("students.json"), "{not json").unwrap();
        let mut config = Config::default();
        config.storage.data_dir = Some(dir);

        assert!(matches!(
            Station::open(config, Box::new(SilentCue)).unwrap_err(),
            Error::RosterParse { .. }
        ));
    }

    #[test]
    fn test_add_student_writes_qr() {
        let mut station = station("station_add");
        let (previous, status) = station
            .add_student(Student::new("001", "Ani", "kelas_a"))
            .unwrap();

        assert!(previous.is_none());
        match status {
            QrStatus::Written(path) => assert!(path.ends_with("kelas_a/001.png")),
            other => panic!("expected a QR image, got {other:?}"),
        }
    }

    #[test]
    fn test_add_student_qr_failure_keeps_student() {
        let mut station = station("station_add_qr_fail").with_encoder(Some(Box::new(
            RecordingEncoder {
                fail_for: vec!["001".to_string()],
                ..Default::default()
            },
        )));

        let (_, status) = station
            .add_student(Student::new("001", "Ani", "kelas_a"))
            .unwrap();
        assert!(matches!(status, QrStatus::Failed(_)));
        assert!(station.roster().contains("001"));
    }

    #[test]
    fn test_add_student_qr_disabled() {
        let mut station = station("station_add_disabled").with_encoder(None);
        let (_, status) = station
            .add_student(Student::new("001", "Ani", "kelas_a"))
            .unwrap();
        assert!(matches!(status, QrStatus::Disabled));
        assert!(station.generate_qr_images().is_none());
    }

    #[test]
    fn test_class_change_removes_stale_image() {
        let mut station = station("station_class_change");
        let old = Student::new("001", "Ani", "kelas_a");
        station.add_student(old.clone()).unwrap();

        let stale = qr::image_path(&station.config().qr_dir(), &old);
        fs::create_dir_all(stale.parent().unwrap()).unwrap();
        fs::write(&stale, b"png").unwrap();

        station
            .add_student(Student::new("001", "Ani", "kelas_b"))
            .unwrap();
        assert!(!stale.exists());
    }

    #[test]
    fn test_import_regenerates_qr() {
        let mut station = station("station_import");
        let source = station.config().data_dir().join("import.json");
        fs::write(&source, r#"{"001": "Ani", "002": {"nama": "Budi", "kelas": "kelas_b"}}"#)
            .unwrap();

        let (count, summary) = station.import_students(&source).unwrap();
        assert_eq!(count, 2);
        assert_eq!(summary.unwrap().written, 2);
    }

    #[test]
    fn test_record_and_reports() {
        let mut station = station("station_reports");
        station
            .add_student(Student::new("001", "Ani", "kelas_a"))
            .unwrap();

        station.record("001", at(8, 0, 0)).unwrap();
        station.record("X999", at(8, 1, 0)).unwrap();

        let shift = station.shift_report().unwrap();
        assert_eq!(shift.len(), 2);
        assert_eq!(shift[1].name, "Unknown");
        assert_eq!(station.session_report(), shift);
    }

    #[test]
    fn test_save_and_open_archive() {
        let mut station = station("station_archive");
        station.record("001", at(8, 0, 0)).unwrap();

        let SaveOutcome::Saved(saved) = station.save_session(at(8, 5, 0)).unwrap() else {
            panic!("expected an archive");
        };
        assert!(station.shift_report().unwrap().is_empty());

        let (archive, rows) = station.archive_report("1").unwrap();
        assert_eq!(archive, saved);
        assert_eq!(rows.len(), 1);
        assert_eq!(station.list_archives().unwrap().len(), 1);
    }

    #[test]
    fn test_end_shift_discards() {
        let mut station = station("station_end_shift");
        station.record("001", at(8, 0, 0)).unwrap();
        station.end_shift().unwrap();

        assert!(station.session_report().is_empty());
        assert!(station.list_archives().unwrap().is_empty());
    }
}
