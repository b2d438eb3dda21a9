//! End-to-end shift: roster, scans across a restart, archive, report.

use std::fs;
use std::path::PathBuf;
use std::time::Duration;

use chrono::{NaiveDate, NaiveDateTime};

use rollcall::report;
use rollcall::{
    Archiver, AttendanceRecord, LastEvent, Ledger, RecordOutcome, Roster, SaveOutcome, Student,
};

fn scratch_dir(name: &str) -> PathBuf {
    let dir = std::env::temp_dir().join(format!("rollcall_it_{}_{}", std::process::id(), name));
    let _ = fs::remove_dir_all(&dir);
    fs::create_dir_all(&dir).unwrap();
    dir
}

fn at(h: u32, m: u32, s: u32) -> NaiveDateTime {
    NaiveDate::from_ymd_opt(2024, 1, 1)
        .unwrap()
        .and_hms_opt(h, m, s)
        .unwrap()
}

#[test]
fn test_full_shift() {
    let dir = scratch_dir("full_shift");
    let log_dir = dir.join("logs");
    let log_path = log_dir.join("attendance.csv");

    fs::write(
        dir.join("students.json"),
        r#"{"001": {"nama": "Ani", "kelas": "kelas_a"}, "002": "Budi"}"#,
    )
    .unwrap();
    let roster = Roster::load(dir.join("students.json")).unwrap();
    let archiver = Archiver::new(&log_dir);

    let mut ledger = Ledger::new(&log_path, Duration::from_secs(300));
    assert_eq!(ledger.last_event_for("001"), LastEvent::NoPriorRecord);

    assert!(ledger.record(&roster, "001", at(8, 0, 0)).unwrap().is_recorded());
    assert_eq!(
        ledger.record(&roster, "001", at(8, 2, 0)).unwrap(),
        RecordOutcome::Blocked {
            student_id: "001".to_string(),
            remaining_secs: 180,
        }
    );

    // The process restarts mid-shift: the cooldown still holds, but this
    // run's session buffer starts empty.
    drop(ledger);
    let mut ledger = Ledger::new(&log_path, Duration::from_secs(300));
    assert!(!ledger.record(&roster, "001", at(8, 4, 59)).unwrap().is_recorded());
    assert!(ledger.record(&roster, "001", at(8, 5, 0)).unwrap().is_recorded());
    assert!(ledger.record(&roster, "X999", at(8, 6, 0)).unwrap().is_recorded());

    // The shift log has every accepted scan, the buffer only this run's.
    assert_eq!(ledger.shift_records().unwrap().len(), 3);
    assert_eq!(ledger.session().len(), 2);

    let SaveOutcome::Saved(archive) = archiver.save_session(&mut ledger, at(8, 10, 0)).unwrap()
    else {
        panic!("expected an archive");
    };
    assert_eq!(archive.name(), "attendance-20240101_081000.csv");
    assert!(!log_path.exists());
    assert!(ledger.session().is_empty());

    let records = archiver.open_archive(&archive).unwrap();
    assert_eq!(
        records,
        vec![
            AttendanceRecord::new("001", at(8, 5, 0), Some("kelas_a".to_string())),
            AttendanceRecord::new("X999", at(8, 6, 0), Some("umum".to_string())),
        ]
    );

    let lines = report::format_lines(&report::render(&records, &roster));
    assert_eq!(
        lines,
        "001 - Ani - kelas_a - 2024-01-01 08:05:00\n\
         X999 - Unknown - umum - 2024-01-01 08:06:00\n"
    );

    // Archiving again with nothing buffered writes nothing.
    assert_eq!(
        archiver.save_session(&mut ledger, at(8, 11, 0)).unwrap(),
        SaveOutcome::NoOp
    );
    assert_eq!(archiver.list_archives().unwrap(), vec![archive]);
}

#[test]
fn test_cooldown_then_archive_in_one_run() {
    let dir = scratch_dir("one_run");
    let log_dir = dir.join("logs");
    let log_path = log_dir.join("attendance.csv");

    let mut roster = Roster::load(dir.join("students.json")).unwrap();
    roster.add(Student::new("001", "Ani", "kelas_a")).unwrap();
    let archiver = Archiver::new(&log_dir);
    let mut ledger = Ledger::new(&log_path, Duration::from_secs(300));

    assert!(ledger.record(&roster, "001", at(8, 0, 0)).unwrap().is_recorded());
    assert_eq!(
        ledger.record(&roster, "001", at(8, 2, 0)).unwrap(),
        RecordOutcome::Blocked {
            student_id: "001".to_string(),
            remaining_secs: 180,
        }
    );
    assert!(ledger.record(&roster, "001", at(8, 5, 0)).unwrap().is_recorded());

    let SaveOutcome::Saved(archive) = archiver.save_session(&mut ledger, at(8, 10, 0)).unwrap()
    else {
        panic!("expected an archive");
    };
    assert_eq!(
        archiver.open_archive(&archive).unwrap(),
        vec![
            AttendanceRecord::new("001", at(8, 0, 0), Some("kelas_a".to_string())),
            AttendanceRecord::new("001", at(8, 5, 0), Some("kelas_a".to_string())),
        ]
    );
    assert!(!log_path.exists());
    assert!(ledger.session().is_empty());
}

#[test]
fn test_roster_edits_survive_reload() {
    let dir = scratch_dir("roster_reload");
    let path = dir.join("students.json");
    let qr_dir = dir.join("qr");

    let mut roster = Roster::load(&path).unwrap();
    roster.add(Student::new("001", "Ani", "kelas_a")).unwrap();
    roster.add(Student::new("002", "Budi", "")).unwrap();
    roster.remove("001", &qr_dir).unwrap();

    let reloaded = Roster::load(&path).unwrap();
    assert_eq!(reloaded.len(), 1);
    assert_eq!(reloaded.name_of("002"), "Budi");
    assert_eq!(reloaded.class_of("002"), "umum");
    assert_eq!(reloaded.name_of("001"), "Unknown");
}
