//! The interactive operator console.
//!
//! ```text
//! 1. Scan attendance (single)      4. Manage students
//! 2. Live scan                     5. Manage sessions
//! 3. Attendance report             0. Exit
//! ```
//!
//! The menu shares its input with the scan loop: while scanning, lines are
//! QR payloads; back at the menu they are choices. Failures of an action are
//! shown and the menu continues.

use std::io::{BufRead, Write};
use std::path::Path;

use tracing::debug;

use crate::archive::SaveOutcome;
use crate::error::Result;
use crate::record::now_local;
use crate::report;
use crate::roster::{Student, DEFAULT_CLASS};
use crate::scan::{LineSource, ScanMode, Scanner};
use crate::station::{QrStatus, Station};

/// The menu loop over a station.
#[derive(Debug)]
pub struct Menu<'a, R, W> {
    station: &'a mut Station,
    input: R,
    output: W,
    clear_screen: bool,
}

impl<'a, R: BufRead, W: Write> Menu<'a, R, W> {
    /// Create a menu reading choices from `input` and writing to `output`.
    pub fn new(station: &'a mut Station, input: R, output: W) -> Self {
        Self {
            station,
            input,
            output,
            clear_screen: false,
        }
    }

    /// Clear the terminal before each live report redraw.
    #[must_use]
    pub fn clear_screen(mut self, clear: bool) -> Self {
        self.clear_screen = clear;
        self
    }

    /// Run until the operator exits or input ends, then close the shift:
    /// archive it if `session.archive_on_exit` is set, discard it otherwise.
    ///
    /// # Errors
    ///
    /// Returns an error if the terminal cannot be read or written.
    pub fn run(&mut self) -> Result<()> {
        loop {
            writeln!(self.output)?;
            writeln!(self.output, "=== MAIN MENU ===")?;
            writeln!(self.output, "1. Scan attendance (single)")?;
            writeln!(self.output, "2. Live scan")?;
            writeln!(self.output, "3. Attendance report")?;
            writeln!(self.output, "4. Manage students")?;
            writeln!(self.output, "5. Manage sessions")?;
            writeln!(self.output, "0. Exit")?;

            let Some(choice) = self.ask("Choose: ")? else {
                break;
            };
            debug!("Main menu choice {:?}", choice);
            match choice.as_str() {
                "1" => self.scan(ScanMode::Single)?,
                "2" => self.scan(ScanMode::Live)?,
                "3" => self.shift_report()?,
                "4" => self.students_menu()?,
                "5" => self.sessions_menu()?,
                "0" => break,
                _ => writeln!(self.output, "Invalid choice.")?,
            }
        }
        self.exit()
    }

    fn exit(&mut self) -> Result<()> {
        let discard = if self.station.config().session.archive_on_exit {
            // Nothing buffered still ends the shift, a failed save keeps the log.
            matches!(self.save_session()?, Some(SaveOutcome::NoOp))
        } else {
            true
        };
        if discard {
            if let Err(err) = self.station.end_shift() {
                writeln!(self.output, "Could not clear the shift log: {err}")?;
            }
        }
        writeln!(self.output, "Goodbye.")?;
        Ok(())
    }

    fn scan(&mut self, mode: ScanMode) -> Result<()> {
        let mut scanner = Scanner::new(mode, self.station.config().repeat_window())
            .clear_screen(self.clear_screen);
        let mut source = LineSource::new(&mut self.input);
        scanner.run(&mut *self.station, &mut source, &mut self.output)?;
        Ok(())
    }

    fn shift_report(&mut self) -> Result<()> {
        writeln!(self.output, "\n=== ATTENDANCE REPORT ===")?;
        match self.station.shift_report() {
            Ok(rows) if rows.is_empty() => writeln!(self.output, "No attendance recorded yet.")?,
            Ok(rows) => write!(self.output, "{}", report::format_lines(&rows))?,
            Err(err) => writeln!(self.output, "Could not read the shift log: {err}")?,
        }
        Ok(())
    }

    fn students_menu(&mut self) -> Result<()> {
        loop {
            writeln!(self.output, "\n=== MANAGE STUDENTS ===")?;
            writeln!(self.output, "1. Add student")?;
            writeln!(self.output, "2. Remove student")?;
            writeln!(self.output, "3. Generate QR codes per class")?;
            writeln!(self.output, "4. Import students from JSON file")?;
            writeln!(self.output, "5. List students")?;
            writeln!(self.output, "0. Back")?;

            let Some(choice) = self.ask("Choose: ")? else {
                return Ok(());
            };
            match choice.as_str() {
                "1" => self.add_student()?,
                "2" => self.remove_student()?,
                "3" => self.generate_qr()?,
                "4" => self.import_students()?,
                "5" => self.list_students()?,
                "0" => return Ok(()),
                _ => writeln!(self.output, "Invalid choice.")?,
            }
        }
    }

    fn add_student(&mut self) -> Result<()> {
        let name = self.ask("Student name: ")?.unwrap_or_default();
        let id = self.ask("Student id: ")?.unwrap_or_default();
        if id.is_empty() {
            writeln!(self.output, "A student id is required.")?;
            return Ok(());
        }
        let class = self
            .ask(&format!("Class (e.g. kelas_a, default {DEFAULT_CLASS}): "))?
            .unwrap_or_default();

        match self.station.add_student(Student::new(id, name, class)) {
            Ok((previous, status)) => {
                let verb = if previous.is_some() { "Updated" } else { "Added" };
                writeln!(self.output, "{verb} student.")?;
                self.show_qr_status(&status)?;
            }
            Err(err) => writeln!(self.output, "Could not save the roster: {err}")?,
        }
        Ok(())
    }

    fn show_qr_status(&mut self, status: &QrStatus) -> Result<()> {
        match status {
            QrStatus::Written(path) => writeln!(self.output, "QR code saved to {}", path.display())?,
            QrStatus::Failed(err) => writeln!(self.output, "QR code not generated: {err}")?,
            QrStatus::Disabled => {}
        }
        Ok(())
    }

    fn remove_student(&mut self) -> Result<()> {
        if self.station.roster().is_empty() {
            writeln!(self.output, "There are no students to remove.")?;
            return Ok(());
        }
        writeln!(self.output, "\n=== REMOVE STUDENT ===")?;
        self.list_students()?;

        let Some(id) = self.ask("Student id to remove (0 to cancel): ")? else {
            return Ok(());
        };
        if id == "0" || id.is_empty() {
            return Ok(());
        }
        match self.station.remove_student(&id) {
            Ok(Some(student)) => writeln!(
                self.output,
                "Removed {} ({}).",
                student.name, student.id
            )?,
            Ok(None) => writeln!(self.output, "Student id not found.")?,
            Err(err) => writeln!(self.output, "Could not save the roster: {err}")?,
        }
        Ok(())
    }

    fn generate_qr(&mut self) -> Result<()> {
        if self.station.roster().is_empty() {
            writeln!(self.output, "There are no students to generate QR codes for.")?;
            return Ok(());
        }
        match self.station.generate_qr_images() {
            Some(summary) => {
                writeln!(self.output, "{} QR codes written.", summary.written)?;
                for (id, err) in &summary.failed {
                    writeln!(self.output, "  {id}: {err}")?;
                }
            }
            None => writeln!(self.output, "QR generation is disabled.")?,
        }
        Ok(())
    }

    fn import_students(&mut self) -> Result<()> {
        let Some(path) = self.ask("JSON file to import: ")? else {
            return Ok(());
        };
        match self.station.import_students(Path::new(&path)) {
            Ok((count, summary)) => {
                writeln!(self.output, "Imported {count} students.")?;
                if let Some(summary) = summary {
                    writeln!(
                        self.output,
                        "{} QR codes written, {} failed.",
                        summary.written,
                        summary.failed.len()
                    )?;
                }
            }
            Err(err) => writeln!(self.output, "Import failed: {err}")?,
        }
        Ok(())
    }

    fn list_students(&mut self) -> Result<()> {
        for student in self.station.roster().iter() {
            writeln!(
                self.output,
                "{} - {} - {}",
                student.id, student.name, student.class_name
            )?;
        }
        Ok(())
    }

    fn sessions_menu(&mut self) -> Result<()> {
        loop {
            writeln!(self.output, "\n=== MANAGE SESSIONS ===")?;
            writeln!(self.output, "1. Save session")?;
            writeln!(self.output, "2. View saved sessions")?;
            writeln!(self.output, "0. Back")?;

            let Some(choice) = self.ask("Choose: ")? else {
                return Ok(());
            };
            match choice.as_str() {
                "1" => {
                    self.save_session()?;
                }
                "2" => self.open_session()?,
                "0" => return Ok(()),
                _ => writeln!(self.output, "Invalid choice.")?,
            }
        }
    }

    fn save_session(&mut self) -> Result<Option<SaveOutcome>> {
        match self.station.save_session(now_local()) {
            Ok(outcome) => {
                match &outcome {
                    SaveOutcome::Saved(archive) => {
                        writeln!(self.output, "Session saved to {}", archive.path.display())?;
                    }
                    SaveOutcome::NoOp => {
                        writeln!(self.output, "No attendance in this session to save.")?;
                    }
                }
                Ok(Some(outcome))
            }
            Err(err) => {
                writeln!(self.output, "Could not save the session: {err}")?;
                Ok(None)
            }
        }
    }

    fn open_session(&mut self) -> Result<()> {
        let archives = match self.station.list_archives() {
            Ok(archives) => archives,
            Err(err) => {
                writeln!(self.output, "Could not list sessions: {err}")?;
                return Ok(());
            }
        };
        if archives.is_empty() {
            writeln!(self.output, "No saved sessions yet.")?;
            return Ok(());
        }

        writeln!(self.output, "\n=== SAVED SESSIONS ===")?;
        for (i, archive) in archives.iter().enumerate() {
            writeln!(self.output, "{}. {}", i + 1, archive.name())?;
        }
        writeln!(self.output, "0. Cancel")?;

        let Some(choice) = self.ask("Number to open: ")? else {
            return Ok(());
        };
        if choice == "0" {
            return Ok(());
        }
        match self.station.archive_report(&choice) {
            Ok((archive, rows)) => {
                writeln!(self.output, "\n=== REPORT: {} ===", archive.name())?;
                write!(self.output, "{}", report::format_lines(&rows))?;
            }
            Err(err) => writeln!(self.output, "{err}")?,
        }
        Ok(())
    }

    /// Prompt and read one trimmed line. `None` at end of input.
    fn ask(&mut self, label: &str) -> Result<Option<String>> {
        write!(self.output, "{label}")?;
        self.output.flush()?;
        let mut line = String::new();
        if self.input.read_line(&mut line)? == 0 {
            return Ok(None);
        }
        Ok(Some(line.trim().to_string()))
    }
}
