//! The scan loop.
//!
//! QR scanners in keyboard-wedge mode type the decoded payload followed by
//! Enter, so a scan source is anything that yields lines. Each accepted
//! payload is submitted to the ledger through the [`Station`].

use std::collections::HashMap;
use std::io::{BufRead, Write};
use std::time::{Duration, Instant};

use tracing::{debug, warn};

use crate::error::Result;
use crate::ledger::RecordOutcome;
use crate::record::now_local;
use crate::report;
use crate::station::Station;

/// Line that ends a scan loop.
pub const QUIT_COMMAND: &str = "q";

const CLEAR_SCREEN: &str = "\x1b[2J\x1b[H";

/// A serial stream of decoded QR payloads.
pub trait ScanSource {
    /// The next payload, or `None` when the operator stops or input ends.
    ///
    /// # Errors
    ///
    /// Returns an error if the underlying device cannot be read.
    fn next_code(&mut self) -> Result<Option<String>>;
}

/// Reads one payload per line. Blank lines are skipped; `q` or end of input
/// stops.
#[derive(Debug)]
pub struct LineSource<R> {
    reader: R,
}

impl<R: BufRead> LineSource<R> {
    /// Wrap a line reader.
    pub fn new(reader: R) -> Self {
        Self { reader }
    }
}

impl<R: BufRead> ScanSource for LineSource<R> {
    fn next_code(&mut self) -> Result<Option<String>> {
        let mut line = String::new();
        loop {
            line.clear();
            if self.reader.read_line(&mut line)? == 0 {
                return Ok(None);
            }
            match line.trim() {
                "" => continue,
                QUIT_COMMAND => return Ok(None),
                code => return Ok(Some(code.to_string())),
            }
        }
    }
}

/// Drops a payload seen again within a short window, so one code held in
/// front of the scanner isn't submitted over and over.
#[derive(Debug)]
pub struct RepeatFilter {
    window: Duration,
    last_seen: HashMap<String, Instant>,
}

impl RepeatFilter {
    /// Create a filter with the given window. A zero window accepts
    /// everything.
    #[must_use]
    pub fn new(window: Duration) -> Self {
        Self {
            window,
            last_seen: HashMap::new(),
        }
    }

    /// Check whether `code` should be submitted at `now`, and remember it if
    /// so.
    pub fn accept(&mut self, code: &str, now: Instant) -> bool {
        if let Some(seen) = self.last_seen.get(code) {
            if now.saturating_duration_since(*seen) < self.window {
                return false;
            }
        }
        self.last_seen.insert(code.to_string(), now);
        true
    }
}

/// Feedback played after a successful record.
pub trait AudioCue: std::fmt::Debug {
    /// Start the cue without waiting for it. Failures are logged, not
    /// returned.
    fn play(&self);
}

/// A cue that does nothing.
#[derive(Debug, Clone, Copy, Default)]
pub struct SilentCue;

impl AudioCue for SilentCue {
    fn play(&self) {}
}

/// How long a scan loop runs.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ScanMode {
    /// Stop after the first decoded code, recorded or not.
    #[default]
    Single,
    /// Keep scanning and redraw the shift report after each record.
    Live,
}

/// Counts from one scan loop.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ScanSummary {
    /// Scans written to the ledger.
    pub recorded: usize,
    /// Scans refused by the cooldown.
    pub blocked: usize,
    /// Repeats dropped by the repeat filter.
    pub repeats: usize,
    /// Scans that failed with an error.
    pub failed: usize,
}

/// Runs scan loops against a station.
#[derive(Debug)]
pub struct Scanner {
    mode: ScanMode,
    filter: RepeatFilter,
    clear_screen: bool,
}

impl Scanner {
    /// Create a scanner.
    #[must_use]
    pub fn new(mode: ScanMode, repeat_window: Duration) -> Self {
        Self {
            mode,
            filter: RepeatFilter::new(repeat_window),
            clear_screen: false,
        }
    }

    /// Clear the terminal before each live report redraw.
    #[must_use]
    pub fn clear_screen(mut self, clear: bool) -> Self {
        self.clear_screen = clear;
        self
    }

    /// Read codes from `source` until it ends (or, in single mode, until the
    /// first code is handled), reporting to `out`.
    ///
    /// Recording errors are shown and the loop carries on.
    ///
    /// # Errors
    ///
    /// Returns an error only if the source or `out` fails.
    pub fn run<S: ScanSource, W: Write>(
        &mut self,
        station: &mut Station,
        source: &mut S,
        out: &mut W,
    ) -> Result<ScanSummary> {
        let mut summary = ScanSummary::default();
        match self.mode {
            ScanMode::Single => writeln!(out, "Scan a QR code (type '{QUIT_COMMAND}' to stop).")?,
            ScanMode::Live => {
                writeln!(out, "Live scan active. Type '{QUIT_COMMAND}' to stop.")?;
            }
        }

        while let Some(code) = source.next_code()? {
            if !self.filter.accept(&code, Instant::now()) {
                debug!("Dropping repeat of {}", code);
                summary.repeats += 1;
                continue;
            }

            match station.record(&code, now_local()) {
                Ok(RecordOutcome::Recorded(record)) => {
                    summary.recorded += 1;
                    station.play_cue();
                    writeln!(
                        out,
                        "QR code detected: {} -> {} ({})",
                        record.student_id,
                        station.roster().name_of(&record.student_id),
                        record.class().unwrap_or_default()
                    )?;
                    writeln!(out, "Attendance recorded.")?;
                    if self.mode == ScanMode::Live {
                        self.redraw(station, out)?;
                    }
                }
                Ok(RecordOutcome::Blocked {
                    student_id,
                    remaining_secs,
                }) => {
                    summary.blocked += 1;
                    writeln!(
                        out,
                        "{} ({}) already checked in recently. Wait {} seconds before scanning again.",
                        station.roster().name_of(&student_id),
                        student_id,
                        remaining_secs
                    )?;
                }
                Err(err) => {
                    summary.failed += 1;
                    warn!("Scan of {} failed: {}", code, err);
                    writeln!(out, "Could not record {code}: {err}")?;
                }
            }

            if self.mode == ScanMode::Single {
                break;
            }
        }

        debug!("Scan loop finished: {:?}", summary);
        Ok(summary)
    }

    fn redraw<W: Write>(&self, station: &Station, out: &mut W) -> Result<()> {
        if self.clear_screen {
            write!(out, "{CLEAR_SCREEN}")?;
        }
        writeln!(out)?;
        writeln!(out, "=== LIVE ATTENDANCE REPORT ===")?;
        match station.shift_report() {
            Ok(rows) if rows.is_empty() => writeln!(out, "No attendance recorded yet.")?,
            Ok(rows) => write!(out, "{}", report::format_lines(&rows))?,
            Err(err) => writeln!(out, "Could not read the shift log: {err}")?,
        }
        writeln!(out)?;
        out.flush()?;
        Ok(())
    }
}
