//! `rollcall` - QR-based classroom attendance recorder
//!
//! This library provides the attendance ledger (a cooldown-gated append log
//! plus an in-memory session buffer), the student roster, session archives
//! and reporting, together with the scan loop and operator console that
//! drive them.

#![warn(missing_docs)]
#![warn(missing_debug_implementations)]
#![deny(unsafe_code)]

pub mod archive;
pub mod cli;
pub mod config;
pub mod credentials;
pub mod error;
pub mod ledger;
pub mod logging;
pub mod menu;
pub mod qr;
pub mod record;
pub mod report;
pub mod roster;
pub mod scan;
pub mod station;
pub mod storage;

#[cfg(test)]
mod test_support;

pub use archive::{ArchiveRef, Archiver, SaveOutcome};
pub use config::{Config, LogErrorPolicy};
pub use credentials::CredentialStore;
pub use error::{Error, Result};
pub use ledger::{LastEvent, Ledger, RecordOutcome};
pub use logging::init_logging;
pub use record::AttendanceRecord;
pub use report::DisplayRow;
pub use roster::{Roster, Student};
pub use scan::{AudioCue, LineSource, ScanMode, ScanSource, Scanner, SilentCue};
pub use station::{QrStatus, Station};
