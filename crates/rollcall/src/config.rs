//! Configuration management for rollcall.
//!
//! This module provides configuration loading and validation using figment,
//! supporting TOML config files, environment variables, and defaults.

use std::path::PathBuf;
use std::time::Duration;

use figment::{
    providers::{Env, Format, Serialized, Toml},
    Figment,
};
use serde::{Deserialize, Serialize};

use crate::error::{Error, Result};

/// Default configuration file name.
const CONFIG_FILE_NAME: &str = "config.toml";

/// Default data directory name.
const DATA_DIR_NAME: &str = "rollcall";

/// Default roster file name.
const ROSTER_FILE_NAME: &str = "students.json";

/// Default credential store file name.
const CREDENTIALS_FILE_NAME: &str = "users.json";

/// Directory (under the data dir) holding the shift log and archives.
const LOG_DIR_NAME: &str = "logs";

/// Directory (under the data dir) holding generated QR images.
const QR_DIR_NAME: &str = "qrcode_generated";

/// Default sound played on an accepted scan.
const SOUND_FILE: &str = "sounds/beep.wav";

/// Application configuration.
///
/// Configuration is loaded from (in order of precedence, highest first):
/// 1. Environment variables (prefixed with `ROLLCALL_`, sections separated by `__`)
/// 2. TOML config file at `~/.config/rollcall/config.toml`
/// 3. Default values
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    /// File locations.
    pub storage: StorageConfig,
    /// Cooldown behaviour.
    pub attendance: AttendanceConfig,
    /// Scan loop behaviour.
    pub scan: ScanConfig,
    /// Session archiving.
    pub session: SessionConfig,
    /// QR image generation.
    pub qr: QrConfig,
}

/// File locations. Unset paths resolve under `data_dir`.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct StorageConfig {
    /// Base directory. Defaults to `~/.local/share/rollcall`.
    pub data_dir: Option<PathBuf>,
    /// Student roster (JSON).
    pub roster_path: Option<PathBuf>,
    /// Directory holding `attendance.csv` and the session archives.
    pub log_dir: Option<PathBuf>,
    /// Credential store (JSON, username to password).
    pub credentials_path: Option<PathBuf>,
    /// Root of the per-class QR image folders.
    pub qr_dir: Option<PathBuf>,
}

/// What to do when the shift log cannot be read during a cooldown check.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum LogErrorPolicy {
    /// Record anyway, as if the student had no prior scan.
    #[default]
    FailOpen,
    /// Refuse the scan until the log is readable again.
    FailClosed,
}

impl std::fmt::Display for LogErrorPolicy {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::FailOpen => write!(f, "fail_open"),
            Self::FailClosed => write!(f, "fail_closed"),
        }
    }
}

/// Cooldown configuration.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct AttendanceConfig {
    /// Seconds a student must wait between two recorded scans.
    pub cooldown_secs: u64,
    /// Policy applied when the shift log is unreadable.
    pub on_log_error: LogErrorPolicy,
}

/// Scan loop configuration.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ScanConfig {
    /// Seconds during which the same decoded string is not resubmitted.
    pub repeat_window_secs: u64,
    /// Play a sound on every accepted scan.
    pub sound_enabled: bool,
    /// Sound file. Defaults to `<data_dir>/sounds/beep.wav`.
    pub sound_path: Option<PathBuf>,
}

/// Session configuration.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SessionConfig {
    /// Archive the session buffer when the menu exits instead of discarding it.
    pub archive_on_exit: bool,
}

/// QR generation configuration.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct QrConfig {
    /// Generate QR images when students are added or imported.
    pub enabled: bool,
    /// Encoder program, invoked as `<program> -o <file> -- <id>`.
    pub program: String,
}

impl Default for AttendanceConfig {
    fn default() -> Self {
        Self {
            cooldown_secs: 300,
            on_log_error: LogErrorPolicy::FailOpen,
        }
    }
}

impl Default for ScanConfig {
    fn default() -> Self {
        Self {
            repeat_window_secs: 3,
            sound_enabled: true,
            sound_path: None,
        }
    }
}

impl Default for QrConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            program: "qrencode".to_string(),
        }
    }
}

impl Config {
    /// Load configuration from all sources.
    ///
    /// # Errors
    ///
    /// Returns an error if configuration loading or parsing fails.
    pub fn load() -> Result<Self> {
        Self::load_from(None)
    }

    /// Load configuration with an optional custom config path.
    ///
    /// # Errors
    ///
    /// Returns an error if configuration loading or parsing fails.
    pub fn load_from(config_path: Option<PathBuf>) -> Result<Self> {
        let config_file = config_path.unwrap_or_else(Self::default_config_path);

        let figment = Figment::new()
            .merge(Serialized::defaults(Config::default()))
            .merge(Toml::file(&config_file))
            .merge(Env::prefixed("ROLLCALL_").split("__"));

        let config: Config = figment.extract()?;
        config.validate()?;
        Ok(config)
    }

    /// Get the default configuration file path.
    #[must_use]
    pub fn default_config_path() -> PathBuf {
        dirs::config_dir()
            .unwrap_or_else(|| PathBuf::from(".config"))
            .join(DATA_DIR_NAME)
            .join(CONFIG_FILE_NAME)
    }

    /// Get the default data directory path.
    #[must_use]
    pub fn default_data_dir() -> PathBuf {
        dirs::data_local_dir()
            .unwrap_or_else(|| PathBuf::from(".local/share"))
            .join(DATA_DIR_NAME)
    }

    /// Validate the configuration.
    ///
    /// # Errors
    ///
    /// Returns an error if any configuration values are invalid.
    pub fn validate(&self) -> Result<()> {
        if self.qr.enabled && self.qr.program.trim().is_empty() {
            return Err(Error::ConfigValidation {
                message: "qr.program must not be empty when qr.enabled is set".to_string(),
            });
        }

        // A week-long cooldown would outlive any shift log.
        if self.attendance.cooldown_secs > 7 * 24 * 60 * 60 {
            return Err(Error::ConfigValidation {
                message: format!(
                    "attendance.cooldown_secs ({}) exceeds one week",
                    self.attendance.cooldown_secs
                ),
            });
        }

        Ok(())
    }

    /// Base data directory, resolving defaults if not set.
    #[must_use]
    pub fn data_dir(&self) -> PathBuf {
        self.storage
            .data_dir
            .clone()
            .unwrap_or_else(Self::default_data_dir)
    }

    /// Roster file path.
    #[must_use]
    pub fn roster_path(&self) -> PathBuf {
        self.storage
            .roster_path
            .clone()
            .unwrap_or_else(|| self.data_dir().join(ROSTER_FILE_NAME))
    }

    /// Directory holding the shift log and archives.
    #[must_use]
    pub fn log_dir(&self) -> PathBuf {
        self.storage
            .log_dir
            .clone()
            .unwrap_or_else(|| self.data_dir().join(LOG_DIR_NAME))
    }

    /// The durable shift log.
    #[must_use]
    pub fn shift_log_path(&self) -> PathBuf {
        self.log_dir().join(crate::archive::SHIFT_LOG_FILE)
    }

    /// Credential store path.
    #[must_use]
    pub fn credentials_path(&self) -> PathBuf {
        self.storage
            .credentials_path
            .clone()
            .unwrap_or_else(|| self.data_dir().join(CREDENTIALS_FILE_NAME))
    }

    /// Root directory for generated QR images.
    #[must_use]
    pub fn qr_dir(&self) -> PathBuf {
        self.storage
            .qr_dir
            .clone()
            .unwrap_or_else(|| self.data_dir().join(QR_DIR_NAME))
    }

    /// Sound played on an accepted scan, if enabled.
    #[must_use]
    pub fn sound_path(&self) -> Option<PathBuf> {
        if !self.scan.sound_enabled {
            return None;
        }
        Some(
            self.scan
                .sound_path
                .clone()
                .unwrap_or_else(|| self.data_dir().join(SOUND_FILE)),
        )
    }

    /// Get the cooldown window as a Duration.
    #[must_use]
    pub fn cooldown(&self) -> Duration {
        Duration::from_secs(self.attendance.cooldown_secs)
    }

    /// Get the repeat suppression window as a Duration.
    #[must_use]
    pub fn repeat_window(&self) -> Duration {
        Duration::from_secs(self.scan.repeat_window_secs)
    }
}
