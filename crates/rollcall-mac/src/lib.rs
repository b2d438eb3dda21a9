//! macOS-specific implementation for rollcall.
//!
//! This crate provides the macOS audio cue used when an attendance scan is
//! accepted. Playback goes through the system `afplay` utility.

#![cfg(target_os = "macos")]
#![warn(missing_docs)]
#![warn(missing_debug_implementations)]
#![deny(unsafe_code)]

use std::path::{Path, PathBuf};
use std::process::{Command, Stdio};

use thiserror::Error;

/// Program used to play audio files.
pub const PLAYER: &str = "afplay";

/// Errors that can occur while starting playback.
#[derive(Debug, Error)]
pub enum SoundError {
    /// The sound file does not exist.
    #[error("sound file not found: {0}")]
    MissingFile(PathBuf),

    /// The player process could not be spawned.
    #[error("failed to start {player}: {source}")]
    Spawn {
        /// Name of the player program.
        player: &'static str,
        /// The underlying error.
        #[source]
        source: std::io::Error,
    },
}

/// Initialize macOS-specific components.
///
/// # Errors
///
/// Returns an error if initialization fails.
pub fn init() -> Result<(), Box<dyn std::error::Error>> {
    tracing::info!("Initializing macOS platform components");
    Ok(())
}

/// Get the platform name.
#[must_use]
pub fn platform_name() -> &'static str {
    "macOS"
}

/// Start playing an audio file without waiting for it to finish.
///
/// # Errors
///
/// Returns an error if the file is missing or `afplay` cannot be started.
pub fn play_sound(path: &Path) -> Result<(), SoundError> {
    if !path.is_file() {
        return Err(SoundError::MissingFile(path.to_path_buf()));
    }

    let mut child = Command::new(PLAYER)
        .arg(path)
        .stdin(Stdio::null())
        .stdout(Stdio::null())
        .stderr(Stdio::null())
        .spawn()
        .map_err(|source| SoundError::Spawn {
            player: PLAYER,
            source,
        })?;

    std::thread::spawn(move || {
        let _ = child.wait();
    });
    Ok(())
}
