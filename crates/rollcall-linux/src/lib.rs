//! Linux-specific implementation for rollcall
//!
//! This crate provides the Linux audio cue used when an attendance scan is
//! accepted. Playback goes through ALSA's `aplay`.

#![cfg(target_os = "linux")]
#![warn(missing_debug_implementations)]
#![deny(unsafe_code)]

use std::path::{Path, PathBuf};
use std::process::{Command, Stdio};

use thiserror::Error;

/// Program used to play WAV files.
pub const PLAYER: &str = "aplay";

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

/// Initialize Linux-specific components
///
/// # Errors
///
/// Returns an error if initialization fails
pub fn init() -> Result<(), Box<dyn std::error::Error>> {
    tracing::debug!("Initializing Linux platform components");
    Ok(())
}

/// Get platform name
#[must_use]
pub fn platform_name() -> &'static str {
    "Linux"
}

/// Start playing a WAV file without waiting for it to finish.
///
/// The child is reaped on a detached thread so repeated cues don't leave
/// zombie processes behind.
///
/// # Errors
///
/// Returns an error if the file is missing or `aplay` cannot be started.
pub fn play_sound(path: &Path) -> Result<(), SoundError> {
    if !path.is_file() {
        return Err(SoundError::MissingFile(path.to_path_buf()));
    }

    let mut child = Command::new(PLAYER)
        .arg("-q")
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

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_init() {
        assert!(init().is_ok());
    }

    #[test]
    fn test_platform_name() {
        assert_eq!(platform_name(), "Linux");
    }

    #[test]
    fn test_play_sound_missing_file() {
        let result = play_sound(Path::new("/nonexistent/rollcall/beep.wav"));
        assert!(matches!(result, Err(SoundError::MissingFile(_))));
    }

    #[test]
    fn test_sound_error_display() {
        let err = SoundError::MissingFile(PathBuf::from("/tmp/beep.wav"));
        assert!(err.to_string().contains("/tmp/beep.wav"));
    }
}
