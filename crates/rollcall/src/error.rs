//! Error types for rollcall.
//!
//! This module defines all error types used throughout the rollcall crate,
//! providing detailed context for debugging and operator-facing messages.

use std::path::PathBuf;
use thiserror::Error;

/// The main error type for rollcall operations.
#[derive(Error, Debug)]
pub enum Error {
    // === Storage Errors ===
    /// Reading a roster, log or archive file failed for a reason other than
    /// the file being absent.
    #[error("failed to read {path}: {source}")]
    StorageRead {
        /// Path of the file.
        path: PathBuf,
        /// The underlying error.
        #[source]
        source: std::io::Error,
    },

    /// Writing a roster, log or archive file failed.
    #[error("failed to write {path}: {source}")]
    StorageWrite {
        /// Path of the file.
        path: PathBuf,
        /// The underlying error.
        #[source]
        source: std::io::Error,
    },

    /// Failed to create a required directory.
    #[error("failed to create directory {path}: {source}")]
    DirectoryCreate {
        /// Path that couldn't be created.
        path: PathBuf,
        /// The underlying error.
        #[source]
        source: std::io::Error,
    },

    /// The roster file exists but is not a JSON object of students.
    #[error("roster file {path} is not valid: {source}")]
    RosterParse {
        /// Path of the roster file.
        path: PathBuf,
        /// The underlying error.
        #[source]
        source: serde_json::Error,
    },

    // === Attendance Errors ===
    /// The durable log could not be read and the cooldown policy refuses to
    /// record without it.
    #[error("cannot verify cooldown for '{student_id}': {reason}")]
    CooldownUnverifiable {
        /// Student whose scan was refused.
        student_id: String,
        /// Why the log could not be read.
        reason: String,
    },

    /// An archive selector did not match any saved session.
    #[error("no saved session matches '{selector}'")]
    ArchiveNotFound {
        /// The index or file name that was requested.
        selector: String,
    },

    // === Credential Errors ===
    /// The credential store is required at startup and is missing.
    #[error("credential store not found at {path}")]
    CredentialsMissing {
        /// Expected location of the store.
        path: PathBuf,
    },

    /// Username/password did not match the credential store.
    #[error("login failed for user '{username}'")]
    LoginFailed {
        /// The username that was tried.
        username: String,
    },

    // === External Collaborators ===
    /// The QR encoder could not produce an image.
    #[error("failed to encode QR for '{student_id}': {message}")]
    QrEncode {
        /// Student whose code was being generated.
        student_id: String,
        /// Description of what went wrong.
        message: String,
    },

    // === Configuration Errors ===
    /// Failed to load configuration.
    #[error("failed to load configuration: {0}")]
    ConfigLoad(Box<figment::Error>),

    /// Configuration validation failed.
    #[error("invalid configuration: {message}")]
    ConfigValidation {
        /// Description of the validation failure.
        message: String,
    },

    // === I/O and Serialization Errors ===
    /// File system or terminal operation failed.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// JSON serialization/deserialization failed.
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    // === Generic Errors ===
    /// An internal error occurred (bug).
    #[error("internal error: {0}")]
    Internal(String),
}

/// A specialized Result type for rollcall operations.
pub type Result<T> = std::result::Result<T, Error>;

impl From<figment::Error> for Error {
    fn from(err: figment::Error) -> Self {
        Self::ConfigLoad(Box::new(err))
    }
}

impl Error {
    /// Create a storage write error for `path`.
    #[must_use]
    pub fn storage_write(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        Self::StorageWrite {
            path: path.into(),
            source,
        }
    }

    /// Create a storage read error for `path`.
    #[must_use]
    pub fn storage_read(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        Self::StorageRead {
            path: path.into(),
            source,
        }
    }

    /// Create a QR encoding error.
    #[must_use]
    pub fn qr_encode(student_id: impl Into<String>, message: impl Into<String>) -> Self {
        Self::QrEncode {
            student_id: student_id.into(),
            message: message.into(),
        }
    }

    /// Create a new internal error.
    #[must_use]
    pub fn internal(message: impl Into<String>) -> Self {
        Self::Internal(message.into())
    }

    /// Check if this error is a failed write, which leaves in-memory state
    /// untouched so the operation can be retried.
    #[must_use]
    pub fn is_storage_write(&self) -> bool {
        matches!(self, Self::StorageWrite { .. })
    }

    /// Check if this error comes from a login attempt.
    #[must_use]
    pub fn is_login_failure(&self) -> bool {
        matches!(self, Self::LoginFailed { .. })
    }
}
