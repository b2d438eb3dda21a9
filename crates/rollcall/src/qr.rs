//! QR image generation.
//!
//! Each student's QR code encodes nothing but their id. Images are laid out
//! per class: `<qr_dir>/<class>/<id>.png`. The actual encoding is delegated
//! to an external program through the [`QrEncoder`] seam.

use std::fmt::Write as _;
use std::path::{Path, PathBuf};
use std::process::{Command, Stdio};

use tracing::{debug, info, warn};

use crate::error::{Error, Result};
use crate::roster::{Roster, Student};
use crate::storage::ensure_parent_dir;

/// Something that can render a payload as a QR image file.
pub trait QrEncoder: std::fmt::Debug {
    /// Write a QR image encoding `payload` to `output`.
    ///
    /// # Errors
    ///
    /// Returns an error if the image could not be produced.
    fn encode(&self, payload: &str, output: &Path) -> Result<()>;
}

/// Encoder that runs `<program> -o <output> -- <payload>` (`qrencode` by default).
#[derive(Debug, Clone)]
pub struct QrencodeCommand {
    program: String,
}

impl QrencodeCommand {
    /// Create an encoder that invokes `program`.
    #[must_use]
    pub fn new(program: impl Into<String>) -> Self {
        Self {
            program: program.into(),
        }
    }

    /// The program this encoder runs.
    #[must_use]
    pub fn program(&self) -> &str {
        &self.program
    }
}

impl QrEncoder for QrencodeCommand {
    fn encode(&self, payload: &str, output: &Path) -> Result<()> {
        ensure_parent_dir(output).map_err(|source| Error::DirectoryCreate {
            path: output.parent().map(Path::to_path_buf).unwrap_or_default(),
            source,
        })?;

        let result = Command::new(&self.program)
            .arg("-o")
            .arg(output)
            .arg("--")
            .arg(payload)
            .stdin(Stdio::null())
            .output()
            .map_err(|e| Error::qr_encode(payload, format!("{}: {e}", self.program)))?;

        if !result.status.success() {
            let stderr = String::from_utf8_lossy(&result.stderr);
            return Err(Error::qr_encode(
                payload,
                format!("{} exited with {}: {}", self.program, result.status, stderr.trim()),
            ));
        }

        debug!("Wrote QR image {}", output.display());
        Ok(())
    }
}

/// Where the QR image for `student` lives.
#[must_use]
pub fn image_path(qr_dir: &Path, student: &Student) -> PathBuf {
    qr_dir
        .join(path_segment(&student.class_name))
        .join(format!("{}.png", path_segment(&student.id)))
}

/// Generate the QR image for one student.
///
/// # Errors
///
/// Returns the encoder's error.
pub fn generate(encoder: &dyn QrEncoder, qr_dir: &Path, student: &Student) -> Result<PathBuf> {
    let path = image_path(qr_dir, student);
    encoder.encode(&student.id, &path)?;
    Ok(path)
}

/// Outcome of regenerating every image in a roster.
#[derive(Debug, Default)]
pub struct QrSummary {
    /// Images written.
    pub written: usize,
    /// Students whose image failed, with the reason.
    pub failed: Vec<(String, Error)>,
}

/// Generate (or refresh) QR images for every student, grouped by class.
///
/// A failure for one student does not stop the others.
pub fn generate_all(encoder: &dyn QrEncoder, qr_dir: &Path, roster: &Roster) -> QrSummary {
    let mut summary = QrSummary::default();
    for (class, students) in roster.by_class() {
        debug!("Generating {} QR images for class {}", students.len(), class);
        for student in students {
            match generate(encoder, qr_dir, student) {
                Ok(_) => summary.written += 1,
                Err(err) => {
                    warn!("QR generation failed for {}: {}", student.id, err);
                    summary.failed.push((student.id.clone(), err));
                }
            }
        }
    }
    info!(
        "Generated {} QR images ({} failed) under {}",
        summary.written,
        summary.failed.len(),
        qr_dir.display()
    );
    summary
}

/// Turn an id or class into a single safe path component.
///
/// Characters outside `[A-Za-z0-9 ._-]` (and non-ASCII letters) are
/// percent-encoded byte by byte, `%` included, so distinct inputs never
/// share a file.
fn path_segment(raw: &str) -> String {
    match raw {
        "" => return "%".to_string(),
        "." => return "%2E".to_string(),
        ".." => return "%2E%2E".to_string(),
        _ => {}
    }
    let mut encoded = String::with_capacity(raw.len());
    for c in raw.chars() {
        if c.is_alphanumeric() || matches!(c, '-' | '_' | '.' | ' ') {
            encoded.push(c);
        } else {
            let mut buf = [0u8; 4];
            for byte in c.encode_utf8(&mut buf).bytes() {
                let _ = write!(encoded, "%{byte:02X}");
            }
        }
    }
    encoded
}
