//! Student roster.
//!
//! The roster maps a student id (the payload of their QR code) to a display
//! name and a class. On disk it is a JSON object keyed by id. Two value
//! shapes are accepted when reading:
//!
//! ```json
//! { "001": "Ani", "002": { "nama": "Budi", "kelas": "kelas_a" } }
//! ```
//!
//! Both are normalized at load time into [`Student`]; nothing past
//! [`Roster::load`] ever looks at the raw shape. Saving always writes the
//! object form with `name` and `class` keys.

use std::collections::BTreeMap;
use std::fs;
use std::io;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use tracing::{debug, info, warn};

use crate::error::{Error, Result};
use crate::storage::{ensure_parent_dir, remove_if_exists};

/// Class assigned when none is given.
pub const DEFAULT_CLASS: &str = "umum";

/// Name shown for ids that are not (or no longer) on the roster.
pub const UNKNOWN_NAME: &str = "Unknown";

const NAME_KEYS: &[&str] = &["nama", "name"];
const CLASS_KEYS: &[&str] = &["kelas", "class"];

/// A student on the roster.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Student {
    /// Identifier encoded in the student's QR code. Stored as the map key.
    #[serde(skip)]
    pub id: String,
    /// Display name.
    pub name: String,
    /// Class the student belongs to.
    #[serde(rename = "class")]
    pub class_name: String,
}

impl Student {
    /// Create a student. A blank name falls back to the id and a blank class
    /// to [`DEFAULT_CLASS`].
    #[must_use]
    pub fn new(
        id: impl Into<String>,
        name: impl Into<String>,
        class_name: impl Into<String>,
    ) -> Self {
        let id = id.into();
        let name = name.into();
        let class_name = class_name.into();

        let name = if name.trim().is_empty() {
            id.clone()
        } else {
            name
        };
        let class_name = match class_name.trim() {
            "" => DEFAULT_CLASS.to_string(),
            class => class.to_string(),
        };
        Self {
            id,
            name,
            class_name,
        }
    }
}

/// The shapes a roster value can take on disk.
#[derive(Debug, Deserialize)]
#[serde(untagged)]
enum StoredStudent {
    /// Legacy form: the value is the display name.
    Name(String),
    /// Object form, with `nama`/`name` and `kelas`/`class`.
    Fields(Map<String, Value>),
    /// Anything else (numbers, null, arrays).
    Other(Value),
}

impl StoredStudent {
    fn normalize(self, id: &str) -> Student {
        match self {
            Self::Name(name) => Student::new(id, name, DEFAULT_CLASS),
            Self::Fields(fields) => Student::new(
                id,
                first_text(&fields, NAME_KEYS).unwrap_or_default(),
                first_text(&fields, CLASS_KEYS).unwrap_or_default(),
            ),
            Self::Other(value) => Student::new(id, scalar_text(&value).unwrap_or_default(), ""),
        }
    }
}

/// First non-blank value among `keys`, in order.
fn first_text(fields: &Map<String, Value>, keys: &[&str]) -> Option<String> {
    keys.iter()
        .filter_map(|key| fields.get(*key).and_then(scalar_text))
        .find(|text| !text.trim().is_empty())
}

fn scalar_text(value: &Value) -> Option<String> {
    match value {
        Value::String(s) => Some(s.clone()),
        Value::Number(n) => Some(n.to_string()),
        Value::Bool(b) => Some(b.to_string()),
        _ => None,
    }
}

/// Parse roster JSON into normalized students.
fn parse_students(text: &str) -> serde_json::Result<BTreeMap<String, Student>> {
    let raw: BTreeMap<String, StoredStudent> = serde_json::from_str(text)?;
    Ok(raw
        .into_iter()
        .map(|(id, stored)| {
            let student = stored.normalize(&id);
            (id, student)
        })
        .collect())
}

/// The student directory, backed by a JSON file.
#[derive(Debug, Clone)]
pub struct Roster {
    path: PathBuf,
    students: BTreeMap<String, Student>,
}

impl Roster {
    /// Load the roster at `path`. A missing file is an empty roster.
    ///
    /// # Errors
    ///
    /// Returns an error if the file exists but cannot be read or is not a
    /// JSON object.
    pub fn load(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref().to_path_buf();
        let students = match read_students(&path)? {
            Some(students) => students,
            None => {
                debug!("No roster at {}, starting empty", path.display());
                BTreeMap::new()
            }
        };
        debug!("Loaded {} students from {}", students.len(), path.display());
        Ok(Self { path, students })
    }

    /// Path of the backing file.
    #[must_use]
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Write the roster in normalized form.
    ///
    /// # Errors
    ///
    /// Returns a storage error if the file cannot be written.
    pub fn save(&self) -> Result<()> {
        self.persist(&self.students)
    }

    /// Add or replace a student and persist. Returns the previous entry.
    ///
    /// The in-memory roster only changes once the file is written.
    ///
    /// # Errors
    ///
    /// Returns a storage error if the roster cannot be saved.
    pub fn add(&mut self, student: Student) -> Result<Option<Student>> {
        let mut next = self.students.clone();
        let previous = next.insert(student.id.clone(), student.clone());
        self.persist(&next)?;
        self.students = next;

        info!(
            "{} student {} ({}) in {}",
            if previous.is_some() { "Updated" } else { "Added" },
            student.id,
            student.name,
            student.class_name
        );
        Ok(previous)
    }

    /// Remove a student, persist, and delete their QR image under `qr_dir`.
    ///
    /// Returns `None` if the id was not on the roster. A missing image is
    /// not an error; other failures deleting it are logged.
    ///
    /// # Errors
    ///
    /// Returns a storage error if the roster cannot be saved.
    pub fn remove(&mut self, id: &str, qr_dir: &Path) -> Result<Option<Student>> {
        if !self.students.contains_key(id) {
            return Ok(None);
        }
        let mut next = self.students.clone();
        let removed = next.remove(id);
        self.persist(&next)?;
        self.students = next;

        if let Some(student) = &removed {
            let image = crate::qr::image_path(qr_dir, student);
            match remove_if_exists(&image) {
                Ok(true) => debug!("Deleted QR image {}", image.display()),
                Ok(false) => {}
                Err(err) => warn!("Could not delete QR image {}: {}", image.display(), err),
            }
            info!("Removed student {} ({})", student.id, student.name);
        }
        Ok(removed)
    }

    /// Merge another roster file (either shape) into this one and persist.
    /// Returns the number of entries merged.
    ///
    /// # Errors
    ///
    /// Returns an error if `source` is missing or invalid, or the merged
    /// roster cannot be saved.
    pub fn import(&mut self, source: &Path) -> Result<usize> {
        let incoming = read_students(source)?.ok_or_else(|| {
            Error::storage_read(
                source,
                io::Error::new(io::ErrorKind::NotFound, "import file not found"),
            )
        })?;

        let count = incoming.len();
        let mut next = self.students.clone();
        next.extend(incoming);
        self.persist(&next)?;
        self.students = next;

        info!("Imported {} students from {}", count, source.display());
        Ok(count)
    }

    /// Look up a student.
    #[must_use]
    pub fn get(&self, id: &str) -> Option<&Student> {
        self.students.get(id)
    }

    /// Check whether an id is on the roster.
    #[must_use]
    pub fn contains(&self, id: &str) -> bool {
        self.students.contains_key(id)
    }

    /// Display name for `id`, or [`UNKNOWN_NAME`].
    #[must_use]
    pub fn name_of(&self, id: &str) -> &str {
        self.students.get(id).map_or(UNKNOWN_NAME, |s| s.name.as_str())
    }

    /// Class for `id`, or [`DEFAULT_CLASS`].
    #[must_use]
    pub fn class_of(&self, id: &str) -> &str {
        self.students
            .get(id)
            .map_or(DEFAULT_CLASS, |s| s.class_name.as_str())
    }

    /// Students ordered by id.
    pub fn iter(&self) -> impl Iterator<Item = &Student> {
        self.students.values()
    }

    /// Students grouped by class, each group ordered by id.
    #[must_use]
    pub fn by_class(&self) -> BTreeMap<&str, Vec<&Student>> {
        let mut groups: BTreeMap<&str, Vec<&Student>> = BTreeMap::new();
        for student in self.students.values() {
            groups
                .entry(student.class_name.as_str())
                .or_default()
                .push(student);
        }
        groups
    }

    /// Number of students.
    #[must_use]
    pub fn len(&self) -> usize {
        self.students.len()
    }

    /// Check if the roster is empty.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.students.is_empty()
    }

    fn persist(&self, students: &BTreeMap<String, Student>) -> Result<()> {
        let json = serde_json::to_string_pretty(students)?;
        ensure_parent_dir(&self.path).map_err(|e| Error::storage_write(&self.path, e))?;
        fs::write(&self.path, json + "\n").map_err(|e| Error::storage_write(&self.path, e))?;
        debug!("Saved {} students to {}", students.len(), self.path.display());
        Ok(())
    }
}

/// Read and normalize a roster file. `Ok(None)` if it does not exist.
fn read_students(path: &Path) -> Result<Option<BTreeMap<String, Student>>> {
    let text = match fs::read_to_string(path) {
        Ok(text) => text,
        Err(err) if err.kind() == io::ErrorKind::NotFound => return Ok(None),
        Err(err) => return Err(Error::storage_read(path, err)),
    };
    if text.trim().is_empty() {
        return Ok(Some(BTreeMap::new()));
    }
    parse_students(&text)
        .map(Some)
        .map_err(|source| Error::RosterParse {
            path: path.to_path_buf(),
            source,
        })
}
