//! Operator login.
//!
//! A flat JSON object of username to password, checked once at startup.

use std::collections::HashMap;
use std::fs;
use std::io::{self, BufRead, Write};
use std::path::{Path, PathBuf};

use tracing::{debug, info};

use crate::error::{Error, Result};

/// The credential store.
#[derive(Debug, Clone)]
pub struct CredentialStore {
    path: PathBuf,
    users: HashMap<String, String>,
}

impl CredentialStore {
    /// Load the store at `path`.
    ///
    /// # Errors
    ///
    /// Returns [`Error::CredentialsMissing`] if the file does not exist, or a
    /// read/parse error if it cannot be used.
    pub fn load(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref().to_path_buf();
        let text = match fs::read_to_string(&path) {
            Ok(text) => text,
            Err(err) if err.kind() == io::ErrorKind::NotFound => {
                return Err(Error::CredentialsMissing { path });
            }
            Err(err) => return Err(Error::storage_read(path, err)),
        };
        let users: HashMap<String, String> = serde_json::from_str(&text)?;
        debug!("Loaded {} operator accounts from {}", users.len(), path.display());
        Ok(Self { path, users })
    }

    /// Path the store was loaded from.
    #[must_use]
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Check a username/password pair.
    #[must_use]
    pub fn verify(&self, username: &str, password: &str) -> bool {
        self.users
            .get(username)
            .is_some_and(|expected| expected == password)
    }

    /// Prompt for any missing part of the credentials on `output`, read the
    /// answers from `input`, and verify them.
    ///
    /// # Errors
    ///
    /// Returns [`Error::LoginFailed`] on a mismatch, or an I/O error if the
    /// terminal cannot be read.
    pub fn login<R: BufRead, W: Write>(
        &self,
        username: Option<&str>,
        input: &mut R,
        output: &mut W,
    ) -> Result<String> {
        let username = match username {
            Some(name) => name.to_string(),
            None => prompt(input, output, "Username: ")?,
        };
        let password = prompt(input, output, "Password: ")?;

        if self.verify(&username, &password) {
            info!("Operator {} logged in", username);
            Ok(username)
        } else {
            Err(Error::LoginFailed { username })
        }
    }
}

/// Print `label`, then read one trimmed line.
fn prompt<R: BufRead, W: Write>(
    input: &mut R,
    output: &mut W,
    label: &str,
) -> Result<String> {
    write!(output, "{label}")?;
    output.flush()?;
    let mut line = String::new();
    input.read_line(&mut line)?;
    Ok(line.trim().to_string())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_support::scratch_dir;
    use std::io::Cursor;

    fn store(name: &str) -> CredentialStore {
        let dir = scratch_dir(name);
        let path = dir.join("users.json");
        fs::write(&path, r#"{"admin": "rahasia", "guru": "1234"}"#).unwrap();
        CredentialStore::load(&path).unwrap()
    }

    #[test]
    fn test_missing_store_is_error() {
        let dir = scratch_dir("credentials_missing");
        let err = CredentialStore::load(dir.join("users.json")).unwrap_err();
        assert!(matches!(err, Error::CredentialsMissing { .. }));
    }

    #[test]
    fn test_invalid_store_is_error() {
        let dir = scratch_dir("credentials_invalid");
        let path = dir.join("users.json");
        fs::write(&path, "not json").unwrap();
        assert!(matches!(
            CredentialStore::load(&path).unwrap_err(),
            Error::Json(_)
        ));
    }

    #[test]
    fn test_verify() {
        let store = store("credentials_verify");
        assert!(store.verify("admin", "rahasia"));
        assert!(!store.verify("admin", "1234"));
        assert!(!store.verify("nobody", "rahasia"));
    }

    #[test]
    fn test_login_prompts_for_both() {
        let store = store("credentials_login");
        let mut input = Cursor::new("guru\n1234\n");
        let mut output = Vec::new();

        let user = store.login(None, &mut input, &mut output).unwrap();
        assert_eq!(user, "guru");
        let shown = String::from_utf8(output).unwrap();
        assert!(shown.contains("Username: "));
        assert!(shown.contains("Password: "));
    }

    #[test]
    fn test_login_with_given_username() {
        let store = store("credentials_login_user");
        let mut input = Cursor::new("rahasia\n");
        let mut output = Vec::new();

        assert_eq!(
            store.login(Some("admin"), &mut input, &mut output).unwrap(),
            "admin"
        );
        assert!(!String::from_utf8(output).unwrap().contains("Username"));
    }

    #[test]
    fn test_login_failure() {
        let store = store("credentials_login_fail");
        let mut input = Cursor::new("admin\nwrong\n");
        let err = store.login(None, &mut input, &mut Vec::new()).unwrap_err();
        assert!(err.is_login_failure());
    }
}
