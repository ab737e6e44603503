//! Backend configuration: a single `directory` option, loaded with
//! `serde` + `toml` the way the host configures every other subsystem.

use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use crate::error::LdapCode;

/// On-disk configuration for one database instance.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Config {
    /// Base directory this database mirrors its suffix's subtree under.
    pub directory: PathBuf,
}

impl Config {
    /// Parse a TOML document, e.g. the contents of an `olcDbDirectory`-style
    /// config fragment.
    pub fn from_toml(text: &str) -> Result<Self, LdapCode> {
        toml::from_str(text).map_err(|e| LdapCode::Other(format!("invalid config: {e}")))
    }

    pub fn to_toml(&self) -> Result<String, LdapCode> {
        toml::to_string_pretty(self).map_err(|e| LdapCode::Other(format!("cannot serialize config: {e}")))
    }

    /// Validate at `db_open` time: the directory must be non-empty and
    /// either already be a directory or be creatable as one, mirroring
    /// `slapd`'s willingness to create a fresh suffix directory on first
    /// start. Anything else is `UnwillingToPerform`.
    pub fn validate(&self) -> Result<(), LdapCode> {
        if self.directory.as_os_str().is_empty() {
            return Err(LdapCode::UnwillingToPerform);
        }
        match std::fs::metadata(&self.directory) {
            Ok(meta) if meta.is_dir() => Ok(()),
            Ok(_) => Err(LdapCode::UnwillingToPerform),
            Err(err) if err.kind() == std::io::ErrorKind::NotFound => {
                std::fs::create_dir_all(&self.directory).map_err(|_| LdapCode::UnwillingToPerform)
            }
            Err(_) => Err(LdapCode::UnwillingToPerform),
        }
    }

    pub fn directory(&self) -> &Path {
        &self.directory
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn round_trips_through_toml() {
        let cfg = Config { directory: PathBuf::from("/tmp/db") };
        let text = cfg.to_toml().unwrap();
        let parsed = Config::from_toml(&text).unwrap();
        assert_eq!(parsed.directory, cfg.directory);
    }

    #[test]
    fn validate_rejects_empty_directory() {
        let cfg = Config { directory: PathBuf::new() };
        assert!(matches!(cfg.validate(), Err(LdapCode::UnwillingToPerform)));
    }

    #[test]
    fn validate_rejects_when_creation_is_impossible() {
        // `not-a-dir` is a plain file, so a path nested under it can never
        // be created as a directory regardless of permissions.
        let dir = tempfile::tempdir().unwrap();
        let file_path = dir.path().join("not-a-dir");
        std::fs::write(&file_path, b"x").unwrap();
        let cfg = Config { directory: file_path.join("nested") };
        assert!(matches!(cfg.validate(), Err(LdapCode::UnwillingToPerform)));
    }

    #[test]
    fn validate_creates_missing_directory() {
        let dir = tempfile::tempdir().unwrap();
        let target = dir.path().join("fresh-suffix-dir");
        let cfg = Config { directory: target.clone() };
        assert!(cfg.validate().is_ok());
        assert!(target.is_dir());
    }

    #[test]
    fn validate_accepts_existing_directory() {
        let dir = tempfile::tempdir().unwrap();
        let cfg = Config { directory: dir.path().to_path_buf() };
        assert!(cfg.validate().is_ok());
    }

    #[test]
    fn validate_rejects_path_that_is_a_file() {
        let dir = tempfile::tempdir().unwrap();
        let file_path = dir.path().join("not-a-dir");
        std::fs::write(&file_path, b"x").unwrap();
        let cfg = Config { directory: file_path };
        assert!(cfg.validate().is_err());
    }
}
