//! Deriving an entry's companion subtree directory from its file path,
//! and back.
//!
//! Operates purely on byte-length accounting, never by re-encoding a DN:
//! the codec is one-way, and enumeration must not try to parse a
//! filename back into a DN.

use std::path::{Path, PathBuf};

const SUFFIX: &str = ".ldif";

/// Strip the trailing `.ldif` from an entry-file path to obtain the
/// companion directory path that would hold its children.
pub fn dir_of(entry_path: &Path) -> PathBuf {
    let s = entry_path.as_os_str().to_string_lossy();
    debug_assert!(s.ends_with(SUFFIX), "dir_of called on a non-.ldif path: {s}");
    PathBuf::from(s.trim_end_matches(SUFFIX))
}

/// The inverse of [`dir_of`]: reappend `.ldif` to a subtree directory path.
pub fn ldif_of(dir_path: &Path) -> PathBuf {
    let mut s = dir_path.as_os_str().to_os_string();
    s.push(SUFFIX);
    PathBuf::from(s)
}
