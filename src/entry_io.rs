//! Reading and atomically replacing entry files.

use std::fs::{self, File, OpenOptions};
use std::io::{self, Read, Write};
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Mutex, OnceLock};

use crate::dn::Dn;
use crate::entry::{Entry, EntrySerializer};
use crate::error::LdapCode;

/// Outcome of a file-level read/stat, narrower than [`LdapCode`] because
/// callers map `NotFound` differently depending on which handler is
/// asking.
#[derive(Debug)]
pub enum IoOutcome {
    NotFound,
    Other(String),
}

impl From<io::Error> for IoOutcome {
    fn from(err: io::Error) -> Self {
        if err.kind() == io::ErrorKind::NotFound {
            IoOutcome::NotFound
        } else {
            IoOutcome::Other(err.to_string())
        }
    }
}

impl IoOutcome {
    /// Most handlers treat a missing file as `NoSuchObject`; the few that
    /// don't (parent-existence probing in `add`, referral-check ancestor
    /// walks) match on [`IoOutcome`] directly instead of calling this.
    pub fn into_ldap_code(self) -> LdapCode {
        match self {
            IoOutcome::NotFound => LdapCode::NoSuchObject,
            IoOutcome::Other(msg) => LdapCode::Other(msg),
        }
    }
}

/// Read an entry file's complete bytes.
///
/// `std::fs::File`'s Unix read implementation already retries
/// `ErrorKind::Interrupted`, so the short-read/EINTR loop is handled by
/// the standard library; what this adds is an "unexpectedly growing
/// file" check: a read that returns more bytes than the pre-read `stat`
/// reported is reported as `Other` rather than silently accepted.
pub fn read_entry_file(path: &Path) -> Result<Vec<u8>, IoOutcome> {
    let mut file = File::open(path)?;
    let expected_len = file.metadata()?.len();
    let mut buf = Vec::with_capacity(expected_len as usize);
    file.read_to_end(&mut buf)?;
    if buf.len() as u64 > expected_len {
        return Err(IoOutcome::Other(format!(
            "entry file grew during read: expected {expected_len} bytes, read {}",
            buf.len()
        )));
    }
    Ok(buf)
}

/// Read and parse an entry file, reconstructing its full DN from
/// `parent_dn`. Shared by the enumerator and the operation handlers so
/// both apply the same "stored DN is relative to parent" convention.
pub fn load_entry(path: &Path, serializer: &dyn EntrySerializer, parent_dn: &Dn) -> Result<Entry, LdapCode> {
    let bytes = read_entry_file(path).map_err(|e| e.into_ldap_code())?;
    let mut entry = serializer.parse(&bytes)?;
    entry.reconstruct_dn(parent_dn);
    Ok(entry)
}

/// Stat-only existence check.
pub fn entry_file_exists(path: &Path) -> Result<bool, IoOutcome> {
    match fs::symlink_metadata(path) {
        Ok(_) => Ok(true),
        Err(err) if err.kind() == io::ErrorKind::NotFound => Ok(false),
        Err(err) => Err(err.into()),
    }
}

/// The process-wide serializer mutex: guards calls into a serializer that
/// may use shared internal buffers. A serializer known to be reentrant
/// can bypass this.
fn serializer_lock() -> &'static Mutex<()> {
    static LOCK: OnceLock<Mutex<()>> = OnceLock::new();
    LOCK.get_or_init(|| Mutex::new(()))
}

fn unique_temp_path(path: &Path) -> PathBuf {
    static COUNTER: AtomicU64 = AtomicU64::new(0);
    let n = COUNTER.fetch_add(1, Ordering::Relaxed);
    let file_name = path.file_name().and_then(|n| n.to_str()).unwrap_or("entry");
    let parent = path.parent().unwrap_or_else(|| Path::new("."));
    parent.join(format!(".{file_name}.tmp.{}.{n}", std::process::id()))
}

/// Atomically replace an entry file's contents: write a same-directory
/// temp file, then rename over the target.
///
/// `entry` must already carry whatever DN belongs on disk: a full
/// entry's DN relative to its parent directory, computed via
/// [`Entry::relative_to`]. This function does not narrow the DN itself,
/// since the suffix root entry's on-disk DN is not a single leaf RDN.
pub fn write_entry_file(
    path: &Path,
    serializer: &dyn EntrySerializer,
    entry: &Entry,
) -> Result<(), LdapCode> {
    let temp_path = unique_temp_path(path);

    let mut temp_file = match OpenOptions::new().write(true).create_new(true).open(&temp_path) {
        Ok(file) => file,
        Err(err) if err.kind() == io::ErrorKind::NotFound => {
            return Err(LdapCode::NoSuchObject)
        }
        Err(err) => return Err(LdapCode::Other(err.to_string())),
    };

    let result = (|| -> Result<(), LdapCode> {
        let bytes = {
            let _guard = serializer_lock().lock().unwrap_or_else(|p| p.into_inner());
            serializer.serialize(entry)
        };
        temp_file.write_all(&bytes).map_err(|e| LdapCode::Other(e.to_string()))?;
        temp_file.sync_all().map_err(|e| LdapCode::Other(format!("close/sync failed: {e}")))?;
        Ok(())
    })();

    drop(temp_file);

    match result {
        Ok(()) => match fs::rename(&temp_path, path) {
            Ok(()) => Ok(()),
            Err(err) => {
                let _ = fs::remove_file(&temp_path);
                if err.kind() == io::ErrorKind::NotFound {
                    Err(LdapCode::NoSuchObject)
                } else {
                    Err(LdapCode::Other(err.to_string()))
                }
            }
        },
        Err(e) => {
            let _ = fs::remove_file(&temp_path);
            Err(e)
        }
    }
}
