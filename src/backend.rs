//! Backend lifecycle (`db_init`, `db_open`, `db_destroy`) and the
//! [`Stats`] counters around it.

use std::path::PathBuf;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::RwLock;

use tracing::{info, warn};

use crate::config::Config;
use crate::concurrency::ConcurrencyGate;
use crate::dn::Dn;
use crate::entry::EntrySerializer;
use crate::error::LdapCode;

/// Operation counters a host can expose through its own monitoring
/// surface. Deliberately coarse, not a metrics subsystem, just
/// enough for a smoke-test dashboard.
#[derive(Debug, Default)]
pub struct Stats {
    pub searches: AtomicU64,
    pub adds: AtomicU64,
    pub modifies: AtomicU64,
    pub modrdns: AtomicU64,
    pub deletes: AtomicU64,
    pub binds: AtomicU64,
}

#[derive(Debug, Clone, Copy, Default)]
pub struct StatsSnapshot {
    pub searches: u64,
    pub adds: u64,
    pub modifies: u64,
    pub modrdns: u64,
    pub deletes: u64,
    pub binds: u64,
}

impl Stats {
    fn snapshot(&self) -> StatsSnapshot {
        StatsSnapshot {
            searches: self.searches.load(Ordering::Relaxed),
            adds: self.adds.load(Ordering::Relaxed),
            modifies: self.modifies.load(Ordering::Relaxed),
            modrdns: self.modrdns.load(Ordering::Relaxed),
            deletes: self.deletes.load(Ordering::Relaxed),
            binds: self.binds.load(Ordering::Relaxed),
        }
    }
}

/// One open database: the suffix it's responsible for, the directory it
/// mirrors that subtree under, its entry serializer, and the concurrency
/// gate every handler in [`crate::handlers`] acquires before touching disk.
pub struct Backend {
    suffix: Dn,
    serializer: Box<dyn EntrySerializer>,
    directory: RwLock<Option<PathBuf>>,
    pub(crate) gate: ConcurrencyGate,
    pub stats: Stats,
    /// Whether this database supports the Increment modification primitive,
    /// referral-aware search, and single-suffix-per-database placement.
    /// Fixed `true` for this implementation; exposed so a host's
    /// capability negotiation can still ask.
    capabilities: Capabilities,
}

#[derive(Debug, Clone, Copy)]
pub struct Capabilities {
    pub supports_increment: bool,
    pub supports_referrals: bool,
    pub single_suffix_per_database: bool,
}

impl Default for Capabilities {
    fn default() -> Self {
        Self { supports_increment: true, supports_referrals: true, single_suffix_per_database: true }
    }
}

impl Backend {
    /// Allocate backend state for `suffix`, not yet bound to a directory.
    pub fn db_init(suffix: Dn, serializer: Box<dyn EntrySerializer>) -> Self {
        Self {
            suffix,
            serializer,
            directory: RwLock::new(None),
            gate: ConcurrencyGate::new(),
            stats: Stats::default(),
            capabilities: Capabilities::default(),
        }
    }

    /// Validate `config` and bind the backend to its directory. Can be
    /// called again after `db_destroy` to reopen.
    pub fn db_open(&self, config: &Config) -> Result<(), LdapCode> {
        config.validate()?;
        let mut dir = self.directory.write().unwrap_or_else(|p| p.into_inner());
        *dir = Some(config.directory().to_path_buf());
        info!(directory = %config.directory().display(), suffix = %self.suffix, "backend opened");
        Ok(())
    }

    /// Unbind the backend from its directory. In-flight handlers already
    /// holding the concurrency gate are allowed
    /// to finish; new calls will see `UnwillingToPerform` until reopened.
    pub fn db_destroy(&self) {
        let mut dir = self.directory.write().unwrap_or_else(|p| p.into_inner());
        if dir.take().is_some() {
            warn!(suffix = %self.suffix, "backend destroyed");
        }
    }

    pub fn suffix(&self) -> &Dn {
        &self.suffix
    }

    pub fn serializer(&self) -> &dyn EntrySerializer {
        self.serializer.as_ref()
    }

    pub fn capabilities(&self) -> Capabilities {
        self.capabilities
    }

    pub fn stats(&self) -> StatsSnapshot {
        self.stats.snapshot()
    }

    /// The bound base directory, or `UnwillingToPerform` if not open.
    pub(crate) fn directory(&self) -> Result<PathBuf, LdapCode> {
        self.directory
            .read()
            .unwrap_or_else(|p| p.into_inner())
            .clone()
            .ok_or(LdapCode::UnwillingToPerform)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::entry::LineSerializer;

    #[test]
    fn open_then_destroy_then_reopen() {
        let dir = tempfile::tempdir().unwrap();
        let backend = Backend::db_init(Dn::parse("dc=example,dc=com"), Box::new(LineSerializer));
        assert!(backend.directory().is_err());

        let cfg = Config { directory: dir.path().to_path_buf() };
        backend.db_open(&cfg).unwrap();
        assert_eq!(backend.directory().unwrap(), dir.path());

        backend.db_destroy();
        assert!(backend.directory().is_err());

        backend.db_open(&cfg).unwrap();
        assert!(backend.directory().is_ok());
    }

    #[test]
    fn open_rejects_invalid_config() {
        let backend = Backend::db_init(Dn::parse("dc=example,dc=com"), Box::new(LineSerializer));
        // A path nested under a plain file can never be created as a
        // directory, regardless of permissions.
        let dir = tempfile::tempdir().unwrap();
        let file_path = dir.path().join("not-a-dir");
        std::fs::write(&file_path, b"x").unwrap();
        let cfg = Config { directory: file_path.join("nested") };
        assert!(backend.db_open(&cfg).is_err());
    }
}
