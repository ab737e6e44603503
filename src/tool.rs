//! Tool Mode: a lock-free, sink-free batch interface for bulk load/dump
//! utilities (the analogue of `slapadd`/`slapcat` tooling run against an
//! offline database). Tool Mode does not take the
//! [`crate::concurrency::ConcurrencyGate`]: callers are expected to hold
//! exclusive access to the backing directory themselves.

use std::path::PathBuf;

use crate::dn::Dn;
use crate::entry::{Entry, EntrySerializer};
use crate::entry_io::{entry_file_exists, write_entry_file};
use crate::error::LdapCode;
use crate::path_codec::dn_to_path;
use crate::sink::{BufferingSink, MatchAll, Scope, ScopeRequest};

const INITIAL_CAPACITY: usize = 500;

/// A Tool Mode session opened against one database.
pub struct ToolSession<'a> {
    suffix: Dn,
    base_dir: PathBuf,
    serializer: &'a dyn EntrySerializer,
    /// Buffered entries, read eagerly on open. Starts at `INITIAL_CAPACITY`
    /// and doubles as `Vec`'s own growth policy would when a dump exceeds
    /// it.
    entries: Vec<Option<Entry>>,
    cursor: usize,
}

impl<'a> ToolSession<'a> {
    /// Enumerate the whole suffix subtree into memory, ignoring referral
    /// shadowing (a dump/load tool needs every entry, referral or not,
    /// equivalent to always running with ManageDSAit).
    ///
    /// A fresh bulk-load starts against a database that has no suffix entry
    /// at all yet (the whole point of `put`). That is not an error here;
    /// only an existing suffix entry triggers the subtree walk, an absent
    /// one opens with an empty buffer, same as lazily reading an empty
    /// tree.
    pub fn open(
        suffix: Dn,
        base_dir: PathBuf,
        serializer: &'a dyn EntrySerializer,
    ) -> Result<Self, LdapCode> {
        let suffix_path = dn_to_path(&suffix, &base_dir, &suffix).ok_or(LdapCode::UnwillingToPerform)?;
        let mut entries = Vec::with_capacity(INITIAL_CAPACITY);
        if entry_file_exists(&suffix_path).map_err(|e| e.into_ldap_code())? {
            let mut sink = BufferingSink::default();
            let request = ScopeRequest {
                base: suffix.clone(),
                scope: Scope::Subtree,
                filter: &MatchAll,
                manage_dsa_it: true,
            };
            crate::enumerator::enumerate(&suffix, &base_dir, serializer, &request, &mut sink)?;
            entries.reserve(sink.entries.len());
            entries.extend(sink.entries.into_iter().map(Some));
        }
        Ok(Self { suffix, base_dir, serializer, entries, cursor: 0 })
    }

    /// Rewind to the first buffered entry.
    pub fn first(&mut self) -> Option<&Entry> {
        self.cursor = 0;
        self.peek()
    }

    /// Advance to the next buffered entry.
    pub fn next(&mut self) -> Option<&Entry> {
        self.cursor += 1;
        self.peek()
    }

    fn peek(&self) -> Option<&Entry> {
        self.entries.get(self.cursor).and_then(|slot| slot.as_ref())
    }

    /// Take ownership of the entry at the cursor, leaving its slot empty
    /// so a second `get` at the same position yields `None` rather than a
    /// stale clone.
    pub fn get(&mut self) -> Option<Entry> {
        self.entries.get_mut(self.cursor).and_then(|slot| slot.take())
    }

    /// Write an entry directly to its mirrored path, bypassing the
    /// concurrency gate and the in-memory buffer.
    pub fn put(&self, entry: &Entry) -> Result<(), LdapCode> {
        let path = dn_to_path(&self.suffix, &self.base_dir, entry.dn())
            .ok_or(LdapCode::UnwillingToPerform)?;
        if let Some(dir) = path.parent() {
            std::fs::create_dir_all(dir).map_err(LdapCode::from)?;
        }
        let parent_dn = entry.dn().parent().unwrap_or_default();
        let relative = entry.relative_to(&parent_dn);
        write_entry_file(&path, self.serializer, &relative)
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::entry::LineSerializer;

    fn suffix() -> Dn {
        Dn::parse("dc=example,dc=com")
    }

    fn seed(base_dir: &std::path::Path) {
        let serializer = LineSerializer;
        let mut session =
            ToolSession::open(suffix(), base_dir.to_path_buf(), &serializer).unwrap();
        assert!(session.is_empty());

        let root = Entry::new(suffix());
        session.put(&root).unwrap();

        let mut child = Entry::new(Dn::parse("ou=People,dc=example,dc=com"));
        child.add_values("ou", vec!["People".into()]);
        session.put(&child).unwrap();
    }

    #[test]
    fn put_then_reopen_sees_everything() {
        let dir = tempfile::tempdir().unwrap();
        seed(dir.path());

        let serializer = LineSerializer;
        let mut session =
            ToolSession::open(suffix(), dir.path().to_path_buf(), &serializer).unwrap();
        assert_eq!(session.len(), 2);

        let first = session.first().unwrap().dn().to_string();
        assert_eq!(first, "dc=example,dc=com");
        let second = session.next().unwrap().dn().to_string();
        assert_eq!(second, "ou=People,dc=example,dc=com");
        assert!(session.next().is_none());
    }

    #[test]
    fn get_transfers_ownership_and_nulls_slot() {
        let dir = tempfile::tempdir().unwrap();
        seed(dir.path());

        let serializer = LineSerializer;
        let mut session =
            ToolSession::open(suffix(), dir.path().to_path_buf(), &serializer).unwrap();
        session.first();
        let taken = session.get();
        assert!(taken.is_some());
        assert!(session.get().is_none(), "second get at same cursor must be None");
    }
}
