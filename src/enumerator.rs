//! Recursive, ordered tree enumeration over the mirrored directory tree.

use std::fs;
use std::path::Path;

use crate::dn::{order_index_of, Dn};
use crate::entry::{Entry, EntrySerializer};
use crate::entry_io::load_entry;
use crate::error::LdapCode;
use crate::parent_path::dir_of;
use crate::path_codec::dn_to_path;
use crate::sink::{ResultSink, Scope, ScopeRequest};

/// Run a search request against the mirrored tree rooted at `base_dir`
/// under `suffix`, pushing matches into `sink`.
///
/// Honors scope rewriting (`OneLevel` and `Subordinate` never recurse past
/// their direct targets), ordered-sibling sequencing, and referral
/// shadowing. Returns whatever the sink's last `Err` was if it aborted the
/// walk partway through; otherwise `Ok(())`.
pub fn enumerate(
    suffix: &Dn,
    base_dir: &Path,
    serializer: &dyn EntrySerializer,
    request: &ScopeRequest<'_>,
    sink: &mut dyn ResultSink,
) -> Result<(), LdapCode> {
    let base_path = match dn_to_path(suffix, base_dir, &request.base) {
        Some(p) => p,
        None => {
            let err = LdapCode::NoSuchObject;
            sink.send_result(Err(err.clone()));
            return Err(err);
        }
    };
    let parent_of_base = request.base.parent().unwrap_or_default();

    let base_entry = match load_entry(&base_path, serializer, &parent_of_base) {
        Ok(entry) => entry,
        Err(err) => {
            sink.send_result(Err(err.clone()));
            return Err(err);
        }
    };

    let result = walk(&base_entry, &base_path, serializer, request, sink, 0);
    sink.send_result(result.clone());
    result
}

/// Depth in the recursion relative to the search base: 0 is the base entry
/// itself, 1 is its direct children, and so on. Used to apply scope
/// rewriting: a one-level search only emits depth 1, a subordinate search
/// emits depth 1 and below, and so on.
fn walk(
    entry: &Entry,
    entry_path: &Path,
    serializer: &dyn EntrySerializer,
    request: &ScopeRequest<'_>,
    sink: &mut dyn ResultSink,
    depth: u32,
) -> Result<(), LdapCode> {
    let emit_self = match request.scope {
        Scope::Base => depth == 0,
        Scope::OneLevel => depth == 1,
        Scope::Subtree => true,
        Scope::Subordinate => depth >= 1,
    };

    // Shadowing is gated on the request's scope, not on recursion depth: a
    // subtree search whose own base is a referral entry must still shadow
    // it. Only a base-scope request reads a referral entry's own
    // attributes directly.
    let shadowed =
        entry.is_referral() && !request.manage_dsa_it && !matches!(request.scope, Scope::Base);

    if emit_self {
        if shadowed {
            sink.send_reference(entry.referral_urls())?;
        } else if request.filter.matches(entry) {
            sink.send_entry(entry.clone())?;
        }
    }

    // A shadowed referral's own subtree is never descended into, the
    // reference already stands in for everything below it.
    if shadowed {
        return Ok(());
    }

    let descend = match request.scope {
        // A base-scope search never touches the companion directory, even
        // when visiting the base entry itself.
        Scope::Base => false,
        Scope::OneLevel => depth == 0,
        Scope::Subtree | Scope::Subordinate => true,
    };
    if !descend {
        return Ok(());
    }

    let children_dir = dir_of(entry_path);
    let mut siblings = match fs::read_dir(&children_dir) {
        Ok(rd) => rd
            .filter_map(|e| e.ok())
            .filter(|e| e.path().extension().is_some_and(|ext| ext == "ldif"))
            .map(|e| e.path())
            .collect::<Vec<_>>(),
        Err(err) if err.kind() == std::io::ErrorKind::NotFound => return Ok(()),
        // A directory that exists but can't be opened is a transient
        // condition, not a missing-object error.
        Err(_) => return Err(LdapCode::Busy),
    };
    siblings.sort_by(|a, b| sibling_sort_key(a).cmp(&sibling_sort_key(b)));

    for child_path in siblings {
        let child = load_entry(&child_path, serializer, entry.dn())?;
        walk(&child, &child_path, serializer, request, sink, depth + 1)?;
    }
    Ok(())
}

/// Sort key for sibling entries: entries whose leaf RDN value carries a
/// `{N}` ordering prefix sort numerically by `N` ahead of unordered
/// siblings, which fall back to lexicographic order on the file stem.
fn sibling_sort_key(path: &Path) -> (u8, u64, String) {
    let stem = path.file_stem().and_then(|s| s.to_str()).unwrap_or_default();
    match order_index_of(stem.splitn(2, '=').nth(1).unwrap_or(stem)) {
        Some(n) => (0, n, stem.to_string()),
        None => (1, 0, stem.to_string()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::entry::LineSerializer;
    use crate::entry_io::write_entry_file;
    use crate::sink::{BufferingSink, MatchAll};

    fn suffix() -> Dn {
        Dn::parse("dc=example,dc=com")
    }

    fn put(base_dir: &Path, dn: &str, build: impl FnOnce(&mut Entry)) {
        let full_dn = Dn::parse(dn);
        let parent = full_dn.parent().unwrap_or_default();
        let mut entry = Entry::new(full_dn);
        build(&mut entry);
        let path = dn_to_path(&suffix(), base_dir, entry.dn()).unwrap();
        fs::create_dir_all(path.parent().unwrap()).unwrap();
        let relative = entry.relative_to(&parent);
        write_entry_file(&path, &LineSerializer, &relative).unwrap();
    }

    #[test]
    fn subtree_scope_visits_everything_in_order() {
        let dir = tempfile::tempdir().unwrap();
        put(dir.path(), "dc=example,dc=com", |_| {});
        put(dir.path(), "ou=People,dc=example,dc=com", |_| {});
        put(dir.path(), "cn={2}Bob,ou=People,dc=example,dc=com", |_| {});
        put(dir.path(), "cn={1}Alice,ou=People,dc=example,dc=com", |_| {});

        let request = ScopeRequest {
            base: suffix(),
            scope: Scope::Subtree,
            filter: &MatchAll,
            manage_dsa_it: false,
        };
        let mut sink = BufferingSink::default();
        enumerate(&suffix(), dir.path(), &LineSerializer, &request, &mut sink).unwrap();

        let dns: Vec<_> = sink.entries.iter().map(|e| e.dn().to_string()).collect();
        assert_eq!(
            dns,
            vec![
                "dc=example,dc=com",
                "ou=People,dc=example,dc=com",
                "cn={1}Alice,ou=People,dc=example,dc=com",
                "cn={2}Bob,ou=People,dc=example,dc=com",
            ]
        );
        assert!(matches!(sink.result, Some(Ok(()))));
    }

    #[test]
    fn one_level_scope_excludes_base_and_grandchildren() {
        let dir = tempfile::tempdir().unwrap();
        put(dir.path(), "dc=example,dc=com", |_| {});
        put(dir.path(), "ou=People,dc=example,dc=com", |_| {});
        put(dir.path(), "cn=Alice,ou=People,dc=example,dc=com", |_| {});

        let request = ScopeRequest {
            base: suffix(),
            scope: Scope::OneLevel,
            filter: &MatchAll,
            manage_dsa_it: false,
        };
        let mut sink = BufferingSink::default();
        enumerate(&suffix(), dir.path(), &LineSerializer, &request, &mut sink).unwrap();

        let dns: Vec<_> = sink.entries.iter().map(|e| e.dn().to_string()).collect();
        assert_eq!(dns, vec!["ou=People,dc=example,dc=com"]);
    }

    #[test]
    fn referral_entries_are_shadowed_unless_manage_dsa_it() {
        let dir = tempfile::tempdir().unwrap();
        put(dir.path(), "dc=example,dc=com", |_| {});
        put(dir.path(), "ou=Remote,dc=example,dc=com", |e| {
            e.add_values("objectClass", vec!["referral".into()]);
            e.add_values("ref", vec!["ldap://elsewhere/ou=Remote".into()]);
        });
        put(dir.path(), "cn=Hidden,ou=Remote,dc=example,dc=com", |_| {});

        let request = ScopeRequest {
            base: suffix(),
            scope: Scope::Subtree,
            filter: &MatchAll,
            manage_dsa_it: false,
        };
        let mut sink = BufferingSink::default();
        enumerate(&suffix(), dir.path(), &LineSerializer, &request, &mut sink).unwrap();

        let dns: Vec<_> = sink.entries.iter().map(|e| e.dn().to_string()).collect();
        assert_eq!(dns, vec!["dc=example,dc=com"]);
        assert_eq!(sink.references.len(), 1);

        let mut managed_sink = BufferingSink::default();
        let managed_request = ScopeRequest { manage_dsa_it: true, ..request };
        enumerate(&suffix(), dir.path(), &LineSerializer, &managed_request, &mut managed_sink).unwrap();
        let managed_dns: Vec<_> =
            managed_sink.entries.iter().map(|e| e.dn().to_string()).collect();
        assert_eq!(
            managed_dns,
            vec![
                "dc=example,dc=com",
                "ou=Remote,dc=example,dc=com",
                "cn=Hidden,ou=Remote,dc=example,dc=com",
            ]
        );
    }

    #[test]
    fn referral_at_search_base_is_shadowed_under_subtree_scope() {
        let dir = tempfile::tempdir().unwrap();
        put(dir.path(), "dc=example,dc=com", |_| {});
        put(dir.path(), "ou=Remote,dc=example,dc=com", |e| {
            e.add_values("objectClass", vec!["referral".into()]);
            e.add_values("ref", vec!["ldap://elsewhere/ou=Remote".into()]);
        });
        put(dir.path(), "cn=Hidden,ou=Remote,dc=example,dc=com", |_| {});

        let request = ScopeRequest {
            base: Dn::parse("ou=Remote,dc=example,dc=com"),
            scope: Scope::Subtree,
            filter: &MatchAll,
            manage_dsa_it: false,
        };
        let mut sink = BufferingSink::default();
        enumerate(&suffix(), dir.path(), &LineSerializer, &request, &mut sink).unwrap();

        assert!(sink.entries.is_empty(), "referral base must not be returned as a plain entry");
        assert_eq!(sink.references.len(), 1);
        assert_eq!(sink.references[0], vec!["ldap://elsewhere/ou=Remote".to_string()]);
    }

    #[test]
    fn referral_at_search_base_is_returned_plainly_under_base_scope() {
        let dir = tempfile::tempdir().unwrap();
        put(dir.path(), "dc=example,dc=com", |_| {});
        put(dir.path(), "ou=Remote,dc=example,dc=com", |e| {
            e.add_values("objectClass", vec!["referral".into()]);
            e.add_values("ref", vec!["ldap://elsewhere/ou=Remote".into()]);
        });

        let request = ScopeRequest {
            base: Dn::parse("ou=Remote,dc=example,dc=com"),
            scope: Scope::Base,
            filter: &MatchAll,
            manage_dsa_it: false,
        };
        let mut sink = BufferingSink::default();
        enumerate(&suffix(), dir.path(), &LineSerializer, &request, &mut sink).unwrap();

        assert_eq!(sink.entries.len(), 1);
        assert!(sink.references.is_empty());
    }

    #[test]
    fn base_scope_never_opens_the_companion_directory() {
        let dir = tempfile::tempdir().unwrap();
        put(dir.path(), "dc=example,dc=com", |_| {});
        put(dir.path(), "ou=People,dc=example,dc=com", |_| {});
        // A child whose own file is unparseable; a base-scope search on
        // the parent must not trip over it by descending.
        let child_path = dir
            .path()
            .join("dc=example,dc=com")
            .join("ou=people")
            .join("cn=broken.ldif");
        fs::write(&child_path, b"not a valid entry").unwrap();

        let request = ScopeRequest {
            base: Dn::parse("ou=People,dc=example,dc=com"),
            scope: Scope::Base,
            filter: &MatchAll,
            manage_dsa_it: false,
        };
        let mut sink = BufferingSink::default();
        enumerate(&suffix(), dir.path(), &LineSerializer, &request, &mut sink).unwrap();
        assert_eq!(sink.entries.len(), 1);
    }

    #[test]
    fn missing_base_is_no_such_object() {
        let dir = tempfile::tempdir().unwrap();
        let request = ScopeRequest {
            base: Dn::parse("ou=Missing,dc=example,dc=com"),
            scope: Scope::Base,
            filter: &MatchAll,
            manage_dsa_it: false,
        };
        let mut sink = BufferingSink::default();
        let err = enumerate(&suffix(), dir.path(), &LineSerializer, &request, &mut sink).unwrap_err();
        assert!(matches!(err, LdapCode::NoSuchObject));
    }
}
