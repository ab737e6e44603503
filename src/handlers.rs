//! Operation handlers: bind, search, add, modify, modrdn, delete, the
//! referral check, and single-entry get. Each one takes the backend's
//! [`ConcurrencyGate`] once and holds it for the handler's full duration,
//! including any referral-check walk up the ancestor chain, so a
//! handler's whole run of on-disk work is covered by one continuous lock
//! acquisition with no gap another handler could land in.

use std::path::PathBuf;
use std::sync::atomic::Ordering;

use tracing::{debug, instrument};

use crate::backend::Backend;
use crate::dn::{Dn, Rdn};
use crate::entry::Entry;
use crate::entry_io::{entry_file_exists, load_entry, write_entry_file, IoOutcome};
use crate::enumerator::enumerate;
use crate::error::{LdapCode, ReferralInfo};
use crate::modify::{apply_modifications, ModOp};
use crate::parent_path::dir_of;
use crate::path_codec::dn_to_path;
use crate::sink::{ResultSink, ScopeRequest};

/// Attribute a bind checks for before delegating to the host's credential
/// verifier.
const PASSWORD_ATTR: &str = "userPassword";

fn entry_path(backend: &Backend, dn: &Dn) -> Result<PathBuf, LdapCode> {
    let base_dir = backend.directory()?;
    dn_to_path(backend.suffix(), &base_dir, dn).ok_or(LdapCode::UnwillingToPerform)
}

/// Walk ancestors from `dn` up to (but not including) `dn` itself,
/// returning the first referral entry encountered. Honors ManageDSAit:
/// when `manage_dsa_it` is set, referrals are never reported (the caller
/// wants to operate on them directly).
///
/// Assumes the caller already holds the concurrency gate; this never
/// acquires it itself, so a handler can fold the check into the same lock
/// acquisition it takes for its own on-disk work.
fn referral_check_locked(backend: &Backend, dn: &Dn, manage_dsa_it: bool) -> Result<Option<ReferralInfo>, LdapCode> {
    if manage_dsa_it {
        return Ok(None);
    }
    let mut current = dn.parent();
    while let Some(ancestor) = current {
        if !ancestor.is_under_suffix(backend.suffix()) {
            break;
        }
        let path = match entry_path(backend, &ancestor) {
            Ok(p) => p,
            Err(_) => break,
        };
        let parent_dn = ancestor.parent().unwrap_or_default();
        match load_entry(&path, backend.serializer(), &parent_dn) {
            Ok(entry) if entry.is_referral() => {
                return Ok(Some(ReferralInfo { matched_dn: ancestor, urls: entry.referral_urls() }));
            }
            _ => {}
        }
        if ancestor == *backend.suffix() {
            break;
        }
        current = ancestor.parent();
    }
    Ok(None)
}

/// Standalone referral check for callers outside a handler's own lock
/// scope (e.g. a host probing ahead of an operation it hasn't committed
/// to yet). Acquires its own read ticket for the duration of the walk.
#[instrument(skip(backend))]
pub fn referral_check(backend: &Backend, dn: &Dn, manage_dsa_it: bool) -> Result<Option<ReferralInfo>, LdapCode> {
    let _ticket = backend.gate.read();
    referral_check_locked(backend, dn, manage_dsa_it)
}

/// Resolve `dn` to its stored entry and hand it to a host-supplied
/// credential check. A missing target or one carrying no password
/// attribute is rejected before `verify_credential` ever runs; password
/// verification itself is the host's responsibility.
#[instrument(skip(backend, verify_credential))]
pub fn bind(
    backend: &Backend,
    dn: &Dn,
    verify_credential: impl FnOnce(&Entry) -> Result<(), LdapCode>,
) -> Result<(), LdapCode> {
    backend.stats.binds.fetch_add(1, Ordering::Relaxed);
    let path = entry_path(backend, dn)?;
    let parent_dn = dn.parent().unwrap_or_default();

    let _ticket = backend.gate.read();

    if let Some(referral) = referral_check_locked(backend, dn, false)? {
        return Err(LdapCode::Referral(referral));
    }
    let entry = load_entry(&path, backend.serializer(), &parent_dn).map_err(|_| LdapCode::InvalidCredentials)?;
    if !entry.has_attr(PASSWORD_ATTR) {
        return Err(LdapCode::InappropriateAuth);
    }
    verify_credential(&entry)
}

/// Fetch a single entry, taking the read or write gate depending on
/// `for_write`.
#[instrument(skip(backend))]
pub fn entry_get_rw(backend: &Backend, dn: &Dn, for_write: bool) -> Result<Entry, LdapCode> {
    let path = entry_path(backend, dn)?;
    let parent_dn = dn.parent().unwrap_or_default();
    if for_write {
        let _ticket = backend.gate.write();
        load_entry(&path, backend.serializer(), &parent_dn)
    } else {
        let _ticket = backend.gate.read();
        load_entry(&path, backend.serializer(), &parent_dn)
    }
}

/// Stream matches under the read gate. The referral check for the search
/// base runs inside the same ticket as the enumeration it guards.
#[instrument(skip(backend, sink, request))]
pub fn search(backend: &Backend, request: &ScopeRequest<'_>, sink: &mut dyn ResultSink) -> Result<(), LdapCode> {
    backend.stats.searches.fetch_add(1, Ordering::Relaxed);
    let base_dir = backend.directory()?;

    let _ticket = backend.gate.read();

    if let Some(referral) = referral_check_locked(backend, &request.base, request.manage_dsa_it)? {
        return Err(LdapCode::Referral(referral));
    }
    enumerate(backend.suffix(), &base_dir, backend.serializer(), request, sink)
}

/// Create a new leaf entry. The parent must already exist (unless `dn` is
/// the suffix root) and `dn` must not already exist.
#[instrument(skip(backend, entry))]
pub fn add(backend: &Backend, entry: Entry) -> Result<(), LdapCode> {
    backend.stats.adds.fetch_add(1, Ordering::Relaxed);
    let dn = entry.dn().clone();
    let path = entry_path(backend, &dn)?;
    let parent_dn = dn.parent().unwrap_or_default();

    let _ticket = backend.gate.write();

    if let Some(referral) = referral_check_locked(backend, &dn, false)? {
        return Err(LdapCode::Referral(referral));
    }

    if dn != *backend.suffix() {
        let parent_path = entry_path(backend, &parent_dn)?;
        match entry_file_exists(&parent_path) {
            Ok(true) => {}
            Ok(false) => return Err(LdapCode::NoSuchObject),
            Err(IoOutcome::NotFound) => return Err(LdapCode::NoSuchObject),
            Err(IoOutcome::Other(msg)) => return Err(LdapCode::Other(msg)),
        }
    }

    match entry_file_exists(&path) {
        Ok(true) => return Err(LdapCode::AlreadyExists),
        Ok(false) => {}
        Err(IoOutcome::NotFound) => {}
        Err(IoOutcome::Other(msg)) => return Err(LdapCode::Other(msg)),
    }

    if let Some(dir) = path.parent() {
        std::fs::create_dir_all(dir).map_err(LdapCode::from)?;
    }
    let relative = entry.relative_to(&parent_dn);
    write_entry_file(&path, backend.serializer(), &relative)?;
    debug!(%dn, "entry added");
    Ok(())
}

/// Apply a modification list to an existing entry. Returns whether
/// `objectClass` was touched, per [`apply_modifications`].
#[instrument(skip(backend, ops))]
pub fn modify(backend: &Backend, dn: &Dn, ops: &[ModOp]) -> Result<bool, LdapCode> {
    backend.stats.modifies.fetch_add(1, Ordering::Relaxed);
    let path = entry_path(backend, dn)?;
    let parent_dn = dn.parent().unwrap_or_default();

    let _ticket = backend.gate.write();

    if let Some(referral) = referral_check_locked(backend, dn, false)? {
        return Err(LdapCode::Referral(referral));
    }

    let mut entry = load_entry(&path, backend.serializer(), &parent_dn)?;
    let object_class_changed = apply_modifications(&mut entry, ops)?;
    let relative = entry.relative_to(&parent_dn);
    write_entry_file(&path, backend.serializer(), &relative)?;
    Ok(object_class_changed)
}

/// Remove a leaf entry. Non-leaf entries (whose companion subtree
/// directory is non-empty) are rejected with `NotAllowedOnNonLeaf` rather
/// than recursively deleted.
#[instrument(skip(backend))]
pub fn delete(backend: &Backend, dn: &Dn) -> Result<(), LdapCode> {
    backend.stats.deletes.fetch_add(1, Ordering::Relaxed);
    let path = entry_path(backend, dn)?;

    let _ticket = backend.gate.write();

    if let Some(referral) = referral_check_locked(backend, dn, false)? {
        return Err(LdapCode::Referral(referral));
    }

    match entry_file_exists(&path) {
        Ok(true) => {}
        Ok(false) => return Err(LdapCode::NoSuchObject),
        Err(IoOutcome::NotFound) => return Err(LdapCode::NoSuchObject),
        Err(IoOutcome::Other(msg)) => return Err(LdapCode::Other(msg)),
    }

    let subtree_dir = dir_of(&path);
    match std::fs::read_dir(&subtree_dir) {
        Ok(mut rd) => {
            if rd.next().is_some() {
                return Err(LdapCode::NotAllowedOnNonLeaf);
            }
            std::fs::remove_dir(&subtree_dir).map_err(LdapCode::from)?;
        }
        Err(err) if err.kind() == std::io::ErrorKind::NotFound => {}
        Err(err) => return Err(LdapCode::Other(err.to_string())),
    }

    std::fs::remove_file(&path).map_err(LdapCode::from)?;
    debug!(%dn, "entry deleted");
    Ok(())
}

/// Rename an entry's leaf RDN and, optionally, move it under
/// `new_superior`.
///
/// This is **not** atomic across its three filesystem steps (write the
/// entry at its new path, unlink the old entry file, rename the old
/// subtree directory to the new name). If a later step fails after an
/// earlier one has already taken effect, the handler reports `Other`
/// describing which step failed rather than reporting blanket success or
/// silently losing the entry.
#[instrument(skip(backend))]
pub fn modrdn(
    backend: &Backend,
    dn: &Dn,
    new_rdn: Rdn,
    delete_old_rdn: bool,
    new_superior: Option<Dn>,
) -> Result<(), LdapCode> {
    backend.stats.modrdns.fetch_add(1, Ordering::Relaxed);

    let old_path = entry_path(backend, dn)?;
    let old_parent_dn = dn.parent().unwrap_or_default();
    let new_parent_dn = new_superior.unwrap_or_else(|| old_parent_dn.clone());
    let new_dn = new_parent_dn.child(new_rdn.clone());
    let new_path = entry_path(backend, &new_dn)?;

    let _ticket = backend.gate.write();

    if let Some(referral) = referral_check_locked(backend, dn, false)? {
        return Err(LdapCode::Referral(referral));
    }

    if new_dn != *dn {
        match entry_file_exists(&new_path) {
            Ok(true) => return Err(LdapCode::AlreadyExists),
            Ok(false) => {}
            Err(e) => return Err(e.into_ldap_code()),
        }
    }

    let mut entry = load_entry(&old_path, backend.serializer(), &old_parent_dn)?;
    if delete_old_rdn {
        if let Some((attr, value)) = dn.rdn_of().and_then(|rdn| rdn.raw().split_once('=')) {
            entry.delete_values(attr, &[value.to_string()]);
        }
    }
    entry.set_dn(new_dn.clone());

    if let Some(dir) = new_path.parent() {
        std::fs::create_dir_all(dir).map_err(LdapCode::from)?;
    }
    let relative = entry.relative_to(&new_parent_dn);
    write_entry_file(&new_path, backend.serializer(), &relative)
        .map_err(|e| LdapCode::Other(format!("modrdn step 1 (write new entry) failed: {e}")))?;

    if new_path != old_path {
        std::fs::remove_file(&old_path)
            .map_err(|e| LdapCode::Other(format!("modrdn step 2 (unlink old entry) failed: {e}")))?;
    }

    let old_subtree_dir = dir_of(&old_path);
    let new_subtree_dir = dir_of(&new_path);
    if old_subtree_dir != new_subtree_dir && old_subtree_dir.exists() {
        if let Some(parent) = new_subtree_dir.parent() {
            std::fs::create_dir_all(parent).map_err(LdapCode::from)?;
        }
        std::fs::rename(&old_subtree_dir, &new_subtree_dir)
            .map_err(|e| LdapCode::Other(format!("modrdn step 3 (rename subtree directory) failed: {e}")))?;
    }

    debug!(%dn, %new_dn, "entry renamed");
    Ok(())
}
