//! Search request/result shapes: scope, filter stand-in, and the streaming
//! [`ResultSink`] contract.

use crate::dn::Dn;
use crate::entry::Entry;
use crate::error::LdapCode;

/// Search scope.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Scope {
    Base,
    OneLevel,
    Subtree,
    /// Children only, excluding the base entry itself, distinct from
    /// `Subtree`, which includes the base.
    Subordinate,
}

/// Out of scope for this crate: schema validation and filter matching.
/// This crate does not evaluate filter semantics, only carries whatever
/// opaque predicate the host supplies.
pub trait Filter: Send + Sync {
    fn matches(&self, entry: &Entry) -> bool;
}

/// A filter that accepts every entry, used by callers (and this crate's own
/// tests) that want enumeration without predicate evaluation.
#[derive(Debug, Default, Clone, Copy)]
pub struct MatchAll;

impl Filter for MatchAll {
    fn matches(&self, _entry: &Entry) -> bool {
        true
    }
}

/// A search request as handed to [`crate::enumerator::enumerate`].
pub struct ScopeRequest<'a> {
    pub base: Dn,
    pub scope: Scope,
    pub filter: &'a dyn Filter,
    /// ManageDSAit control: when set, referral entries are returned as
    /// ordinary entries instead of being shadowed into `send_referral`
    /// results.
    pub manage_dsa_it: bool,
}

/// Streaming sink an enumeration pushes results into. A caller that wants
/// buffered results instead of its own streaming sink can implement this
/// over a `Vec`.
pub trait ResultSink {
    /// Push one matching entry. Returning `Err` aborts the enumeration:
    /// the enumerator must stop recursing and propagate the sink's error
    /// as the operation's result.
    fn send_entry(&mut self, entry: Entry) -> Result<(), LdapCode>;

    /// Push a continuation reference produced by referral shadowing.
    fn send_reference(&mut self, urls: Vec<String>) -> Result<(), LdapCode>;

    /// Called once at the end of a successful enumeration with the final
    /// LDAP result code (normally `Ok(())`, i.e. Success).
    fn send_result(&mut self, result: Result<(), LdapCode>);
}

/// A sink that buffers everything in memory, useful for tests and for
/// hosts that would rather collect a `Vec` than stream.
#[derive(Debug, Default)]
pub struct BufferingSink {
    pub entries: Vec<Entry>,
    pub references: Vec<Vec<String>>,
    pub result: Option<Result<(), LdapCode>>,
}

impl ResultSink for BufferingSink {
    fn send_entry(&mut self, entry: Entry) -> Result<(), LdapCode> {
        self.entries.push(entry);
        Ok(())
    }

    fn send_reference(&mut self, urls: Vec<String>) -> Result<(), LdapCode> {
        self.references.push(urls);
        Ok(())
    }

    fn send_result(&mut self, result: Result<(), LdapCode>) {
        self.result = Some(result);
    }
}
