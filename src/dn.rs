//! Distinguished name model.
//!
//! The core backend only consumes DN utilities (parent, normalize,
//! RDN-of, suffix-test, DN-builder) from its host; a standalone crate
//! still needs one concrete type to drive path derivation and
//! enumeration against. This module supplies the minimum RFC-4514-
//! adjacent model that does: leaf-to-root RDN sequencing, a case-folded
//! normalized form, and the `{N}` ordering prefix.

use std::fmt;

/// One RDN component of a [`Dn`], e.g. `cn=Alice` or `{1}config`.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct Rdn {
    /// Presentation form, original case and whitespace.
    raw: String,
    /// Normalized form: lowercased, internal whitespace collapsed.
    normalized: String,
}

impl Rdn {
    /// Build an RDN from its presentation form, computing the normalized form.
    pub fn new(raw: impl Into<String>) -> Self {
        let raw = raw.into();
        let normalized = normalize_component(&raw);
        Self { raw, normalized }
    }

    pub fn raw(&self) -> &str {
        &self.raw
    }

    pub fn normalized(&self) -> &str {
        &self.normalized
    }

    /// The `{N}` ordering prefix, if this RDN's *value* (the part after the
    /// first `=`) begins with one.
    pub fn order_index(&self) -> Option<u64> {
        let value = self.raw.splitn(2, '=').nth(1).unwrap_or(&self.raw);
        order_index_of(value)
    }
}

impl fmt::Display for Rdn {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.raw)
    }
}

/// Parse a leading `{N}` ordering prefix out of a string, returning the
/// integer if present. Shared between [`Rdn::order_index`] and the
/// enumerator's directory-name sort key.
pub fn order_index_of(value: &str) -> Option<u64> {
    let rest = value.strip_prefix('{')?;
    let end = rest.find('}')?;
    rest[..end].parse().ok()
}

fn normalize_component(raw: &str) -> String {
    let mut out = String::with_capacity(raw.len());
    let mut last_was_space = false;
    for ch in raw.trim().chars() {
        if ch.is_whitespace() {
            if !last_was_space {
                out.push(' ');
            }
            last_was_space = true;
        } else {
            out.extend(ch.to_lowercase());
            last_was_space = false;
        }
    }
    out
}

/// A distinguished name: RDNs ordered leaf-to-root.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Default)]
pub struct Dn {
    rdns: Vec<Rdn>,
}

impl Dn {
    /// Build a DN from components already in leaf-to-root order.
    pub fn from_rdns(rdns: Vec<Rdn>) -> Self {
        Self { rdns }
    }

    /// Parse a presentation-form DN string (`cn=Alice,dc=example,dc=com`)
    /// into leaf-to-root RDNs. Does not attempt multi-valued-RDN or
    /// escaped-comma parsing beyond a plain `\,` escape, which is all the
    /// filesystem-shape model this crate builds on requires.
    pub fn parse(s: &str) -> Self {
        let mut rdns = Vec::new();
        let mut current = String::new();
        let mut chars = s.chars().peekable();
        while let Some(ch) = chars.next() {
            match ch {
                '\\' if chars.peek().is_some() => {
                    current.push(ch);
                    current.push(chars.next().unwrap());
                }
                ',' => {
                    rdns.push(Rdn::new(std::mem::take(&mut current)));
                }
                _ => current.push(ch),
            }
        }
        if !current.is_empty() {
            rdns.push(Rdn::new(current));
        }
        Self { rdns }
    }

    pub fn is_empty(&self) -> bool {
        self.rdns.is_empty()
    }

    pub fn rdns(&self) -> &[Rdn] {
        &self.rdns
    }

    /// The leaf RDN, if any.
    pub fn rdn_of(&self) -> Option<&Rdn> {
        self.rdns.first()
    }

    /// The DN with the leaf RDN removed.
    pub fn parent(&self) -> Option<Dn> {
        if self.rdns.is_empty() {
            None
        } else {
            Some(Dn { rdns: self.rdns[1..].to_vec() })
        }
    }

    /// Prepend a leaf RDN, returning the child DN (used to reconstruct a
    /// full DN from a stored leaf RDN plus a parent DN).
    pub fn child(&self, leaf: Rdn) -> Dn {
        let mut rdns = Vec::with_capacity(self.rdns.len() + 1);
        rdns.push(leaf);
        rdns.extend(self.rdns.iter().cloned());
        Dn { rdns }
    }

    /// Prepend this DN's own RDNs (in order) to `parent`, returning the
    /// concatenated full DN. Generalizes [`Dn::child`] to the case where
    /// `self` holds more than one RDN (the suffix root entry's stored DN,
    /// relative to an empty parent).
    pub fn prepended_to(&self, parent: &Dn) -> Dn {
        let mut rdns = Vec::with_capacity(self.rdns.len() + parent.rdns.len());
        rdns.extend(self.rdns.iter().cloned());
        rdns.extend(parent.rdns.iter().cloned());
        Dn { rdns }
    }

    /// Normalized-form equality test for "this DN's normalized form equals
    /// or is subordinate to `suffix`'s normalized form".
    pub fn is_under_suffix(&self, suffix: &Dn) -> bool {
        if suffix.rdns.len() > self.rdns.len() {
            return false;
        }
        let tail = &self.rdns[self.rdns.len() - suffix.rdns.len()..];
        tail.iter().zip(suffix.rdns.iter()).all(|(a, b)| a.normalized() == b.normalized())
    }

    /// Strip `suffix` from the tail, returning the RDNs strictly above it.
    /// Returns `None` if `self` is not under `suffix`.
    pub fn strip_suffix<'a>(&'a self, suffix: &Dn) -> Option<&'a [Rdn]> {
        if !self.is_under_suffix(suffix) {
            return None;
        }
        Some(&self.rdns[..self.rdns.len() - suffix.rdns.len()])
    }

    /// Normalized presentation, leaf-to-root, comma-joined.
    pub fn normalized_string(&self) -> String {
        self.rdns.iter().map(Rdn::normalized).collect::<Vec<_>>().join(",")
    }
}

impl fmt::Display for Dn {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let parts: Vec<&str> = self.rdns.iter().map(Rdn::raw).collect();
        write!(f, "{}", parts.join(","))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parse_orders_leaf_to_root() {
        let dn = Dn::parse("cn=Alice,ou=People,dc=example,dc=com");
        assert_eq!(dn.rdns().len(), 4);
        assert_eq!(dn.rdn_of().unwrap().raw(), "cn=Alice");
    }

    #[test]
    fn normalization_case_folds_and_collapses_whitespace() {
        let a = Rdn::new("CN = Alice   Smith");
        let b = Rdn::new("cn=alice smith");
        assert_eq!(a.normalized(), b.normalized());
    }

    #[test]
    fn suffix_test_and_strip() {
        let suffix = Dn::parse("dc=example,dc=com");
        let dn = Dn::parse("cn=Alice,ou=People,dc=example,dc=com");
        assert!(dn.is_under_suffix(&suffix));
        let above = dn.strip_suffix(&suffix).unwrap();
        assert_eq!(above.len(), 2);

        let other = Dn::parse("cn=Bob,dc=elsewhere,dc=org");
        assert!(!other.is_under_suffix(&suffix));
    }

    #[test]
    fn order_index_extraction() {
        let rdn = Rdn::new("olcDatabase={2}bdb");
        assert_eq!(rdn.order_index(), Some(2));
        let unordered = Rdn::new("cn=plain");
        assert_eq!(unordered.order_index(), None);
    }

    #[test]
    fn child_reconstructs_full_dn() {
        let parent = Dn::parse("dc=example,dc=com");
        let full = parent.child(Rdn::new("cn=Alice"));
        assert_eq!(full.to_string(), "cn=Alice,dc=example,dc=com");
    }
}
