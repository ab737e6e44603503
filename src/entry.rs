//! Entry data model and the serializer contract it is stored through.
//!
//! The textual entry serializer/deserializer is a host collaborator, not
//! something this crate's core implements: it's assumed available as two
//! functions, `serialize(entry) -> bytes` and `parse(bytes) -> entry |
//! error`. [`EntrySerializer`] is that contract; [`LineSerializer`] is a
//! narrow, self-contained stand-in good enough to drive this crate's own
//! tests without pretending to be a full LDIF grammar.

use std::fmt;

use crate::dn::Dn;
use crate::error::LdapCode;

/// An ordered set of attribute-value assertions identified by a DN.
/// Attribute order and each attribute's value order are preserved,
/// matching how a directory entry is conventionally rendered.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Entry {
    dn: Dn,
    attrs: Vec<(String, Vec<String>)>,
}

impl Entry {
    pub fn new(dn: Dn) -> Self {
        Self { dn, attrs: Vec::new() }
    }

    pub fn dn(&self) -> &Dn {
        &self.dn
    }

    pub fn set_dn(&mut self, dn: Dn) {
        self.dn = dn;
    }

    /// Return a clone of this entry with its DN narrowed to just the RDNs
    /// above `parent_dn` (one RDN for an ordinary entry, but the whole,
    /// possibly multi-RDN, suffix for the root entry, whose directory
    /// "parent" is empty). This is the on-disk representation: the path
    /// already encodes `parent_dn`, so the file content need not repeat
    /// it.
    pub fn relative_to(&self, parent_dn: &Dn) -> Entry {
        let mut clone = self.clone();
        if let Some(above) = self.dn.strip_suffix(parent_dn) {
            clone.dn = Dn::from_rdns(above.to_vec());
        }
        clone
    }

    /// Reconstruct the full DN by prepending this entry's stored
    /// above-parent RDNs to `parent_dn`.
    pub fn reconstruct_dn(&mut self, parent_dn: &Dn) {
        self.dn = self.dn.prepended_to(parent_dn);
    }

    pub fn values(&self, attr: &str) -> impl Iterator<Item = &str> {
        self.attrs
            .iter()
            .filter(move |(name, _)| name.eq_ignore_ascii_case(attr))
            .flat_map(|(_, values)| values.iter().map(String::as_str))
    }

    pub fn has_attr(&self, attr: &str) -> bool {
        self.values(attr).next().is_some()
    }

    pub fn attr_names(&self) -> impl Iterator<Item = &str> {
        self.attrs.iter().map(|(name, _)| name.as_str())
    }

    /// Append values to an attribute, creating it if absent (the Add
    /// modification primitive).
    pub fn add_values(&mut self, attr: &str, values: Vec<String>) {
        if let Some((_, existing)) = self.attrs.iter_mut().find(|(name, _)| name.eq_ignore_ascii_case(attr)) {
            existing.extend(values);
        } else {
            self.attrs.push((attr.to_string(), values));
        }
    }

    /// Remove specific values from an attribute, or the whole attribute if
    /// `values` is empty (the Delete modification primitive).
    pub fn delete_values(&mut self, attr: &str, values: &[String]) {
        if values.is_empty() {
            self.attrs.retain(|(name, _)| !name.eq_ignore_ascii_case(attr));
            return;
        }
        if let Some((_, existing)) = self.attrs.iter_mut().find(|(name, _)| name.eq_ignore_ascii_case(attr)) {
            existing.retain(|v| !values.contains(v));
        }
        self.attrs.retain(|(_, values)| !values.is_empty());
    }

    /// Replace an attribute's values wholesale, removing it if `values` is
    /// empty (the Replace modification primitive).
    pub fn replace_values(&mut self, attr: &str, values: Vec<String>) {
        self.attrs.retain(|(name, _)| !name.eq_ignore_ascii_case(attr));
        if !values.is_empty() {
            self.attrs.push((attr.to_string(), values));
        }
    }

    /// Increment a single-valued integer attribute (the Increment
    /// modification primitive). Errors if the attribute is missing or
    /// not parseable as an integer.
    pub fn increment_value(&mut self, attr: &str, delta: i64) -> Result<(), LdapCode> {
        let entry = self
            .attrs
            .iter_mut()
            .find(|(name, _)| name.eq_ignore_ascii_case(attr))
            .ok_or_else(|| LdapCode::Other(format!("increment on missing attribute {attr}")))?;
        let current: i64 = entry
            .1
            .first()
            .ok_or_else(|| LdapCode::Other(format!("increment on empty attribute {attr}")))?
            .parse()
            .map_err(|_| LdapCode::Other(format!("attribute {attr} is not an integer")))?;
        entry.1 = vec![(current + delta).to_string()];
        Ok(())
    }

    /// Whether this entry is marked as a referral object: `objectClass:
    /// referral` plus at least one `ref` value.
    pub fn is_referral(&self) -> bool {
        self.values("objectClass").any(|v| v.eq_ignore_ascii_case("referral")) && self.has_attr("ref")
    }

    pub fn referral_urls(&self) -> Vec<String> {
        self.values("ref").map(str::to_owned).collect()
    }
}

/// Contract for the host's entry text-format codec.
pub trait EntrySerializer: Send + Sync {
    fn serialize(&self, entry: &Entry) -> Vec<u8>;
    fn parse(&self, bytes: &[u8]) -> Result<Entry, LdapCode>;
}

/// `attr: value` line-oriented format, blank-line terminated, `#`-comment
/// tolerant. A minimal stand-in; a host is expected to supply a richer
/// serializer via [`EntrySerializer`].
#[derive(Debug, Default, Clone, Copy)]
pub struct LineSerializer;

impl EntrySerializer for LineSerializer {
    fn serialize(&self, entry: &Entry) -> Vec<u8> {
        let mut out = String::new();
        out.push_str("dn: ");
        out.push_str(&entry.dn.to_string());
        out.push('\n');
        for (name, values) in &entry.attrs {
            for value in values {
                out.push_str(name);
                out.push_str(": ");
                out.push_str(value);
                out.push('\n');
            }
        }
        out.into_bytes()
    }

    fn parse(&self, bytes: &[u8]) -> Result<Entry, LdapCode> {
        let text = std::str::from_utf8(bytes)
            .map_err(|e| LdapCode::Other(format!("invalid utf-8 entry: {e}")))?;
        let mut dn = None;
        let mut attrs: Vec<(String, Vec<String>)> = Vec::new();
        for line in text.lines() {
            if line.is_empty() || line.starts_with('#') {
                continue;
            }
            let (name, value) = line
                .split_once(':')
                .ok_or_else(|| LdapCode::Other(format!("malformed entry line: {line:?}")))?;
            let name = name.trim();
            let value = value.trim_start().to_string();
            if name.eq_ignore_ascii_case("dn") {
                dn = Some(Dn::parse(&value));
                continue;
            }
            if let Some((_, values)) = attrs.iter_mut().find(|(n, _)| n.eq_ignore_ascii_case(name)) {
                values.push(value);
            } else {
                attrs.push((name.to_string(), vec![value]));
            }
        }
        let dn = dn.ok_or_else(|| LdapCode::Other("entry has no dn: line".to_string()))?;
        Ok(Entry { dn, attrs })
    }
}

impl fmt::Display for Entry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.dn)
    }
}
