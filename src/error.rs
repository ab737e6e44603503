//! Error taxonomy returned by backend operations: a flat, `Copy`-free
//! enum with one variant per abstract result kind, carrying just enough
//! payload to let the host build a protocol-specific response.

use std::fmt;
use std::io;

use crate::dn::Dn;

/// Result of a backend operation.
pub type Result<T> = std::result::Result<T, LdapCode>;

/// Abstract result kinds a handler can return.
#[derive(Debug, Clone)]
pub enum LdapCode {
    /// Missing entry file when one was required.
    NoSuchObject,
    /// Target path already occupied.
    AlreadyExists,
    /// Attempt to delete a non-leaf entry (companion directory not empty).
    NotAllowedOnNonLeaf,
    /// Bind target missing or password check failed.
    InvalidCredentials,
    /// Bind target has no password attribute to check against.
    InappropriateAuth,
    /// ACL denial on the modify path.
    InsufficientAccess,
    /// Parent directory could not be created, or a required stat failed.
    UnwillingToPerform,
    /// Transient directory-open failure other than not-found.
    Busy,
    /// Unexpected I/O error; carries a human-readable description.
    Other(String),
    /// A scoped search crossed a referral entry without ManageDSAit.
    Referral(ReferralInfo),
}

/// Referral synthesized while traversing below a referral entry.
#[derive(Debug, Clone)]
pub struct ReferralInfo {
    /// Normalized DN of the referral entry encountered.
    pub matched_dn: Dn,
    /// Referral URLs carried by the matched entry, if any were attached.
    pub urls: Vec<String>,
}

impl fmt::Display for LdapCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            LdapCode::NoSuchObject => write!(f, "no such object"),
            LdapCode::AlreadyExists => write!(f, "already exists"),
            LdapCode::NotAllowedOnNonLeaf => write!(f, "not allowed on non-leaf"),
            LdapCode::InvalidCredentials => write!(f, "invalid credentials"),
            LdapCode::InappropriateAuth => write!(f, "inappropriate authentication"),
            LdapCode::InsufficientAccess => write!(f, "insufficient access"),
            LdapCode::UnwillingToPerform => write!(f, "unwilling to perform"),
            LdapCode::Busy => write!(f, "busy"),
            LdapCode::Other(msg) => write!(f, "other error: {msg}"),
            LdapCode::Referral(info) => write!(f, "referral at {}", info.matched_dn),
        }
    }
}

impl std::error::Error for LdapCode {}

impl From<io::Error> for LdapCode {
    /// Local recovery (EINTR retry, missing-parent creation, ENOENT-on-rmdir)
    /// happens at the call site; anything that reaches here is surfaced
    /// verbatim as `Other`.
    fn from(err: io::Error) -> Self {
        LdapCode::Other(err.to_string())
    }
}
