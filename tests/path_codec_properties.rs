//! Property-based checks for the DN-to-path codec: injectivity and byte
//! safety.

use std::path::Path;

use ldif_backend::path_codec::dn_to_path;
use ldif_backend::{Dn, Rdn};
use proptest::prelude::*;

/// Characters the DN model accepts in an RDN value without needing a DN-
/// level escape of their own, kept narrow enough that `proptest`'s shrinker
/// stays useful (the filesystem-shape model this crate builds on doesn't
/// attempt full RFC 4514 escaping, see `src/dn.rs`).
fn rdn_value_strategy() -> impl Strategy<Value = String> {
    "[a-zA-Z0-9 ._/:{}\\\\-]{1,16}"
}

fn suffix() -> Dn {
    Dn::parse("dc=example,dc=com")
}

proptest! {
    /// Two distinct leaf RDN values under the same suffix must never
    /// collide on the same path.
    #[test]
    fn distinct_leaf_values_never_collide(a in rdn_value_strategy(), b in rdn_value_strategy()) {
        prop_assume!(Rdn::new(format!("cn={a}")).normalized() != Rdn::new(format!("cn={b}")).normalized());

        let dn_a = Dn::parse(&format!("cn={a},dc=example,dc=com"));
        let dn_b = Dn::parse(&format!("cn={b},dc=example,dc=com"));

        let path_a = dn_to_path(&suffix(), Path::new("/base"), &dn_a);
        let path_b = dn_to_path(&suffix(), Path::new("/base"), &dn_b);

        if let (Some(pa), Some(pb)) = (path_a, path_b) {
            prop_assert_ne!(pa, pb);
        }
    }

    /// The codec must always produce a valid UTF-8 path string, never
    /// panicking or emitting invalid bytes; every input here is already
    /// valid UTF-8 by construction, so this asserts the encoder's own
    /// internal `String::from_utf8` expectation never trips.
    #[test]
    fn encoding_never_panics_and_stays_utf8(value in rdn_value_strategy()) {
        let dn = Dn::parse(&format!("cn={value},dc=example,dc=com"));
        if let Some(path) = dn_to_path(&suffix(), Path::new("/base"), &dn) {
            prop_assert!(path.to_str().is_some());
        }
    }

    /// A value containing the suffix separator byte (`.`) must never
    /// produce a path component that itself ends in `.ldif`, which would
    /// be ambiguous with the entry-file marker.
    #[test]
    fn suffix_separator_is_always_escaped(prefix in "[a-zA-Z0-9]{0,8}") {
        let value = format!("{prefix}.ldif");
        let dn = Dn::parse(&format!("cn={value},dc=example,dc=com"));
        if let Some(path) = dn_to_path(&suffix(), Path::new("/base"), &dn) {
            let leaf = path.file_name().and_then(|n| n.to_str()).unwrap_or_default();
            prop_assert!(leaf.ends_with(".ldif"));
            let stem = &leaf[..leaf.len() - ".ldif".len()];
            prop_assert!(!stem.ends_with(".ldif"));
        }
    }
}
