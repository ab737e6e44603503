//! Reversible encoding between a normalized DN and a filesystem path
//! under a configured base directory.
//!
//! The encoding is deliberately one-way: enumeration reads DNs back out
//! of file contents, never out of filenames. What must hold, and what
//! the property tests in `tests/path_codec_properties.rs` check, is
//! injectivity and byte safety.

use std::path::{Path, PathBuf};

use crate::dn::Dn;

#[cfg(windows)]
mod platform {
    /// Bytes that cannot appear in a Windows filename component.
    pub const UNSAFE: &[u8] = b"/:<>\"|?*";
    /// `\` is itself a path separator on Windows, so the DN escape byte
    /// cannot pass through unchanged; substitute `^`.
    pub const ESCAPE_SUBSTITUTE: u8 = b'^';
    pub const BRACE_LEFT: u8 = b'{';
    pub const BRACE_RIGHT: u8 = b'}';
}

#[cfg(not(windows))]
mod platform {
    /// Bytes that cannot appear in a POSIX filename component.
    pub const UNSAFE: &[u8] = b"/:";
    /// `\` is filename-safe on POSIX: identity substitution.
    pub const ESCAPE_SUBSTITUTE: u8 = b'\\';
    pub const BRACE_LEFT: u8 = b'{';
    pub const BRACE_RIGHT: u8 = b'}';
}

const DN_ESCAPE: u8 = b'\\';
const SUFFIX_SEPARATOR: u8 = b'.';
const BRACE_LEFT_DN: u8 = b'{';
const BRACE_RIGHT_DN: u8 = b'}';

const fn contains(set: &[u8], byte: u8) -> bool {
    let mut i = 0;
    while i < set.len() {
        if set[i] == byte {
            return true;
        }
        i += 1;
    }
    false
}

// Refuse to build if the chosen encoding would map any of `-`, the escape
// byte, or the brace delimiters into the platform's unsafe byte set.
const _: () = {
    assert!(!contains(platform::UNSAFE, b'-'));
    assert!(!contains(platform::UNSAFE, platform::ESCAPE_SUBSTITUTE));
    assert!(!contains(platform::UNSAFE, platform::BRACE_LEFT));
    assert!(!contains(platform::UNSAFE, platform::BRACE_RIGHT));
};

fn push_hex_escaped(out: &mut Vec<u8>, byte: u8) {
    out.push(platform::ESCAPE_SUBSTITUTE);
    out.extend_from_slice(format!("{byte:02X}").as_bytes());
}

/// Encode a single string (an RDN's normalized form, or the whole
/// normalized suffix joined by commas) through the per-character decision
/// ladder.
fn encode_component(input: &str) -> String {
    let mut out = Vec::with_capacity(input.len());
    for &byte in input.as_bytes() {
        let escape_substitute_collides = platform::ESCAPE_SUBSTITUTE != DN_ESCAPE
            && byte == platform::ESCAPE_SUBSTITUTE;
        let brace_left_collides =
            platform::BRACE_LEFT != BRACE_LEFT_DN && byte == platform::BRACE_LEFT;
        let brace_right_collides =
            platform::BRACE_RIGHT != BRACE_RIGHT_DN && byte == platform::BRACE_RIGHT;

        if byte == SUFFIX_SEPARATOR {
            push_hex_escaped(&mut out, byte);
        } else if escape_substitute_collides || brace_left_collides || brace_right_collides {
            push_hex_escaped(&mut out, byte);
        } else if byte == DN_ESCAPE {
            out.push(platform::ESCAPE_SUBSTITUTE);
        } else if byte == BRACE_LEFT_DN {
            out.push(platform::BRACE_LEFT);
        } else if byte == BRACE_RIGHT_DN {
            out.push(platform::BRACE_RIGHT);
        } else if contains(platform::UNSAFE, byte) {
            push_hex_escaped(&mut out, byte);
        } else {
            out.push(byte);
        }
    }
    // Safety/invariant: every byte we substitute or hex-escape is ASCII, so
    // UTF-8 multi-byte sequences from the original `&str` pass through
    // untouched and the result stays valid UTF-8.
    String::from_utf8(out).expect("path codec preserves utf-8 validity")
}

/// A total function from a normalized DN under `suffix` to a path under
/// `base`.
///
/// Returns `None` if `normalized_dn` is not under `suffix`.
pub fn dn_to_path(suffix: &Dn, base: &Path, normalized_dn: &Dn) -> Option<PathBuf> {
    let above = normalized_dn.strip_suffix(suffix)?;

    let suffix_component = encode_component(&suffix.normalized_string());

    let mut path = base.to_path_buf();
    if above.is_empty() {
        path.push(format!("{suffix_component}.ldif"));
        return Some(path);
    }

    path.push(suffix_component);
    // `above` is leaf-to-root; walk it root-to-leaf so the deepest
    // directory nesting matches the DN's ancestry.
    for (i, rdn) in above.iter().rev().enumerate() {
        let encoded = encode_component(rdn.normalized());
        if i + 1 == above.len() {
            path.push(format!("{encoded}.ldif"));
        } else {
            path.push(encoded);
        }
    }
    Some(path)
}
