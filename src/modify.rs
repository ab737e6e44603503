//! Modification-list processing wired onto [`Entry`]'s primitives.

use crate::entry::Entry;
use crate::error::LdapCode;

/// One item of a modify request's modification list.
#[derive(Debug, Clone)]
pub enum ModOp {
    Add { attr: String, values: Vec<String> },
    Delete { attr: String, values: Vec<String> },
    Replace { attr: String, values: Vec<String> },
    Increment { attr: String, delta: i64 },
    /// Add only if the attribute is not already present; a no-op (not an
    /// error) if it is. Used where a caller wants "set if absent" without
    /// first reading the entry back.
    SoftAdd { attr: String, values: Vec<String> },
}

/// Apply a modification list to `entry` in order, stopping at the first
/// failing op. Modifications are applied sequentially, not atomically
/// validated up front.
///
/// Returns whether any op touched `objectClass`. Callers that maintain a
/// schema-derived cache keyed on object class should invalidate it when
/// this is `true`.
pub fn apply_modifications(entry: &mut Entry, ops: &[ModOp]) -> Result<bool, LdapCode> {
    let mut object_class_changed = false;
    for op in ops {
        if op_attr(op).eq_ignore_ascii_case("objectclass") {
            object_class_changed = true;
        }
        match op {
            ModOp::Add { attr, values } => entry.add_values(attr, values.clone()),
            ModOp::Delete { attr, values } => entry.delete_values(attr, values),
            ModOp::Replace { attr, values } => entry.replace_values(attr, values.clone()),
            ModOp::Increment { attr, delta } => entry.increment_value(attr, *delta)?,
            ModOp::SoftAdd { attr, values } => {
                if !entry.has_attr(attr) {
                    entry.add_values(attr, values.clone());
                }
            }
        }
    }
    Ok(object_class_changed)
}

fn op_attr(op: &ModOp) -> &str {
    match op {
        ModOp::Add { attr, .. }
        | ModOp::Delete { attr, .. }
        | ModOp::Replace { attr, .. }
        | ModOp::Increment { attr, .. }
        | ModOp::SoftAdd { attr, .. } => attr,
    }
}
