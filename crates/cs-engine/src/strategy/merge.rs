//! Two-way field merge helpers.
//!
//! Shared by the content-diff and field-merge strategies so neither can
//! recurse into the other. With no common ancestor available, a field
//! merges cleanly only when the two sides are reconcilable on their own:
//! equal values, a one-sided edit, pure text extension, or a tag union.

use cs_common::{EntityKind, Snapshot};
use serde_json::{Map, Value};
use std::collections::BTreeSet;

/// How a single field merged.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FieldOutcome {
    /// Both sides already agree.
    Equal,
    /// Reconciled without loss (one-sided value, containment, union).
    Merged,
    /// Irreconcilable two-sided edit.
    Failed,
}

/// Result of merging a whole snapshot pair.
#[derive(Debug, Clone)]
pub struct SnapshotMerge {
    pub merged: Value,
    /// Fraction of fields where both sides already agreed.
    pub clean_fraction: f64,
}

/// Merge two text fields. `None` means irreconcilable.
pub fn merge_text(local: Option<&str>, cloud: Option<&str>) -> Option<(Value, FieldOutcome)> {
    match (unwrap_empty(local), unwrap_empty(cloud)) {
        (None, None) => Some((Value::Null, FieldOutcome::Equal)),
        (Some(l), None) => Some((Value::String(l.to_string()), FieldOutcome::Merged)),
        (None, Some(c)) => Some((Value::String(c.to_string()), FieldOutcome::Merged)),
        (Some(l), Some(c)) => {
            if l == c {
                Some((Value::String(l.to_string()), FieldOutcome::Equal))
            } else if l.contains(c) {
                // Cloud text is a prefix/substring of the local edit: the
                // local side extended it.
                Some((Value::String(l.to_string()), FieldOutcome::Merged))
            } else if c.contains(l) {
                Some((Value::String(c.to_string()), FieldOutcome::Merged))
            } else {
                None
            }
        }
    }
}

/// Union of the two tag sets, order-normalized. Always succeeds.
pub fn merge_tags(local: &[String], cloud: &[String]) -> (Vec<String>, FieldOutcome) {
    let l: BTreeSet<&String> = local.iter().collect();
    let c: BTreeSet<&String> = cloud.iter().collect();
    let union: Vec<String> = l.union(&c).map(|s| s.to_string()).collect();
    let outcome = if l == c {
        FieldOutcome::Equal
    } else {
        FieldOutcome::Merged
    };
    (union, outcome)
}

/// Merge a scalar-or-object field that has no union semantics: equal or
/// one-sided only.
pub fn merge_opaque(local: Option<&Value>, cloud: Option<&Value>) -> Option<(Value, FieldOutcome)> {
    match (local, cloud) {
        (None, None) => Some((Value::Null, FieldOutcome::Equal)),
        (Some(l), None) => Some((l.clone(), FieldOutcome::Merged)),
        (None, Some(c)) => Some((c.clone(), FieldOutcome::Merged)),
        (Some(l), Some(c)) if l == c => Some((l.clone(), FieldOutcome::Equal)),
        _ => None,
    }
}

fn unwrap_empty(s: Option<&str>) -> Option<&str> {
    s.filter(|t| !t.trim().is_empty())
}

fn push_outcome(
    merged: &mut Map<String, Value>,
    outcomes: &mut Vec<FieldOutcome>,
    field: &str,
    result: Option<(Value, FieldOutcome)>,
) -> bool {
    match result {
        Some((value, outcome)) => {
            if !value.is_null() {
                merged.insert(field.to_string(), value);
            }
            outcomes.push(outcome);
            true
        }
        None => false,
    }
}

/// Merge a snapshot pair field-by-field for the given entity kind.
///
/// Returns `None` when any field is irreconcilable; the caller decides
/// whether that means manual review or a timestamp delegate.
pub fn merge_snapshots(
    entity: EntityKind,
    local: &Snapshot,
    cloud: &Snapshot,
) -> Option<SnapshotMerge> {
    let mut merged = Map::new();
    let mut outcomes = Vec::new();

    let ok = match entity {
        EntityKind::Card => {
            let text_ok = push_outcome(
                &mut merged,
                &mut outcomes,
                "front_content",
                merge_text(local.front_content(), cloud.front_content()),
            ) && push_outcome(
                &mut merged,
                &mut outcomes,
                "back_content",
                merge_text(local.back_content(), cloud.back_content()),
            );

            let style_ok = push_outcome(
                &mut merged,
                &mut outcomes,
                "style",
                merge_opaque(local.0.get("style"), cloud.0.get("style")),
            );
            let folder_ok = push_outcome(
                &mut merged,
                &mut outcomes,
                "folder_id",
                merge_opaque(local.0.get("folder_id"), cloud.0.get("folder_id")),
            );

            let (tags, tag_outcome) = merge_tags(&local.tags(), &cloud.tags());
            merged.insert(
                "tags".to_string(),
                Value::Array(tags.into_iter().map(Value::String).collect()),
            );
            outcomes.push(tag_outcome);

            text_ok && style_ok && folder_ok
        }
        EntityKind::Tag | EntityKind::Folder => {
            push_outcome(
                &mut merged,
                &mut outcomes,
                "name",
                merge_text(local.name(), cloud.name()),
            ) && push_outcome(
                &mut merged,
                &mut outcomes,
                "parent_id",
                merge_opaque(local.0.get("parent_id"), cloud.0.get("parent_id")),
            )
        }
        // Image payloads are opaque blobs; nothing to merge field-wise.
        EntityKind::Image => false,
    };

    if !ok {
        return None;
    }

    let equal = outcomes
        .iter()
        .filter(|o| **o == FieldOutcome::Equal)
        .count();
    let clean_fraction = if outcomes.is_empty() {
        0.0
    } else {
        equal as f64 / outcomes.len() as f64
    };

    Some(SnapshotMerge {
        merged: Value::Object(merged),
        clean_fraction,
    })
}
