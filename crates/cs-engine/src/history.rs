//! Conflict history persistence.
//!
//! The running aggregates (`total_conflicts`, `auto_resolved`, average
//! resolution time, per-entity resolution pattern) feed the user-pattern
//! strategy on the next sync round. Persistence is best-effort: a failed
//! read degrades to defaults, a failed write is logged and ignored.

use cs_common::{Conflict, ConflictHistory, Resolution};

use crate::store::PreferenceStore;

pub const HISTORY_KEY: &str = "conflict_history";

/// Load the persisted history, degrading to defaults on any failure.
pub fn load(store: &dyn PreferenceStore) -> ConflictHistory {
    match store.get(HISTORY_KEY) {
        Ok(Some(value)) => match serde_json::from_value(value) {
            Ok(history) => history,
            Err(e) => {
                tracing::warn!(error = %e, "conflict history corrupt; using defaults");
                ConflictHistory::default()
            }
        },
        Ok(None) => ConflictHistory::default(),
        Err(e) => {
            tracing::warn!(error = %e, "conflict history unavailable; using defaults");
            ConflictHistory::default()
        }
    }
}

/// Fold one resolution into the persisted history.
pub fn record_outcome(
    store: &dyn PreferenceStore,
    conflict: &Conflict,
    resolution: &Resolution,
    elapsed_ms: u64,
) {
    let mut history = load(store);
    history.record(
        conflict.entity,
        resolution.kind,
        resolution.is_automatic(),
        elapsed_ms,
    );

    let value = match serde_json::to_value(&history) {
        Ok(v) => v,
        Err(e) => {
            tracing::warn!(error = %e, "conflict history serialization failed");
            return;
        }
    };
    if let Err(e) = store.set(HISTORY_KEY, value) {
        tracing::warn!(error = %e, "conflict history write failed; continuing in-memory");
    }
}
