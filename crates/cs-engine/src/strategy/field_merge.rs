//! Field-merge strategy: per-field two-way reconciliation for cards and
//! tags.

use cs_common::{Candidate, Conflict, EntityKind, ResolutionContext, ResolutionKind};

use super::{content_diff, merge, Strategy, StrategyError};

const APPLICABLE: &[EntityKind] = &[EntityKind::Card, EntityKind::Tag];

/// Attempt a loss-free field-wise merge; fall back to the content
/// similarity decision when any field is irreconcilable.
#[derive(Debug, Default)]
pub struct FieldMergeStrategy;

impl FieldMergeStrategy {
    pub fn new() -> Self {
        Self
    }
}

impl Strategy for FieldMergeStrategy {
    fn name(&self) -> &'static str {
        "field-merge"
    }

    fn default_priority(&self) -> u8 {
        4
    }

    fn applicable(&self) -> &[EntityKind] {
        APPLICABLE
    }

    fn evaluate(
        &self,
        conflict: &Conflict,
        ctx: &ResolutionContext,
    ) -> Result<Candidate, StrategyError> {
        if let Some(result) =
            merge::merge_snapshots(conflict.entity, &conflict.local, &conflict.cloud)
        {
            let confidence = (0.6 + 0.3 * result.clean_fraction).min(0.9);
            return Ok(Candidate::new(
                ResolutionKind::Merge,
                confidence,
                format!(
                    "all fields reconciled ({:.0}% untouched)",
                    result.clean_fraction * 100.0
                ),
            )
            .with_merged(result.merged));
        }

        // Irreconcilable field: let the content similarity rules decide.
        Ok(content_diff::decide(conflict, ctx))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{Duration, Utc};
    use cs_common::{NetworkQuality, Severity, Snapshot};
    use serde_json::json;

    fn ctx() -> ResolutionContext {
        let now = Utc::now();
        ResolutionContext::new(
            now,
            now + Duration::milliseconds(200),
            NetworkQuality::new(0.8, 10.0, 40.0),
        )
    }

    #[test]
    fn clean_merge_scores_by_untouched_fraction() {
        let conflict = Conflict::new(
            EntityKind::Card,
            "card-1",
            "content_edit",
            Snapshot::new(json!({"front_content": "q", "back_content": "a", "tags": ["x"]})),
            Snapshot::new(json!({"front_content": "q", "back_content": "a", "tags": ["x", "y"]})),
            Severity::Low,
        );

        let c = FieldMergeStrategy::new().evaluate(&conflict, &ctx()).unwrap();
        assert_eq!(c.resolution, ResolutionKind::Merge);
        // 4 of 5 fields equal, tags merged: 0.6 + 0.3 * 0.8 = 0.84
        assert!((c.confidence - 0.84).abs() < 1e-9);
        let merged = c.merged.unwrap();
        assert_eq!(merged.get("tags").unwrap().as_array().unwrap().len(), 2);
    }

    #[test]
    fn tag_rename_both_sides_falls_through() {
        let conflict = Conflict::new(
            EntityKind::Tag,
            "tag-1",
            "rename",
            Snapshot::new(json!({"name": "projects"})),
            Snapshot::new(json!({"name": "work"})),
            Severity::Low,
        );

        let c = FieldMergeStrategy::new().evaluate(&conflict, &ctx()).unwrap();
        // Irreconcilable rename: decision comes from the similarity path,
        // never a silent merge.
        assert_ne!(c.resolution, ResolutionKind::Merge);
    }

    #[test]
    fn tag_extension_merges() {
        let conflict = Conflict::new(
            EntityKind::Tag,
            "tag-1",
            "rename",
            Snapshot::new(json!({"name": "projects 2026"})),
            Snapshot::new(json!({"name": "projects"})),
            Severity::Low,
        );

        let c = FieldMergeStrategy::new().evaluate(&conflict, &ctx()).unwrap();
        assert_eq!(c.resolution, ResolutionKind::Merge);
        assert_eq!(c.merged.unwrap().get("name"), Some(&json!("projects 2026")));
    }
}
