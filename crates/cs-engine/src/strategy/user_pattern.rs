//! User-pattern strategy: replay the user's historical resolution choice
//! for this entity kind.

use cs_common::{Candidate, Conflict, EntityKind, ResolutionContext};

use super::{timestamp, Strategy, StrategyError};

const APPLICABLE: &[EntityKind] = &[EntityKind::Card, EntityKind::Folder, EntityKind::Tag];

/// Learned per-entity resolution preference.
#[derive(Debug, Default)]
pub struct UserPatternStrategy;

impl UserPatternStrategy {
    pub fn new() -> Self {
        Self
    }
}

impl Strategy for UserPatternStrategy {
    fn name(&self) -> &'static str {
        "user-pattern"
    }

    fn default_priority(&self) -> u8 {
        3
    }

    fn applicable(&self) -> &[EntityKind] {
        APPLICABLE
    }

    fn evaluate(
        &self,
        conflict: &Conflict,
        ctx: &ResolutionContext,
    ) -> Result<Candidate, StrategyError> {
        if let Some(kind) = ctx.history.per_entity.get(&conflict.entity) {
            // Trust grows with how often past conflicts resolved without
            // the user stepping in.
            let confidence = (0.5 + ctx.history.auto_ratio() * 0.4).min(0.9);
            return Ok(Candidate::new(
                *kind,
                confidence,
                format!(
                    "user has settled {} conflicts as {} before",
                    conflict.entity, kind
                ),
            ));
        }

        if let Some(default) = ctx.preferences.default_resolution {
            return Ok(Candidate::new(
                default,
                0.6,
                format!("user default preference: {default}"),
            ));
        }

        let mut c = timestamp::score(ctx);
        c.reasoning = format!("no user pattern recorded; {}", c.reasoning);
        Ok(c)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{Duration, Utc};
    use cs_common::{NetworkQuality, ResolutionKind, Severity, Snapshot};
    use serde_json::json;

    fn conflict() -> Conflict {
        Conflict::new(
            EntityKind::Card,
            "card-1",
            "content_edit",
            Snapshot::new(json!({})),
            Snapshot::new(json!({})),
            Severity::Low,
        )
    }

    fn ctx() -> ResolutionContext {
        let now = Utc::now();
        ResolutionContext::new(
            now,
            now + Duration::milliseconds(200),
            NetworkQuality::new(0.8, 10.0, 40.0),
        )
    }

    #[test]
    fn replays_recorded_choice() {
        let mut ctx = ctx();
        ctx.history.total_conflicts = 10;
        ctx.history.auto_resolved = 5;
        ctx.history
            .per_entity
            .insert(EntityKind::Card, ResolutionKind::LocalWins);

        let c = UserPatternStrategy::new().evaluate(&conflict(), &ctx).unwrap();
        assert_eq!(c.resolution, ResolutionKind::LocalWins);
        // 0.5 + 0.5 * 0.4 = 0.7
        assert!((c.confidence - 0.7).abs() < 1e-9);
    }

    #[test]
    fn confidence_is_capped_at_090() {
        let mut ctx = ctx();
        ctx.history.total_conflicts = 100;
        ctx.history.auto_resolved = 100;
        ctx.history
            .per_entity
            .insert(EntityKind::Card, ResolutionKind::CloudWins);

        let c = UserPatternStrategy::new().evaluate(&conflict(), &ctx).unwrap();
        assert!((c.confidence - 0.9).abs() < 1e-9);
    }

    #[test]
    fn falls_back_to_default_preference() {
        let mut ctx = ctx();
        ctx.preferences.default_resolution = Some(ResolutionKind::CloudWins);

        let c = UserPatternStrategy::new().evaluate(&conflict(), &ctx).unwrap();
        assert_eq!(c.resolution, ResolutionKind::CloudWins);
        assert!((c.confidence - 0.6).abs() < 1e-9);
    }

    #[test]
    fn delegates_without_any_signal() {
        let c = UserPatternStrategy::new().evaluate(&conflict(), &ctx()).unwrap();
        assert!(c.reasoning.contains("no user pattern"));
    }
}
