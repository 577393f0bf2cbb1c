//! Semantic strategy: keyword-overlap heuristics for cards and tags.
//!
//! The overlap coefficient (`|A∩B| / min(|A|, |B|)`) is deliberately
//! forgiving toward one side being a superset of the other; pure
//! extensions are treated as complementary edits and merged.

use cs_common::{Candidate, Conflict, EntityKind, ResolutionContext, ResolutionKind, Snapshot};
use std::collections::BTreeSet;

use super::{merge, timestamp, Strategy, StrategyError};

const APPLICABLE: &[EntityKind] = &[EntityKind::Card, EntityKind::Tag];

/// Keywords: lowercase alphanumeric runs longer than two characters.
fn keywords(text: &str) -> BTreeSet<String> {
    text.split(|c: char| !c.is_alphanumeric())
        .filter(|w| w.len() > 2)
        .map(|w| w.to_lowercase())
        .collect()
}

fn entity_text(entity: EntityKind, snap: &Snapshot) -> String {
    match entity {
        EntityKind::Card => format!(
            "{} {}",
            snap.front_content().unwrap_or(""),
            snap.back_content().unwrap_or("")
        ),
        _ => snap.name().unwrap_or("").to_string(),
    }
}

/// Overlap coefficient between the two snapshots' keyword sets.
pub fn keyword_overlap(entity: EntityKind, local: &Snapshot, cloud: &Snapshot) -> f64 {
    let a = keywords(&entity_text(entity, local));
    let b = keywords(&entity_text(entity, cloud));
    if a.is_empty() && b.is_empty() {
        return 1.0;
    }
    if a.is_empty() || b.is_empty() {
        return 0.0;
    }
    let inter = a.intersection(&b).count() as f64;
    inter / a.len().min(b.len()) as f64
}

fn complementary(entity: EntityKind, local: &Snapshot, cloud: &Snapshot) -> Option<Candidate> {
    let l = entity_text(entity, local);
    let c = entity_text(entity, cloud);
    let (l_norm, c_norm) = (l.trim().to_lowercase(), c.trim().to_lowercase());
    if l_norm.is_empty() || c_norm.is_empty() {
        return None;
    }
    if l_norm.contains(&c_norm) || c_norm.contains(&l_norm) {
        let result = merge::merge_snapshots(entity, local, cloud)?;
        return Some(
            Candidate::new(
                ResolutionKind::Merge,
                0.8,
                "one side purely extends the other; merged",
            )
            .with_merged(result.merged),
        );
    }
    None
}

/// Keyword-overlap comparison for cards and tags.
#[derive(Debug, Default)]
pub struct SemanticStrategy;

impl SemanticStrategy {
    pub fn new() -> Self {
        Self
    }
}

impl Strategy for SemanticStrategy {
    fn name(&self) -> &'static str {
        "semantic"
    }

    fn default_priority(&self) -> u8 {
        6
    }

    fn applicable(&self) -> &[EntityKind] {
        APPLICABLE
    }

    fn evaluate(
        &self,
        conflict: &Conflict,
        ctx: &ResolutionContext,
    ) -> Result<Candidate, StrategyError> {
        let overlap = keyword_overlap(conflict.entity, &conflict.local, &conflict.cloud);

        if overlap > 0.9 {
            if let Some(result) =
                merge::merge_snapshots(conflict.entity, &conflict.local, &conflict.cloud)
            {
                return Ok(Candidate::new(
                    ResolutionKind::Merge,
                    0.6 + 0.3 * result.clean_fraction,
                    format!("keyword overlap {overlap:.2}; merged"),
                )
                .with_merged(result.merged));
            }
            // Same vocabulary, different arrangement: weighted delegate.
        } else if overlap < 0.4 {
            if let Some(candidate) = complementary(conflict.entity, &conflict.local, &conflict.cloud)
            {
                return Ok(candidate);
            }
            return Ok(Candidate::new(
                ResolutionKind::Manual,
                0.95,
                format!("keyword overlap {overlap:.2}; meanings diverged, manual review"),
            ));
        }

        let mut c = timestamp::score(ctx);
        c.confidence = (c.confidence * (0.5 + overlap / 2.0)).clamp(0.0, 0.95);
        c.reasoning = format!("keyword overlap {overlap:.2} inconclusive; {}", c.reasoning);
        Ok(c)
    }
}
