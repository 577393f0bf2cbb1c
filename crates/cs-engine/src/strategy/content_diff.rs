//! Content-diff strategy: field-level similarity for cards.
//!
//! Similarity is averaged over the five card fields. Near-identical
//! contents defer to the timestamp signal; heavily diverged contents go
//! to manual review unless a field merge reconciles them.

use cs_common::{Candidate, Conflict, EntityKind, ResolutionContext, ResolutionKind, Snapshot};
use std::collections::BTreeSet;

use super::{merge, timestamp, Strategy, StrategyError};

const APPLICABLE: &[EntityKind] = &[EntityKind::Card];

/// Token-set Jaccard similarity between two text fields.
pub fn token_jaccard(a: Option<&str>, b: Option<&str>) -> f64 {
    let ta = tokens(a);
    let tb = tokens(b);
    if ta.is_empty() && tb.is_empty() {
        return 1.0;
    }
    if ta.is_empty() || tb.is_empty() {
        return 0.0;
    }
    let inter = ta.intersection(&tb).count() as f64;
    let union = ta.union(&tb).count() as f64;
    inter / union
}

fn tokens(text: Option<&str>) -> BTreeSet<String> {
    text.map(|t| {
        t.split(|c: char| !c.is_alphanumeric())
            .filter(|w| !w.is_empty())
            .map(|w| w.to_lowercase())
            .collect()
    })
    .unwrap_or_default()
}

/// Property-equality ratio between two style objects.
fn style_similarity(local: &Snapshot, cloud: &Snapshot) -> f64 {
    match (local.style(), cloud.style()) {
        (None, None) => 1.0,
        (Some(_), None) | (None, Some(_)) => 0.0,
        (Some(l), Some(c)) => {
            let keys: BTreeSet<&String> = l.keys().chain(c.keys()).collect();
            if keys.is_empty() {
                return 1.0;
            }
            let equal = keys.iter().filter(|k| l.get(**k) == c.get(**k)).count();
            equal as f64 / keys.len() as f64
        }
    }
}

fn set_jaccard(a: &[String], b: &[String]) -> f64 {
    let sa: BTreeSet<&String> = a.iter().collect();
    let sb: BTreeSet<&String> = b.iter().collect();
    if sa.is_empty() && sb.is_empty() {
        return 1.0;
    }
    let inter = sa.intersection(&sb).count() as f64;
    let union = sa.union(&sb).count() as f64;
    inter / union
}

/// Average similarity over the card fields the sync layer diffs.
pub fn card_similarity(local: &Snapshot, cloud: &Snapshot) -> f64 {
    let front = token_jaccard(local.front_content(), cloud.front_content());
    let back = token_jaccard(local.back_content(), cloud.back_content());
    let style = style_similarity(local, cloud);
    let folder = if local.folder_id() == cloud.folder_id() {
        1.0
    } else {
        0.0
    };
    let tags = set_jaccard(&local.tags(), &cloud.tags());
    (front + back + style + folder + tags) / 5.0
}

/// Entity-aware snapshot similarity. Cards compare the full field set;
/// named entities compare name and parent.
pub fn snapshot_similarity(entity: EntityKind, local: &Snapshot, cloud: &Snapshot) -> f64 {
    match entity {
        EntityKind::Card => card_similarity(local, cloud),
        EntityKind::Tag | EntityKind::Folder => {
            let name = token_jaccard(local.name(), cloud.name());
            let parent = if local.parent_id() == cloud.parent_id() {
                1.0
            } else {
                0.0
            };
            (name + parent) / 2.0
        }
        EntityKind::Image => 0.0,
    }
}

/// Content-diff decision shared with the field-merge failure path.
pub(crate) fn decide(conflict: &Conflict, ctx: &ResolutionContext) -> Candidate {
    let similarity = snapshot_similarity(conflict.entity, &conflict.local, &conflict.cloud);

    if similarity > 0.9 {
        let mut c = timestamp::score(ctx);
        c.reasoning = format!(
            "contents nearly identical (similarity {similarity:.2}); {}",
            c.reasoning
        );
        return c;
    }

    if similarity < 0.3 {
        if let Some(result) = merge::merge_snapshots(conflict.entity, &conflict.local, &conflict.cloud)
        {
            return Candidate::new(
                ResolutionKind::Merge,
                0.6 + 0.3 * result.clean_fraction,
                format!("contents diverged (similarity {similarity:.2}) but fields merge cleanly"),
            )
            .with_merged(result.merged);
        }
        return Candidate::new(
            ResolutionKind::Manual,
            0.9,
            format!("contents diverged (similarity {similarity:.2}); manual review needed"),
        );
    }

    // Middle band: attempt a whole-snapshot merge before deferring.
    if let Some(result) = merge::merge_snapshots(conflict.entity, &conflict.local, &conflict.cloud) {
        return Candidate::new(
            ResolutionKind::Merge,
            0.6 + 0.3 * result.clean_fraction,
            format!("partial overlap (similarity {similarity:.2}); merged field-wise"),
        )
        .with_merged(result.merged);
    }

    let mut c = timestamp::score(ctx);
    c.reasoning = format!(
        "partial overlap (similarity {similarity:.2}), merge not possible; {}",
        c.reasoning
    );
    c
}

/// Field-level content comparison for cards.
#[derive(Debug, Default)]
pub struct ContentDiffStrategy;

impl ContentDiffStrategy {
    pub fn new() -> Self {
        Self
    }
}

impl Strategy for ContentDiffStrategy {
    fn name(&self) -> &'static str {
        "content-diff"
    }

    fn default_priority(&self) -> u8 {
        2
    }

    fn applicable(&self) -> &[EntityKind] {
        APPLICABLE
    }

    fn evaluate(
        &self,
        conflict: &Conflict,
        ctx: &ResolutionContext,
    ) -> Result<Candidate, StrategyError> {
        Ok(decide(conflict, ctx))
    }
}
