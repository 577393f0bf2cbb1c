//! Hierarchy strategy: structural checks for folder conflicts.
//!
//! Walks the injected folder tree to detect circular dependencies and to
//! compare structural depth. Walks are depth-capped; a revisited id is
//! treated as a circular dependency even though the caller promises
//! acyclic data.

use cs_common::{Candidate, Conflict, EntityKind, ResolutionContext, ResolutionKind, Snapshot};
use std::collections::BTreeSet;
use std::sync::Arc;

use super::{Strategy, StrategyError};
use crate::store::HierarchyLookup;

const APPLICABLE: &[EntityKind] = &[EntityKind::Folder];

/// Structural checks over the folder tree.
pub struct HierarchyStrategy {
    lookup: Arc<dyn HierarchyLookup>,
    max_depth: u32,
}

impl HierarchyStrategy {
    pub fn new(lookup: Arc<dyn HierarchyLookup>, max_depth: u32) -> Self {
        Self { lookup, max_depth }
    }

    /// Depth of `folder_id` from the root, and whether the walk hit a
    /// cycle (revisited id or exceeded the cap).
    fn walk(&self, folder_id: &str) -> Result<(u32, bool), StrategyError> {
        let mut seen = BTreeSet::new();
        let mut current = folder_id.to_string();
        let mut depth = 0u32;

        loop {
            if !seen.insert(current.clone()) {
                return Ok((depth, true));
            }
            if depth >= self.max_depth {
                return Ok((depth, true));
            }
            match self.lookup.parent_of(&current)? {
                Some(parent) => {
                    depth += 1;
                    current = parent.id;
                }
                None => return Ok((depth, false)),
            }
        }
    }

    /// Depth the folder would have under the snapshot's parent.
    fn depth_under(&self, snap: &Snapshot) -> Result<(u32, bool), StrategyError> {
        match snap.parent_id() {
            Some(parent) => {
                let (d, cyclic) = self.walk(parent)?;
                Ok((d + 1, cyclic))
            }
            None => Ok((0, false)),
        }
    }
}

/// Structural complexity in [0, 1]: deep trees and long names make a
/// folder conflict harder to resolve automatically.
fn complexity(depth: u32, name_len: usize) -> f64 {
    0.6 * (depth as f64 / 8.0).min(1.0) + 0.4 * (name_len as f64 / 48.0).min(1.0)
}

fn name_len(snap: &Snapshot) -> usize {
    snap.name().map(str::len).unwrap_or(0)
}

impl Strategy for HierarchyStrategy {
    fn name(&self) -> &'static str {
        "hierarchy"
    }

    fn default_priority(&self) -> u8 {
        7
    }

    fn applicable(&self) -> &[EntityKind] {
        APPLICABLE
    }

    fn evaluate(
        &self,
        conflict: &Conflict,
        _ctx: &ResolutionContext,
    ) -> Result<Candidate, StrategyError> {
        let (local_depth, local_cycle) = self.depth_under(&conflict.local)?;
        let (cloud_depth, cloud_cycle) = self.depth_under(&conflict.cloud)?;

        if local_cycle
            || cloud_cycle
            || conflict.local.parent_id() == Some(conflict.entity_id.as_str())
            || conflict.cloud.parent_id() == Some(conflict.entity_id.as_str())
        {
            return Ok(Candidate::new(
                ResolutionKind::Manual,
                0.9,
                "circular folder dependency detected; manual restructuring required",
            ));
        }

        if conflict.local.parent_id() != conflict.cloud.parent_id() {
            return Ok(Candidate::new(
                ResolutionKind::Manual,
                0.8,
                "replicas moved the folder under different parents",
            ));
        }

        let local_name = name_len(&conflict.local);
        let cloud_name = name_len(&conflict.cloud);
        let score = complexity(
            local_depth.max(cloud_depth),
            local_name.max(cloud_name),
        );

        if score < 0.3 {
            let winner = if local_name <= cloud_name {
                ResolutionKind::LocalWins
            } else {
                ResolutionKind::CloudWins
            };
            return Ok(Candidate::new(
                winner,
                0.7,
                format!("simple structure (complexity {score:.2}); shorter name wins"),
            ));
        }

        if score < 0.7 {
            let winner = match local_depth.cmp(&cloud_depth) {
                std::cmp::Ordering::Less => ResolutionKind::LocalWins,
                std::cmp::Ordering::Greater => ResolutionKind::CloudWins,
                std::cmp::Ordering::Equal => {
                    if local_name <= cloud_name {
                        ResolutionKind::LocalWins
                    } else {
                        ResolutionKind::CloudWins
                    }
                }
            };
            return Ok(Candidate::new(
                winner,
                0.8,
                format!("moderate structure (complexity {score:.2}); shallower placement wins"),
            ));
        }

        Ok(Candidate::new(
            ResolutionKind::Manual,
            0.8,
            format!("complex folder structure (complexity {score:.2}); manual review"),
        ))
    }
}
