//! Resolution strategies.
//!
//! Each strategy is a pure decision function over `(Conflict,
//! ResolutionContext)` specialized on one signal. The cascade owns a
//! registry of boxed strategies with priority and applicability as static
//! metadata; there is no runtime name matching.
//!
//! Priorities run cheap-and-reliable first:
//!
//! | priority | strategy      | signal                       |
//! |----------|---------------|------------------------------|
//! | 1        | timestamp     | write-time delta + network   |
//! | 2        | content-diff  | field-level similarity       |
//! | 3        | user-pattern  | persisted user choices       |
//! | 4        | field-merge   | per-field merge feasibility  |
//! | 5        | network-aware | composite network score      |
//! | 6        | semantic      | keyword overlap              |
//! | 7        | hierarchy     | folder structure             |
//! | 8        | context-aware | batch/dependency/urgency     |

use cs_common::{Candidate, Conflict, EntityKind, ResolutionContext};
use thiserror::Error;

pub mod content_diff;
pub mod context_aware;
pub mod field_merge;
pub mod hierarchy;
pub mod merge;
pub mod network;
pub mod semantic;
pub mod timestamp;
pub mod user_pattern;

pub use content_diff::ContentDiffStrategy;
pub use context_aware::ContextAwareStrategy;
pub use field_merge::FieldMergeStrategy;
pub use hierarchy::HierarchyStrategy;
pub use network::NetworkAwareStrategy;
pub use semantic::SemanticStrategy;
pub use timestamp::TimestampStrategy;
pub use user_pattern::UserPatternStrategy;

/// Errors from a single strategy invocation. Always recoverable: the
/// cascade retries, then skips.
#[derive(Debug, Error)]
pub enum StrategyError {
    #[error("strategy input missing: {0}")]
    MissingInput(String),

    #[error("collaborator lookup failed: {0}")]
    Lookup(#[from] cs_common::Error),
}

/// A signal-specific resolution heuristic.
pub trait Strategy: Send + Sync {
    /// Stable name, used in fallback chains and statistics.
    fn name(&self) -> &'static str;

    /// Default cascade priority (lower runs earlier). The re-ranking job
    /// may override this per registry entry.
    fn default_priority(&self) -> u8;

    /// Entity kinds this strategy knows how to score.
    fn applicable(&self) -> &[EntityKind];

    fn evaluate(
        &self,
        conflict: &Conflict,
        ctx: &ResolutionContext,
    ) -> Result<Candidate, StrategyError>;
}

pub(crate) const ALL_ENTITIES: &[EntityKind] = &[
    EntityKind::Card,
    EntityKind::Folder,
    EntityKind::Tag,
    EntityKind::Image,
];
