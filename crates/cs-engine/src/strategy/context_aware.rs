//! Context-aware strategy: operation-context classification.
//!
//! Classifies the surrounding situation (batch sync, structural
//! dependency, urgent decision) and routes to a specialized handler.
//! The handlers are extension points with a documented default: none of
//! them currently claims the conflict, so the candidate comes from the
//! timestamp signal with the classification noted in the reasoning.

use chrono::{Duration, Utc};
use cs_common::{Candidate, Conflict, EntityKind, ResolutionContext, Urgency};

use super::{timestamp, Strategy, StrategyError};

const APPLICABLE: &[EntityKind] = &[EntityKind::Card, EntityKind::Folder];

/// The situation classes the strategy distinguishes.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Situation {
    /// Unattended background sync processing many conflicts.
    Batch,
    /// The entity participates in a structural dependency (folder tree).
    Dependency,
    /// A decision is needed now (deadline or immediate urgency).
    Urgent,
    /// Nothing special about the context.
    Plain,
}

pub fn classify(conflict: &Conflict, ctx: &ResolutionContext) -> Situation {
    let deadline_close = ctx
        .time
        .deadline
        .map(|d| d - Utc::now() < Duration::seconds(60))
        .unwrap_or(false);
    if ctx.time.urgency == Urgency::Immediate || deadline_close {
        return Situation::Urgent;
    }
    if conflict.entity == EntityKind::Folder
        && (conflict.local.parent_id().is_some() || conflict.cloud.parent_id().is_some())
    {
        return Situation::Dependency;
    }
    if !ctx.time.user_active && ctx.time.urgency == Urgency::Background {
        return Situation::Batch;
    }
    Situation::Plain
}

/// Handler extension points. Each may claim the conflict by returning a
/// candidate; returning `None` falls through to the delegate default.
fn handle_batch(_conflict: &Conflict, _ctx: &ResolutionContext) -> Option<Candidate> {
    None
}

fn handle_dependency(_conflict: &Conflict, _ctx: &ResolutionContext) -> Option<Candidate> {
    None
}

fn handle_urgent(_conflict: &Conflict, _ctx: &ResolutionContext) -> Option<Candidate> {
    None
}

/// Operation-context classification with delegate default.
#[derive(Debug, Default)]
pub struct ContextAwareStrategy;

impl ContextAwareStrategy {
    pub fn new() -> Self {
        Self
    }
}

impl Strategy for ContextAwareStrategy {
    fn name(&self) -> &'static str {
        "context-aware"
    }

    fn default_priority(&self) -> u8 {
        8
    }

    fn applicable(&self) -> &[EntityKind] {
        APPLICABLE
    }

    fn evaluate(
        &self,
        conflict: &Conflict,
        ctx: &ResolutionContext,
    ) -> Result<Candidate, StrategyError> {
        let situation = classify(conflict, ctx);

        let handled = match situation {
            Situation::Batch => handle_batch(conflict, ctx),
            Situation::Dependency => handle_dependency(conflict, ctx),
            Situation::Urgent => handle_urgent(conflict, ctx),
            Situation::Plain => None,
        };
        if let Some(candidate) = handled {
            return Ok(candidate);
        }

        let mut c = timestamp::score(ctx);
        c.reasoning = format!("{situation:?} context, no specialized handling; {}", c.reasoning);
        Ok(c)
    }
}
