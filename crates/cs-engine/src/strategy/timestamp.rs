//! Timestamp strategy: last-writer heuristics adjusted for network
//! reliability.
//!
//! The scoring function is shared: several strategies delegate to it when
//! their own signal is inconclusive, and the cascade's guaranteed
//! fallback is built on it.

use cs_common::{Candidate, Conflict, EntityKind, ResolutionContext, ResolutionKind};

use super::{Strategy, StrategyError, ALL_ENTITIES};

/// Confidence ceiling for any timestamp-based decision.
const MAX_CONFIDENCE: f64 = 0.95;

/// Score a conflict purely from the write-time delta and the network
/// reliability sample.
///
/// - `Δt < 1s`: near-simultaneous writes; pick the replica the network
///   makes more trustworthy (`reliability > 0.5` favors cloud).
/// - `Δt < 5s`: newer write wins at moderate confidence.
/// - otherwise: newer write wins at high confidence.
///
/// All bands add `(reliability − 0.5) × 0.4`, so an unreliable link
/// lowers trust in the signal symmetrically.
pub fn score(ctx: &ResolutionContext) -> Candidate {
    let delta_ms = ctx.timestamp_delta_ms();
    let reliability = ctx.network.reliability;
    let net_adj = (reliability - 0.5) * 0.4;

    let newer = if ctx.local_op.at > ctx.cloud_op.at {
        ResolutionKind::LocalWins
    } else {
        ResolutionKind::CloudWins
    };

    let (resolution, base, detail) = if delta_ms < 1000 {
        let pick = if reliability > 0.5 {
            ResolutionKind::CloudWins
        } else {
            ResolutionKind::LocalWins
        };
        (
            pick,
            0.6,
            format!("writes {delta_ms}ms apart; picked by link reliability {reliability:.2}"),
        )
    } else if delta_ms < 5000 {
        (
            newer,
            0.75,
            format!("writes {delta_ms}ms apart; newer replica wins"),
        )
    } else {
        (
            newer,
            0.85,
            format!("writes {delta_ms}ms apart; clearly sequential, newer replica wins"),
        )
    };

    let confidence = (base + net_adj).clamp(0.0, MAX_CONFIDENCE);
    Candidate::new(resolution, confidence, detail)
}

/// Timestamp strategy wrapper around [`score`].
#[derive(Debug, Default)]
pub struct TimestampStrategy;

impl TimestampStrategy {
    pub fn new() -> Self {
        Self
    }
}

impl Strategy for TimestampStrategy {
    fn name(&self) -> &'static str {
        "timestamp"
    }

    fn default_priority(&self) -> u8 {
        1
    }

    fn applicable(&self) -> &[EntityKind] {
        ALL_ENTITIES
    }

    fn evaluate(
        &self,
        _conflict: &Conflict,
        ctx: &ResolutionContext,
    ) -> Result<Candidate, StrategyError> {
        Ok(score(ctx))
    }
}
