//! Property-based tests for cascade invariants.

use std::sync::Arc;

use chrono::{Duration, Utc};
use proptest::prelude::*;

use cs_common::{
    Candidate, Conflict, EntityKind, NetworkQuality, ResolutionContext, ResolutionKind, Severity,
    Snapshot,
};
use cs_config::CascadeConfig;
use cs_engine::cascade::FALLBACK_STRATEGY;
use cs_engine::store::StaticHierarchy;
use cs_engine::Strategy as ResolutionStrategy;
use cs_engine::{Cascade, StrategyError};

fn entity_strategy() -> impl Strategy<Value = EntityKind> {
    prop_oneof![
        Just(EntityKind::Card),
        Just(EntityKind::Folder),
        Just(EntityKind::Tag),
        Just(EntityKind::Image),
    ]
}

fn severity_strategy() -> impl Strategy<Value = Severity> {
    prop_oneof![
        Just(Severity::Low),
        Just(Severity::Medium),
        Just(Severity::High),
        Just(Severity::Critical),
    ]
}

fn snapshot_strategy() -> impl Strategy<Value = Snapshot> {
    (
        "[a-z ]{0,40}",
        "[a-z ]{0,40}",
        proptest::option::of("[a-z]{1,8}"),
        proptest::collection::vec("[a-z]{1,6}", 0..4),
    )
        .prop_map(|(front, back, parent, tags)| {
            Snapshot::new(serde_json::json!({
                "front_content": front,
                "back_content": back,
                "name": front,
                "parent_id": parent,
                "tags": tags,
            }))
        })
}

fn conflict_strategy() -> impl Strategy<Value = Conflict> {
    (
        entity_strategy(),
        severity_strategy(),
        snapshot_strategy(),
        snapshot_strategy(),
    )
        .prop_map(|(entity, severity, local, cloud)| {
            Conflict::new(entity, "e-1", "edit", local, cloud, severity)
        })
}

fn context_strategy() -> impl Strategy<Value = ResolutionContext> {
    (
        -600_000i64..600_000,
        0.0f64..=1.0,
        0.0f64..=100.0,
        0.0f64..=2000.0,
    )
        .prop_map(|(delta_ms, reliability, bandwidth, latency)| {
            let base = Utc::now();
            ResolutionContext::new(
                base,
                base + Duration::milliseconds(delta_ms),
                NetworkQuality::new(reliability, bandwidth, latency),
            )
        })
}

fn cascade() -> Cascade {
    let config = CascadeConfig {
        retry_backoff_ms: 0,
        ..CascadeConfig::default()
    };
    Cascade::new(config, Arc::new(StaticHierarchy::new()))
}

proptest! {
    #![proptest_config(ProptestConfig::with_cases(512))]

    /// `resolve` always terminates with a well-formed resolution, and low
    /// confidence always demands user confirmation.
    #[test]
    fn resolve_upholds_confidence_consent_coupling(
        conflict in conflict_strategy(),
        ctx in context_strategy(),
    ) {
        let resolution = cascade().resolve(&conflict, &ctx);

        prop_assert!((0.0..=1.0).contains(&resolution.confidence));
        if resolution.confidence < 0.7 {
            prop_assert!(
                resolution.requires_confirmation,
                "confidence {} without confirmation",
                resolution.confidence
            );
        }
        prop_assert!(!resolution.strategy.is_empty());
    }

    /// The fallback chain reflects invocation order: every entry names a
    /// registered strategy (or the fallback), and the accepted strategy
    /// appears in the chain.
    #[test]
    fn fallback_chain_reflects_invocations(
        conflict in conflict_strategy(),
        ctx in context_strategy(),
    ) {
        let cascade = cascade();
        let known: Vec<&str> = cascade.strategy_names();
        let resolution = cascade.resolve(&conflict, &ctx);

        for name in &resolution.fallback_chain {
            prop_assert!(
                known.contains(&name.as_str()) || name == FALLBACK_STRATEGY,
                "unknown strategy {name} in chain"
            );
        }
        if resolution.strategy != "manual" {
            prop_assert!(resolution.fallback_chain.contains(&resolution.strategy));
        }
    }
}

/// A strategy that never reaches even the low-confidence tier.
struct Hopeless;

impl ResolutionStrategy for Hopeless {
    fn name(&self) -> &'static str {
        "hopeless"
    }
    fn default_priority(&self) -> u8 {
        1
    }
    fn applicable(&self) -> &[EntityKind] {
        &[
            EntityKind::Card,
            EntityKind::Folder,
            EntityKind::Tag,
            EntityKind::Image,
        ]
    }
    fn evaluate(
        &self,
        _conflict: &Conflict,
        _ctx: &ResolutionContext,
    ) -> Result<Candidate, StrategyError> {
        Ok(Candidate::new(ResolutionKind::LocalWins, 0.05, "shrug"))
    }
}

proptest! {
    #![proptest_config(ProptestConfig::with_cases(256))]

    /// Fallback guarantee: when no strategy reaches the low-confidence
    /// bar and the fallback is enabled, the fallback produces the result.
    #[test]
    fn fallback_guarantee_holds(
        conflict in conflict_strategy(),
        ctx in context_strategy(),
    ) {
        let config = CascadeConfig { retry_backoff_ms: 0, ..CascadeConfig::default() };
        let cascade = Cascade::with_strategies(config, vec![Box::new(Hopeless)]);
        let resolution = cascade.resolve(&conflict, &ctx);
        prop_assert_eq!(resolution.strategy.as_str(), FALLBACK_STRATEGY);
    }
}
