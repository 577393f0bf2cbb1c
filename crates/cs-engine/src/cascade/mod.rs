//! Cascade orchestrator: tiered strategy evaluation with retry and a
//! guaranteed fallback.
//!
//! Tiers widen the strategy pool while lowering the acceptance bar:
//!
//! 1. priority ≤ 3, accept at `high_confidence`, no confirmation needed
//! 2. priority ≤ 5, accept at `medium_confidence`, confirmation forced
//! 3. all applicable, accept at `low_confidence` (floored), confirmation
//!    forced
//! 4. timestamp fallback (if enabled), else `manual` at confidence 0
//!
//! By default lower-priority strategies are re-invoked in later tiers;
//! `strict_mode` reuses the first invocation's candidate instead.
//!
//! `resolve` never returns an error: strategy failures are retried then
//! skipped, and a malformed context degrades to a `manual` resolution
//! carrying the error text.

pub mod fallback;

use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;

use cs_common::{Candidate, Conflict, Error, Resolution, ResolutionContext};
use cs_config::CascadeConfig;

use crate::store::HierarchyLookup;
use crate::strategy::{
    ContentDiffStrategy, ContextAwareStrategy, FieldMergeStrategy, HierarchyStrategy,
    NetworkAwareStrategy, SemanticStrategy, Strategy, TimestampStrategy, UserPatternStrategy,
};

pub use fallback::FALLBACK_STRATEGY;

struct Registered {
    strategy: Box<dyn Strategy>,
    priority: u8,
}

/// The cascading strategy evaluator.
pub struct Cascade {
    config: CascadeConfig,
    entries: Vec<Registered>,
}

impl Cascade {
    /// Build a cascade with the full strategy set.
    pub fn new(config: CascadeConfig, lookup: Arc<dyn HierarchyLookup>) -> Self {
        let max_depth = config.max_hierarchy_depth;
        Self::with_strategies(
            config,
            vec![
                Box::new(TimestampStrategy::new()),
                Box::new(ContentDiffStrategy::new()),
                Box::new(UserPatternStrategy::new()),
                Box::new(FieldMergeStrategy::new()),
                Box::new(NetworkAwareStrategy::new()),
                Box::new(SemanticStrategy::new()),
                Box::new(HierarchyStrategy::new(lookup, max_depth)),
                Box::new(ContextAwareStrategy::new()),
            ],
        )
    }

    /// Build a cascade over a custom strategy set (mainly for tests and
    /// embedders with their own heuristics).
    pub fn with_strategies(config: CascadeConfig, strategies: Vec<Box<dyn Strategy>>) -> Self {
        let mut entries: Vec<Registered> = strategies
            .into_iter()
            .map(|s| Registered {
                priority: s.default_priority(),
                strategy: s,
            })
            .collect();
        entries.sort_by_key(|e| e.priority);
        Self { config, entries }
    }

    /// Registered strategy names in priority order.
    pub fn strategy_names(&self) -> Vec<&'static str> {
        self.entries.iter().map(|e| e.strategy.name()).collect()
    }

    /// Apply a priority table produced by the out-of-band re-ranking job.
    /// Unknown names are ignored.
    pub fn apply_priorities(&mut self, table: &[(String, u8)]) {
        for entry in &mut self.entries {
            if let Some((_, p)) = table.iter().find(|(name, _)| name == entry.strategy.name()) {
                entry.priority = *p;
            }
        }
        self.entries.sort_by_key(|e| e.priority);
    }

    /// Resolve one conflict. Never fails; the worst case is a `manual`
    /// resolution at confidence 0.
    pub fn resolve(&self, conflict: &Conflict, ctx: &ResolutionContext) -> Resolution {
        if let Err(e) = validate_context(ctx) {
            tracing::warn!(conflict = %conflict.id, error = %e, "context rejected");
            return Resolution::manual(e.to_string(), Vec::new());
        }

        let mut chain: Vec<String> = Vec::new();
        // Strict mode: first invocation's candidate per strategy.
        let mut cache: HashMap<&'static str, Option<Candidate>> = HashMap::new();

        let tiers = [
            (3u8, self.config.high_confidence, false),
            (5u8, self.config.medium_confidence, true),
            (u8::MAX, self.config.low_confidence, true),
        ];

        for (max_priority, threshold, force_confirmation) in tiers {
            for entry in self
                .entries
                .iter()
                .filter(|e| e.priority <= max_priority)
                .filter(|e| e.strategy.applicable().contains(&conflict.entity))
            {
                let name = entry.strategy.name();

                let candidate = if self.config.strict_mode && cache.contains_key(name) {
                    // Already invoked in an earlier tier; reuse the result
                    // without touching the chain.
                    cache.get(name).and_then(Clone::clone)
                } else {
                    chain.push(name.to_string());
                    let result = self.execute_with_retry(entry.strategy.as_ref(), conflict, ctx);
                    if self.config.strict_mode {
                        cache.insert(name, result.clone());
                    }
                    result
                };

                if let Some(mut candidate) = candidate {
                    if candidate.confidence >= threshold {
                        // Floor at the tier threshold.
                        candidate.confidence = candidate.confidence.max(threshold);
                        tracing::debug!(
                            conflict = %conflict.id,
                            strategy = name,
                            confidence = candidate.confidence,
                            tier_threshold = threshold,
                            "candidate accepted"
                        );
                        return Resolution::from_candidate(
                            candidate,
                            name,
                            chain,
                            force_confirmation,
                        );
                    }
                }
            }
        }

        if self.config.timestamp_fallback.enabled {
            chain.push(FALLBACK_STRATEGY.to_string());
            let candidate = fallback::resolve(ctx);
            return Resolution::from_candidate(candidate, FALLBACK_STRATEGY, chain, false);
        }

        Resolution::manual("no strategy reached acceptable confidence", chain)
    }

    /// Invoke one strategy with the configured retry budget. `None` means
    /// every attempt failed; the strategy is skipped.
    fn execute_with_retry(
        &self,
        strategy: &dyn Strategy,
        conflict: &Conflict,
        ctx: &ResolutionContext,
    ) -> Option<Candidate> {
        let attempts = self.config.max_retries + 1;
        for attempt in 1..=attempts {
            match strategy.evaluate(conflict, ctx) {
                Ok(candidate) => return Some(candidate),
                Err(e) => {
                    tracing::debug!(
                        conflict = %conflict.id,
                        strategy = strategy.name(),
                        attempt,
                        error = %e,
                        "strategy attempt failed"
                    );
                    if attempt < attempts {
                        std::thread::sleep(Duration::from_millis(
                            self.config.retry_backoff_ms * attempt as u64,
                        ));
                    }
                }
            }
        }
        tracing::warn!(
            conflict = %conflict.id,
            strategy = strategy.name(),
            "strategy exhausted retries; skipping"
        );
        None
    }
}

fn validate_context(ctx: &ResolutionContext) -> Result<(), Error> {
    let net = &ctx.network;
    if !net.reliability.is_finite() || !(0.0..=1.0).contains(&net.reliability) {
        return Err(Error::MalformedContext(format!(
            "network reliability out of range: {}",
            net.reliability
        )));
    }
    if !net.bandwidth_mbps.is_finite() || net.bandwidth_mbps < 0.0 {
        return Err(Error::MalformedContext(format!(
            "negative or non-finite bandwidth: {}",
            net.bandwidth_mbps
        )));
    }
    if !net.latency_ms.is_finite() || net.latency_ms < 0.0 {
        return Err(Error::MalformedContext(format!(
            "negative or non-finite latency: {}",
            net.latency_ms
        )));
    }
    Ok(())
}
