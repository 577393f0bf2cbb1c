//! Network-aware strategy: resolve by link quality.
//!
//! A poor link means the cloud snapshot may be stale or the upload may
//! fail halfway, so the local replica is preferred; an excellent
//! low-latency link makes the cloud replica the authoritative copy.

use cs_common::{Candidate, Conflict, EntityKind, ResolutionContext, ResolutionKind, Severity};

use super::{timestamp, Strategy, StrategyError, ALL_ENTITIES};

/// Composite-network-score gating.
#[derive(Debug, Default)]
pub struct NetworkAwareStrategy;

impl NetworkAwareStrategy {
    pub fn new() -> Self {
        Self
    }
}

impl Strategy for NetworkAwareStrategy {
    fn name(&self) -> &'static str {
        "network-aware"
    }

    fn default_priority(&self) -> u8 {
        5
    }

    fn applicable(&self) -> &[EntityKind] {
        ALL_ENTITIES
    }

    fn evaluate(
        &self,
        conflict: &Conflict,
        ctx: &ResolutionContext,
    ) -> Result<Candidate, StrategyError> {
        let score = ctx.network.composite_score();

        if score < 0.3 {
            return Ok(Candidate::new(
                ResolutionKind::LocalWins,
                0.85,
                format!("poor connectivity (score {score:.2}); keep local replica"),
            ));
        }

        if score < 0.6 {
            // Severity gate: important conflicts wait for the user rather
            // than trusting a shaky link.
            if matches!(conflict.severity, Severity::High | Severity::Critical) {
                return Ok(Candidate::new(
                    ResolutionKind::Manual,
                    0.75,
                    format!(
                        "fair connectivity (score {score:.2}) and {:?} severity; wait for user",
                        conflict.severity
                    ),
                ));
            }
            return Ok(Candidate::new(
                ResolutionKind::LocalWins,
                0.75,
                format!("fair connectivity (score {score:.2}); keep local replica"),
            ));
        }

        if ctx.network.latency_ms < 50.0 && ctx.network.bandwidth_mbps > 10.0 {
            return Ok(Candidate::new(
                ResolutionKind::CloudWins,
                0.8,
                "fast link; cloud replica is authoritative",
            ));
        }

        let mut c = timestamp::score(ctx);
        c.reasoning = format!("network quality unremarkable; {}", c.reasoning);
        Ok(c)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{Duration, Utc};
    use cs_common::{NetworkQuality, Snapshot};
    use serde_json::json;

    fn conflict(severity: Severity) -> Conflict {
        Conflict::new(
            EntityKind::Card,
            "card-1",
            "content_edit",
            Snapshot::new(json!({})),
            Snapshot::new(json!({})),
            severity,
        )
    }

    fn ctx(net: NetworkQuality) -> ResolutionContext {
        let now = Utc::now();
        ResolutionContext::new(now, now + Duration::milliseconds(200), net)
    }

    #[test]
    fn poor_network_keeps_local() {
        let c = NetworkAwareStrategy::new()
            .evaluate(
                &conflict(Severity::Low),
                &ctx(NetworkQuality::new(0.1, 0.5, 900.0)),
            )
            .unwrap();
        assert_eq!(c.resolution, ResolutionKind::LocalWins);
        assert!((c.confidence - 0.85).abs() < 1e-9);
    }

    #[test]
    fn fair_network_high_severity_waits() {
        let c = NetworkAwareStrategy::new()
            .evaluate(
                &conflict(Severity::High),
                &ctx(NetworkQuality::new(0.5, 4.0, 600.0)),
            )
            .unwrap();
        assert_eq!(c.resolution, ResolutionKind::Manual);
        assert!(c.reasoning.contains("wait for user"));
    }

    #[test]
    fn fair_network_low_severity_keeps_local() {
        let c = NetworkAwareStrategy::new()
            .evaluate(
                &conflict(Severity::Low),
                &ctx(NetworkQuality::new(0.5, 4.0, 600.0)),
            )
            .unwrap();
        assert_eq!(c.resolution, ResolutionKind::LocalWins);
        assert!((c.confidence - 0.75).abs() < 1e-9);
    }

    #[test]
    fn fast_link_prefers_cloud() {
        let c = NetworkAwareStrategy::new()
            .evaluate(
                &conflict(Severity::Low),
                &ctx(NetworkQuality::new(0.95, 50.0, 10.0)),
            )
            .unwrap();
        assert_eq!(c.resolution, ResolutionKind::CloudWins);
        assert!((c.confidence - 0.8).abs() < 1e-9);
    }

    #[test]
    fn unremarkable_network_delegates() {
        // Good score but neither fast nor shaky.
        let c = NetworkAwareStrategy::new()
            .evaluate(
                &conflict(Severity::Low),
                &ctx(NetworkQuality::new(0.9, 8.0, 120.0)),
            )
            .unwrap();
        assert!(c.reasoning.contains("unremarkable"));
    }
}
