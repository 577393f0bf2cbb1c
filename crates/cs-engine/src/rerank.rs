//! Out-of-band strategy re-ranking.
//!
//! A pure function from an effectiveness snapshot to a new priority
//! table. Runs as periodic maintenance, never on the resolution hot path;
//! the cascade applies the table through an explicit call.

use crate::monitor::StrategyEffectiveness;

/// Composite score used for ranking: success rate dominates, confidence
/// and speed break ties.
fn score(stats: &StrategyEffectiveness) -> f64 {
    let time_term = (1.0 - stats.avg_resolution_ms / 10_000.0).max(0.0);
    stats.success_rate * 0.5 + stats.avg_confidence * 0.3 + time_term * 0.2
}

/// Rank strategies by observed effectiveness, best first, and assign
/// priorities 1..n. Strategies with no recorded uses sort last; name
/// order makes the result deterministic on ties.
pub fn rank(snapshot: &[StrategyEffectiveness]) -> Vec<(String, u8)> {
    let mut scored: Vec<(&StrategyEffectiveness, f64)> = snapshot
        .iter()
        .map(|s| {
            let score = if s.total_uses == 0 { -1.0 } else { score(s) };
            (s, score)
        })
        .collect();

    scored.sort_by(|(a, sa), (b, sb)| {
        sb.partial_cmp(sa)
            .unwrap_or(std::cmp::Ordering::Equal)
            .then_with(|| a.strategy.cmp(&b.strategy))
    });

    scored
        .into_iter()
        .enumerate()
        .map(|(i, (s, _))| (s.strategy.clone(), (i + 1).min(u8::MAX as usize) as u8))
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::monitor::{ConfidenceHistogram, EffectivenessTrend};
    use std::collections::BTreeMap;

    fn stats(name: &str, uses: u64, success: f64, confidence: f64, ms: f64) -> StrategyEffectiveness {
        StrategyEffectiveness {
            strategy: name.to_string(),
            total_uses: uses,
            success_rate: success,
            avg_confidence: confidence,
            avg_resolution_ms: ms,
            histogram: ConfidenceHistogram::default(),
            per_entity: BTreeMap::new(),
            per_conflict_type: BTreeMap::new(),
            per_network: BTreeMap::new(),
            trend: EffectivenessTrend::Stable,
        }
    }

    #[test]
    fn better_strategies_rank_first() {
        let table = rank(&[
            stats("slow-and-weak", 10, 0.4, 0.5, 9000.0),
            stats("strong", 10, 0.95, 0.85, 100.0),
            stats("middling", 10, 0.7, 0.6, 2000.0),
        ]);

        assert_eq!(table[0], ("strong".to_string(), 1));
        assert_eq!(table[1], ("middling".to_string(), 2));
        assert_eq!(table[2], ("slow-and-weak".to_string(), 3));
    }

    #[test]
    fn unused_strategies_sort_last() {
        let table = rank(&[
            stats("never-used", 0, 0.0, 0.0, 0.0),
            stats("proven", 5, 0.6, 0.6, 500.0),
        ]);
        assert_eq!(table[0].0, "proven");
        assert_eq!(table[1].0, "never-used");
    }

    #[test]
    fn ties_break_by_name() {
        let table = rank(&[
            stats("b", 5, 0.8, 0.8, 100.0),
            stats("a", 5, 0.8, 0.8, 100.0),
        ]);
        assert_eq!(table[0].0, "a");
        assert_eq!(table[1].0, "b");
    }

    #[test]
    fn empty_snapshot_yields_empty_table() {
        assert!(rank(&[]).is_empty());
    }
}
