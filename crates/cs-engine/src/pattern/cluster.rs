//! Pattern clustering.
//!
//! Clusters are ephemeral: fully recomputed on each pass from the current
//! pattern set, grouped by `(category, severity, trend)`.

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

use cs_common::Severity;

use super::{ConflictPattern, PatternCategory, PatternTrend};

/// Recommended operator action for a cluster.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ClusterAction {
    UrgentFix,
    Optimize,
    Monitor,
}

/// A group of patterns behaving alike.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PatternCluster {
    pub category: PatternCategory,
    pub severity: Severity,
    pub trend: PatternTrend,
    /// Member pattern names.
    pub members: Vec<String>,
    pub total_frequency: u64,
    /// Frequency-weighted composite impact of the members.
    pub impact: f64,
    pub action: ClusterAction,
}

/// Group patterns by `(category, severity, trend)`; only groups with at
/// least two members form a cluster.
pub fn cluster<'a>(patterns: impl Iterator<Item = &'a ConflictPattern>) -> Vec<PatternCluster> {
    let mut groups: BTreeMap<(PatternCategory, Severity, PatternTrend), Vec<&ConflictPattern>> =
        BTreeMap::new();
    for p in patterns {
        groups
            .entry((p.category, p.severity, p.trend))
            .or_default()
            .push(p);
    }

    groups
        .into_iter()
        .filter(|(_, members)| members.len() >= 2)
        .map(|((category, severity, trend), members)| {
            let total_frequency: u64 = members.iter().map(|p| p.frequency).sum();
            let impact = if total_frequency == 0 {
                0.0
            } else {
                members
                    .iter()
                    .map(|p| p.frequency as f64 * p.impact.composite())
                    .sum::<f64>()
                    / total_frequency as f64
            };
            let mean_success =
                members.iter().map(|p| p.success_rate).sum::<f64>() / members.len() as f64;

            let action = if severity == Severity::Critical && trend == PatternTrend::Increasing {
                ClusterAction::UrgentFix
            } else if mean_success < 0.5 {
                ClusterAction::Optimize
            } else {
                ClusterAction::Monitor
            };

            PatternCluster {
                category,
                severity,
                trend,
                members: members.iter().map(|p| p.name.clone()).collect(),
                total_frequency,
                impact,
                action,
            }
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::super::PatternImpact;
    use super::*;
    use chrono::Utc;
    use cs_common::PatternId;

    fn pattern(
        name: &str,
        category: PatternCategory,
        severity: Severity,
        trend: PatternTrend,
        frequency: u64,
        success_rate: f64,
    ) -> ConflictPattern {
        ConflictPattern {
            id: PatternId::new(),
            name: name.to_string(),
            category,
            severity,
            frequency,
            success_rate,
            avg_resolution_ms: 100.0,
            histogram: Default::default(),
            triggers: vec![],
            recommended_strategies: vec![],
            prevention_measures: vec![],
            trend,
            impact: PatternImpact {
                user_experience: 0.5,
                system_performance: 0.5,
                data_integrity: 0.5,
            },
            first_seen: Utc::now(),
            last_seen: Utc::now(),
        }
    }

    #[test]
    fn two_alike_patterns_form_one_cluster() {
        let a = pattern(
            "net-a",
            PatternCategory::NetworkRelated,
            Severity::Medium,
            PatternTrend::Stable,
            4,
            0.8,
        );
        let b = pattern(
            "net-b",
            PatternCategory::NetworkRelated,
            Severity::Medium,
            PatternTrend::Stable,
            6,
            0.9,
        );
        let clusters = cluster([&a, &b].into_iter());
        assert_eq!(clusters.len(), 1);
        assert_eq!(clusters[0].members.len(), 2);
        assert_eq!(clusters[0].total_frequency, 10);
        assert_eq!(clusters[0].action, ClusterAction::Monitor);
    }

    #[test]
    fn singletons_do_not_cluster() {
        let a = pattern(
            "net-a",
            PatternCategory::NetworkRelated,
            Severity::Medium,
            PatternTrend::Stable,
            4,
            0.8,
        );
        let b = pattern(
            "tim-b",
            PatternCategory::TimingRelated,
            Severity::Medium,
            PatternTrend::Stable,
            6,
            0.9,
        );
        assert!(cluster([&a, &b].into_iter()).is_empty());
    }

    #[test]
    fn critical_increasing_is_urgent() {
        let a = pattern(
            "a",
            PatternCategory::ConcurrentAccess,
            Severity::Critical,
            PatternTrend::Increasing,
            4,
            0.9,
        );
        let b = pattern(
            "b",
            PatternCategory::ConcurrentAccess,
            Severity::Critical,
            PatternTrend::Increasing,
            2,
            0.9,
        );
        let clusters = cluster([&a, &b].into_iter());
        assert_eq!(clusters[0].action, ClusterAction::UrgentFix);
    }

    #[test]
    fn failing_cluster_asks_for_optimization() {
        let a = pattern(
            "a",
            PatternCategory::TimingRelated,
            Severity::Low,
            PatternTrend::Stable,
            4,
            0.3,
        );
        let b = pattern(
            "b",
            PatternCategory::TimingRelated,
            Severity::Low,
            PatternTrend::Stable,
            2,
            0.4,
        );
        let clusters = cluster([&a, &b].into_iter());
        assert_eq!(clusters[0].action, ClusterAction::Optimize);
    }
}
