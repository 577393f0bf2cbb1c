//! Insight generation from the pattern set and supporting history.
//!
//! Insights are regenerated after every analysis and on the hourly sweep.
//! A regenerated insight with the same kind and message keeps its original
//! id and timestamp; anything older than the TTL is dropped.

use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

use cs_common::InsightId;

use super::{ConflictPattern, ConflictRecord, PatternTrend};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum InsightKind {
    Trend,
    Anomaly,
    Correlation,
    Recommendation,
}

/// A human-readable observation derived from the conflict stream.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PatternInsight {
    pub id: InsightId,
    pub kind: InsightKind,
    pub message: String,
    /// Relative importance in [0, 1]; the list is sorted by this.
    pub significance: f64,
    pub created_at: DateTime<Utc>,
}

/// Regenerate the insight list.
pub(crate) fn generate<'a>(
    patterns: impl Iterator<Item = &'a ConflictPattern> + Clone,
    history: impl Iterator<Item = &'a ConflictRecord> + Clone,
    previous: &[PatternInsight],
    ttl_hours: i64,
    now: DateTime<Utc>,
) -> Vec<PatternInsight> {
    let mut fresh: Vec<(InsightKind, String, f64)> = Vec::new();

    // Trend: several patterns growing at once.
    let increasing: Vec<&ConflictPattern> = patterns
        .clone()
        .filter(|p| p.trend == PatternTrend::Increasing && p.frequency > 3)
        .collect();
    if increasing.len() >= 3 {
        let names: Vec<&str> = increasing.iter().map(|p| p.name.as_str()).collect();
        fresh.push((
            InsightKind::Trend,
            format!(
                "{} conflict patterns are on the rise: {}",
                increasing.len(),
                names.join(", ")
            ),
            (0.5 + 0.1 * increasing.len() as f64).min(1.0),
        ));
    }

    // Anomaly: a frequent pattern that keeps failing.
    for p in patterns.clone() {
        if p.success_rate < 0.3 && p.frequency > 5 {
            fresh.push((
                InsightKind::Anomaly,
                format!(
                    "pattern {} resolves automatically only {:.0}% of the time over {} conflicts",
                    p.name,
                    p.success_rate * 100.0,
                    p.frequency
                ),
                (0.7 + (0.3 - p.success_rate)).min(1.0),
            ));
        }
    }

    // Correlation: success rate split by link reliability, per strategy.
    let mut cohorts: BTreeMap<&str, (Vec<bool>, Vec<bool>)> = BTreeMap::new();
    for r in history.clone() {
        let entry = cohorts.entry(r.strategy.as_str()).or_default();
        if r.signals.network_reliability < 0.5 {
            entry.0.push(r.success);
        } else {
            entry.1.push(r.success);
        }
    }
    for (strategy, (low, high)) in cohorts {
        if low.len() >= 5 && high.len() >= 5 {
            let low_rate = rate(&low);
            let high_rate = rate(&high);
            let gap = (high_rate - low_rate).abs();
            if gap > 0.3 {
                fresh.push((
                    InsightKind::Correlation,
                    format!(
                        "{} succeeds {:.0}% on reliable links but {:.0}% on unreliable ones",
                        strategy,
                        high_rate * 100.0,
                        low_rate * 100.0
                    ),
                    gap.min(1.0),
                ));
            }
        }
    }

    // Recommendation: frequent patterns that carry prevention measures.
    let preventable: Vec<&ConflictPattern> = patterns
        .filter(|p| p.frequency > 5 && p.prevention_measures.len() > 2)
        .collect();
    if preventable.len() >= 3 {
        let measures: Vec<&str> = preventable
            .iter()
            .flat_map(|p| p.prevention_measures.iter())
            .map(String::as_str)
            .take(5)
            .collect();
        fresh.push((
            InsightKind::Recommendation,
            format!(
                "{} frequent patterns are preventable; consider: {}",
                preventable.len(),
                measures.join("; ")
            ),
            (0.5 + 0.05 * preventable.len() as f64).min(1.0),
        ));
    }

    // Keep ids and timestamps stable across regeneration.
    let mut insights: Vec<PatternInsight> = fresh
        .into_iter()
        .map(|(kind, message, significance)| {
            let prior = previous
                .iter()
                .find(|p| p.kind == kind && p.message == message);
            PatternInsight {
                id: prior.map(|p| p.id.clone()).unwrap_or_default(),
                created_at: prior.map(|p| p.created_at).unwrap_or(now),
                kind,
                message,
                significance,
            }
        })
        .filter(|i| now - i.created_at < Duration::hours(ttl_hours))
        .collect();

    insights.sort_by(|a, b| {
        b.significance
            .partial_cmp(&a.significance)
            .unwrap_or(std::cmp::Ordering::Equal)
    });
    insights
}

fn rate(outcomes: &[bool]) -> f64 {
    if outcomes.is_empty() {
        return 0.0;
    }
    outcomes.iter().filter(|s| **s).count() as f64 / outcomes.len() as f64
}
