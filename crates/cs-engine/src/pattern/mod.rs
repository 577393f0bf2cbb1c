//! Pattern analyzer: mines the resolution stream for recurring conflict
//! shapes, detects emergent patterns, derives insights, and predicts
//! pattern occurrence.
//!
//! Seeded with four canonical patterns at startup; new patterns are
//! synthesized at runtime when enough unmatched conflicts of the same
//! shape accumulate. Pattern records are never deleted; only the
//! supporting history is bounded (ring buffer + 30-day retention sweep).

pub mod cluster;
pub mod insight;

use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, VecDeque};

use cs_common::{
    Conflict, EntityKind, PatternId, Resolution, ResolutionContext, ResolutionKind, Severity,
};
use cs_config::AnalyzerConfig;

use crate::monitor::ConfidenceHistogram;

pub use cluster::{ClusterAction, PatternCluster};
pub use insight::{InsightKind, PatternInsight};

// ── Signals and triggers ────────────────────────────────────────────────

/// Observable signals trigger predicates range over.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SignalKind {
    NetworkReliability,
    TimestampDeltaMs,
    FallbackChainLength,
    HierarchyDepth,
    ResolutionTimeMs,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TriggerPredicate {
    Below,
    Above,
}

/// One trigger predicate over a signal.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Trigger {
    pub signal: SignalKind,
    pub predicate: TriggerPredicate,
    pub threshold: f64,
}

impl Trigger {
    pub fn below(signal: SignalKind, threshold: f64) -> Self {
        Self {
            signal,
            predicate: TriggerPredicate::Below,
            threshold,
        }
    }

    pub fn above(signal: SignalKind, threshold: f64) -> Self {
        Self {
            signal,
            predicate: TriggerPredicate::Above,
            threshold,
        }
    }

    pub fn matches(&self, signals: &SignalVector) -> bool {
        let value = signals.get(self.signal);
        match self.predicate {
            TriggerPredicate::Below => value < self.threshold,
            TriggerPredicate::Above => value > self.threshold,
        }
    }
}

/// Signal values extracted from one analyzed conflict.
#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
pub struct SignalVector {
    pub network_reliability: f64,
    pub timestamp_delta_ms: f64,
    pub fallback_chain_len: f64,
    pub hierarchy_depth: f64,
    pub resolution_time_ms: f64,
}

impl SignalVector {
    pub fn get(&self, kind: SignalKind) -> f64 {
        match kind {
            SignalKind::NetworkReliability => self.network_reliability,
            SignalKind::TimestampDeltaMs => self.timestamp_delta_ms,
            SignalKind::FallbackChainLength => self.fallback_chain_len,
            SignalKind::HierarchyDepth => self.hierarchy_depth,
            SignalKind::ResolutionTimeMs => self.resolution_time_ms,
        }
    }

    fn observe(
        conflict: &Conflict,
        resolution: &Resolution,
        elapsed_ms: u64,
        ctx: &ResolutionContext,
    ) -> Self {
        let depth = conflict
            .local
            .depth_hint()
            .or_else(|| conflict.cloud.depth_hint())
            .unwrap_or(0);
        Self {
            network_reliability: ctx.network.reliability,
            timestamp_delta_ms: ctx.timestamp_delta_ms() as f64,
            fallback_chain_len: resolution.fallback_chain.len() as f64,
            hierarchy_depth: depth as f64,
            resolution_time_ms: elapsed_ms as f64,
        }
    }
}

// ── Patterns ────────────────────────────────────────────────────────────

#[derive(
    Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize,
)]
#[serde(rename_all = "snake_case")]
pub enum PatternCategory {
    ConcurrentAccess,
    NetworkRelated,
    DataStructureRelated,
    TimingRelated,
    DataConsistency,
}

#[derive(
    Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize,
)]
#[serde(rename_all = "snake_case")]
pub enum PatternTrend {
    Increasing,
    Stable,
    Decreasing,
}

/// Estimated impact of a pattern, each dimension in [0, 1].
#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
pub struct PatternImpact {
    pub user_experience: f64,
    pub system_performance: f64,
    pub data_integrity: f64,
}

impl PatternImpact {
    pub fn composite(&self) -> f64 {
        (self.user_experience + self.system_performance + self.data_integrity) / 3.0
    }
}

/// A named, recurring shape of conflict.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ConflictPattern {
    pub id: PatternId,
    pub name: String,
    pub category: PatternCategory,
    pub severity: Severity,
    pub frequency: u64,
    pub success_rate: f64,
    pub avg_resolution_ms: f64,
    pub histogram: ConfidenceHistogram,
    /// Matching is the logical OR of these.
    pub triggers: Vec<Trigger>,
    pub recommended_strategies: Vec<String>,
    pub prevention_measures: Vec<String>,
    pub trend: PatternTrend,
    pub impact: PatternImpact,
    pub first_seen: DateTime<Utc>,
    pub last_seen: DateTime<Utc>,
}

impl ConflictPattern {
    pub fn matches(&self, signals: &SignalVector) -> bool {
        self.triggers.iter().any(|t| t.matches(signals))
    }

    fn observe(&mut self, success: bool, confidence: f64, elapsed_ms: u64, now: DateTime<Utc>) {
        let n = self.frequency as f64;
        let s = if success { 1.0 } else { 0.0 };
        self.success_rate = (self.success_rate * n + s) / (n + 1.0);
        self.avg_resolution_ms = (self.avg_resolution_ms * n + elapsed_ms as f64) / (n + 1.0);
        self.frequency += 1;
        self.histogram.observe(confidence);
        self.last_seen = now;
    }
}

// ── Supporting records ──────────────────────────────────────────────────

/// One analyzed conflict, as kept in the history ring buffer.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ConflictRecord {
    pub at: DateTime<Utc>,
    pub entity: EntityKind,
    pub conflict_type: String,
    pub strategy: String,
    pub success: bool,
    pub matched: Vec<PatternId>,
    pub signals: SignalVector,
}

/// What one `analyze` call did.
#[derive(Debug, Clone, Default)]
pub struct AnalysisOutcome {
    /// Names of patterns the conflict matched.
    pub matched: Vec<String>,
    /// Name of a pattern synthesized by this call, if any.
    pub emergent: Option<String>,
}

/// Predicted pattern occurrence for the next validity window.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PatternPrediction {
    pub pattern: String,
    pub probability: f64,
    pub factors: PredictionBreakdown,
    pub valid_until: DateTime<Utc>,
}

/// Additive components behind a pattern prediction.
#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
pub struct PredictionBreakdown {
    pub base: f64,
    pub category_term: f64,
    pub activity_term: f64,
    pub frequency_term: f64,
}

/// Result of a maintenance sweep.
#[derive(Debug, Clone, Copy)]
pub struct MaintenanceReport {
    pub pruned_records: usize,
    pub insights: usize,
    pub clusters: usize,
}

// ── Analyzer ────────────────────────────────────────────────────────────

/// Mines the resolution stream for recurring conflict shapes.
pub struct PatternAnalyzer {
    config: AnalyzerConfig,
    patterns: BTreeMap<PatternId, ConflictPattern>,
    history: VecDeque<ConflictRecord>,
    insights: Vec<PatternInsight>,
}

impl PatternAnalyzer {
    pub fn new(config: AnalyzerConfig) -> Self {
        let mut analyzer = Self {
            config,
            patterns: BTreeMap::new(),
            history: VecDeque::new(),
            insights: Vec::new(),
        };
        for p in seed_patterns(Utc::now()) {
            analyzer.patterns.insert(p.id.clone(), p);
        }
        analyzer
    }

    /// Analyze one resolved conflict.
    pub fn analyze(
        &mut self,
        conflict: &Conflict,
        resolution: &Resolution,
        elapsed_ms: u64,
        ctx: &ResolutionContext,
    ) -> AnalysisOutcome {
        self.analyze_at(conflict, resolution, elapsed_ms, ctx, Utc::now())
    }

    /// [`analyze`](Self::analyze) with an explicit clock.
    pub fn analyze_at(
        &mut self,
        conflict: &Conflict,
        resolution: &Resolution,
        elapsed_ms: u64,
        ctx: &ResolutionContext,
        now: DateTime<Utc>,
    ) -> AnalysisOutcome {
        let signals = SignalVector::observe(conflict, resolution, elapsed_ms, ctx);
        let success = resolution.kind != ResolutionKind::Manual;

        let matched_ids: Vec<PatternId> = self
            .patterns
            .values()
            .filter(|p| p.matches(&signals))
            .map(|p| p.id.clone())
            .collect();

        self.history.push_back(ConflictRecord {
            at: now,
            entity: conflict.entity,
            conflict_type: conflict.conflict_type.clone(),
            strategy: resolution.strategy.clone(),
            success,
            matched: matched_ids.clone(),
            signals,
        });
        while self.history.len() > self.config.history_capacity {
            self.history.pop_front();
        }

        let mut matched_names = Vec::new();
        for id in &matched_ids {
            let recent = self.recent_matches(id, now);
            if let Some(pattern) = self.patterns.get_mut(id) {
                pattern.observe(success, resolution.confidence, elapsed_ms, now);
                pattern.trend = trend_from_recency(recent, pattern.frequency);
                matched_names.push(pattern.name.clone());
            }
        }

        let emergent = if matched_ids.is_empty() {
            self.detect_emergent(conflict, now)
        } else {
            None
        };

        self.refresh_insights(now);

        AnalysisOutcome {
            matched: matched_names,
            emergent,
        }
    }

    /// Records within the last 7 days matching the given pattern.
    fn recent_matches(&self, id: &PatternId, now: DateTime<Utc>) -> u64 {
        let cutoff = now - Duration::days(7);
        self.history
            .iter()
            .filter(|r| r.at >= cutoff && r.matched.contains(id))
            .count() as u64
    }

    /// Synthesize a pattern when enough unmatched conflicts of the same
    /// `(entity, conflict_type)` shape accumulated inside the window.
    fn detect_emergent(&mut self, conflict: &Conflict, now: DateTime<Utc>) -> Option<String> {
        let name = format!("emergent_{}_{}", conflict.entity, conflict.conflict_type);
        if self.patterns.values().any(|p| p.name == name) {
            return None;
        }

        let cutoff = now - Duration::hours(self.config.emergence_window_hours);
        let window: Vec<&ConflictRecord> = self
            .history
            .iter()
            .filter(|r| {
                r.at >= cutoff
                    && r.entity == conflict.entity
                    && r.conflict_type == conflict.conflict_type
            })
            .collect();
        if window.len() < self.config.emergence_min_count {
            return None;
        }

        let n = window.len() as f64;
        let mean = |f: fn(&SignalVector) -> f64| -> f64 {
            window.iter().map(|r| f(&r.signals)).sum::<f64>() / n
        };
        let mean_reliability = mean(|s| s.network_reliability);
        let mean_chain = mean(|s| s.fallback_chain_len);
        let mean_delta = mean(|s| s.timestamp_delta_ms);
        let mean_time = mean(|s| s.resolution_time_ms);
        let success_rate = window.iter().filter(|r| r.success).count() as f64 / n;

        let category = if mean_reliability < 0.5 {
            PatternCategory::NetworkRelated
        } else if mean_chain > 3.0 {
            PatternCategory::ConcurrentAccess
        } else if conflict.entity == EntityKind::Folder {
            PatternCategory::DataStructureRelated
        } else {
            PatternCategory::DataConsistency
        };

        let impact = PatternImpact {
            user_experience: (mean_time / 10_000.0).min(1.0),
            system_performance: (mean_chain / 5.0).min(1.0),
            data_integrity: 1.0 - success_rate,
        };
        let severity = severity_from_impact(impact.composite());

        let mut triggers = Vec::new();
        if mean_reliability < 0.5 {
            triggers.push(Trigger::below(SignalKind::NetworkReliability, 0.5));
        }
        if mean_chain > 2.0 {
            triggers.push(Trigger::above(SignalKind::FallbackChainLength, 2.0));
        }
        if mean_time > 5000.0 {
            triggers.push(Trigger::above(SignalKind::ResolutionTimeMs, 5000.0));
        }
        if triggers.is_empty() {
            // Always leave something matchable for future conflicts.
            triggers.push(Trigger::below(
                SignalKind::TimestampDeltaMs,
                (mean_delta * 2.0).max(1000.0),
            ));
        }

        let first_seen = window.iter().map(|r| r.at).min().unwrap_or(now);
        let pattern = ConflictPattern {
            id: PatternId::new(),
            name: name.clone(),
            category,
            severity,
            frequency: window.len() as u64,
            success_rate,
            avg_resolution_ms: mean_time,
            histogram: ConfidenceHistogram::default(),
            triggers,
            recommended_strategies: recommended_for(category),
            prevention_measures: prevention_for(category),
            trend: PatternTrend::Stable,
            impact,
            first_seen,
            last_seen: now,
        };

        tracing::info!(
            pattern = %pattern.name,
            category = ?pattern.category,
            severity = ?pattern.severity,
            supporting = window.len(),
            "emergent pattern synthesized"
        );
        self.patterns.insert(pattern.id.clone(), pattern);
        Some(name)
    }

    fn refresh_insights(&mut self, now: DateTime<Utc>) {
        self.insights = insight::generate(
            self.patterns.values(),
            self.history.iter(),
            &self.insights,
            self.config.insight_ttl_hours,
            now,
        );
    }

    /// Current insights, sorted by significance.
    pub fn insights(&self) -> &[PatternInsight] {
        &self.insights
    }

    /// Recompute clusters from the current pattern set.
    pub fn clusters(&self) -> Vec<PatternCluster> {
        cluster::cluster(self.patterns.values())
    }

    pub fn patterns(&self) -> impl Iterator<Item = &ConflictPattern> {
        self.patterns.values()
    }

    pub fn pattern_by_name(&self, name: &str) -> Option<&ConflictPattern> {
        self.patterns.values().find(|p| p.name == name)
    }

    pub fn history_len(&self) -> usize {
        self.history.len()
    }

    /// Predict pattern-occurrence probability for the next 24 hours.
    pub fn predict(&self, ctx: &ResolutionContext) -> Vec<PatternPrediction> {
        self.predict_at(ctx, Utc::now())
    }

    pub fn predict_at(&self, ctx: &ResolutionContext, now: DateTime<Utc>) -> Vec<PatternPrediction> {
        let cutoff = now - Duration::hours(24);
        let recent: Vec<&ConflictRecord> =
            self.history.iter().filter(|r| r.at >= cutoff).collect();
        let load = if recent.is_empty() {
            0.0
        } else {
            let mean_ms = recent
                .iter()
                .map(|r| r.signals.resolution_time_ms)
                .sum::<f64>()
                / recent.len() as f64;
            (mean_ms / 10_000.0).min(1.0)
        };

        let mut predictions: Vec<PatternPrediction> = self
            .patterns
            .values()
            .map(|p| {
                let category_term = match p.category {
                    PatternCategory::NetworkRelated => (1.0 - ctx.network.reliability) * 0.4,
                    PatternCategory::TimingRelated => (1.0 - ctx.network.reliability) * 0.3,
                    PatternCategory::ConcurrentAccess => load * 0.4,
                    PatternCategory::DataStructureRelated | PatternCategory::DataConsistency => {
                        load * 0.3
                    }
                };
                let activity = recent
                    .iter()
                    .filter(|r| r.matched.contains(&p.id))
                    .count() as f64;
                let activity_term = 0.2 * (activity / 10.0).min(1.0);
                let frequency_term = 0.3 * (p.frequency as f64 / 20.0).min(1.0);

                let factors = PredictionBreakdown {
                    base: 0.1,
                    category_term,
                    activity_term,
                    frequency_term,
                };
                PatternPrediction {
                    pattern: p.name.clone(),
                    probability: (0.1 + category_term + activity_term + frequency_term)
                        .clamp(0.0, 1.0),
                    factors,
                    valid_until: now + Duration::hours(24),
                }
            })
            .filter(|p| p.probability > self.config.min_prediction_probability)
            .collect();

        predictions.sort_by(|a, b| {
            b.probability
                .partial_cmp(&a.probability)
                .unwrap_or(std::cmp::Ordering::Equal)
        });
        predictions
    }

    /// Hourly sweep: prune supporting records past retention, then re-run
    /// clustering and insight generation.
    pub fn run_maintenance(&mut self) -> MaintenanceReport {
        self.run_maintenance_at(Utc::now())
    }

    pub fn run_maintenance_at(&mut self, now: DateTime<Utc>) -> MaintenanceReport {
        let cutoff = now - Duration::days(self.config.retention_days);
        let before = self.history.len();
        self.history.retain(|r| r.at >= cutoff);
        let pruned = before - self.history.len();

        self.refresh_insights(now);
        let clusters = self.clusters();

        tracing::debug!(
            pruned,
            insights = self.insights.len(),
            clusters = clusters.len(),
            "analyzer maintenance sweep"
        );

        MaintenanceReport {
            pruned_records: pruned,
            insights: self.insights.len(),
            clusters: clusters.len(),
        }
    }
}

fn trend_from_recency(recent: u64, frequency: u64) -> PatternTrend {
    if frequency == 0 {
        return PatternTrend::Stable;
    }
    let ratio = recent as f64 / frequency as f64;
    if ratio > 0.5 {
        PatternTrend::Increasing
    } else if ratio < 0.2 {
        PatternTrend::Decreasing
    } else {
        PatternTrend::Stable
    }
}

fn severity_from_impact(composite: f64) -> Severity {
    if composite > 0.8 {
        Severity::Critical
    } else if composite > 0.6 {
        Severity::High
    } else if composite > 0.4 {
        Severity::Medium
    } else {
        Severity::Low
    }
}

fn recommended_for(category: PatternCategory) -> Vec<String> {
    let names: &[&str] = match category {
        PatternCategory::ConcurrentAccess => &["timestamp", "field-merge"],
        PatternCategory::NetworkRelated => &["network-aware", "timestamp"],
        PatternCategory::DataStructureRelated => &["hierarchy"],
        PatternCategory::TimingRelated => &["timestamp"],
        PatternCategory::DataConsistency => &["content-diff", "field-merge"],
    };
    names.iter().map(|s| s.to_string()).collect()
}

fn prevention_for(category: PatternCategory) -> Vec<String> {
    let measures: &[&str] = match category {
        PatternCategory::ConcurrentAccess => &[
            "serialize sync sessions per device",
            "shorten the sync interval",
            "lock entities while a sync round is active",
        ],
        PatternCategory::NetworkRelated => &[
            "defer sync until the link stabilizes",
            "batch uploads on poor connections",
            "prefer wifi transports for large payloads",
        ],
        PatternCategory::DataStructureRelated => &[
            "flatten deep folder trees",
            "validate folder moves before queuing",
            "disallow moves into unsynced folders",
        ],
        PatternCategory::TimingRelated => &[
            "debounce rapid successive edits",
            "sync before switching devices",
        ],
        PatternCategory::DataConsistency => &[
            "refresh entities before editing",
            "surface stale-entity warnings in the editor",
            "sync on app foreground",
        ],
    };
    measures.iter().map(|s| s.to_string()).collect()
}

/// The four canonical patterns present at startup.
fn seed_patterns(now: DateTime<Utc>) -> Vec<ConflictPattern> {
    let seed = |name: &str,
                category: PatternCategory,
                severity: Severity,
                triggers: Vec<Trigger>,
                impact: PatternImpact| ConflictPattern {
        id: PatternId::new(),
        name: name.to_string(),
        category,
        severity,
        frequency: 0,
        success_rate: 0.0,
        avg_resolution_ms: 0.0,
        histogram: ConfidenceHistogram::default(),
        triggers,
        recommended_strategies: recommended_for(category),
        prevention_measures: prevention_for(category),
        trend: PatternTrend::Stable,
        impact,
        first_seen: now,
        last_seen: now,
    };

    vec![
        seed(
            "concurrent_access",
            PatternCategory::ConcurrentAccess,
            Severity::High,
            vec![Trigger::above(SignalKind::FallbackChainLength, 2.0)],
            PatternImpact {
                user_experience: 0.6,
                system_performance: 0.5,
                data_integrity: 0.7,
            },
        ),
        seed(
            "network_related",
            PatternCategory::NetworkRelated,
            Severity::Medium,
            vec![Trigger::below(SignalKind::NetworkReliability, 0.5)],
            PatternImpact {
                user_experience: 0.5,
                system_performance: 0.6,
                data_integrity: 0.4,
            },
        ),
        seed(
            "data_structure_related",
            PatternCategory::DataStructureRelated,
            Severity::Medium,
            vec![Trigger::above(SignalKind::HierarchyDepth, 3.0)],
            PatternImpact {
                user_experience: 0.4,
                system_performance: 0.4,
                data_integrity: 0.8,
            },
        ),
        seed(
            "timing_related",
            PatternCategory::TimingRelated,
            Severity::Low,
            vec![
                Trigger::below(SignalKind::TimestampDeltaMs, 5000.0),
                Trigger::above(SignalKind::ResolutionTimeMs, 5000.0),
            ],
            PatternImpact {
                user_experience: 0.5,
                system_performance: 0.5,
                data_integrity: 0.3,
            },
        ),
    ]
}
