//! Performance monitor: per-strategy effectiveness, anomaly alerts,
//! health checks, and effectiveness prediction.
//!
//! Observes every produced resolution. Aggregates are updated in place
//! with incremental running averages (`new = (old×n + value)/(n+1)`), so
//! the monitor never rescans its ring buffer for the hot-path update.

use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};
use serde_json::{json, Value};
use std::collections::{BTreeMap, VecDeque};

use cs_common::{AlertId, Conflict, EntityKind, NetworkBucket, NetworkQuality, Resolution};
use cs_config::MonitorConfig;

// ── Effectiveness aggregates ────────────────────────────────────────────

/// Direction a strategy's effectiveness is moving.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EffectivenessTrend {
    Improving,
    Stable,
    Declining,
}

/// Uses/successes pair for a sub-population.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct SubStat {
    pub uses: u64,
    pub successes: u64,
}

impl SubStat {
    pub fn observe(&mut self, success: bool) {
        self.uses += 1;
        if success {
            self.successes += 1;
        }
    }

    pub fn rate(&self) -> f64 {
        if self.uses == 0 {
            return 0.0;
        }
        self.successes as f64 / self.uses as f64
    }
}

/// Confidence distribution buckets aligned with the cascade tiers.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ConfidenceHistogram {
    /// ≥ 0.7
    pub high: u64,
    /// 0.4 – 0.7
    pub medium: u64,
    /// < 0.4
    pub low: u64,
}

impl ConfidenceHistogram {
    pub fn observe(&mut self, confidence: f64) {
        if confidence >= 0.7 {
            self.high += 1;
        } else if confidence >= 0.4 {
            self.medium += 1;
        } else {
            self.low += 1;
        }
    }
}

/// Running aggregates for one strategy. Created on first use, updated in
/// place forever, never deleted.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StrategyEffectiveness {
    pub strategy: String,
    pub total_uses: u64,
    pub success_rate: f64,
    pub avg_confidence: f64,
    pub avg_resolution_ms: f64,
    pub histogram: ConfidenceHistogram,
    pub per_entity: BTreeMap<EntityKind, SubStat>,
    pub per_conflict_type: BTreeMap<String, SubStat>,
    pub per_network: BTreeMap<NetworkBucket, SubStat>,
    pub trend: EffectivenessTrend,
}

impl StrategyEffectiveness {
    fn new(strategy: &str) -> Self {
        Self {
            strategy: strategy.to_string(),
            total_uses: 0,
            success_rate: 0.0,
            avg_confidence: 0.0,
            avg_resolution_ms: 0.0,
            histogram: ConfidenceHistogram::default(),
            per_entity: BTreeMap::new(),
            per_conflict_type: BTreeMap::new(),
            per_network: BTreeMap::new(),
            trend: EffectivenessTrend::Stable,
        }
    }

    fn observe(&mut self, metric: &ResolutionMetric) {
        let n = self.total_uses as f64;
        let success = if metric.success { 1.0 } else { 0.0 };
        self.success_rate = (self.success_rate * n + success) / (n + 1.0);
        self.avg_confidence = (self.avg_confidence * n + metric.confidence) / (n + 1.0);
        self.avg_resolution_ms =
            (self.avg_resolution_ms * n + metric.elapsed_ms as f64) / (n + 1.0);
        self.total_uses += 1;

        self.histogram.observe(metric.confidence);
        self.per_entity
            .entry(metric.entity)
            .or_default()
            .observe(metric.success);
        self.per_conflict_type
            .entry(metric.conflict_type.clone())
            .or_default()
            .observe(metric.success);
        self.per_network
            .entry(metric.bucket)
            .or_default()
            .observe(metric.success);

        self.trend = if self.success_rate > 0.8 {
            EffectivenessTrend::Improving
        } else if self.success_rate > 0.6 {
            EffectivenessTrend::Stable
        } else {
            EffectivenessTrend::Declining
        };
    }
}

/// One recorded resolution, as kept in the ring buffer.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ResolutionMetric {
    pub strategy: String,
    pub entity: EntityKind,
    pub conflict_type: String,
    pub confidence: f64,
    pub success: bool,
    pub elapsed_ms: u64,
    pub network_reliability: f64,
    pub bucket: NetworkBucket,
    pub fallback_chain_len: usize,
    pub at: DateTime<Utc>,
}

// ── Alerts ──────────────────────────────────────────────────────────────

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AlertKind {
    Info,
    Warning,
    Error,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AlertSeverity {
    Low,
    Medium,
    High,
    Critical,
}

/// Advisory signal about degraded effectiveness. Never thrown; resolved
/// explicitly by the consumer, never auto-expires.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PerformanceAlert {
    pub id: AlertId,
    pub kind: AlertKind,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub strategy: Option<String>,
    pub message: String,
    pub severity: AlertSeverity,
    pub at: DateTime<Utc>,
    pub resolved: bool,
    pub metadata: Value,
}

/// Alert consumer callback. A failing callback is logged; the remaining
/// callbacks still run.
pub type AlertCallback =
    Box<dyn Fn(&PerformanceAlert) -> Result<(), Box<dyn std::error::Error + Send + Sync>> + Send + Sync>;

// ── Health ──────────────────────────────────────────────────────────────

/// Outcome of a periodic health check.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct HealthReport {
    /// Overall health score in [0, 1].
    pub score: f64,
    pub strategy_success_mean: f64,
    pub window_success_rate: f64,
    pub window_avg_confidence: f64,
    pub window_avg_ms: f64,
    pub samples_24h: usize,
    pub unresolved_critical: usize,
    pub unresolved_high: usize,
    pub degraded: bool,
}

// ── Prediction ──────────────────────────────────────────────────────────

/// Weighted components behind a prediction.
#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize)]
pub struct PredictionFactors {
    pub overall_success: f64,
    pub entity_success: f64,
    pub conflict_type_success: f64,
    pub network_success: f64,
}

/// Expected effectiveness of a strategy for a hypothetical conflict.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EffectivenessPrediction {
    pub confidence: f64,
    pub expected_ms: f64,
    pub success_probability: f64,
    /// (low, high) bound on the success probability.
    pub interval: (f64, f64),
    pub factors: PredictionFactors,
}

// ── Monitor ─────────────────────────────────────────────────────────────

/// Observes the resolution stream and maintains effectiveness state.
pub struct PerformanceMonitor {
    config: MonitorConfig,
    metrics: VecDeque<ResolutionMetric>,
    effectiveness: BTreeMap<String, StrategyEffectiveness>,
    alerts: Vec<PerformanceAlert>,
    callbacks: Vec<AlertCallback>,
}

impl PerformanceMonitor {
    pub fn new(config: MonitorConfig) -> Self {
        Self {
            config,
            metrics: VecDeque::new(),
            effectiveness: BTreeMap::new(),
            alerts: Vec::new(),
            callbacks: Vec::new(),
        }
    }

    /// Record one produced resolution.
    pub fn record(
        &mut self,
        resolution: &Resolution,
        conflict: &Conflict,
        elapsed_ms: u64,
        network: &NetworkQuality,
    ) {
        self.record_at(resolution, conflict, elapsed_ms, network, Utc::now());
    }

    /// [`record`](Self::record) with an explicit clock.
    pub fn record_at(
        &mut self,
        resolution: &Resolution,
        conflict: &Conflict,
        elapsed_ms: u64,
        network: &NetworkQuality,
        now: DateTime<Utc>,
    ) {
        let success = resolution.kind != cs_common::ResolutionKind::Manual;
        let metric = ResolutionMetric {
            strategy: resolution.strategy.clone(),
            entity: conflict.entity,
            conflict_type: conflict.conflict_type.clone(),
            confidence: resolution.confidence,
            success,
            elapsed_ms,
            network_reliability: network.reliability,
            bucket: network.bucket(),
            fallback_chain_len: resolution.fallback_chain.len(),
            at: now,
        };

        self.effectiveness
            .entry(metric.strategy.clone())
            .or_insert_with(|| StrategyEffectiveness::new(&metric.strategy))
            .observe(&metric);

        self.check_alerts(&metric, now);

        self.metrics.push_back(metric);
        while self.metrics.len() > self.config.metrics_capacity {
            self.metrics.pop_front();
        }
    }

    fn check_alerts(&mut self, metric: &ResolutionMetric, now: DateTime<Utc>) {
        if metric.confidence < self.config.low_confidence_alert {
            self.raise(
                AlertKind::Warning,
                AlertSeverity::Medium,
                Some(metric.strategy.clone()),
                format!(
                    "low confidence resolution ({:.2}) from {}",
                    metric.confidence, metric.strategy
                ),
                json!({ "confidence": metric.confidence }),
                now,
            );
        }

        if metric.elapsed_ms > self.config.slow_resolution_ms {
            self.raise(
                AlertKind::Warning,
                AlertSeverity::Medium,
                Some(metric.strategy.clone()),
                format!(
                    "resolution time {}ms too long (budget {}ms)",
                    metric.elapsed_ms, self.config.slow_resolution_ms
                ),
                json!({ "elapsed_ms": metric.elapsed_ms }),
                now,
            );
        }

        if metric.fallback_chain_len > self.config.max_fallback_chain {
            self.raise(
                AlertKind::Warning,
                AlertSeverity::Low,
                Some(metric.strategy.clone()),
                format!(
                    "fallback chain too long ({} strategies attempted)",
                    metric.fallback_chain_len
                ),
                json!({ "chain_length": metric.fallback_chain_len }),
                now,
            );
        }

        if metric.network_reliability < self.config.unreliable_network && !metric.success {
            self.raise(
                AlertKind::Info,
                AlertSeverity::Low,
                Some(metric.strategy.clone()),
                format!(
                    "resolution failed on unreliable network (reliability {:.2})",
                    metric.network_reliability
                ),
                json!({ "reliability": metric.network_reliability }),
                now,
            );
        }
    }

    fn raise(
        &mut self,
        kind: AlertKind,
        severity: AlertSeverity,
        strategy: Option<String>,
        message: String,
        metadata: Value,
        now: DateTime<Utc>,
    ) {
        let alert = PerformanceAlert {
            id: AlertId::new(),
            kind,
            strategy,
            message,
            severity,
            at: now,
            resolved: false,
            metadata,
        };

        for callback in &self.callbacks {
            if let Err(e) = callback(&alert) {
                tracing::warn!(alert = %alert.id, error = %e, "alert callback failed");
            }
        }

        tracing::debug!(alert = %alert.id, message = %alert.message, "alert raised");
        self.alerts.push(alert);
    }

    /// Register an alert consumer.
    pub fn on_alert(&mut self, callback: AlertCallback) {
        self.callbacks.push(callback);
    }

    pub fn alerts(&self) -> &[PerformanceAlert] {
        &self.alerts
    }

    pub fn unresolved_alerts(&self) -> impl Iterator<Item = &PerformanceAlert> {
        self.alerts.iter().filter(|a| !a.resolved)
    }

    /// Mark an alert handled. Returns false for unknown ids.
    pub fn resolve_alert(&mut self, id: &AlertId) -> bool {
        match self.alerts.iter_mut().find(|a| &a.id == id) {
            Some(alert) => {
                alert.resolved = true;
                true
            }
            None => false,
        }
    }

    /// Effectiveness aggregates for one strategy.
    pub fn effectiveness(&self, strategy: &str) -> Option<&StrategyEffectiveness> {
        self.effectiveness.get(strategy)
    }

    /// Snapshot of all per-strategy aggregates (for the re-ranking job).
    pub fn effectiveness_snapshot(&self) -> Vec<StrategyEffectiveness> {
        self.effectiveness.values().cloned().collect()
    }

    pub fn metrics_len(&self) -> usize {
        self.metrics.len()
    }

    pub fn metrics(&self) -> impl Iterator<Item = &ResolutionMetric> {
        self.metrics.iter()
    }

    /// Run the periodic health check, raising a system alert when the
    /// score drops below the configured threshold.
    pub fn run_health_check(&mut self) -> HealthReport {
        self.run_health_check_at(Utc::now())
    }

    pub fn run_health_check_at(&mut self, now: DateTime<Utc>) -> HealthReport {
        let report = self.health_at(now);
        if report.degraded {
            self.raise(
                AlertKind::Error,
                AlertSeverity::High,
                None,
                format!("system health degraded (score {:.2})", report.score),
                json!({ "score": report.score }),
                now,
            );
        }
        report
    }

    /// Compute the health report without side effects.
    pub fn health_at(&self, now: DateTime<Utc>) -> HealthReport {
        let unresolved_critical = self
            .unresolved_alerts()
            .filter(|a| a.severity == AlertSeverity::Critical)
            .count();
        let unresolved_high = self
            .unresolved_alerts()
            .filter(|a| a.severity == AlertSeverity::High)
            .count();

        if self.metrics.is_empty() {
            return HealthReport {
                score: 1.0,
                strategy_success_mean: 1.0,
                window_success_rate: 1.0,
                window_avg_confidence: 0.7,
                window_avg_ms: 0.0,
                samples_24h: 0,
                unresolved_critical,
                unresolved_high,
                degraded: false,
            };
        }

        let strategy_success_mean = self
            .effectiveness
            .values()
            .map(|e| e.success_rate)
            .sum::<f64>()
            / self.effectiveness.len() as f64;

        let cutoff = now - Duration::hours(24);
        let window: Vec<&ResolutionMetric> =
            self.metrics.iter().filter(|m| m.at >= cutoff).collect();
        let (window_success_rate, window_avg_confidence, window_avg_ms) = if window.is_empty() {
            (1.0, 0.7, 0.0)
        } else {
            let n = window.len() as f64;
            (
                window.iter().filter(|m| m.success).count() as f64 / n,
                window.iter().map(|m| m.confidence).sum::<f64>() / n,
                window.iter().map(|m| m.elapsed_ms as f64).sum::<f64>() / n,
            )
        };

        // Weighted mean: strategy mean ×1, 24h success ×2, confidence
        // against the 0.7 target ×1, time against the 10s budget ×1.
        let confidence_term = (window_avg_confidence / 0.7).min(1.0);
        let time_term = (1.0 - window_avg_ms / self.config.slow_resolution_ms as f64).max(0.0);
        let weighted = (strategy_success_mean
            + window_success_rate * 2.0
            + confidence_term
            + time_term)
            / 5.0;

        let penalty = 0.2 * unresolved_critical as f64 + 0.1 * unresolved_high as f64;
        let score = (weighted - penalty).clamp(0.0, 1.0);

        HealthReport {
            score,
            strategy_success_mean,
            window_success_rate,
            window_avg_confidence,
            window_avg_ms,
            samples_24h: window.len(),
            unresolved_critical,
            unresolved_high,
            degraded: score < self.config.health_alert_threshold,
        }
    }

    /// Predict expected effectiveness for a hypothetical
    /// `(strategy, entity, conflict_type, network)` tuple.
    pub fn predict(
        &self,
        strategy: &str,
        entity: EntityKind,
        conflict_type: &str,
        network: &NetworkQuality,
    ) -> EffectivenessPrediction {
        let stats = match self.effectiveness.get(strategy) {
            Some(s) if s.total_uses > 0 => s,
            // Unknown strategy: fixed defaults, widest interval.
            _ => {
                return EffectivenessPrediction {
                    confidence: 0.6,
                    expected_ms: 2000.0,
                    success_probability: 0.6,
                    interval: (0.3, 0.9),
                    factors: PredictionFactors::default(),
                }
            }
        };

        let overall = stats.success_rate;
        let entity_rate = stats
            .per_entity
            .get(&entity)
            .filter(|s| s.uses > 0)
            .map(SubStat::rate)
            .unwrap_or(overall);
        let type_rate = stats
            .per_conflict_type
            .get(conflict_type)
            .filter(|s| s.uses > 0)
            .map(SubStat::rate)
            .unwrap_or(overall);
        let network_rate = stats
            .per_network
            .get(&network.bucket())
            .filter(|s| s.uses > 0)
            .map(SubStat::rate)
            .unwrap_or(overall);

        let probability =
            overall * 0.4 + entity_rate * 0.3 + type_rate * 0.2 + network_rate * 0.1;
        let half = (1.0 / (stats.total_uses as f64).sqrt()).clamp(0.05, 0.3);

        EffectivenessPrediction {
            confidence: stats.avg_confidence,
            expected_ms: stats.avg_resolution_ms,
            success_probability: probability,
            interval: ((probability - half).max(0.0), (probability + half).min(1.0)),
            factors: PredictionFactors {
                overall_success: overall,
                entity_success: entity_rate,
                conflict_type_success: type_rate,
                network_success: network_rate,
            },
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use cs_common::{ResolutionKind, Severity, Snapshot};
    use serde_json::json;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Arc;

    fn conflict() -> Conflict {
        Conflict::new(
            EntityKind::Card,
            "card-1",
            "content_edit",
            Snapshot::new(json!({})),
            Snapshot::new(json!({})),
            Severity::Low,
        )
    }

    fn resolution(kind: ResolutionKind, confidence: f64, chain_len: usize) -> Resolution {
        Resolution {
            kind,
            confidence,
            reasoning: "test".into(),
            merged: None,
            requires_confirmation: confidence < 0.7,
            estimated_seconds: 2,
            strategy: "timestamp".into(),
            fallback_chain: vec!["timestamp".to_string(); chain_len],
        }
    }

    fn network(reliability: f64) -> NetworkQuality {
        NetworkQuality::new(reliability, 10.0, 50.0)
    }

    fn monitor() -> PerformanceMonitor {
        PerformanceMonitor::new(MonitorConfig::default())
    }

    #[test]
    fn running_averages_match_reference_sequence() {
        let mut m = monitor();
        let c = conflict();
        let net = network(0.9);

        m.record(&resolution(ResolutionKind::LocalWins, 0.8, 1), &c, 100, &net);
        m.record(&resolution(ResolutionKind::CloudWins, 0.6, 1), &c, 100, &net);
        m.record(&resolution(ResolutionKind::Manual, 0.4, 1), &c, 100, &net);

        let stats = m.effectiveness("timestamp").unwrap();
        assert_eq!(stats.total_uses, 3);
        assert!((stats.success_rate - 2.0 / 3.0).abs() < 1e-9);
        assert!((stats.avg_confidence - 0.6).abs() < 1e-9);
    }

    #[test]
    fn histogram_buckets_align_with_tiers() {
        let mut m = monitor();
        let c = conflict();
        let net = network(0.9);

        m.record(&resolution(ResolutionKind::LocalWins, 0.9, 1), &c, 10, &net);
        m.record(&resolution(ResolutionKind::LocalWins, 0.5, 1), &c, 10, &net);
        m.record(&resolution(ResolutionKind::LocalWins, 0.2, 1), &c, 10, &net);

        let h = m.effectiveness("timestamp").unwrap().histogram;
        assert_eq!((h.high, h.medium, h.low), (1, 1, 1));
    }

    #[test]
    fn low_confidence_raises_exactly_one_alert() {
        let mut m = monitor();
        m.record(
            &resolution(ResolutionKind::LocalWins, 0.25, 1),
            &conflict(),
            100,
            &network(0.9),
        );

        assert_eq!(m.alerts().len(), 1);
        assert!(m.alerts()[0].message.contains("low confidence"));
        assert_eq!(m.alerts()[0].severity, AlertSeverity::Medium);
    }

    #[test]
    fn slow_resolution_raises_alert() {
        let mut m = monitor();
        m.record(
            &resolution(ResolutionKind::LocalWins, 0.9, 1),
            &conflict(),
            15_000,
            &network(0.9),
        );

        assert_eq!(m.alerts().len(), 1);
        let msg = &m.alerts()[0].message;
        assert!(msg.contains("resolution time"));
        assert!(msg.contains("too long"));
    }

    #[test]
    fn long_fallback_chain_raises_alert() {
        let mut m = monitor();
        m.record(
            &resolution(ResolutionKind::LocalWins, 0.9, 4),
            &conflict(),
            100,
            &network(0.9),
        );

        assert_eq!(m.alerts().len(), 1);
        assert!(m.alerts()[0].message.contains("fallback chain too long"));
        assert_eq!(m.alerts()[0].severity, AlertSeverity::Low);
    }

    #[test]
    fn unreliable_network_failure_is_informational() {
        let mut m = monitor();
        m.record(
            &resolution(ResolutionKind::Manual, 0.5, 1),
            &conflict(),
            100,
            &network(0.2),
        );

        assert_eq!(m.alerts().len(), 1);
        assert_eq!(m.alerts()[0].kind, AlertKind::Info);
    }

    #[test]
    fn independent_rules_can_all_fire() {
        let mut m = monitor();
        // Manual at 0.1 confidence, slow, long chain, bad network.
        m.record(
            &resolution(ResolutionKind::Manual, 0.1, 5),
            &conflict(),
            20_000,
            &network(0.1),
        );
        assert_eq!(m.alerts().len(), 4);
    }

    #[test]
    fn failing_callback_does_not_stop_others() {
        let mut m = monitor();
        let seen = Arc::new(AtomicUsize::new(0));
        m.on_alert(Box::new(|_| Err("callback exploded".into())));
        let seen2 = Arc::clone(&seen);
        m.on_alert(Box::new(move |_| {
            seen2.fetch_add(1, Ordering::SeqCst);
            Ok(())
        }));

        m.record(
            &resolution(ResolutionKind::LocalWins, 0.25, 1),
            &conflict(),
            100,
            &network(0.9),
        );
        assert_eq!(seen.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn ring_buffer_keeps_most_recent_1000() {
        let mut m = monitor();
        let c = conflict();
        let net = network(0.9);
        let start = Utc::now();
        for i in 0..1200u32 {
            m.record_at(
                &resolution(ResolutionKind::LocalWins, 0.9, 1),
                &c,
                i as u64,
                &net,
                start + Duration::seconds(i as i64),
            );
        }

        assert_eq!(m.metrics_len(), 1000);
        // Oldest 200 dropped: the front entry carries elapsed 200.
        assert_eq!(m.metrics().next().unwrap().elapsed_ms, 200);
    }

    #[test]
    fn resolve_alert_marks_and_reports_unknown() {
        let mut m = monitor();
        m.record(
            &resolution(ResolutionKind::LocalWins, 0.25, 1),
            &conflict(),
            100,
            &network(0.9),
        );
        let id = m.alerts()[0].id.clone();
        assert!(m.resolve_alert(&id));
        assert_eq!(m.unresolved_alerts().count(), 0);
        assert!(!m.resolve_alert(&AlertId::from_string("alr-nope")));
    }

    #[test]
    fn empty_monitor_is_healthy() {
        let mut m = monitor();
        let report = m.run_health_check();
        assert!((report.score - 1.0).abs() < 1e-9);
        assert!(!report.degraded);
        assert!(m.alerts().is_empty());
    }

    #[test]
    fn persistent_failures_degrade_health() {
        let mut m = monitor();
        let c = conflict();
        let net = network(0.9);
        for _ in 0..20 {
            m.record(&resolution(ResolutionKind::Manual, 0.1, 1), &c, 9000, &net);
        }

        let report = m.run_health_check();
        assert!(report.degraded, "score {} should be degraded", report.score);
        assert!(m
            .alerts()
            .iter()
            .any(|a| a.message.contains("system health degraded")));
    }

    #[test]
    fn trend_tracks_success_rate() {
        let mut m = monitor();
        let c = conflict();
        let net = network(0.9);

        for _ in 0..10 {
            m.record(&resolution(ResolutionKind::LocalWins, 0.9, 1), &c, 10, &net);
        }
        assert_eq!(
            m.effectiveness("timestamp").unwrap().trend,
            EffectivenessTrend::Improving
        );

        for _ in 0..10 {
            m.record(&resolution(ResolutionKind::Manual, 0.3, 1), &c, 10, &net);
        }
        // 10/20 successes: declining.
        assert_eq!(
            m.effectiveness("timestamp").unwrap().trend,
            EffectivenessTrend::Declining
        );
    }

    #[test]
    fn predict_unknown_strategy_uses_defaults() {
        let m = monitor();
        let p = m.predict("never-seen", EntityKind::Card, "content_edit", &network(0.9));
        assert!((p.confidence - 0.6).abs() < 1e-9);
        assert!((p.success_probability - 0.6).abs() < 1e-9);
        assert_eq!(p.interval, (0.3, 0.9));
    }

    #[test]
    fn predict_blends_subpopulation_rates() {
        let mut m = monitor();
        let net = network(0.9);
        // 4 successes on cards.
        for _ in 0..4 {
            m.record(
                &resolution(ResolutionKind::LocalWins, 0.8, 1),
                &conflict(),
                100,
                &net,
            );
        }
        // 1 failure on a folder conflict of a different type.
        let folder = Conflict::new(
            EntityKind::Folder,
            "f-1",
            "move",
            Snapshot::new(json!({})),
            Snapshot::new(json!({})),
            Severity::Low,
        );
        m.record(&resolution(ResolutionKind::Manual, 0.2, 1), &folder, 100, &net);

        let p = m.predict("timestamp", EntityKind::Card, "content_edit", &net);
        // overall 0.8; card entity rate 1.0; card type rate 1.0; bucket 0.8
        let expected = 0.8 * 0.4 + 1.0 * 0.3 + 1.0 * 0.2 + 0.8 * 0.1;
        assert!((p.success_probability - expected).abs() < 1e-9);
        assert!(p.interval.0 <= p.success_probability);
        assert!(p.interval.1 >= p.success_probability);

        // Folder predictions use the folder sub-rate.
        let p = m.predict("timestamp", EntityKind::Folder, "move", &net);
        assert!(p.success_probability < 0.8);
    }
}
