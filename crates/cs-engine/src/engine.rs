//! Engine facade: cascade + monitor + analyzer + persistence.
//!
//! `resolve` runs the cascade, then fans the produced resolution out to
//! the performance monitor and pattern analyzer and persists the updated
//! conflict history. The fan-out targets sit behind mutexes so multiple
//! conflicts may be resolved concurrently; the cascade itself is
//! stateless per call.
//!
//! Background schedules (health check, maintenance sweep) run on plain
//! threads holding a weak reference, so dropping the engine stops them.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex, MutexGuard, RwLock, Weak};
use std::thread::JoinHandle;
use std::time::{Duration, Instant};

use chrono::{DateTime, Utc};
use cs_common::{Conflict, NetworkQuality, Resolution, ResolutionContext, UserPreferences};
use cs_config::EngineConfig;

use crate::cascade::Cascade;
use crate::history;
use crate::monitor::PerformanceMonitor;
use crate::pattern::PatternAnalyzer;
use crate::rerank;
use crate::store::{HierarchyLookup, PreferenceStore};

pub const PREFERENCES_KEY: &str = "user_preferences";

/// The assembled conflict resolution engine.
pub struct Engine {
    cascade: RwLock<Cascade>,
    monitor: Mutex<PerformanceMonitor>,
    analyzer: Mutex<PatternAnalyzer>,
    store: Arc<dyn PreferenceStore>,
    config: EngineConfig,
}

impl Engine {
    pub fn new(
        config: EngineConfig,
        store: Arc<dyn PreferenceStore>,
        lookup: Arc<dyn HierarchyLookup>,
    ) -> Self {
        Self {
            cascade: RwLock::new(Cascade::new(config.cascade.clone(), lookup)),
            monitor: Mutex::new(PerformanceMonitor::new(config.monitor.clone())),
            analyzer: Mutex::new(PatternAnalyzer::new(config.analyzer.clone())),
            store,
            config,
        }
    }

    /// Assemble a resolution context from the persisted preferences and
    /// history plus the caller's live inputs.
    pub fn build_context(
        &self,
        local_at: DateTime<Utc>,
        cloud_at: DateTime<Utc>,
        network: NetworkQuality,
    ) -> ResolutionContext {
        let mut ctx = ResolutionContext::new(local_at, cloud_at, network);
        ctx.history = history::load(self.store.as_ref());
        ctx.preferences = match self.store.get(PREFERENCES_KEY) {
            Ok(Some(value)) => serde_json::from_value(value).unwrap_or_else(|e| {
                tracing::warn!(error = %e, "user preferences corrupt; using defaults");
                UserPreferences::default()
            }),
            Ok(None) => UserPreferences::default(),
            Err(e) => {
                tracing::warn!(error = %e, "user preferences unavailable; using defaults");
                UserPreferences::default()
            }
        };
        ctx
    }

    /// Resolve one conflict and fan the outcome out to the monitor, the
    /// analyzer, and the history store.
    pub fn resolve(&self, conflict: &Conflict, ctx: &ResolutionContext) -> Resolution {
        let started = Instant::now();
        let resolution = self
            .cascade
            .read()
            .unwrap_or_else(|e| e.into_inner())
            .resolve(conflict, ctx);
        let elapsed_ms = started.elapsed().as_millis() as u64;

        self.monitor()
            .record(&resolution, conflict, elapsed_ms, &ctx.network);
        self.analyzer()
            .analyze(conflict, &resolution, elapsed_ms, ctx);
        history::record_outcome(self.store.as_ref(), conflict, &resolution, elapsed_ms);

        tracing::debug!(
            conflict = %conflict.id,
            strategy = %resolution.strategy,
            kind = %resolution.kind,
            confidence = resolution.confidence,
            elapsed_ms,
            "conflict resolved"
        );
        resolution
    }

    /// Re-rank strategy priorities from the current effectiveness
    /// snapshot. Out-of-band maintenance; call it from a scheduler, not
    /// per resolution.
    pub fn rerank_strategies(&self) -> Vec<(String, u8)> {
        let snapshot = self.monitor().effectiveness_snapshot();
        let table = rerank::rank(&snapshot);
        if !table.is_empty() {
            self.cascade
                .write()
                .unwrap_or_else(|e| e.into_inner())
                .apply_priorities(&table);
            tracing::info!(entries = table.len(), "strategy priorities re-ranked");
        }
        table
    }

    /// The performance monitor, locked.
    pub fn monitor(&self) -> MutexGuard<'_, PerformanceMonitor> {
        self.monitor.lock().unwrap_or_else(|e| e.into_inner())
    }

    /// The pattern analyzer, locked.
    pub fn analyzer(&self) -> MutexGuard<'_, PatternAnalyzer> {
        self.analyzer.lock().unwrap_or_else(|e| e.into_inner())
    }

    /// Start the periodic health-check and maintenance schedules.
    pub fn start_background(self: &Arc<Self>) -> BackgroundGuard {
        let stop = Arc::new(AtomicBool::new(false));
        let mut handles = Vec::new();

        let health_interval = Duration::from_secs(self.config.monitor.health_interval_secs);
        handles.push(spawn_schedule(
            "health-check",
            Arc::downgrade(self),
            Arc::clone(&stop),
            health_interval,
            |engine| {
                engine.monitor().run_health_check();
            },
        ));

        let maintenance_interval =
            Duration::from_secs(self.config.analyzer.maintenance_interval_secs);
        handles.push(spawn_schedule(
            "maintenance",
            Arc::downgrade(self),
            Arc::clone(&stop),
            maintenance_interval,
            |engine| {
                engine.analyzer().run_maintenance();
            },
        ));

        BackgroundGuard { stop, handles }
    }
}

fn spawn_schedule(
    name: &'static str,
    engine: Weak<Engine>,
    stop: Arc<AtomicBool>,
    interval: Duration,
    job: fn(&Engine),
) -> JoinHandle<()> {
    std::thread::Builder::new()
        .name(format!("cs-{name}"))
        .spawn(move || {
            let tick = Duration::from_millis(50).min(interval.max(Duration::from_millis(1)));
            let mut last: Option<Instant> = None;
            loop {
                if stop.load(Ordering::SeqCst) {
                    break;
                }
                let due = last.map(|t| t.elapsed() >= interval).unwrap_or(true);
                if due {
                    match engine.upgrade() {
                        Some(engine) => job(&engine),
                        None => break,
                    }
                    last = Some(Instant::now());
                }
                std::thread::sleep(tick);
            }
            tracing::debug!(schedule = name, "background schedule stopped");
        })
        .expect("spawning background schedule")
}

/// Stops the background schedules when dropped.
pub struct BackgroundGuard {
    stop: Arc<AtomicBool>,
    handles: Vec<JoinHandle<()>>,
}

impl BackgroundGuard {
    /// Signal the schedules to stop and wait for them.
    pub fn stop(mut self) {
        self.shutdown();
    }

    fn shutdown(&mut self) {
        self.stop.store(true, Ordering::SeqCst);
        for handle in self.handles.drain(..) {
            let _ = handle.join();
        }
    }
}

impl Drop for BackgroundGuard {
    fn drop(&mut self) {
        self.shutdown();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::store::{MemoryStore, StaticHierarchy};
    use chrono::Duration as ChronoDuration;
    use cs_common::{EntityKind, ResolutionKind, Severity, Snapshot};
    use serde_json::json;

    fn engine() -> Engine {
        Engine::new(
            EngineConfig::default(),
            Arc::new(MemoryStore::new()),
            Arc::new(StaticHierarchy::new()),
        )
    }

    fn conflict() -> Conflict {
        Conflict::new(
            EntityKind::Card,
            "card-1",
            "content_edit",
            Snapshot::new(json!({"front_content": "a"})),
            Snapshot::new(json!({"front_content": "b"})),
            Severity::Low,
        )
    }

    fn ctx() -> ResolutionContext {
        let now = Utc::now();
        ResolutionContext::new(
            now,
            now + ChronoDuration::milliseconds(300),
            NetworkQuality::new(0.9, 10.0, 50.0),
        )
    }

    #[test]
    fn resolve_fans_out_to_monitor_analyzer_and_history() {
        let e = engine();
        let r = e.resolve(&conflict(), &ctx());

        assert_eq!(r.kind, ResolutionKind::CloudWins);
        assert_eq!(e.monitor().metrics_len(), 1);
        assert_eq!(e.analyzer().history_len(), 1);

        let ctx2 = e.build_context(
            Utc::now(),
            Utc::now(),
            NetworkQuality::new(0.9, 10.0, 50.0),
        );
        assert_eq!(ctx2.history.total_conflicts, 1);
        assert_eq!(ctx2.history.auto_resolved, 1);
    }

    #[test]
    fn build_context_survives_corrupt_preferences() {
        let store = Arc::new(MemoryStore::new());
        store.set(PREFERENCES_KEY, json!(42)).unwrap();
        let e = Engine::new(
            EngineConfig::default(),
            store,
            Arc::new(StaticHierarchy::new()),
        );
        let ctx = e.build_context(Utc::now(), Utc::now(), NetworkQuality::new(0.9, 10.0, 50.0));
        assert!(ctx.preferences.default_resolution.is_none());
    }

    #[test]
    fn rerank_applies_a_priority_table() {
        let e = engine();
        // Seed some effectiveness data.
        for _ in 0..5 {
            e.resolve(&conflict(), &ctx());
        }
        let table = e.rerank_strategies();
        assert!(!table.is_empty());
        // The only used strategy ranks first.
        assert_eq!(table[0].0, "timestamp");
    }

    #[test]
    fn background_guard_runs_and_stops() {
        let mut config = EngineConfig::default();
        config.monitor.health_interval_secs = 0;
        config.analyzer.maintenance_interval_secs = 0;
        let e = Arc::new(Engine::new(
            config,
            Arc::new(MemoryStore::new()),
            Arc::new(StaticHierarchy::new()),
        ));

        // Degrade health first so the schedule observably fires.
        for _ in 0..20 {
            let r = Resolution::manual("forced", vec![]);
            e.monitor().record(
                &r,
                &conflict(),
                9000,
                &NetworkQuality::new(0.9, 10.0, 50.0),
            );
        }

        let guard = e.start_background();
        std::thread::sleep(Duration::from_millis(200));
        guard.stop();

        assert!(e
            .monitor()
            .alerts()
            .iter()
            .any(|a| a.message.contains("system health degraded")));
    }
}
