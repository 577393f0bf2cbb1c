//! Cardsync conflict resolution engine.
//!
//! Resolves write-write conflicts between a local offline-capable replica
//! and a cloud replica with a graduated-trust cascade: cheap, reliable
//! signals first, expensive or uncertain ones later, and a deterministic
//! timestamp fallback guaranteeing termination. Every produced resolution
//! fans out to a performance monitor (per-strategy effectiveness, alerts,
//! health) and a pattern analyzer (recurring conflict shapes, insights,
//! predictions).
//!
//! Entry points:
//! - [`cascade::Cascade`]: the pure decision procedure
//! - [`engine::Engine`]: cascade + monitor + analyzer + persistence
//! - [`monitor::PerformanceMonitor`] and [`pattern::PatternAnalyzer`]:
//!   usable standalone when the embedder owns the fan-out

pub mod cascade;
pub mod engine;
pub mod history;
pub mod monitor;
pub mod pattern;
pub mod rerank;
pub mod store;
pub mod strategy;

pub use cascade::Cascade;
pub use engine::{BackgroundGuard, Engine};
pub use monitor::{PerformanceAlert, PerformanceMonitor, StrategyEffectiveness};
pub use pattern::{ConflictPattern, PatternAnalyzer, PatternCluster, PatternInsight};
pub use store::{HierarchyLookup, JsonFileStore, MemoryStore, PreferenceStore, StaticHierarchy};
pub use strategy::{Strategy, StrategyError};
