//! Resolution context supplied per `resolve` invocation.
//!
//! The context is read-only to strategies. It carries the replica
//! operations that produced the conflict, the user's preferences, current
//! network quality, time constraints, and the accumulated conflict
//! history.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::collections::BTreeMap;

use crate::conflict::EntityKind;
use crate::resolution::ResolutionKind;

/// One replica's write operation behind the conflict.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ReplicaOp {
    /// When the write happened on that replica.
    pub at: DateTime<Utc>,
    /// Operation payload summary, if the sync layer attached one.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub payload: Option<Value>,
}

impl ReplicaOp {
    pub fn at(at: DateTime<Utc>) -> Self {
        Self { at, payload: None }
    }
}

/// Network transport class reported by the quality sampler.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Transport {
    Wifi,
    Cellular,
    Ethernet,
    Unknown,
}

/// Bucketed network quality used for per-strategy statistics.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize,
)]
#[serde(rename_all = "snake_case")]
pub enum NetworkBucket {
    Poor,
    Fair,
    Good,
    Excellent,
}

impl std::fmt::Display for NetworkBucket {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let s = match self {
            NetworkBucket::Poor => "poor",
            NetworkBucket::Fair => "fair",
            NetworkBucket::Good => "good",
            NetworkBucket::Excellent => "excellent",
        };
        write!(f, "{}", s)
    }
}

/// Sampled network quality at resolution time.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NetworkQuality {
    /// Link reliability in [0, 1].
    pub reliability: f64,
    pub bandwidth_mbps: f64,
    pub latency_ms: f64,
    pub transport: Transport,
}

impl NetworkQuality {
    pub fn new(reliability: f64, bandwidth_mbps: f64, latency_ms: f64) -> Self {
        Self {
            reliability,
            bandwidth_mbps,
            latency_ms,
            transport: Transport::Unknown,
        }
    }

    /// Composite [0, 1] score blending reliability, bandwidth, and latency.
    ///
    /// `reliability × 0.4 + min(bw/10, 1) × 0.3 + max(0, 1 − lat/1000) × 0.3`
    pub fn composite_score(&self) -> f64 {
        let bw = (self.bandwidth_mbps / 10.0).min(1.0);
        let lat = (1.0 - self.latency_ms / 1000.0).max(0.0);
        self.reliability * 0.4 + bw * 0.3 + lat * 0.3
    }

    /// Bucket the composite score for statistics.
    pub fn bucket(&self) -> NetworkBucket {
        let score = self.composite_score();
        if score < 0.4 {
            NetworkBucket::Poor
        } else if score < 0.6 {
            NetworkBucket::Fair
        } else if score < 0.8 {
            NetworkBucket::Good
        } else {
            NetworkBucket::Excellent
        }
    }
}

/// How urgently the conflict needs a decision.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Urgency {
    Background,
    Normal,
    Elevated,
    Immediate,
}

/// Caller-supplied timing constraints.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TimeConstraints {
    pub urgency: Urgency,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub deadline: Option<DateTime<Utc>>,
    pub user_active: bool,
}

impl Default for TimeConstraints {
    fn default() -> Self {
        Self {
            urgency: Urgency::Normal,
            deadline: None,
            user_active: false,
        }
    }
}

/// User preferences relevant to conflict resolution.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct UserPreferences {
    /// Resolution the user asked for when nothing better is known.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub default_resolution: Option<ResolutionKind>,
    /// Whether the user allows automatic resolution at all.
    #[serde(default)]
    pub auto_resolve: bool,
}

/// Accumulated resolution history, persisted through the preference store.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ConflictHistory {
    pub total_conflicts: u64,
    pub auto_resolved: u64,
    pub avg_resolution_ms: f64,
    /// Per-entity resolution the user (or the cascade) has settled on.
    #[serde(default)]
    pub per_entity: BTreeMap<EntityKind, ResolutionKind>,
}

impl ConflictHistory {
    /// Share of past conflicts resolved without user intervention.
    pub fn auto_ratio(&self) -> f64 {
        if self.total_conflicts == 0 {
            return 0.0;
        }
        self.auto_resolved as f64 / self.total_conflicts as f64
    }

    /// Fold one resolved conflict into the running aggregates.
    pub fn record(&mut self, entity: EntityKind, kind: ResolutionKind, auto: bool, elapsed_ms: u64) {
        let n = self.total_conflicts as f64;
        self.avg_resolution_ms = (self.avg_resolution_ms * n + elapsed_ms as f64) / (n + 1.0);
        self.total_conflicts += 1;
        if auto {
            self.auto_resolved += 1;
            self.per_entity.insert(entity, kind);
        }
    }
}

/// Everything a strategy may read while scoring a conflict.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ResolutionContext {
    pub local_op: ReplicaOp,
    pub cloud_op: ReplicaOp,
    pub preferences: UserPreferences,
    pub network: NetworkQuality,
    pub time: TimeConstraints,
    pub history: ConflictHistory,
}

impl ResolutionContext {
    /// Minimal context for the given replica write times and network sample.
    pub fn new(
        local_at: DateTime<Utc>,
        cloud_at: DateTime<Utc>,
        network: NetworkQuality,
    ) -> Self {
        Self {
            local_op: ReplicaOp::at(local_at),
            cloud_op: ReplicaOp::at(cloud_at),
            preferences: UserPreferences::default(),
            network,
            time: TimeConstraints::default(),
            history: ConflictHistory::default(),
        }
    }

    /// Absolute distance between the two replica writes, in milliseconds.
    pub fn timestamp_delta_ms(&self) -> i64 {
        (self.local_op.at - self.cloud_op.at).num_milliseconds().abs()
    }
}
