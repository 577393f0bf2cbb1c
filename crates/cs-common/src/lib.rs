//! Cardsync common types, IDs, and errors.
//!
//! This crate provides the foundational types shared across the conflict
//! resolution engine:
//! - Conflict and snapshot types produced by change detection
//! - Resolution context (replica operations, network quality, history)
//! - Resolution and candidate types consumed by the sync queue
//! - Common error types and prefixed identifiers

pub mod conflict;
pub mod context;
pub mod error;
pub mod id;
pub mod resolution;

pub use conflict::{Conflict, ConflictStatus, EntityKind, Severity, Snapshot};
pub use context::{
    ConflictHistory, NetworkBucket, NetworkQuality, ReplicaOp, ResolutionContext, TimeConstraints,
    Transport, Urgency, UserPreferences,
};
pub use error::{Error, Result};
pub use id::{AlertId, ConflictId, InsightId, PatternId};
pub use resolution::{Candidate, Resolution, ResolutionKind};
