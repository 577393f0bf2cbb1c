//! Conflict records and entity snapshots.
//!
//! A `Conflict` is produced by the external change-detection collaborator
//! when the same entity was modified on both replicas between syncs. It is
//! immutable once created; the engine only reads it.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::id::ConflictId;

/// Kind of entity a conflict refers to.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize,
)]
#[serde(rename_all = "snake_case")]
pub enum EntityKind {
    Card,
    Folder,
    Tag,
    Image,
}

impl std::fmt::Display for EntityKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let s = match self {
            EntityKind::Card => "card",
            EntityKind::Folder => "folder",
            EntityKind::Tag => "tag",
            EntityKind::Image => "image",
        };
        write!(f, "{}", s)
    }
}

/// Conflict severity as assessed by change detection.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize,
)]
#[serde(rename_all = "snake_case")]
pub enum Severity {
    Low,
    Medium,
    High,
    Critical,
}

/// Lifecycle status of a conflict record.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ConflictStatus {
    Pending,
    Resolved,
    Dismissed,
}

/// One replica's view of the conflicted entity.
///
/// Entity payloads are free-form JSON at the sync boundary; this wrapper
/// keeps the field access the strategies rely on in one place.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Snapshot(pub Value);

impl Snapshot {
    pub fn new(value: Value) -> Self {
        Self(value)
    }

    /// String-valued field access; absent or non-string fields yield `None`.
    pub fn field_str(&self, name: &str) -> Option<&str> {
        self.0.get(name).and_then(Value::as_str)
    }

    /// Card front side text.
    pub fn front_content(&self) -> Option<&str> {
        self.field_str("front_content")
    }

    /// Card back side text.
    pub fn back_content(&self) -> Option<&str> {
        self.field_str("back_content")
    }

    /// Card style object.
    pub fn style(&self) -> Option<&serde_json::Map<String, Value>> {
        self.0.get("style").and_then(Value::as_object)
    }

    /// Containing folder for cards.
    pub fn folder_id(&self) -> Option<&str> {
        self.field_str("folder_id")
    }

    /// Display name for folders and tags.
    pub fn name(&self) -> Option<&str> {
        self.field_str("name")
    }

    /// Parent folder/tag id; `None` for roots.
    pub fn parent_id(&self) -> Option<&str> {
        self.field_str("parent_id")
    }

    /// Tag list attached to a card.
    pub fn tags(&self) -> Vec<String> {
        self.0
            .get("tags")
            .and_then(Value::as_array)
            .map(|items| {
                items
                    .iter()
                    .filter_map(Value::as_str)
                    .map(String::from)
                    .collect()
            })
            .unwrap_or_default()
    }

    /// Hierarchy depth hint recorded by the storage layer, if present.
    pub fn depth_hint(&self) -> Option<u32> {
        self.0
            .get("depth")
            .and_then(Value::as_u64)
            .map(|d| d as u32)
    }
}

/// A write-write conflict between the local and cloud replicas.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Conflict {
    pub id: ConflictId,
    pub entity: EntityKind,
    pub entity_id: String,
    /// Free-form tag assigned by change detection (e.g. "content_edit").
    pub conflict_type: String,
    pub local: Snapshot,
    pub cloud: Snapshot,
    pub detected_at: DateTime<Utc>,
    pub severity: Severity,
    pub status: ConflictStatus,
}

impl Conflict {
    /// Build a pending conflict with a fresh id.
    pub fn new(
        entity: EntityKind,
        entity_id: impl Into<String>,
        conflict_type: impl Into<String>,
        local: Snapshot,
        cloud: Snapshot,
        severity: Severity,
    ) -> Self {
        Self {
            id: ConflictId::new(),
            entity,
            entity_id: entity_id.into(),
            conflict_type: conflict_type.into(),
            local,
            cloud,
            detected_at: Utc::now(),
            severity,
            status: ConflictStatus::Pending,
        }
    }
}
