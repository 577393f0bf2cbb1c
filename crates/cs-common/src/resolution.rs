//! Resolution outcomes and strategy candidates.

use serde::{Deserialize, Serialize};
use serde_json::Value;

/// What the sync queue should do with the conflicted entity.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ResolutionKind {
    LocalWins,
    CloudWins,
    Merge,
    Manual,
}

impl ResolutionKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            ResolutionKind::LocalWins => "local_wins",
            ResolutionKind::CloudWins => "cloud_wins",
            ResolutionKind::Merge => "merge",
            ResolutionKind::Manual => "manual",
        }
    }
}

impl std::fmt::Display for ResolutionKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// An unconfirmed proposal produced by one strategy, before the cascade
/// accepts or discards it.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Candidate {
    pub resolution: ResolutionKind,
    /// Trust in this proposal, in [0, 1].
    pub confidence: f64,
    pub reasoning: String,
    /// Merged payload when `resolution == merge`.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub merged: Option<Value>,
    /// Advisory cost of applying this resolution.
    pub estimated_seconds: u32,
}

impl Candidate {
    pub fn new(resolution: ResolutionKind, confidence: f64, reasoning: impl Into<String>) -> Self {
        Self {
            resolution,
            confidence,
            reasoning: reasoning.into(),
            merged: None,
            estimated_seconds: match resolution {
                ResolutionKind::Manual => 60,
                ResolutionKind::Merge => 10,
                _ => 2,
            },
        }
    }

    pub fn with_merged(mut self, merged: Value) -> Self {
        self.merged = Some(merged);
        self
    }

    pub fn with_estimate(mut self, seconds: u32) -> Self {
        self.estimated_seconds = seconds;
        self
    }
}

/// The accepted outcome for one conflict. Produced once, immutable,
/// persisted by the sync queue.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Resolution {
    pub kind: ResolutionKind,
    pub confidence: f64,
    pub reasoning: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub merged: Option<Value>,
    pub requires_confirmation: bool,
    pub estimated_seconds: u32,
    /// Name of the strategy whose candidate was accepted.
    pub strategy: String,
    /// Strategy names attempted for this conflict, in invocation order.
    pub fallback_chain: Vec<String>,
}

impl Resolution {
    /// Promote an accepted candidate into a final resolution.
    ///
    /// Confirmation is forced on whenever confidence is below the high
    /// band, regardless of what the tier asked for.
    pub fn from_candidate(
        candidate: Candidate,
        strategy: impl Into<String>,
        fallback_chain: Vec<String>,
        requires_confirmation: bool,
    ) -> Self {
        let confidence = candidate.confidence.clamp(0.0, 1.0);
        Self {
            kind: candidate.resolution,
            confidence,
            reasoning: candidate.reasoning,
            merged: candidate.merged,
            requires_confirmation: requires_confirmation || confidence < 0.7,
            estimated_seconds: candidate.estimated_seconds,
            strategy: strategy.into(),
            fallback_chain,
        }
    }

    /// A manual resolution with zero confidence (the safe default).
    pub fn manual(reasoning: impl Into<String>, fallback_chain: Vec<String>) -> Self {
        Self {
            kind: ResolutionKind::Manual,
            confidence: 0.0,
            reasoning: reasoning.into(),
            merged: None,
            requires_confirmation: true,
            estimated_seconds: 120,
            strategy: "manual".to_string(),
            fallback_chain,
        }
    }

    /// Whether the cascade handled this conflict without user involvement.
    pub fn is_automatic(&self) -> bool {
        self.kind != ResolutionKind::Manual && !self.requires_confirmation
    }
}
