//! Prefixed identifier types.
//!
//! All engine-generated records carry short prefixed ids so that log lines
//! and dashboards can tell conflicts, patterns, alerts, and insights apart
//! at a glance.

use serde::{Deserialize, Serialize};
use std::fmt;

fn random_suffix() -> String {
    uuid::Uuid::new_v4().simple().to_string()[..8].to_string()
}

macro_rules! prefixed_id {
    ($(#[$doc:meta])* $name:ident, $prefix:literal) => {
        $(#[$doc])*
        #[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
        #[serde(transparent)]
        pub struct $name(pub String);

        impl $name {
            /// Generate a new id with the type prefix.
            pub fn new() -> Self {
                Self(format!("{}-{}", $prefix, random_suffix()))
            }

            /// Wrap an existing id string.
            pub fn from_string(s: impl Into<String>) -> Self {
                Self(s.into())
            }

            pub fn as_str(&self) -> &str {
                &self.0
            }
        }

        impl Default for $name {
            fn default() -> Self {
                Self::new()
            }
        }

        impl fmt::Display for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                write!(f, "{}", self.0)
            }
        }
    };
}

prefixed_id!(
    /// Identifier for a detected conflict.
    ConflictId,
    "cfl"
);
prefixed_id!(
    /// Identifier for a conflict pattern (seeded or synthesized).
    PatternId,
    "pat"
);
prefixed_id!(
    /// Identifier for a performance alert.
    AlertId,
    "alr"
);
prefixed_id!(
    /// Identifier for a pattern insight.
    InsightId,
    "ins"
);
