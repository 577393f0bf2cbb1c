//! Guaranteed-terminating timestamp fallback.
//!
//! Invoked only by the cascade when no strategy reaches the minimum
//! acceptable confidence. Built on the shared timestamp scoring so the
//! fallback can never itself fail.

use cs_common::{Candidate, ResolutionContext};

use crate::strategy::timestamp;

/// Name recorded in resolutions produced by the fallback path.
pub const FALLBACK_STRATEGY: &str = "timestamp-fallback";

/// Compute the fallback candidate. Pure and total.
pub fn resolve(ctx: &ResolutionContext) -> Candidate {
    let mut c = timestamp::score(ctx);
    c.reasoning = format!("no strategy reached acceptable confidence; {}", c.reasoning);
    c
}
