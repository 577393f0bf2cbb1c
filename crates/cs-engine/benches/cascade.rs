//! Criterion benchmarks for the cascade hot path.

use std::sync::Arc;

use chrono::{Duration, Utc};
use criterion::{black_box, criterion_group, criterion_main, Criterion};
use serde_json::json;

use cs_common::{Conflict, EntityKind, NetworkQuality, ResolutionContext, Severity, Snapshot};
use cs_config::CascadeConfig;
use cs_engine::store::StaticHierarchy;
use cs_engine::Cascade;

fn card_conflict() -> Conflict {
    Conflict::new(
        EntityKind::Card,
        "card-1",
        "content_edit",
        Snapshot::new(json!({
            "front_content": "What is the borrow checker",
            "back_content": "The compile time ownership verifier",
            "tags": ["rust", "compiler"],
        })),
        Snapshot::new(json!({
            "front_content": "What is the borrow checker exactly",
            "back_content": "The compile time ownership verifier",
            "tags": ["rust"],
        })),
        Severity::Medium,
    )
}

fn context(delta_ms: i64, reliability: f64) -> ResolutionContext {
    let now = Utc::now();
    ResolutionContext::new(
        now,
        now + Duration::milliseconds(delta_ms),
        NetworkQuality::new(reliability, 10.0, 50.0),
    )
}

fn bench_resolve(c: &mut Criterion) {
    let cascade = Cascade::new(
        CascadeConfig {
            retry_backoff_ms: 0,
            ..CascadeConfig::default()
        },
        Arc::new(StaticHierarchy::new()),
    );

    let mut group = c.benchmark_group("cascade/resolve");

    // Tier-1 acceptance: timestamp fires immediately.
    let conflict = card_conflict();
    let fast = context(300, 0.9);
    group.bench_function("tier1_timestamp", |b| {
        b.iter(|| black_box(cascade.resolve(black_box(&conflict), black_box(&fast))))
    });

    // Unreliable link weakens the timestamp signal; later strategies run.
    let slow = context(300, 0.1);
    group.bench_function("unreliable_link", |b| {
        b.iter(|| black_box(cascade.resolve(black_box(&conflict), black_box(&slow))))
    });

    group.finish();
}

criterion_group!(benches, bench_resolve);
criterion_main!(benches);
