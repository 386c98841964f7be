//! Battle benchmarks for arena_core.
//!
//! Run with: `cargo bench -p arena_core`

// Benchmark binaries don't need docs on macro-generated functions
#![allow(missing_docs)]

use arena_test_utils::fixtures;
use criterion::{black_box, criterion_group, criterion_main, Criterion};

/// One hundred steps of a two-unit duel, the smallest full battle.
pub fn duel_benchmark(c: &mut Criterion) {
    c.bench_function("duel_100_steps", |b| {
        b.iter(|| {
            let mut world = fixtures::duel_world(42);
            for _ in 0..100 {
                world.time_step();
            }
            black_box(world.time_step_count())
        })
    });
}

/// A fuller board: five units per side.
pub fn lineup_benchmark(c: &mut Criterion) {
    c.bench_function("lineup_5v5_100_steps", |b| {
        b.iter(|| {
            let mut world = fixtures::lineup_world(7, 5);
            for _ in 0..100 {
                world.time_step();
            }
            black_box(world.time_step_count())
        })
    });
}

/// Snapshot hashing cost, paid on every desync check.
pub fn state_hash_benchmark(c: &mut Criterion) {
    let mut world = fixtures::lineup_world(7, 5);
    for _ in 0..50 {
        world.time_step();
    }
    c.bench_function("state_hash_mid_battle", |b| {
        b.iter(|| black_box(world.state_hash().unwrap()))
    });
}

criterion_group!(benches, duel_benchmark, lineup_benchmark, state_hash_benchmark);
criterion_main!(benches);
