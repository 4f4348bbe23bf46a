//! Battle benchmarks for tactics_core.
//!
//! Run with: `cargo bench -p tactics_core`

// Benchmark binaries don't need docs on macro-generated functions
#![allow(missing_docs)]

use criterion::{black_box, criterion_group, criterion_main, Criterion};
use tactics_core::battle::DEFAULT_MAX_TICKS;
use tactics_core::rng::RandomStream;
use tactics_test_utils::fixtures::{battle, duel_setup, knight_vs_archer, shipped_data};

/// Full battles from setup to report.
pub fn battle_benchmark(c: &mut Criterion) {
    let data = shipped_data();

    c.bench_function("knight_vs_archer", |b| {
        b.iter(|| {
            let mut battle = battle(&data, knight_vs_archer(&data));
            black_box(battle.run_to_completion(DEFAULT_MAX_TICKS))
        })
    });

    let setup = duel_setup(
        &data,
        42,
        &["knight", "archer", "mage", "cleric"],
        &["warlord", "exorcist", "archer", "knight"],
    );
    c.bench_function("four_vs_four", |b| {
        b.iter(|| {
            let mut battle = battle(&data, setup.clone());
            black_box(battle.run_to_completion(DEFAULT_MAX_TICKS))
        })
    });
}

/// Raw draws from the random stream.
pub fn rng_benchmark(c: &mut Criterion) {
    c.bench_function("random_stream_1000_draws", |b| {
        b.iter(|| {
            let mut rng = RandomStream::new(black_box(7));
            (0..1000).fold(0u32, |acc, _| acc ^ rng.next_u32())
        })
    });
}

criterion_group!(benches, battle_benchmark, rng_benchmark);
criterion_main!(benches);
