//! Simulation benchmarks for td_core.
//!
//! Run with: `cargo bench -p td_core`

// Benchmark binaries don't need docs on macro-generated functions
#![allow(missing_docs)]

use criterion::{black_box, criterion_group, criterion_main, BatchSize, Criterion};
use td_core::prelude::*;

/// A session mid-wave with a ring of towers along the path.
fn busy_session() -> Simulation {
    let mut sim = Simulation::new(GameConfig::default()).expect("default config is valid");
    sim.join_player(PlayerId(1), Some(PlayerResources::new(100_000, 20)))
        .expect("player joins");

    let spots = [
        (-40, 10),
        (-20, 10),
        (-40, -10),
        (-20, 30),
        (-10, 0),
        (10, 0),
        (10, -10),
        (20, 10),
        (40, -10),
        (40, 10),
    ];
    for (i, (x, y)) in spots.into_iter().enumerate() {
        let kind = TowerKind::ALL[i % TowerKind::ALL.len()];
        sim.place_tower(PlayerId(1), kind, Vec2Fixed::from_ints(x, y))
            .expect("spot is clear");
    }

    sim.start_wave().expect("first wave starts");
    for _ in 0..100 {
        sim.step();
    }
    sim
}

/// Runs simulation benchmarks for the td_core crate.
pub fn simulation_benchmark(c: &mut Criterion) {
    c.bench_function("tick_busy_wave", |b| {
        b.iter_batched(
            busy_session,
            |mut sim| black_box(sim.step()),
            BatchSize::SmallInput,
        );
    });

    let sim = busy_session();
    c.bench_function("state_hash", |b| b.iter(|| black_box(sim.state_hash())));
}

criterion_group!(benches, simulation_benchmark);
criterion_main!(benches);
