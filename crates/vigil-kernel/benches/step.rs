use criterion::{black_box, criterion_group, criterion_main, Criterion};
use vigil_kernel::kernel::FixedWallClock;
use vigil_kernel::Engine;

fn bench_life_cycle_step(c: &mut Criterion) {
    let mut engine = Engine::seeded(42).with_wall_clock(FixedWallClock(12));
    // Warm up so memory, ideas and routines are populated.
    for _ in 0..500 {
        let _ = engine.life_cycle_step();
    }

    c.bench_function("vigil-kernel/life_cycle_step", |b| {
        b.iter(|| {
            let report = engine.life_cycle_step();
            black_box(report.map(|r| r.action).ok());
        })
    });
}

fn bench_propose(c: &mut Criterion) {
    let mut engine = Engine::seeded(7).with_wall_clock(FixedWallClock(12));
    for _ in 0..200 {
        let _ = engine.life_cycle_step();
    }

    c.bench_function("vigil-kernel/propose", |b| {
        b.iter(|| black_box(engine.propose().action))
    });
}

criterion_group!(benches, bench_life_cycle_step, bench_propose);
criterion_main!(benches);
