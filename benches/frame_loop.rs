//! Frame loop benchmarks.

use criterion::{black_box, criterion_group, criterion_main, Criterion};
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};

use presence::input::registry::{KEYBOARD, MOUSE};
use presence::{Axis, AxisInput, Environment, FrameScheduler, PlanarStage, RuntimeConfig};

/// Jittered frame deltas around 60 Hz with occasional long frames.
fn frame_deltas(count: usize) -> Vec<f64> {
    let mut rng = StdRng::seed_from_u64(7);
    (0..count)
        .map(|_| {
            if rng.gen_bool(0.02) {
                rng.gen_range(40.0..120.0)
            } else {
                rng.gen_range(14.0..19.0)
            }
        })
        .collect()
}

fn bench_scheduler(c: &mut Criterion) {
    let deltas = frame_deltas(1024);
    c.bench_function("scheduler_1024_frames", |b| {
        b.iter(|| {
            let mut scheduler = FrameScheduler::default();
            let mut substeps = 0u32;
            for &raw in &deltas {
                substeps += scheduler.advance(black_box(raw));
            }
            substeps
        })
    });
}

fn bench_environment(c: &mut Criterion) {
    let deltas = frame_deltas(1024);
    let runtime = tokio::runtime::Builder::new_current_thread()
        .build()
        .unwrap();

    c.bench_function("environment_1024_frames", |b| {
        b.iter(|| {
            let mut env = Environment::new(RuntimeConfig::default(), Box::new(PlanarStage::new(1.7)));
            env.add_input_manager(Box::new(AxisInput::new(KEYBOARD).with_value(Axis::Drive, 1.0)));
            env.add_input_manager(Box::new(AxisInput::new(MOUSE).with_rate(Axis::Heading, 0.5)));
            env.subscribe(|_| Ok(()));
            runtime.block_on(env.start());
            for &raw in &deltas {
                env.advance(black_box(raw));
            }
            env.control()
        })
    });
}

criterion_group!(benches, bench_scheduler, bench_environment);
criterion_main!(benches);
