//! Simulation benchmarks for the game core
//!
//! Plays whole runs headless at 60 Hz with a seeded RNG.
//!
//! Run with: cargo bench --bench simulation

use criterion::{black_box, criterion_group, criterion_main, BenchmarkId, Criterion, Throughput};
use pukul_tikus::game::config::GameConfig;
use pukul_tikus::game::mole::MoleKind;
use pukul_tikus::game::session::{ClickTarget, GameSession};

const DT: f32 = 1.0 / 60.0;
/// Hard cap so a run that never ends cannot hang the bench
const MAX_FRAMES: u32 = 60 * 120;

/// Click every normal/armored mole, hold hearts, leave punishment moles alone
fn autoplay(seed: u64) -> u32 {
    let mut session = GameSession::with_seed(GameConfig::default(), "Bench", seed)
        .unwrap_or_else(|e| panic!("invalid default config: {}", e));
    let mut frames = 0;

    while !session.is_finished() && frames < MAX_FRAMES {
        session.tick(DT);

        let targets: Vec<_> = session
            .live_moles()
            .iter()
            .map(|m| (m.id, m.kind))
            .collect();
        for (id, kind) in targets {
            match kind {
                MoleKind::Normal | MoleKind::Armored => {
                    session.click(Some(ClickTarget::Entity(id)));
                }
                MoleKind::Heart => {
                    session.hold(Some(id), DT);
                }
                MoleKind::Punishment => {}
            }
        }

        black_box(session.drain_events());
        frames += 1;
    }
    frames
}

fn bench_full_run(c: &mut Criterion) {
    let mut group = c.benchmark_group("full_run");
    group.sample_size(20);

    for seed in [1u64, 7, 42] {
        group.bench_with_input(BenchmarkId::new("autoplay", seed), &seed, |b, &seed| {
            b.iter(|| autoplay(black_box(seed)));
        });
    }
    group.finish();
}

fn bench_idle_ticks(c: &mut Criterion) {
    let mut group = c.benchmark_group("tick");
    group.throughput(Throughput::Elements(600));

    group.bench_function("idle_600_frames", |b| {
        b.iter(|| {
            let mut session = GameSession::with_seed(GameConfig::default(), "Bench", 3)
                .unwrap_or_else(|e| panic!("invalid default config: {}", e));
            for _ in 0..600 {
                session.tick(black_box(DT));
            }
            session.drain_events().len()
        });
    });
    group.finish();
}

criterion_group!(benches, bench_full_run, bench_idle_ticks);
criterion_main!(benches);
