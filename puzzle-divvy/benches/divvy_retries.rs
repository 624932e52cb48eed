//! Benchmark suite for puzzle-divvy.
//!
//! Tracks wall-clock cost and, informally via bencher iteration counts,
//! retry behaviour across a handful of `(w, h, k)` presets — the same
//! presets `attempt_counts_stay_within_baseline_for_common_presets`
//! asserts against as a hard ceiling.

use std::hint::black_box;

use criterion::{BenchmarkId, Criterion, criterion_group, criterion_main};
use puzzle_divvy::divvy_rectangle_with_attempts;
use puzzle_random::Rng;

fn bench_divvy_presets(c: &mut Criterion) {
    let mut group = c.benchmark_group("divvy_rectangle_with_attempts");

    for (w, h, k) in [(4usize, 4usize, 4usize), (9, 4, 6), (10, 10, 5), (12, 12, 4)] {
        group.bench_with_input(BenchmarkId::new("preset", format!("{w}x{h}/{k}")), &(w, h, k), |b, &(w, h, k)| {
            let mut seed_counter = 0u64;
            b.iter(|| {
                seed_counter += 1;
                let mut rng = Rng::from_u64(seed_counter);
                divvy_rectangle_with_attempts(black_box(w), black_box(h), black_box(k), &mut rng)
            });
        });
    }

    group.finish();
}

criterion_group!(benches, bench_divvy_presets);
criterion_main!(benches);
