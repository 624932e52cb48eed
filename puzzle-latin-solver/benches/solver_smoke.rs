//! Benchmark suite for puzzle-latin-solver.
//!
//! Covers `solve` over empty grids at a few orders (forcing full
//! backtracking search) and over a near-complete grid (deduction-only, the
//! cheap path every real solve mostly spends its time in).

use std::hint::black_box;

use criterion::{BenchmarkId, Criterion, criterion_group, criterion_main};
use puzzle_latin_solver::{Difficulty, UserDeductions, solve};

fn bench_empty_grids(c: &mut Criterion) {
    let mut group = c.benchmark_group("solve_empty_grid");
    let user = UserDeductions::default();

    for order in [3u8, 4, 5] {
        let initial = vec![0u8; order as usize * order as usize];
        group.bench_with_input(BenchmarkId::new("order", order), &order, |b, &order| {
            b.iter(|| solve(black_box(&initial), order, Difficulty::Recursion, &user, None));
        });
    }

    group.finish();
}

fn bench_near_complete_grid(c: &mut Criterion) {
    let mut group = c.benchmark_group("solve_near_complete");
    let user = UserDeductions::default();

    // Order-9 grid with exactly one cell blanked; naked-single deduction
    // alone should close it without ever reaching recursion.
    let mut initial = vec![0u8; 81];
    for (i, cell) in initial.iter_mut().enumerate() {
        *cell = (((i / 9 + i % 9) % 9) + 1) as u8;
    }
    initial[0] = 0;

    group.bench_function("order_9_one_blank", |b| {
        b.iter(|| solve(black_box(&initial), 9, Difficulty::Simple, &user, None));
    });

    group.finish();
}

criterion_group!(benches, bench_empty_grids, bench_near_complete_grid);
criterion_main!(benches);
