//! Criterion benchmarks for [`LayoutPlanner`] construction and lookup.
//!
//! Run with:
//! ```bash
//! cargo bench --package mdc-core --bench layout_bench
//! ```

use criterion::{black_box, criterion_group, criterion_main, BenchmarkId, Criterion};
use mdc_core::domain::layout::{DisplayId, LayoutPlanner};

fn display_ids(n: usize) -> Vec<DisplayId> {
    (1..=n).map(|i| i as DisplayId).collect()
}

fn bench_plan(c: &mut Criterion) {
    let mut group = c.benchmark_group("layout_planner_new");
    // 60 and 120 have many divisors; 127 is prime.
    for n in [4usize, 60, 120, 127] {
        let ids = display_ids(n);
        group.bench_with_input(BenchmarkId::from_parameter(n), &ids, |b, ids| {
            b.iter(|| LayoutPlanner::new(black_box(ids.iter().copied())))
        });
    }
    group.finish();
}

fn bench_lookup(c: &mut Criterion) {
    let planner = LayoutPlanner::new(display_ids(120));
    c.bench_function("layout_lookup_and_position", |b| {
        b.iter(|| {
            let layout = planner.layout(black_box("10x12")).expect("layout must exist");
            layout.position_of(black_box(117))
        })
    });
}

criterion_group!(benches, bench_plan, bench_lookup);
criterion_main!(benches);
