//! Benchmarks comparing the three work-sharing schedules on uniform and
//! skewed per-index workloads, with `rayon` as a baseline.

use core::num::NonZeroUsize;

use divan::Bencher;
use divan::black_box;
use loopshare::Reduce;
use loopshare::Schedule;
use loopshare::parallel_for;
use rayon::prelude::*;

// -----------------------------------------------------------------------------
// Workloads

const LEN: usize = 1 << 16;
const THREADS: usize = 8;

/// A cheap, uniform per-index computation.
fn uniform_cost(index: usize) -> u64 {
    (index as u64).wrapping_mul(0x9e37_79b9_7f4a_7c15)
}

/// Per-index work that grows with the index, which penalizes schedules that
/// cannot rebalance.
fn skewed_cost(index: usize) -> u64 {
    let mut acc = 0u64;
    for round in 0..index % 64 {
        acc = acc.wrapping_add((round as u64).wrapping_mul(0x9e37_79b9));
    }
    acc
}

fn sum_body(
    cost: fn(usize) -> u64,
) -> Reduce<impl Fn() -> u64, impl Fn(usize, &mut u64), impl Fn(&mut u64, u64)> {
    Reduce {
        identity: || 0u64,
        fold: move |index, acc: &mut u64| *acc = acc.wrapping_add(cost(index)),
        merge: |into: &mut u64, from| *into = into.wrapping_add(from),
    }
}

fn run(schedule: Schedule, cost: fn(usize) -> u64) -> u64 {
    let threads = NonZeroUsize::new(THREADS).unwrap();
    parallel_for(threads, 0..LEN, schedule, &sum_body(cost)).unwrap()
}

// -----------------------------------------------------------------------------
// Benchmarks

const COSTS: &[&str] = &["uniform", "skewed"];

fn cost_fn(name: &str) -> fn(usize) -> u64 {
    match name {
        "uniform" => uniform_cost,
        _ => skewed_cost,
    }
}

#[divan::bench(args = COSTS)]
fn static_schedule(bencher: Bencher, cost: &str) {
    let cost = cost_fn(cost);
    bencher.bench(|| black_box(run(Schedule::Static { chunk: None }, cost)));
}

#[divan::bench(args = COSTS)]
fn dynamic_schedule(bencher: Bencher, cost: &str) {
    let cost = cost_fn(cost);
    bencher.bench(|| black_box(run(Schedule::Dynamic { chunk: Some(64) }, cost)));
}

#[divan::bench(args = COSTS)]
fn guided_schedule(bencher: Bencher, cost: &str) {
    let cost = cost_fn(cost);
    bencher.bench(|| black_box(run(Schedule::Guided { chunk: Some(16) }, cost)));
}

#[divan::bench(args = COSTS)]
fn rayon_baseline(bencher: Bencher, cost: &str) {
    let cost = cost_fn(cost);
    bencher.bench(|| {
        black_box(
            (0..LEN)
                .into_par_iter()
                .map(cost)
                .reduce(|| 0u64, u64::wrapping_add),
        )
    });
}

fn main() {
    divan::main();
}
