//! Synchronization benchmarks: fresh insertion, reversal and churn.

use criterion::{BatchSize, Criterion, black_box, criterion_group, criterion_main};
use repeat_core::IdentitySelector;
use repeat_runtime::{IndexedRepeat, MemoryHost, RepeatConfig};

const ITEMS: u32 = 1_000;

fn repeat() -> IndexedRepeat<u32, MemoryHost<u32>> {
    let config = RepeatConfig::builder()
        .with_selector(IdentitySelector::display())
        .build()
        .expect("valid config");
    IndexedRepeat::new(config, MemoryHost::new())
}

fn seeded(items: &[u32]) -> IndexedRepeat<u32, MemoryHost<u32>> {
    let mut repeat = repeat();
    repeat.synchronize(items.to_vec()).expect("seed pass");
    repeat
}

fn bench_fresh_insert(c: &mut Criterion) {
    let items: Vec<u32> = (0..ITEMS).collect();
    c.bench_function("fresh_insert_1000", |b| {
        b.iter_batched(
            repeat,
            |mut repeat| {
                repeat.synchronize(black_box(items.clone())).expect("pass");
                repeat
            },
            BatchSize::SmallInput,
        )
    });
}

fn bench_reverse(c: &mut Criterion) {
    let items: Vec<u32> = (0..ITEMS).collect();
    let reversed: Vec<u32> = items.iter().rev().copied().collect();
    c.bench_function("reverse_1000", |b| {
        b.iter_batched(
            || seeded(&items),
            |mut repeat| {
                repeat.synchronize(black_box(reversed.clone())).expect("pass");
                repeat
            },
            BatchSize::SmallInput,
        )
    });
}

fn bench_churn(c: &mut Criterion) {
    let items: Vec<u32> = (0..ITEMS).collect();
    // drop every third item and append as many new ones
    let churned: Vec<u32> = items
        .iter()
        .copied()
        .filter(|n| n % 3 != 0)
        .chain(ITEMS..ITEMS + ITEMS / 3 + 1)
        .collect();
    c.bench_function("churn_1000", |b| {
        b.iter_batched(
            || seeded(&items),
            |mut repeat| {
                repeat.synchronize(black_box(churned.clone())).expect("pass");
                repeat
            },
            BatchSize::SmallInput,
        )
    });
}

criterion_group!(benches, bench_fresh_insert, bench_reverse, bench_churn);
criterion_main!(benches);
