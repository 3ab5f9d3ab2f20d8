//! Performance benchmarks for merge and reconcile.

use airport_reconcile::{
    merge_descriptors, reconcile, AliveMap, Origin, PatternSet, SourceDescriptor,
};
use criterion::{black_box, criterion_group, criterion_main, BenchmarkId, Criterion};

/// `count` descriptors over `count / dup_factor` distinct subscriptions.
fn descriptors(count: usize, dup_factor: usize) -> Vec<SourceDescriptor> {
    (0..count)
        .map(|i| {
            let id = i / dup_factor.max(1);
            SourceDescriptor {
                domain: format!("site{id}.com"),
                origin: if i % 3 == 0 { Origin::Telegram } else { Origin::Page },
                errors: Some((i % 7) as u32),
                include: PatternSet::from_fragment(format!("tag{}", i % 5)),
                ..SourceDescriptor::with_sub(format!("https://site{id}.com/link/abc?sub=1"))
            }
        })
        .collect()
}

fn alive_for(list: &[SourceDescriptor]) -> AliveMap {
    list.iter()
        .enumerate()
        .filter_map(|(i, d)| d.sub.as_single().map(|s| (s.to_string(), i % 2 == 0)))
        .collect()
}

/// Merge cost grows with accepted entries; benchmark a few list sizes.
fn bench_merge(c: &mut Criterion) {
    let mut group = c.benchmark_group("merge");

    for count in [100, 500, 2000] {
        group.bench_with_input(BenchmarkId::new("descriptors", count), &count, |b, &count| {
            let list = descriptors(count, 4);
            b.iter(|| black_box(merge_descriptors(list.clone())));
        });
    }

    group.finish();
}

fn bench_reconcile(c: &mut Criterion) {
    let mut group = c.benchmark_group("reconcile");

    for count in [100, 2000, 10000] {
        group.bench_with_input(BenchmarkId::new("descriptors", count), &count, |b, &count| {
            let list = descriptors(count, 1);
            let alive = alive_for(&list);
            b.iter(|| black_box(reconcile(list.clone(), &alive)));
        });
    }

    group.finish();
}

criterion_group!(benches, bench_merge, bench_reconcile);
criterion_main!(benches);
