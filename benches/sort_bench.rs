//! Benchmarks for the qsort adapter against Rust's own sort

use criterion::{black_box, criterion_group, criterion_main, BatchSize, Criterion, Throughput};
use qsort_bridge::{ContextSorter, Sorter, Variant};
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};

fn random_values(len: usize) -> Vec<i64> {
    let mut rng = StdRng::seed_from_u64(len as u64);
    (0..len).map(|_| rng.gen()).collect()
}

/// Every adapter variant over growing inputs
fn bench_variants(c: &mut Criterion) {
    let sorter = Sorter::new();

    for &size in &[16usize, 1_000, 100_000] {
        let mut group = c.benchmark_group(format!("sort_{}", size));
        group.throughput(Throughput::Elements(size as u64));
        let input = random_values(size);

        for variant in Variant::ALL {
            if variant.apply(&sorter, &mut input.clone(), false).is_err() {
                continue;
            }
            group.bench_function(variant.to_string(), |b| {
                b.iter_batched_ref(
                    || input.clone(),
                    |values| variant.apply(&sorter, black_box(values), false),
                    BatchSize::LargeInput,
                )
            });
        }

        group.bench_function("std_unstable", |b| {
            b.iter_batched_ref(
                || input.clone(),
                |values| black_box(values).sort_unstable_by(|a, b| a.cmp(b)),
                BatchSize::LargeInput,
            )
        });

        group.finish();
    }
}

/// Index recovery cost on wide elements
fn bench_wide_elements(c: &mut Criterion) {
    let input: Vec<[u64; 8]> = random_values(10_000)
        .into_iter()
        .map(|v| [v as u64; 8])
        .collect();

    let mut group = c.benchmark_group("wide_elements");
    group.bench_function("typed", |b| {
        b.iter_batched_ref(
            || input.clone(),
            |values| qsort_bridge::sort_by(values, |a, b| a[0].cmp(&b[0])),
            BatchSize::LargeInput,
        )
    });
    group.bench_function("index", |b| {
        b.iter_batched_ref(
            || input.clone(),
            |values| qsort_bridge::sort_by_index(values, |v, i, j| v[i][0].cmp(&v[j][0])),
            BatchSize::LargeInput,
        )
    });
    if let Ok(context) = ContextSorter::shared() {
        group.bench_function("context", |b| {
            b.iter_batched_ref(
                || input.clone(),
                |values| context.sort_by_index(values, |v, i, j| v[i][0].cmp(&v[j][0])),
                BatchSize::LargeInput,
            )
        });
    }
    group.finish();
}

criterion_group!(benches, bench_variants, bench_wide_elements);
criterion_main!(benches);
