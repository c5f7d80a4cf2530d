//! Adapter Integration Tests for qsort-bridge
//!
//! Drives the public API end to end with larger, randomized inputs and
//! several threads sharing the process-wide comparison state.

use std::cmp::Ordering;
use std::sync::Arc;
use std::thread;

use qsort_bridge::{
    BackendConfig, BackendKind, ContextSorter, DynamicQsort, LibcQsort, SortError, Sorter, Variant,
};
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};

fn random_values(seed: u64, len: usize) -> Vec<i64> {
    let mut rng = StdRng::seed_from_u64(seed);
    (0..len).map(|_| rng.gen_range(-1_000_000..1_000_000)).collect()
}

fn sorted_copy(values: &[i64]) -> Vec<i64> {
    let mut expected = values.to_vec();
    expected.sort_unstable();
    expected
}

// ============================================================================
// Single-threaded
// ============================================================================

#[test]
fn test_large_random_input_every_variant() {
    let sorter = Sorter::new();
    let input = random_values(7, 10_000);
    let expected = sorted_copy(&input);

    for variant in Variant::ALL {
        let mut values = input.clone();
        match variant.apply(&sorter, &mut values, false) {
            Ok(()) => assert_eq!(values, expected, "variant {}", variant),
            Err(e) => assert!(matches!(
                e,
                SortError::Unsupported(_) | SortError::SymbolNotFound { .. }
            )),
        }
    }
}

#[test]
fn test_struct_elements_by_index() {
    #[derive(Debug, Clone, PartialEq)]
    struct Record {
        name: String,
        score: u32,
    }

    let mut records: Vec<Record> = ["delta", "alpha", "charlie", "bravo"]
        .iter()
        .zip([40, 10, 30, 10])
        .map(|(name, score)| Record {
            name: name.to_string(),
            score,
        })
        .collect();

    qsort_bridge::sort_by_index(&mut records, |v, i, j| {
        v[i].score
            .cmp(&v[j].score)
            .then_with(|| v[i].name.cmp(&v[j].name))
    });

    let names: Vec<&str> = records.iter().map(|r| r.name.as_str()).collect();
    assert_eq!(names, ["alpha", "bravo", "charlie", "delta"]);
}

#[test]
fn test_sort_by_key_on_floats() {
    let mut values = vec![3.5f64, -1.25, 9.0, 0.0, 2.75];
    qsort_bridge::sort_by(&mut values, |a, b| a.partial_cmp(b).unwrap_or(Ordering::Equal));
    assert_eq!(values, [-1.25, 0.0, 2.75, 3.5, 9.0]);

    let mut words = vec!["pear", "fig", "banana", "kiwi"];
    qsort_bridge::sort_by_key(&mut words, |w| w.len());
    assert_eq!(words[0], "fig");
    assert_eq!(words[3], "banana");
}

#[test]
fn test_process_backend_matches_libc() {
    let native = match DynamicQsort::from_process() {
        Ok(native) => native,
        Err(e) if cfg!(all(target_os = "linux", target_env = "gnu")) => {
            panic!("qsort must resolve from a glibc process image: {e}")
        }
        Err(_) => return,
    };
    let dynamic = Sorter::with_native(native);
    let linked = Sorter::with_native(LibcQsort);

    let input = random_values(11, 2_000);
    let mut a = input.clone();
    let mut b = input;
    dynamic.sort_by_index(&mut a, |v, i, j| v[i].cmp(&v[j]));
    linked.sort_by_index(&mut b, |v, i, j| v[i].cmp(&v[j]));
    assert_eq!(a, b);
}

#[test]
fn test_configured_backends_sort() {
    let config = BackendConfig::default();
    let guaranteed = cfg!(all(target_os = "linux", target_env = "gnu"));
    for kind in [BackendKind::Libc, BackendKind::Dynamic, BackendKind::Process] {
        let native = match config.build_kind(kind) {
            Ok(native) => native,
            Err(e) if guaranteed || kind == BackendKind::Libc => {
                panic!("backend {} failed to build: {}", kind, e)
            }
            Err(_) => continue,
        };
        let sorter = Sorter::with_native(native);
        let mut values = [42i64, 9, 101, 95, 27, 25];
        sorter.slice(&mut values, |v, i, j| v[i] < v[j]);
        assert_eq!(values, [9, 25, 27, 42, 95, 101], "backend {}", kind);
    }
}

// ============================================================================
// Concurrency
// ============================================================================

#[test]
fn test_concurrent_index_sorts() {
    let handles: Vec<_> = (0..8u64)
        .map(|seed| {
            thread::spawn(move || {
                let input = random_values(seed, 5_000);
                let mut values = input.clone();
                qsort_bridge::sort_by_index(&mut values, |v, i, j| v[i].cmp(&v[j]));
                assert_eq!(values, sorted_copy(&input));
            })
        })
        .collect();

    for handle in handles {
        handle.join().unwrap();
    }
}

#[test]
fn test_concurrent_mixed_variants_share_one_sorter() {
    let sorter = Arc::new(Sorter::new());
    let handles: Vec<_> = Variant::ALL
        .into_iter()
        .enumerate()
        .map(|(n, variant)| {
            let sorter = Arc::clone(&sorter);
            thread::spawn(move || {
                for round in 0..20u64 {
                    let input = random_values(n as u64 * 100 + round, 500);
                    let mut values = input.clone();
                    if variant.apply(&*sorter, &mut values, true).is_err() {
                        return;
                    }
                    let mut expected = sorted_copy(&input);
                    expected.reverse();
                    assert_eq!(values, expected, "variant {}", variant);
                }
            })
        })
        .collect();

    for handle in handles {
        handle.join().unwrap();
    }
}

#[test]
fn test_context_sorter_matches_locked_sorter() {
    let Ok(context) = ContextSorter::shared() else {
        return;
    };

    let input = random_values(23, 4_000);
    let mut locked = input.clone();
    let mut bound = input;
    qsort_bridge::slice(&mut locked, |v, i, j| v[i] > v[j]);
    context.slice(&mut bound, |v, i, j| v[i] > v[j]);
    assert_eq!(locked, bound);
}

#[test]
fn test_panicking_thread_does_not_poison_others() {
    let bad = thread::spawn(|| {
        let mut values = random_values(3, 100);
        qsort_bridge::sort_by(&mut values, |_: &i64, _: &i64| -> Ordering {
            panic!("comparator gave up")
        });
    });
    assert!(bad.join().is_err());

    let mut values = random_values(4, 100);
    let expected = sorted_copy(&values);
    qsort_bridge::sort(&mut values);
    assert_eq!(values, expected);
}
