//! The sort variants the CLI and config can select.
//!
//! Each variant sorts the same `i64` data through a different entry point of
//! the adapter, so they can be compared side by side.

use std::cmp::Ordering;
use std::fmt;
use std::mem;
use std::os::raw::{c_int, c_void};

use clap::ValueEnum;
use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::error::SortResult;
use crate::native::{CompareFn, NativeSort};
use crate::sort::{context, Sorter};

/// Entry point into the sort adapter
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize, ValueEnum)]
#[serde(rename_all = "lowercase")]
pub enum Variant {
    /// Three-way comparator over raw element pointers
    Raw,
    /// Three-way comparator over elements
    Typed,
    /// Three-way comparator over logical indices
    #[default]
    Index,
    /// Less-than predicate over logical indices
    Less,
    /// C-ABI comparator passed straight to the native routine
    Native,
    /// Comparator bound through qsort_r's user-data pointer
    Context,
}

impl Variant {
    /// Every variant, in the order `qsb demo` prints them
    pub const ALL: [Variant; 6] = [
        Variant::Raw,
        Variant::Typed,
        Variant::Index,
        Variant::Less,
        Variant::Native,
        Variant::Context,
    ];

    /// Whether this variant goes through the process-wide comparison state
    pub fn uses_shared_state(self) -> bool {
        !matches!(self, Variant::Native | Variant::Context)
    }

    /// Sort `values` through this variant.
    ///
    /// Only [`Variant::Context`] can fail, when the platform has no
    /// compatible `qsort_r`; it ignores `sorter`'s backend.
    pub fn apply<N: NativeSort>(
        self,
        sorter: &Sorter<N>,
        values: &mut [i64],
        descending: bool,
    ) -> SortResult<()> {
        let order = move |o: Ordering| if descending { o.reverse() } else { o };

        match self {
            Variant::Raw => unsafe {
                sorter.sort_raw(
                    values.as_mut_ptr().cast(),
                    values.len(),
                    mem::size_of::<i64>(),
                    |a, b| order((*a.cast::<i64>()).cmp(&*b.cast::<i64>())),
                );
            },
            Variant::Typed => sorter.sort_by(values, |a, b| order(a.cmp(b))),
            Variant::Index => sorter.sort_by_index(values, |v, i, j| order(v[i].cmp(&v[j]))),
            Variant::Less => {
                if descending {
                    sorter.slice(values, |v, i, j| v[i] > v[j]);
                } else {
                    sorter.slice(values, |v, i, j| v[i] < v[j]);
                }
            }
            Variant::Native => {
                let cmp: CompareFn = if descending {
                    compare_i64_desc
                } else {
                    compare_i64
                };
                unsafe { sorter.sort_with_native(values, cmp) };
            }
            Variant::Context => {
                debug!(
                    backend = sorter.native().name(),
                    "context variant sorts with the process's qsort_r, backend unused"
                );
                context::sort_by_index(values, |v, i, j| order(v[i].cmp(&v[j])))?;
            }
        }
        Ok(())
    }
}

impl fmt::Display for Variant {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Variant::Raw => "raw",
            Variant::Typed => "typed",
            Variant::Index => "index",
            Variant::Less => "less",
            Variant::Native => "native",
            Variant::Context => "context",
        };
        f.write_str(name)
    }
}

/// Ascending `i64` comparison with C linkage
pub unsafe extern "C" fn compare_i64(a: *const c_void, b: *const c_void) -> c_int {
    let (a, b) = (*(a as *const i64), *(b as *const i64));
    a.cmp(&b) as c_int
}

/// Descending `i64` comparison with C linkage
pub unsafe extern "C" fn compare_i64_desc(a: *const c_void, b: *const c_void) -> c_int {
    compare_i64(b, a)
}

#[cfg(test)]
mod tests {
    use super::*;

    const INPUT: [i64; 6] = [42, 9, 101, 95, 27, 25];

    #[test]
    fn test_every_variant_agrees() {
        let sorter = Sorter::new();
        for variant in Variant::ALL {
            let mut values = INPUT;
            match variant.apply(&sorter, &mut values, false) {
                Ok(()) => assert_eq!(values, [9, 25, 27, 42, 95, 101], "{variant}"),
                Err(_) => assert_eq!(variant, Variant::Context),
            }
        }
    }

    #[test]
    fn test_every_variant_descends() {
        let sorter = Sorter::new();
        for variant in Variant::ALL {
            let mut values = INPUT;
            if variant.apply(&sorter, &mut values, true).is_ok() {
                assert_eq!(values, [101, 95, 42, 27, 25, 9], "{variant}");
            }
        }
    }

    #[test]
    fn test_extreme_values_do_not_overflow() {
        let sorter = Sorter::new();
        let mut values = [i64::MAX, i64::MIN, 0, -1, 1];
        Variant::Native.apply(&sorter, &mut values, false).unwrap();
        assert_eq!(values, [i64::MIN, -1, 0, 1, i64::MAX]);
    }

    #[test]
    fn test_shared_state_classification() {
        assert!(Variant::Raw.uses_shared_state());
        assert!(Variant::Less.uses_shared_state());
        assert!(!Variant::Native.uses_shared_state());
        assert!(!Variant::Context.uses_shared_state());
    }

    #[test]
    fn test_display_matches_serde_names() {
        for variant in Variant::ALL {
            let toml = toml::to_string(&std::collections::BTreeMap::from([("v", variant)])).unwrap();
            assert_eq!(toml.trim(), format!("v = \"{variant}\""));
        }
    }
}
