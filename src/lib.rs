//! qsort-bridge - closure-accepting sorts on top of the native C `qsort`
//!
//! C's `qsort` takes a raw buffer, an element count, an element size and a
//! comparison *function pointer*. It has no slot for user data, so it cannot
//! call a closure, and it knows nothing about Rust types. This crate bridges
//! the two: a fixed-signature `extern "C"` trampoline is handed to the native
//! routine, and it recovers the real comparator from a lock-guarded,
//! process-wide comparison state.
//!
//! # Example
//!
//! ```rust
//! let mut values = [42i64, 9, 101, 95, 27, 25];
//!
//! // Three-way comparator over elements
//! qsort_bridge::sort_by(&mut values, |a, b| a.cmp(b));
//! assert_eq!(values, [9, 25, 27, 42, 95, 101]);
//!
//! // "Less-than" predicate over logical indices
//! qsort_bridge::slice(&mut values, |v, i, j| v[i] > v[j]);
//! assert_eq!(values, [101, 95, 42, 27, 25, 9]);
//! ```
//!
//! # Architecture
//!
//! ```text
//! ┌────────────────────┐
//! │  Sorter<N>         │  sort_by / sort_by_index / slice / sort_raw
//! └─────────┬──────────┘
//!           │ lock COMPARE_INFO, install comparator + base + stride
//!           ▼
//! ┌────────────────────┐
//! │  NativeSort        │  libc qsort, or qsort resolved with libloading
//! └─────────┬──────────┘
//!           │ compare_trampoline(a, b)
//!           ▼
//! ┌────────────────────┐
//! │  user comparator   │  (a - base) / stride -> index, when index-based
//! └────────────────────┘
//! ```
//!
//! Where `qsort_r` exists, [`ContextSorter`] passes the closure through its
//! user-data pointer instead, and concurrent sorts no longer serialize.

#![warn(clippy::all)]

pub mod config;
pub mod error;
pub mod native;
pub mod sort;
pub mod variant;

pub use config::{BackendConfig, BackendKind, ConfigError, QsbConfig, SortConfig};
pub use error::{SortError, SortResult};
pub use native::{
    CompareFn, ContextCompareFn, ContextQsort, DynamicQsort, LibcQsort, LibraryLoader, NativeSort,
};
pub use sort::{
    slice, sort, sort_by, sort_by_index, sort_by_key, sort_raw, try_sort_by_for, ContextSorter,
    Sorter,
};
pub use variant::Variant;

/// Library version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
