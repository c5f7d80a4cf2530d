//! Generic Sort Adapter
//!
//! Exposes a native, non-reentrant `qsort` as closure-accepting sort
//! operations over any `[T]`.
//!
//! # How a call flows
//!
//! ```text
//! sort_by(values, |a, b| ...)
//!       │
//!       ▼
//! lock COMPARE_INFO ──► install comparator, base, stride, len
//!       │
//!       ▼
//! NativeSort::sort(base, len, stride, compare_trampoline)
//!       │            │
//!       │            ▼
//!       │      compare_trampoline(a, b) ──► user closure
//!       ▼
//! clear state, unlock, re-raise a captured comparator panic
//! ```
//!
//! The callback signature has no user-data slot, so the comparator lives in
//! process-wide state and every locked call is serialized. When the platform
//! offers `qsort_r`, [`ContextSorter`] binds the closure through its
//! user-data argument and skips the lock entirely.
//!
//! # Preconditions
//!
//! Comparators must be strict weak orderings; anything else yields an
//! unspecified permutation. They must not start another sort on the same
//! thread (that panics), nor wait on a thread that does (that deadlocks).

pub mod context;
mod state;
mod trampoline;

use std::cmp::Ordering;
use std::mem;
use std::os::raw::c_void;
use std::panic;
use std::time::Duration;

use tracing::{debug, trace};

use crate::native::{CompareFn, LibcQsort, NativeSort};
use state::{ErasedComparator, Frame, Session, StateGuard, COMPARE_INFO};
use trampoline::{compare_trampoline, erase_index, erase_pointer};

pub use context::ContextSorter;

/// Sort adapter over a native sort primitive
#[derive(Debug, Clone, Default)]
pub struct Sorter<N = LibcQsort> {
    native: N,
}

impl Sorter<LibcQsort> {
    /// Adapter over the C library's `qsort`
    pub const fn new() -> Self {
        Self { native: LibcQsort }
    }
}

impl<N: NativeSort> Sorter<N> {
    /// Adapter over a specific native primitive
    pub fn with_native(native: N) -> Self {
        Self { native }
    }

    /// The native primitive in use
    pub fn native(&self) -> &N {
        &self.native
    }

    /// Take the native primitive back
    pub fn into_native(self) -> N {
        self.native
    }

    /// Sort `count` elements of `size` bytes at `base` with a three-way
    /// comparator over raw element pointers.
    ///
    /// A null `base`, zero `count` or zero `size` returns without calling
    /// native code.
    ///
    /// # Safety
    ///
    /// `base` must be valid for reads and writes of `count * size` bytes and
    /// not otherwise accessed during the call. `cmp` receives pointers to
    /// elements and must only read them as the type actually stored there.
    pub unsafe fn sort_raw<F>(&self, base: *mut c_void, count: usize, size: usize, mut cmp: F)
    where
        F: FnMut(*const c_void, *const c_void) -> Ordering,
    {
        if base.is_null() || count == 0 || size == 0 {
            return;
        }
        let frame = Frame {
            base: base as usize,
            stride: size,
            len: count,
        };
        let comparator = erase_pointer(&mut cmp);
        self.run(COMPARE_INFO.lock(), frame, comparator, "raw");
    }

    /// Sort with a three-way comparator over elements
    pub fn sort_by<T, F>(&self, values: &mut [T], mut cmp: F)
    where
        F: FnMut(&T, &T) -> Ordering,
    {
        if values.is_empty() || mem::size_of::<T>() == 0 {
            return;
        }
        let frame = Frame::of(values);
        // Safety: the trampoline only hands us pointers to `T`s in the frame.
        let mut typed = |a: *const c_void, b: *const c_void| unsafe {
            cmp(&*a.cast::<T>(), &*b.cast::<T>())
        };
        let comparator = erase_pointer(&mut typed);
        unsafe { self.run(COMPARE_INFO.lock(), frame, comparator, "typed") }
    }

    /// Sort by a key extracted from each element
    pub fn sort_by_key<T, K, F>(&self, values: &mut [T], mut key: F)
    where
        F: FnMut(&T) -> K,
        K: Ord,
    {
        self.sort_by(values, |a, b| {
            let ka = key(a);
            let kb = key(b);
            ka.cmp(&kb)
        });
    }

    /// Sort with a three-way comparator over logical indices.
    ///
    /// `cmp(view, i, j)` compares the elements currently at positions `i`
    /// and `j`; `view` is the buffer as the native routine has left it so
    /// far. Indices are recovered from element addresses on every call.
    pub fn sort_by_index<T, F>(&self, values: &mut [T], cmp: F)
    where
        F: FnMut(&[T], usize, usize) -> Ordering,
    {
        self.sort_indexed(values, cmp, "index");
    }

    /// Sort with a "less-than" predicate over logical indices.
    ///
    /// Produces exactly what [`Sorter::sort_by_index`] produces for the
    /// equivalent three-way comparator.
    pub fn slice<T, F>(&self, values: &mut [T], mut less: F)
    where
        F: FnMut(&[T], usize, usize) -> bool,
    {
        self.sort_indexed(
            values,
            move |view: &[T], i, j| less_to_ordering(&mut less, view, i, j),
            "less",
        );
    }

    /// Sort with a C-ABI comparator, bypassing the shared state.
    ///
    /// No lock is taken: the comparator is a plain function pointer and
    /// needs nothing from the adapter.
    ///
    /// # Safety
    ///
    /// `cmp` must read its arguments as `T`.
    pub unsafe fn sort_with_native<T>(&self, values: &mut [T], cmp: CompareFn) {
        if values.is_empty() || mem::size_of::<T>() == 0 {
            return;
        }
        trace!(
            variant = "native",
            len = values.len(),
            backend = self.native.name(),
            "native sort"
        );
        self.native.sort(
            values.as_mut_ptr().cast(),
            values.len(),
            mem::size_of::<T>(),
            cmp,
        );
    }

    /// Like [`Sorter::sort_by`], but wait at most `timeout` for the shared
    /// comparison state.
    ///
    /// Returns `false`, leaving `values` untouched, if another caller held
    /// the state for the whole timeout. The timeout bounds only the wait,
    /// never the native call.
    pub fn try_sort_by_for<T, F>(&self, values: &mut [T], timeout: Duration, mut cmp: F) -> bool
    where
        F: FnMut(&T, &T) -> Ordering,
    {
        if values.is_empty() || mem::size_of::<T>() == 0 {
            return true;
        }
        let Some(guard) = COMPARE_INFO.try_lock_for(timeout) else {
            debug!(?timeout, "comparison state busy, giving up");
            return false;
        };
        let frame = Frame::of(values);
        let mut typed = |a: *const c_void, b: *const c_void| unsafe {
            cmp(&*a.cast::<T>(), &*b.cast::<T>())
        };
        let comparator = erase_pointer(&mut typed);
        unsafe { self.run(guard, frame, comparator, "typed") };
        true
    }

    fn sort_indexed<T, F>(&self, values: &mut [T], mut cmp: F, variant: &'static str)
    where
        F: FnMut(&[T], usize, usize) -> Ordering,
    {
        if values.is_empty() || mem::size_of::<T>() == 0 {
            return;
        }
        let frame = Frame::of(values);
        let comparator = erase_index::<T, F>(&mut cmp);
        unsafe { self.run(COMPARE_INFO.lock(), frame, comparator, variant) }
    }

    /// Install `comparator`, run the native sort, and tear down.
    ///
    /// # Safety
    ///
    /// `frame` must describe a buffer exclusively owned by the caller, and
    /// `comparator` must stay valid until this returns.
    unsafe fn run(
        &self,
        guard: StateGuard,
        frame: Frame,
        comparator: ErasedComparator,
        variant: &'static str,
    ) {
        trace!(
            variant,
            len = frame.len,
            stride = frame.stride,
            backend = self.native.name(),
            "native sort"
        );

        let session = Session::install(&guard, frame, comparator);
        self.native.sort(
            frame.base as *mut c_void,
            frame.len,
            frame.stride,
            compare_trampoline,
        );
        let captured = session.finish();
        drop(guard);

        if let Some(payload) = captured {
            panic::resume_unwind(payload);
        }
    }
}

/// Adapt a less-than predicate to a three-way result
pub(crate) fn less_to_ordering<T, F>(less: &mut F, view: &[T], i: usize, j: usize) -> Ordering
where
    F: FnMut(&[T], usize, usize) -> bool,
{
    if less(view, i, j) {
        Ordering::Less
    } else if less(view, j, i) {
        Ordering::Greater
    } else {
        Ordering::Equal
    }
}

static DEFAULT_SORTER: Sorter = Sorter::new();

/// Sort `values` in ascending order with the C library's `qsort`
pub fn sort<T: Ord>(values: &mut [T]) {
    DEFAULT_SORTER.sort_by(values, T::cmp);
}

/// [`Sorter::sort_by`] on the C library's `qsort`
pub fn sort_by<T, F>(values: &mut [T], cmp: F)
where
    F: FnMut(&T, &T) -> Ordering,
{
    DEFAULT_SORTER.sort_by(values, cmp);
}

/// [`Sorter::sort_by_key`] on the C library's `qsort`
pub fn sort_by_key<T, K, F>(values: &mut [T], key: F)
where
    F: FnMut(&T) -> K,
    K: Ord,
{
    DEFAULT_SORTER.sort_by_key(values, key);
}

/// [`Sorter::sort_by_index`] on the C library's `qsort`
pub fn sort_by_index<T, F>(values: &mut [T], cmp: F)
where
    F: FnMut(&[T], usize, usize) -> Ordering,
{
    DEFAULT_SORTER.sort_by_index(values, cmp);
}

/// [`Sorter::slice`] on the C library's `qsort`
pub fn slice<T, F>(values: &mut [T], less: F)
where
    F: FnMut(&[T], usize, usize) -> bool,
{
    DEFAULT_SORTER.slice(values, less);
}

/// [`Sorter::sort_raw`] on the C library's `qsort`
///
/// # Safety
///
/// See [`Sorter::sort_raw`].
pub unsafe fn sort_raw<F>(base: *mut c_void, count: usize, size: usize, cmp: F)
where
    F: FnMut(*const c_void, *const c_void) -> Ordering,
{
    DEFAULT_SORTER.sort_raw(base, count, size, cmp);
}

/// [`Sorter::try_sort_by_for`] on the C library's `qsort`
pub fn try_sort_by_for<T, F>(values: &mut [T], timeout: Duration, cmp: F) -> bool
where
    F: FnMut(&T, &T) -> Ordering,
{
    DEFAULT_SORTER.try_sort_by_for(values, timeout, cmp)
}
