//! Native Sort Primitives
//!
//! The foreign sort routine is treated as an opaque function with the fixed
//! C signature
//!
//! ```text
//! void qsort(void *base, size_t count, size_t size,
//!            int (*compare)(const void *a, const void *b));
//! ```
//!
//! It has no user-data slot, is not reentrant and knows nothing about
//! closures. The [`NativeSort`] trait is the seam the sort adapter talks to;
//! the adapter never reimplements the primitive, it only bridges to it.
//!
//! # Backends
//!
//! ```text
//! LibcQsort      qsort linked from the platform C library
//! DynamicQsort   qsort resolved at runtime from a shared library (libloading)
//! ContextQsort   qsort_r resolved from the process image, carries a user-data pointer
//! ```

mod loader;
mod system;

use std::os::raw::{c_int, c_void};
use std::sync::Arc;

pub use loader::{ContextQsort, DynamicQsort, LibraryLoader, DEFAULT_C_LIBRARY};
pub use system::LibcQsort;

/// C-ABI three-way comparison callback: negative, zero or positive.
pub type CompareFn = unsafe extern "C" fn(a: *const c_void, b: *const c_void) -> c_int;

/// C-ABI comparison callback with a trailing user-data pointer (`qsort_r`).
pub type ContextCompareFn =
    unsafe extern "C" fn(a: *const c_void, b: *const c_void, ctx: *mut c_void) -> c_int;

/// A native, function-pointer based, in-place sort routine.
///
/// # Safety
///
/// Implementors must reorder exactly the `count` elements of `size` bytes
/// starting at `base`, moving elements only as whole byte copies, and must
/// invoke `cmp` synchronously on the calling thread. When the routine
/// returns, the buffer must hold a permutation of its input.
///
/// Routines that compare scratch copies instead of in-buffer elements are
/// still sound for pointer-based comparators, but break index recovery; the
/// adapter detects that and panics.
pub unsafe trait NativeSort: Send + Sync {
    /// Short name used in logs and by the CLI
    fn name(&self) -> &str;

    /// Sort `count` elements of `size` bytes at `base` using `cmp`.
    ///
    /// # Safety
    ///
    /// `base` must be valid for reads and writes of `count * size` bytes for
    /// the whole call, and `cmp` must be sound to call on any two elements.
    unsafe fn sort(&self, base: *mut c_void, count: usize, size: usize, cmp: CompareFn);
}

unsafe impl<N: NativeSort + ?Sized> NativeSort for &N {
    fn name(&self) -> &str {
        (**self).name()
    }

    unsafe fn sort(&self, base: *mut c_void, count: usize, size: usize, cmp: CompareFn) {
        (**self).sort(base, count, size, cmp)
    }
}

unsafe impl<N: NativeSort + ?Sized> NativeSort for Box<N> {
    fn name(&self) -> &str {
        (**self).name()
    }

    unsafe fn sort(&self, base: *mut c_void, count: usize, size: usize, cmp: CompareFn) {
        (**self).sort(base, count, size, cmp)
    }
}

unsafe impl<N: NativeSort + ?Sized> NativeSort for Arc<N> {
    fn name(&self) -> &str {
        (**self).name()
    }

    unsafe fn sort(&self, base: *mut c_void, count: usize, size: usize, cmp: CompareFn) {
        (**self).sort(base, count, size, cmp)
    }
}
