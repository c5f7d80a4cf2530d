//! The platform C library's `qsort`, linked at build time.

use std::os::raw::c_void;

use super::{CompareFn, NativeSort};

/// `qsort` from the C library the binary links against.
#[derive(Debug, Clone, Copy, Default)]
pub struct LibcQsort;

unsafe impl NativeSort for LibcQsort {
    fn name(&self) -> &str {
        "libc"
    }

    unsafe fn sort(&self, base: *mut c_void, count: usize, size: usize, cmp: CompareFn) {
        libc::qsort(base, count, size, Some(cmp));
    }
}
