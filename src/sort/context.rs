//! Lock-free adapter over `qsort_r`.
//!
//! `qsort_r` passes a user-data pointer through to every comparison, so the
//! closure can be bound to the call itself instead of to process-wide state.
//! Concurrent callers never wait on each other.

use std::cmp::Ordering;
use std::mem;
use std::os::raw::{c_int, c_void};

use once_cell::sync::Lazy;
use tracing::trace;

use super::less_to_ordering;
use super::state::{Frame, PanicPayload};
use super::trampoline::catch;
use crate::error::SortResult;
use crate::native::{ContextCompareFn, ContextQsort};

/// Per-call state handed to `qsort_r` as its user-data pointer
struct CallContext<F> {
    cmp: F,
    frame: Frame,
    panic: Option<PanicPayload>,
}

impl<F> CallContext<F> {
    fn new(cmp: F, frame: Frame) -> Self {
        Self {
            cmp,
            frame,
            panic: None,
        }
    }

    /// Compare through `f`, parking a panic instead of unwinding into C
    fn guarded(&mut self, f: impl FnOnce(&mut F, &Frame) -> Ordering) -> c_int {
        if self.panic.is_some() {
            return 0;
        }
        let frame = self.frame;
        let cmp = &mut self.cmp;
        match catch(|| f(cmp, &frame)) {
            Ok(order) => order as c_int,
            Err(payload) => {
                self.panic = Some(payload);
                0
            }
        }
    }
}

unsafe extern "C" fn typed_trampoline<T, F>(
    a: *const c_void,
    b: *const c_void,
    ctx: *mut c_void,
) -> c_int
where
    F: FnMut(&T, &T) -> Ordering,
{
    let ctx = &mut *(ctx as *mut CallContext<F>);
    ctx.guarded(|cmp, _| cmp(&*a.cast::<T>(), &*b.cast::<T>()))
}

unsafe extern "C" fn index_trampoline<T, F>(
    a: *const c_void,
    b: *const c_void,
    ctx: *mut c_void,
) -> c_int
where
    F: FnMut(&[T], usize, usize) -> Ordering,
{
    let ctx = &mut *(ctx as *mut CallContext<F>);
    ctx.guarded(|cmp, frame| {
        let i = frame.index_of(a);
        let j = frame.index_of(b);
        cmp(frame.view::<T>(), i, j)
    })
}

/// Sort adapter that binds the comparator into each `qsort_r` call
#[derive(Debug)]
pub struct ContextSorter {
    native: ContextQsort,
}

impl ContextSorter {
    /// Adapter over the process's `qsort_r`
    pub fn from_process() -> SortResult<Self> {
        Ok(Self {
            native: ContextQsort::from_process()?,
        })
    }

    /// Adapter over an already resolved `qsort_r`
    pub fn with_native(native: ContextQsort) -> Self {
        Self { native }
    }

    /// The process-wide instance, if `qsort_r` is available
    pub fn shared() -> SortResult<&'static ContextSorter> {
        static SHARED: Lazy<SortResult<ContextSorter>> = Lazy::new(ContextSorter::from_process);
        SHARED.as_ref().map_err(Clone::clone)
    }

    /// Sort with a three-way comparator over elements
    pub fn sort_by<T, F>(&self, values: &mut [T], cmp: F)
    where
        F: FnMut(&T, &T) -> Ordering,
    {
        if values.is_empty() || mem::size_of::<T>() == 0 {
            return;
        }
        let mut ctx = CallContext::new(cmp, Frame::of(values));
        unsafe { self.run(&mut ctx, typed_trampoline::<T, F>, "typed") }
    }

    /// Sort with a three-way comparator over logical indices
    pub fn sort_by_index<T, F>(&self, values: &mut [T], cmp: F)
    where
        F: FnMut(&[T], usize, usize) -> Ordering,
    {
        if values.is_empty() || mem::size_of::<T>() == 0 {
            return;
        }
        let mut ctx = CallContext::new(cmp, Frame::of(values));
        unsafe { self.run(&mut ctx, index_trampoline::<T, F>, "index") }
    }

    /// Sort with a "less-than" predicate over logical indices
    pub fn slice<T, F>(&self, values: &mut [T], mut less: F)
    where
        F: FnMut(&[T], usize, usize) -> bool,
    {
        self.sort_by_index(values, move |view: &[T], i, j| {
            less_to_ordering(&mut less, view, i, j)
        });
    }

    unsafe fn run<F>(
        &self,
        ctx: &mut CallContext<F>,
        trampoline: ContextCompareFn,
        variant: &'static str,
    ) {
        let frame = ctx.frame;
        trace!(variant, len = frame.len, stride = frame.stride, "native context sort");
        self.native.sort(
            frame.base as *mut c_void,
            frame.len,
            frame.stride,
            trampoline,
            (ctx as *mut CallContext<F>).cast(),
        );
        if let Some(payload) = ctx.panic.take() {
            std::panic::resume_unwind(payload);
        }
    }
}

/// [`ContextSorter::sort_by`] on the process's `qsort_r`
pub fn sort_by<T, F>(values: &mut [T], cmp: F) -> SortResult<()>
where
    F: FnMut(&T, &T) -> Ordering,
{
    ContextSorter::shared()?.sort_by(values, cmp);
    Ok(())
}

/// [`ContextSorter::sort_by_index`] on the process's `qsort_r`
pub fn sort_by_index<T, F>(values: &mut [T], cmp: F) -> SortResult<()>
where
    F: FnMut(&[T], usize, usize) -> Ordering,
{
    ContextSorter::shared()?.sort_by_index(values, cmp);
    Ok(())
}
