//! Fixed-signature shims installed as the native comparator.

use std::cmp::Ordering;
use std::os::raw::{c_int, c_void};
use std::panic::{self, AssertUnwindSafe};

use super::state::{ErasedComparator, Frame, PanicPayload, COMPARE_INFO};

/// The `CompareFn` handed to every locked native call.
///
/// Recovers the active comparator from `COMPARE_INFO` and delegates to it.
/// A comparator panic must not unwind through C frames, so it is caught,
/// parked in the state, and every later comparison in the same call answers
/// "equal" so the native routine finishes quickly.
pub(crate) unsafe extern "C" fn compare_trampoline(a: *const c_void, b: *const c_void) -> c_int {
    let guard = COMPARE_INFO.lock();

    let (frame, comparator) = {
        let state = guard.borrow();
        match state.comparator {
            Some(comparator) if state.panic.is_none() => (state.frame, comparator),
            _ => return 0,
        }
    };

    // The state borrow is released before calling out, so a nested sort
    // reaches the adapter's own check instead of a RefCell panic.
    let outcome = catch(|| (comparator.call)(comparator.data, &frame, a, b));
    match outcome {
        Ok(order) => order as c_int,
        Err(payload) => {
            let mut state = guard.borrow_mut();
            if state.panic.is_none() {
                state.panic = Some(payload);
            }
            0
        }
    }
}

/// Run `f`, turning a panic into its payload
pub(crate) fn catch<R>(f: impl FnOnce() -> R) -> Result<R, PanicPayload> {
    panic::catch_unwind(AssertUnwindSafe(f))
}

/// Erase a comparator over raw element pointers
pub(crate) fn erase_pointer<F>(cmp: &mut F) -> ErasedComparator
where
    F: FnMut(*const c_void, *const c_void) -> Ordering,
{
    ErasedComparator::new(cmp, call_pointer::<F>)
}

/// Erase a comparator over logical indices into a `[T]`
pub(crate) fn erase_index<T, F>(cmp: &mut F) -> ErasedComparator
where
    F: FnMut(&[T], usize, usize) -> Ordering,
{
    ErasedComparator::new(cmp, call_index::<T, F>)
}

/// Thunk for comparators over raw element pointers
pub(crate) unsafe fn call_pointer<F>(
    data: *mut (),
    _frame: &Frame,
    a: *const c_void,
    b: *const c_void,
) -> Ordering
where
    F: FnMut(*const c_void, *const c_void) -> Ordering,
{
    let cmp = &mut *(data as *mut F);
    cmp(a, b)
}

/// Thunk for comparators over logical indices.
///
/// The only place an address is turned back into an index.
pub(crate) unsafe fn call_index<T, F>(
    data: *mut (),
    frame: &Frame,
    a: *const c_void,
    b: *const c_void,
) -> Ordering
where
    F: FnMut(&[T], usize, usize) -> Ordering,
{
    let i = frame.index_of(a);
    let j = frame.index_of(b);
    let cmp = &mut *(data as *mut F);
    cmp(frame.view::<T>(), i, j)
}
