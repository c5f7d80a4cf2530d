//! Process-wide comparison state.
//!
//! `qsort`'s callback carries no user-data slot, so the active comparator has
//! to live somewhere the trampoline can find it. It lives here, behind one
//! lock that the adapter holds for the whole native call.

use std::any::Any;
use std::cell::RefCell;
use std::cmp::Ordering;
use std::os::raw::c_void;
use std::slice;

use parking_lot::{const_reentrant_mutex, ReentrantMutex, ReentrantMutexGuard};

/// Payload of a comparator panic, held until the native call returns
pub(crate) type PanicPayload = Box<dyn Any + Send + 'static>;

/// Monomorphized shim that knows the concrete closure type behind `data`
pub(crate) type Thunk =
    unsafe fn(data: *mut (), frame: &Frame, a: *const c_void, b: *const c_void) -> Ordering;

/// Geometry of the buffer being sorted
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) struct Frame {
    /// Address of element 0
    pub base: usize,
    /// Byte distance between elements
    pub stride: usize,
    /// Element count
    pub len: usize,
}

impl Frame {
    pub(crate) const EMPTY: Frame = Frame {
        base: 0,
        stride: 0,
        len: 0,
    };

    /// Capture the geometry of an exclusively borrowed slice; the borrow
    /// keeps the base address fixed for as long as the frame is used.
    pub(crate) fn of<T>(values: &mut [T]) -> Self {
        Self {
            base: values.as_mut_ptr() as usize,
            stride: std::mem::size_of::<T>(),
            len: values.len(),
        }
    }

    /// Recover the logical index of the element at `addr`.
    ///
    /// Recomputed on every comparison since the native routine moves
    /// elements between calls. Panics if `addr` is not an element boundary
    /// inside the buffer.
    pub(crate) fn index_of(&self, addr: *const c_void) -> usize {
        let index = (addr as usize)
            .checked_sub(self.base)
            .filter(|offset| offset % self.stride == 0)
            .map(|offset| offset / self.stride)
            .filter(|&index| index < self.len);

        match index {
            Some(index) => index,
            None => panic!(
                "native sort compared {:p}, which is not an element of the {}-element buffer at {:#x} (stride {})",
                addr, self.len, self.base, self.stride
            ),
        }
    }

    /// Shared view of the buffer as it is right now.
    ///
    /// # Safety
    ///
    /// The frame must describe a live `[T]` that nothing else is writing to
    /// for the lifetime `'a`.
    pub(crate) unsafe fn view<'a, T>(&self) -> &'a [T] {
        slice::from_raw_parts(self.base as *const T, self.len)
    }
}

/// Type-erased user comparator
#[derive(Clone, Copy)]
pub(crate) struct ErasedComparator {
    pub data: *mut (),
    pub call: Thunk,
}

impl ErasedComparator {
    /// Erase `cmp`; the result must not outlive the borrow, and `call` must
    /// be the thunk instantiated for `F`.
    pub(crate) fn new<F>(cmp: &mut F, call: Thunk) -> Self {
        Self {
            data: cmp as *mut F as *mut (),
            call,
        }
    }
}

/// The shared state read by the trampoline
pub(crate) struct ComparisonState {
    pub frame: Frame,
    pub comparator: Option<ErasedComparator>,
    pub panic: Option<PanicPayload>,
}

impl ComparisonState {
    const IDLE: ComparisonState = ComparisonState {
        frame: Frame::EMPTY,
        comparator: None,
        panic: None,
    };

    pub(crate) fn is_active(&self) -> bool {
        self.comparator.is_some()
    }
}

// Safety: the raw closure pointer is only dereferenced by the thread that
// installed it, while it holds COMPARE_INFO.
unsafe impl Send for ComparisonState {}

/// Guard type for the comparison-state lock
pub(crate) type StateGuard = ReentrantMutexGuard<'static, RefCell<ComparisonState>>;

/// The one comparison state in the process.
///
/// Reentrant so the trampoline, running on the lock holder's thread inside
/// the native call, can take it again to read the comparator. A call from
/// any other thread blocks, so it can never observe another caller's state.
pub(crate) static COMPARE_INFO: ReentrantMutex<RefCell<ComparisonState>> =
    const_reentrant_mutex(RefCell::new(ComparisonState::IDLE));

/// An installed comparator; clears the state when dropped.
pub(crate) struct Session<'g> {
    state: &'g RefCell<ComparisonState>,
}

impl<'g> Session<'g> {
    /// Install `comparator` for `frame`.
    ///
    /// Panics when called from inside a comparator that is already running
    /// on this thread.
    pub(crate) fn install(
        guard: &'g StateGuard,
        frame: Frame,
        comparator: ErasedComparator,
    ) -> Self {
        let state: &'g RefCell<ComparisonState> = guard;
        let mut current = state.borrow_mut();
        if current.is_active() {
            drop(current);
            panic!("qsort-bridge: sort called from inside an active comparator");
        }
        current.frame = frame;
        current.comparator = Some(comparator);
        current.panic = None;
        drop(current);
        Self { state }
    }

    /// Clear the state and hand back any captured comparator panic
    pub(crate) fn finish(self) -> Option<PanicPayload> {
        let payload = self.state.borrow_mut().panic.take();
        payload
    }
}

impl Drop for Session<'_> {
    fn drop(&mut self) {
        let mut state = self.state.borrow_mut();
        state.frame = Frame::EMPTY;
        state.comparator = None;
        state.panic = None;
    }
}
