use crate::HardwareTx;
use std::{
    cell::UnsafeCell,
    ops::{Deref, DerefMut},
    sync::atomic::AtomicUsize,
};

/// A machine word with two access modes.
///
/// Inside a hardware region (witnessed by a `&HardwareTx`) the word is read
/// and written with plain loads and stores; the region's isolation supplies
/// the atomicity. Everywhere else the word derefs to an [`AtomicUsize`] and
/// is accessed with explicit orderings.
///
/// Mixing the two modes on the same location is the entire point: a hardware
/// region that touches a word conflicts with, and is ordered against, any
/// concurrent atomic access to it.
#[derive(Debug)]
#[repr(transparent)]
pub struct HtmWord {
    inner: UnsafeCell<AtomicUsize>,
}

unsafe impl Send for HtmWord {}
unsafe impl Sync for HtmWord {}

impl HtmWord {
    #[inline]
    pub const fn new(value: usize) -> Self {
        HtmWord {
            inner: UnsafeCell::new(AtomicUsize::new(value)),
        }
    }

    #[inline(always)]
    fn as_raw(&self, _: &HardwareTx) -> *mut usize {
        self.inner.get() as *mut usize
    }

    /// In-region load. The borrow of the region is the proof that the plain
    /// load cannot observe a torn or stale value.
    #[inline(always)]
    pub fn get(&self, htx: &HardwareTx) -> usize {
        unsafe { *self.as_raw(htx) }
    }

    /// In-region store; buffered by the hardware until the region commits.
    #[inline(always)]
    pub fn set(&self, htx: &HardwareTx, value: usize) {
        unsafe { *self.as_raw(htx) = value }
    }
}

impl Deref for HtmWord {
    type Target = AtomicUsize;

    #[inline(always)]
    fn deref(&self) -> &Self::Target {
        unsafe { &*self.inner.get() }
    }
}

impl DerefMut for HtmWord {
    #[inline(always)]
    fn deref_mut(&mut self) -> &mut Self::Target {
        unsafe { &mut *self.inner.get() }
    }
}
