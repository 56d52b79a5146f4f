//! The global transaction version counter.
//!
//! A single word drives the entire software commit protocol. Its parity is
//! the state: even means quiescent, odd means some software transaction owns
//! the writeback window and shared memory may be mid-update. Software
//! transactions begin at an even version, validate against it, and commit by
//! moving it even -> odd -> even. Hardware transactions load it inside their
//! region, which both checks the parity and subscribes the word to the
//! hardware read set: a software claim during the region aborts the region.

use core::{
    hint,
    sync::atomic::{
        AtomicUsize,
        Ordering::{AcqRel, Acquire, Relaxed, Release},
    },
};

#[derive(Debug)]
pub struct GlobalSeqlock(AtomicUsize);

/// Process-wide instance; all transactions in the process serialize
/// against this one counter.
pub static SEQLOCK: GlobalSeqlock = GlobalSeqlock::new();

impl GlobalSeqlock {
    #[inline]
    pub const fn new() -> Self {
        GlobalSeqlock(AtomicUsize::new(0))
    }

    #[inline]
    pub fn read(&self) -> usize {
        self.0.load(Acquire)
    }

    /// Low-bit probe for the hardware prologue.
    #[inline]
    pub fn is_write_locked(&self) -> bool {
        self.read() & 1 != 0
    }

    /// Spins until the writeback window is closed and returns the (even)
    /// version observed.
    #[inline]
    pub fn read_quiescent(&self) -> usize {
        loop {
            let version = self.0.load(Acquire);
            if likely!(version & 1 == 0) {
                return version;
            }
            hint::spin_loop();
        }
    }

    /// Tries to open the writeback window by moving the counter from the
    /// caller's read-version to odd. Fails if any commit (or window) has
    /// intervened since `rv` was read.
    #[inline]
    pub fn try_claim(&self, rv: usize) -> bool {
        debug_assert!(rv & 1 == 0, "read-version is odd; begin/validate is broken");
        self.0.compare_exchange(rv, rv + 1, AcqRel, Relaxed).is_ok()
    }

    /// Closes the window opened by a successful `try_claim(rv)`, publishing
    /// the writeback performed under it.
    #[inline]
    pub fn release(&self, rv: usize) {
        debug_assert!(
            self.0.load(Relaxed) == rv + 1,
            "releasing a writeback window that is not held by this thread"
        );
        self.0.store(rv + 2, Release);
    }
}
