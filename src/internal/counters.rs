//! The hardware commit counter table.
//!
//! Hardware transactions leave no log behind, so the software path cannot
//! see their individual writes. What it can see is this table: every
//! hardware commit increments its thread's slot as the region's final
//! transactional store, making the increment atomic with the commit's
//! effects. A software transaction snapshots the table at begin; if the
//! table is unchanged by the time the transaction holds the writeback
//! window, no hardware commit happened during its lifetime and its
//! value-validated read set is coherent with a single serialization point.
//!
//! Each slot has a single writer (its thread) and any number of readers,
//! and sits on its own cache line.

use core::sync::atomic::{
    fence, AtomicU64, AtomicUsize,
    Ordering::{AcqRel, Acquire, Relaxed, Release, SeqCst},
};
use crossbeam_utils::CachePadded;
use hynorec_htm::{HardwareTx, HtmWord};

/// Upper bound on live threads, one slot each.
pub const MAX_THREADS: usize = 64;

const ZERO_SLOT: CachePadded<HtmWord> = CachePadded::new(HtmWord::new(0));

pub struct CommitCounters {
    slots: [CachePadded<HtmWord>; MAX_THREADS],
    /// One bit per slot; set while a thread owns it.
    in_use: AtomicU64,
    /// High-water mark of ever-claimed slots. Never decreases, so
    /// snapshots only have to copy the live prefix.
    len: AtomicUsize,
}

/// Process-wide instance, shared by every thread's transactions.
pub static COUNTERS: CommitCounters = CommitCounters::new();

impl CommitCounters {
    pub const fn new() -> Self {
        CommitCounters {
            slots: [ZERO_SLOT; MAX_THREADS],
            in_use: AtomicU64::new(0),
            len: AtomicUsize::new(0),
        }
    }

    /// Claims a free slot for the calling thread.
    ///
    /// # Panics
    ///
    /// Panics when more than [`MAX_THREADS`] threads hold transactional
    /// state at once.
    #[inline(never)]
    #[cold]
    pub fn acquire(&self) -> CounterSlot<'_> {
        let mut bits = self.in_use.load(Relaxed);
        loop {
            let index = (!bits).trailing_zeros() as usize;
            assert!(
                index < MAX_THREADS,
                "every commit counter slot is taken ({} live threads)",
                MAX_THREADS
            );
            match self
                .in_use
                .compare_exchange_weak(bits, bits | 1 << index, AcqRel, Relaxed)
            {
                Ok(_) => {
                    let mut len = self.len.load(Relaxed);
                    while len < index + 1 {
                        match self
                            .len
                            .compare_exchange_weak(len, index + 1, AcqRel, Relaxed)
                        {
                            Ok(_) => break,
                            Err(now) => len = now,
                        }
                    }
                    return CounterSlot { table: self, index };
                }
                Err(now) => bits = now,
            }
        }
    }

    /// Copies the live prefix of the table. The trailing fence orders the
    /// copy before the caller's first transactional read.
    #[inline]
    pub fn snapshot_into(&self, snap: &mut SnapCounters) {
        snap.values.clear();
        let len = self.len.load(Acquire);
        for slot in &self.slots[..len] {
            snap.values.push(slot.load(Acquire));
        }
        fence(SeqCst);
    }

    /// Whether any hardware commit has landed since `snap` was taken. A
    /// table that grew new slots counts as changed; the new thread may
    /// already have committed.
    #[inline]
    pub fn changed_since(&self, snap: &SnapCounters) -> bool {
        let len = self.len.load(Acquire);
        if unlikely!(len != snap.values.len()) {
            return true;
        }
        for (slot, &seen) in self.slots[..len].iter().zip(&snap.values) {
            if unlikely!(slot.load(Acquire) != seen) {
                return true;
            }
        }
        false
    }
}

impl core::fmt::Debug for CommitCounters {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.debug_struct("CommitCounters")
            .field("len", &self.len.load(Relaxed))
            .field("in_use", &self.in_use.load(Relaxed))
            .finish()
    }
}

/// A thread's claim on one counter slot. Released (for reuse by a later
/// thread) on drop; the counter value itself survives, keeping the table
/// monotonic.
#[derive(Debug)]
pub struct CounterSlot<'a> {
    table: &'a CommitCounters,
    index: usize,
}

impl CounterSlot<'_> {
    /// The final transactional store of a hardware commit.
    #[inline]
    pub fn bump(&self, htx: &HardwareTx) {
        let slot = &self.table.slots[self.index];
        let value = slot.get(htx);
        slot.set(htx, value.wrapping_add(1));
    }
}

impl Drop for CounterSlot<'_> {
    fn drop(&mut self) {
        self.table
            .in_use
            .fetch_and(!(1u64 << self.index), Release);
    }
}

/// A thread-private copy of the table's live prefix, taken at software
/// begin. The buffer is reused across transactions.
#[derive(Debug)]
pub struct SnapCounters {
    values: Vec<usize>,
}

impl SnapCounters {
    pub fn new() -> Self {
        SnapCounters {
            values: Vec::with_capacity(MAX_THREADS),
        }
    }
}
