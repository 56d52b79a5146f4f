//! Per-thread transactional state and the two execution paths.
//!
//! `Thread` owns everything a transaction attempt needs: the read and write
//! logs, the read-version `rv`, the commit counter snapshot, this thread's
//! counter slot, and commit statistics. The software path is NOrec; the
//! hybrid dispatcher tries the hardware path first and falls back.

use crate::{
    internal::{
        counters::{CounterSlot, SnapCounters, COUNTERS},
        read_log::ReadLog,
        seqlock::SEQLOCK,
        write_log::WriteLog,
    },
    stats::TxStats,
    tx::{Error, Tx},
};
use core::ptr::NonNull;
use hynorec_htm::{BoundedHtxErr, HardwareTx, HtmWord};
use std::sync::atomic::Ordering::Acquire;

/// Hardware attempts per dispatcher round before the software fallback.
pub const HTM_ATTEMPTS: u8 = 5;

pub struct Thread {
    read_log: ReadLog,
    write_log: WriteLog,
    snap: SnapCounters,
    /// The even seqlock version this attempt's reads are consistent with.
    rv: usize,
    slot: CounterSlot<'static>,
    pub stats: TxStats,
}

impl Thread {
    #[inline(never)]
    #[cold]
    pub fn new() -> Self {
        Thread {
            read_log: ReadLog::new(),
            write_log: WriteLog::new(),
            snap: SnapCounters::new(),
            rv: 0,
            slot: COUNTERS.acquire(),
            stats: TxStats::ZERO,
        }
    }

    /// NOrec begin: pick an even read-version, then snapshot the commit
    /// counter table before the first transactional read.
    #[inline]
    fn sw_begin(&mut self) {
        debug_assert!(
            self.read_log.is_empty() && self.write_log.is_empty(),
            "transaction logs were not cleared by the previous attempt"
        );
        self.rv = SEQLOCK.read_quiescent();
        COUNTERS.snapshot_into(&mut self.snap);
    }

    /// Buffered-first read. A write-set hit returns the pending value;
    /// otherwise the load is re-run until it is coherent with `rv`.
    #[inline]
    pub fn sw_read(&mut self, word: NonNull<HtmWord>) -> Result<usize, Error> {
        if let Some(pending) = self.write_log.find(word) {
            return Ok(pending);
        }
        let mut value = unsafe { word.as_ref() }.load(Acquire);
        while unlikely!(self.rv != SEQLOCK.read()) {
            // a writer committed since begin; prove the read set still
            // holds, then re-load under the new version
            self.validate()?;
            value = unsafe { word.as_ref() }.load(Acquire);
        }
        self.read_log.record(word, value);
        Ok(value)
    }

    #[inline]
    pub fn sw_write(&mut self, word: NonNull<HtmWord>, value: usize) -> Result<(), Error> {
        self.write_log.record(word, value);
        Ok(())
    }

    /// Moves `rv` forward to a quiescent version and re-verifies every
    /// logged read against current memory. A value mismatch aborts the
    /// attempt; a seqlock moved mid-scan restarts the scan.
    #[inline(never)]
    #[cold]
    fn validate(&mut self) -> Result<(), Error> {
        loop {
            let rv = SEQLOCK.read_quiescent();
            if unlikely!(!unsafe { self.read_log.validate_values() }) {
                return Err(self.conflict());
            }
            if likely!(SEQLOCK.read() == rv) {
                self.rv = rv;
                return Ok(());
            }
        }
    }

    /// Abandons the attempt: clears both logs and produces the abort
    /// signal the dispatcher consumes. Nothing has touched shared memory.
    #[inline(never)]
    #[cold]
    fn conflict(&mut self) -> Error {
        self.read_log.clear();
        self.write_log.clear();
        Error::CONFLICT
    }

    /// NOrec commit. Read-only transactions are already serialized by
    /// their reads; writers claim the writeback window, re-check for
    /// concurrent hardware commits, then write back and release.
    #[inline]
    fn sw_commit(&mut self) -> Result<(), Error> {
        if self.write_log.is_empty() {
            self.read_log.clear();
            return Ok(());
        }
        while unlikely!(!SEQLOCK.try_claim(self.rv)) {
            self.validate()?;
        }
        // window held: seqlock == rv + 1, odd. Hardware prologues now
        // abort, and no other software writer can claim.
        if unlikely!(COUNTERS.changed_since(&self.snap)) {
            // a hardware transaction committed during our lifetime; its
            // writes are invisible to the log, so only the values can
            // decide. No seqlock loop here: this thread owns the odd
            // parity.
            if unlikely!(!unsafe { self.read_log.validate_values() }) {
                SEQLOCK.release(self.rv);
                return Err(self.conflict());
            }
        }
        unsafe { self.write_log.perform_writes() };
        SEQLOCK.release(self.rv);
        self.read_log.clear();
        self.write_log.clear();
        Ok(())
    }

    /// The hybrid dispatcher: up to [`HTM_ATTEMPTS`] hardware attempts,
    /// then one software attempt; a software abort restarts the round.
    #[inline]
    pub fn run_hybrid<'tword, F, O>(&mut self, mut f: F) -> O
    where
        F: FnMut(&mut Tx<'tword>) -> Result<O, Error>,
    {
        loop {
            let mut attempts = 0;
            // Control can re-emerge from `bounded` several times: an abort
            // anywhere below rolls the region back to its begin point, the
            // retry handler counts the failure, and a fresh `Ok` re-runs
            // this match with a new region.
            match unsafe { HardwareTx::bounded(&mut attempts, HTM_ATTEMPTS) } {
                Ok(htx) => {
                    // Prologue: a held writeback window means shared memory
                    // may be torn. The load also subscribes the seqlock to
                    // the hardware read set, so a window claimed later
                    // aborts this region instead of racing it.
                    if SEQLOCK.is_write_locked() {
                        htx.abort();
                    }
                    let mut tx = unsafe { Tx::hardware(&htx) };
                    match f(&mut tx) {
                        Ok(o) => {
                            self.slot.bump(&htx);
                            drop(htx);
                            self.stats.hw_commits += 1;
                            self.stats.hw_retries += u64::from(attempts);
                            return o;
                        }
                        Err(_) => htx.abort(),
                    }
                }
                Err(BoundedHtxErr::SoftwareFallback) | Err(BoundedHtxErr::AbortOrConflict) => {}
            }
            self.stats.hw_retries += u64::from(attempts);
            if let Some(o) = SwPin::begin(self).attempt(&mut f) {
                return o;
            }
            // software abort: restart from the hardware path, which may
            // now succeed since the contending commit has drained
        }
    }

    /// Software-only dispatcher; retries until the attempt commits.
    #[inline]
    pub fn run_software<'tword, F, O>(&mut self, mut f: F) -> O
    where
        F: FnMut(&mut Tx<'tword>) -> Result<O, Error>,
    {
        loop {
            if let Some(o) = SwPin::begin(self).attempt(&mut f) {
                return o;
            }
        }
    }
}

impl Drop for Thread {
    fn drop(&mut self) {
        crate::stats::merge_thread(&self.stats);
    }
}

/// One software attempt. Dropping the pin clears the logs, which keeps the
/// per-thread state reusable on the abort path and even across a panic in
/// user code.
struct SwPin<'a> {
    thread: &'a mut Thread,
}

impl<'a> SwPin<'a> {
    #[inline]
    fn begin(thread: &'a mut Thread) -> Self {
        thread.sw_begin();
        SwPin { thread }
    }

    #[inline]
    fn attempt<'tword, F, O>(self, f: &mut F) -> Option<O>
    where
        F: FnMut(&mut Tx<'tword>) -> Result<O, Error>,
    {
        let mut pin = self;
        let result = {
            let mut tx = unsafe { Tx::software(NonNull::from(&mut *pin.thread)) };
            f(&mut tx)
        };
        let outcome = result.and_then(|o| pin.thread.sw_commit().map(|()| o));
        match outcome {
            Ok(o) => {
                pin.thread.stats.sw_commits += 1;
                Some(o)
            }
            Err(_) => {
                pin.thread.stats.sw_aborts += 1;
                None
            }
        }
    }
}

impl Drop for SwPin<'_> {
    #[inline]
    fn drop(&mut self) {
        self.thread.read_log.clear();
        self.thread.write_log.clear();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::tword::TWord;

    #[test]
    fn software_transaction_commits_buffered_writes() {
        let mut thread = Thread::new();
        let x = TWord::new(1);
        let y = TWord::new(2);
        thread.run_software(|tx| {
            let a = x.get(tx)?;
            let b = y.get(tx)?;
            x.set(tx, b)?;
            y.set(tx, a)?;
            Ok(())
        });
        assert_eq!(x.into_inner(), 2);
        assert_eq!(y.into_inner(), 1);
        assert_eq!(thread.stats.sw_commits, 1);
        assert_eq!(thread.stats.sw_aborts, 0);
    }

    #[test]
    fn transaction_reads_its_own_writes() {
        let mut thread = Thread::new();
        let x = TWord::new(10);
        let seen = thread.run_software(|tx| {
            x.set(tx, 20)?;
            let mid = x.get(tx)?;
            x.set(tx, 30)?;
            Ok((mid, x.get(tx)?))
        });
        assert_eq!(seen, (20, 30));
        assert_eq!(x.into_inner(), 30);
    }

    #[test]
    fn read_only_transaction_commits() {
        let mut thread = Thread::new();
        let x = TWord::new(5);
        let got = thread.run_software(|tx| x.get(tx));
        assert_eq!(got, 5);
        assert_eq!(thread.stats.sw_commits, 1);
        assert_eq!(thread.stats.sw_aborts, 0);
    }

    #[test]
    fn user_retry_clears_the_logs() {
        let mut thread = Thread::new();
        let x = TWord::new(0);
        let mut tries = 0;
        thread.run_software(|tx| {
            x.set(tx, 1)?;
            tries += 1;
            if tries < 3 {
                Err(Error::RETRY)
            } else {
                Ok(())
            }
        });
        assert_eq!(tries, 3);
        assert_eq!(thread.stats.sw_aborts, 2);
        assert_eq!(thread.stats.sw_commits, 1);
        assert_eq!(x.into_inner(), 1);
    }

    #[test]
    fn hybrid_dispatcher_commits_without_hardware() {
        // with the hardware backend compiled out this exercises the
        // fallback shortcut; with it, either path must produce the result
        let mut thread = Thread::new();
        let x = TWord::new(3);
        thread.run_hybrid(|tx| {
            let v = x.get(tx)?;
            x.set(tx, v * 7)?;
            Ok(())
        });
        assert_eq!(x.into_inner(), 21);
        assert_eq!(thread.stats.commits(), 1);
    }
}
