//! The software path's read set.
//!
//! NOrec validates by value: every software read appends the address it
//! read and the value it saw, and validation re-loads each address and
//! compares. There are no per-location version records to consult, which is
//! what lets hardware transactions write concurrently without tripping over
//! metadata they never knew about.

use core::{
    ptr::NonNull,
    sync::atomic::Ordering::Acquire,
};
use hynorec_htm::HtmWord;

const READ_CAPACITY: usize = 1024;

#[derive(Debug)]
struct ReadEntry {
    word: NonNull<HtmWord>,
    seen: usize,
}

/// Entries are raw pointers; the transaction lifetime on the public surface
/// guarantees every recorded word outlives the attempt that logged it, and
/// the log is cleared before that attempt ends on every path.
#[derive(Debug)]
pub struct ReadLog {
    entries: Vec<ReadEntry>,
}

impl ReadLog {
    pub fn new() -> Self {
        ReadLog {
            entries: Vec::with_capacity(READ_CAPACITY),
        }
    }

    #[inline]
    pub fn record(&mut self, word: NonNull<HtmWord>, seen: usize) {
        self.entries.push(ReadEntry { word, seen })
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    #[inline]
    pub fn clear(&mut self) {
        self.entries.clear()
    }

    /// Re-loads every logged address and compares against the value the
    /// transaction acted on.
    ///
    /// # Safety
    ///
    /// Every recorded word must still be live.
    #[inline]
    pub unsafe fn validate_values(&self) -> bool {
        for entry in &self.entries {
            let current = entry.word.as_ref().load(Acquire);
            if unlikely!(current != entry.seen) {
                return false;
            }
        }
        true
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::Ordering::Relaxed;

    #[test]
    fn validation_tracks_current_memory() {
        let a = HtmWord::new(1);
        let b = HtmWord::new(2);
        let mut log = ReadLog::new();
        log.record(NonNull::from(&a), 1);
        log.record(NonNull::from(&b), 2);
        assert!(unsafe { log.validate_values() });

        b.store(7, Relaxed);
        assert!(!unsafe { log.validate_values() });

        b.store(2, Relaxed);
        assert!(unsafe { log.validate_values() });
    }

    #[test]
    fn clear_empties_but_keeps_capacity() {
        let a = HtmWord::new(0);
        let mut log = ReadLog::new();
        for _ in 0..10 {
            log.record(NonNull::from(&a), 0);
        }
        assert!(!log.is_empty());
        log.clear();
        assert!(log.is_empty());
        assert!(unsafe { log.validate_values() });
    }
}
