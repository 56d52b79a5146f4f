//! The software path's buffered write set.
//!
//! Software writes never touch shared memory until commit; they land here.
//! Reads consult the log first so a transaction sees its own writes, with a
//! reverse scan so the latest write to an address wins. Writeback replays
//! the log in order under the held window, which makes duplicate entries
//! harmless.

use core::{
    ptr::NonNull,
    sync::atomic::Ordering::Release,
};
use hynorec_htm::HtmWord;

const WRITE_CAPACITY: usize = 256;

#[derive(Debug)]
struct WriteEntry {
    word: NonNull<HtmWord>,
    pending: usize,
}

/// Same pointer-liveness contract as the read log: the transaction lifetime
/// keeps every recorded word alive, and the log never survives the attempt.
#[derive(Debug)]
pub struct WriteLog {
    entries: Vec<WriteEntry>,
}

impl WriteLog {
    pub fn new() -> Self {
        WriteLog {
            entries: Vec::with_capacity(WRITE_CAPACITY),
        }
    }

    #[inline]
    pub fn record(&mut self, word: NonNull<HtmWord>, pending: usize) {
        self.entries.push(WriteEntry { word, pending })
    }

    /// The most recent buffered value for `word`, if any.
    #[inline]
    pub fn find(&self, word: NonNull<HtmWord>) -> Option<usize> {
        self.entries
            .iter()
            .rev()
            .find(|entry| entry.word == word)
            .map(|entry| entry.pending)
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    #[inline]
    pub fn clear(&mut self) {
        self.entries.clear()
    }

    /// Applies the buffered writes in log order.
    ///
    /// # Safety
    ///
    /// Every recorded word must still be live, and the caller must hold the
    /// writeback window; nothing else may be mid-commit.
    #[inline]
    pub unsafe fn perform_writes(&self) {
        for entry in &self.entries {
            entry.word.as_ref().store(entry.pending, Release);
        }
    }
}
