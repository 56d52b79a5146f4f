//! Transaction statistics.
//!
//! Counts accumulate per thread with no synchronization on the hot path;
//! when a thread's transactional context is torn down its totals merge into
//! a process-wide aggregate readable through [`global`].

use std::sync::Mutex;

/// Commit and abort counts for one thread (or, from [`global`], the whole
/// process).
#[derive(Copy, Clone, Debug, Default, PartialEq, Eq)]
pub struct TxStats {
    /// Transactions committed by the hardware path.
    pub hw_commits: u64,
    /// Transactions committed by the software path.
    pub sw_commits: u64,
    /// Software attempts that aborted (each was retried).
    pub sw_aborts: u64,
    /// Hardware begin attempts that aborted before the fallback.
    pub hw_retries: u64,
}

impl TxStats {
    pub(crate) const ZERO: TxStats = TxStats {
        hw_commits: 0,
        sw_commits: 0,
        sw_aborts: 0,
        hw_retries: 0,
    };

    /// Total committed transactions, either path.
    #[inline]
    pub fn commits(&self) -> u64 {
        self.hw_commits + self.sw_commits
    }

    pub(crate) fn merge(&mut self, rhs: &TxStats) {
        self.hw_commits += rhs.hw_commits;
        self.sw_commits += rhs.sw_commits;
        self.sw_aborts += rhs.sw_aborts;
        self.hw_retries += rhs.hw_retries;
    }
}

static GLOBAL: Mutex<TxStats> = Mutex::new(TxStats::ZERO);

pub(crate) fn merge_thread(stats: &TxStats) {
    if let Ok(mut global) = GLOBAL.lock() {
        global.merge(stats);
    }
}

/// The merged totals of every thread context dropped so far.
pub fn global() -> TxStats {
    GLOBAL.lock().map(|global| *global).unwrap_or(TxStats::ZERO)
}
