//! Thread local state, [`ThreadKey`], used to run transactions.
//!
//! A handle to the thread local state is acquired by calling [`get`].

use crate::{
    internal::thread::Thread,
    stats::TxStats,
    tx::{Error, Tx},
};
use std::{
    cell::RefCell,
    fmt::{self, Debug, Formatter},
    rc::Rc,
};

/// A handle to this thread's transactional state.
///
/// `ThreadKey` encapsulates the logs, version bookkeeping, and commit
/// counter slot a thread needs to run transactions, and provides the
/// dispatcher entry points.
#[derive(Clone)]
pub struct ThreadKey {
    thread: Rc<RefCell<Thread>>,
}

impl Debug for ThreadKey {
    #[cold]
    fn fmt(&self, formatter: &mut Formatter<'_>) -> fmt::Result {
        formatter.pad("ThreadKey { .. }")
    }
}

impl ThreadKey {
    #[inline(never)]
    #[cold]
    fn new() -> Self {
        ThreadKey {
            thread: Rc::new(RefCell::new(Thread::new())),
        }
    }

    /// Runs a transaction, hardware path first, retrying until it commits.
    ///
    /// The closure may run any number of times; it must confine its side
    /// effects to [`TWord`] accesses through the supplied [`Tx`].
    ///
    /// # Panics
    ///
    /// Panics if a transaction is already running on this thread.
    ///
    /// # Examples
    ///
    /// ```
    /// use hynorec::{thread_key, tword::TWord};
    ///
    /// let key = thread_key::get();
    /// let x = TWord::new(0);
    /// let y = TWord::new(7);
    ///
    /// let prev = key.run(|tx| {
    ///     let v = y.get(tx)?;
    ///     x.set(tx, v)?;
    ///     y.set(tx, 0)?;
    ///     Ok(v)
    /// });
    ///
    /// assert_eq!(prev, 7);
    /// assert_eq!(x.into_inner(), 7);
    /// ```
    ///
    /// [`TWord`]: crate::tword::TWord
    #[inline]
    pub fn run<'tword, F, O>(&'tword self, f: F) -> O
    where
        F: FnMut(&mut Tx<'tword>) -> Result<O, Error>,
    {
        self.try_run(f)
            .expect("nested transactions are not supported")
    }

    /// Runs a transaction on the software path only.
    ///
    /// The hybrid dispatcher is normally the right entry point; this one
    /// exists so workloads can be forced through NOrec — for mode-parity
    /// checks and deterministic tests.
    ///
    /// # Panics
    ///
    /// Panics if a transaction is already running on this thread.
    #[inline]
    pub fn run_software<'tword, F, O>(&'tword self, f: F) -> O
    where
        F: FnMut(&mut Tx<'tword>) -> Result<O, Error>,
    {
        self.try_run_software(f)
            .expect("nested transactions are not supported")
    }

    /// Like [`run`](Self::run), but reports nesting instead of panicking.
    #[inline]
    pub fn try_run<'tword, F, O>(&'tword self, f: F) -> Result<O, TryRunErr>
    where
        F: FnMut(&mut Tx<'tword>) -> Result<O, Error>,
    {
        let mut thread = self.thread.try_borrow_mut().map_err(|_| TryRunErr::new())?;
        Ok(thread.run_hybrid(f))
    }

    /// Like [`run_software`](Self::run_software), but reports nesting
    /// instead of panicking.
    #[inline]
    pub fn try_run_software<'tword, F, O>(&'tword self, f: F) -> Result<O, TryRunErr>
    where
        F: FnMut(&mut Tx<'tword>) -> Result<O, Error>,
    {
        let mut thread = self.thread.try_borrow_mut().map_err(|_| TryRunErr::new())?;
        Ok(thread.run_software(f))
    }

    /// This thread's commit statistics so far.
    ///
    /// # Panics
    ///
    /// Panics if called from inside a transaction.
    pub fn stats(&self) -> TxStats {
        self.thread.borrow().stats
    }
}

#[inline(never)]
#[cold]
fn new_thread_key() -> ThreadKey {
    ThreadKey::new()
}

thread_local! {
    static THREAD_KEY: ThreadKey = new_thread_key();
}

/// Returns a handle to this thread's transactional state.
///
/// Reusing one `ThreadKey` across transactions skips repeated thread local
/// lookups.
#[inline]
pub fn get() -> ThreadKey {
    THREAD_KEY
        .try_with(ThreadKey::clone)
        .unwrap_or_else(|_| new_thread_key())
}

/// Error type indicating that a transaction could not start because one is
/// already running on this thread.
pub struct TryRunErr {
    _private: (),
}

impl Debug for TryRunErr {
    #[cold]
    fn fmt(&self, formatter: &mut Formatter<'_>) -> fmt::Result {
        formatter.pad("TryRunErr { .. }")
    }
}

impl TryRunErr {
    #[inline]
    fn new() -> Self {
        TryRunErr { _private: () }
    }
}
