//! Transaction handles and the abort signal.

use crate::internal::thread::Thread;
use core::{
    fmt::{self, Debug, Formatter},
    marker::PhantomData,
    ptr::NonNull,
};
use hynorec_htm::{HardwareTx, HtmWord};

#[derive(PartialEq, Eq)]
enum ErrorKind {
    Conflict,
    Retry,
}

/// Error type indicating that the current transaction attempt has failed.
///
/// Route it back to [`ThreadKey::run`] with `?`; the dispatcher clears the
/// attempt and retries. Handling it anywhere else defeats the runtime's
/// restart contract.
///
/// [`ThreadKey::run`]: crate::thread_key::ThreadKey::run
#[derive(PartialEq, Eq)]
pub struct Error {
    kind: ErrorKind,
    _private: (),
}

impl Debug for Error {
    #[cold]
    fn fmt(&self, formatter: &mut Formatter<'_>) -> fmt::Result {
        formatter.pad("Error { .. }")
    }
}

impl Error {
    /// Error value requesting a restart of the current transaction.
    ///
    /// Returning `RETRY` from the transaction closure restarts it
    /// immediately; the thread spins until some attempt commits.
    pub const RETRY: Self = Error {
        kind: ErrorKind::Retry,
        _private: (),
    };

    pub(crate) const CONFLICT: Self = Error {
        kind: ErrorKind::Conflict,
        _private: (),
    };
}

/// A live transaction attempt.
///
/// Handed to the closure passed to [`ThreadKey::run`]; all transactional
/// reads and writes go through it (see [`TWord::get`] and [`TWord::set`]).
/// The `'tword` brand ties every location touched to memory that outlives
/// the transaction.
///
/// [`ThreadKey::run`]: crate::thread_key::ThreadKey::run
/// [`TWord::get`]: crate::tword::TWord::get
/// [`TWord::set`]: crate::tword::TWord::set
pub struct Tx<'tword> {
    kind: TxKind,
    _marker: PhantomData<fn(&'tword ()) -> &'tword ()>,
}

enum TxKind {
    /// Inside a hardware region: reads and writes go straight to memory,
    /// tracked by the CPU.
    Hardware(NonNull<HardwareTx>),
    /// Software attempt: reads and writes go through the NOrec logs.
    Software(NonNull<Thread>),
}

impl Debug for Tx<'_> {
    #[cold]
    fn fmt(&self, formatter: &mut Formatter<'_>) -> fmt::Result {
        formatter.pad(match self.kind {
            TxKind::Hardware(_) => "Tx::Hardware { .. }",
            TxKind::Software(_) => "Tx::Software { .. }",
        })
    }
}

impl<'tword> Tx<'tword> {
    /// # Safety
    ///
    /// `htx` must be a started region that stays live for every use of the
    /// returned handle.
    #[inline]
    pub(crate) unsafe fn hardware(htx: &HardwareTx) -> Self {
        Tx {
            kind: TxKind::Hardware(NonNull::from(htx)),
            _marker: PhantomData,
        }
    }

    /// # Safety
    ///
    /// `thread` must point to a context with a begun software attempt, and
    /// must not be accessed through any other path while the handle lives.
    #[inline]
    pub(crate) unsafe fn software(thread: NonNull<Thread>) -> Self {
        Tx {
            kind: TxKind::Software(thread),
            _marker: PhantomData,
        }
    }

    #[inline]
    pub(crate) fn read_word(&mut self, word: NonNull<HtmWord>) -> Result<usize, Error> {
        match self.kind {
            TxKind::Hardware(htx) => Ok(unsafe { word.as_ref().get(htx.as_ref()) }),
            TxKind::Software(mut thread) => unsafe { thread.as_mut() }.sw_read(word),
        }
    }

    #[inline]
    pub(crate) fn write_word(&mut self, word: NonNull<HtmWord>, value: usize) -> Result<(), Error> {
        match self.kind {
            TxKind::Hardware(htx) => {
                unsafe { word.as_ref().set(htx.as_ref(), value) };
                Ok(())
            }
            TxKind::Software(mut thread) => unsafe { thread.as_mut() }.sw_write(word, value),
        }
    }
}
