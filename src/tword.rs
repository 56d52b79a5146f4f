//! `TWord`, the transactional memory location.

use crate::tx::{Error, Tx};
use core::{
    fmt::{self, Debug, Formatter},
    ptr::NonNull,
    sync::atomic::Ordering::Relaxed,
};
use hynorec_htm::HtmWord;

/// A word-sized shared memory location under transactional control.
///
/// All shared access goes through a [`Tx`]; unique access (`&mut self` or
/// ownership) bypasses the runtime entirely, which is how workloads
/// initialize and audit state outside the measurement window.
///
/// # Examples
///
/// ```
/// use hynorec::{thread_key, tword::TWord};
///
/// let key = thread_key::get();
/// let x = TWord::new(40);
///
/// key.run(|tx| {
///     let v = x.get(tx)?;
///     x.set(tx, v + 2)?;
///     Ok(())
/// });
///
/// assert_eq!(x.into_inner(), 42);
/// ```
#[repr(transparent)]
pub struct TWord {
    storage: HtmWord,
}

impl TWord {
    #[inline]
    pub const fn new(value: usize) -> Self {
        TWord {
            storage: HtmWord::new(value),
        }
    }

    /// Transactionally consistent read. May signal an abort.
    #[inline]
    pub fn get<'tword>(&'tword self, tx: &mut Tx<'tword>) -> Result<usize, Error> {
        tx.read_word(NonNull::from(&self.storage))
    }

    /// Transactional write: buffered on the software path, direct inside a
    /// hardware region.
    #[inline]
    pub fn set<'tword>(&'tword self, tx: &mut Tx<'tword>, value: usize) -> Result<(), Error> {
        tx.write_word(NonNull::from(&self.storage), value)
    }

    /// Unique access; no transaction required.
    #[inline]
    pub fn get_mut(&mut self) -> &mut usize {
        self.storage.get_mut()
    }

    #[inline]
    pub fn into_inner(mut self) -> usize {
        *self.storage.get_mut()
    }
}

impl Debug for TWord {
    fn fmt(&self, formatter: &mut Formatter<'_>) -> fmt::Result {
        formatter
            .debug_tuple("TWord")
            .field(&self.storage.load(Relaxed))
            .finish()
    }
}

impl Default for TWord {
    #[inline]
    fn default() -> Self {
        TWord::new(0)
    }
}

impl From<usize> for TWord {
    #[inline]
    fn from(value: usize) -> Self {
        TWord::new(value)
    }
}

#[cfg(test)]
mod tests {
    use super::TWord;

    #[test]
    fn unique_access_bypasses_the_runtime() {
        let mut w = TWord::new(3);
        *w.get_mut() += 4;
        assert_eq!(w.into_inner(), 7);
    }

    #[test]
    fn conversions() {
        assert_eq!(TWord::default().into_inner(), 0);
        assert_eq!(TWord::from(9).into_inner(), 9);
        assert_eq!(format!("{:?}", TWord::new(5)), "TWord(5)");
    }
}
