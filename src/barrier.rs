//! A counting spin barrier.
//!
//! Benchmarks use it to line worker threads up before the measurement
//! window opens, so startup skew never counts against any thread's numbers.

use core::{
    hint,
    sync::atomic::{
        AtomicUsize,
        Ordering::{AcqRel, Acquire},
    },
};

/// A one-shot rendezvous for a fixed number of threads.
///
/// Every participant calls [`wait`](Self::wait) once; all of them return
/// only after the last one has arrived. Like every wait in this runtime it
/// spins rather than sleeps.
#[derive(Debug)]
pub struct SpinBarrier {
    arrived: AtomicUsize,
    total: usize,
}

impl SpinBarrier {
    /// # Panics
    ///
    /// Panics when `total` is zero.
    #[inline]
    pub const fn new(total: usize) -> Self {
        assert!(total > 0, "a barrier for zero threads can never release");
        SpinBarrier {
            arrived: AtomicUsize::new(0),
            total,
        }
    }

    /// Arrives at the barrier and spins until all participants have.
    #[inline]
    pub fn wait(&self) {
        let previous = self.arrived.fetch_add(1, AcqRel);
        debug_assert!(previous < self.total, "barrier reused after release");
        while self.arrived.load(Acquire) < self.total {
            hint::spin_loop();
        }
    }
}

#[cfg(test)]
mod tests {
    use super::SpinBarrier;
    use crossbeam_utils::thread;
    use std::sync::atomic::{AtomicUsize, Ordering::Relaxed};

    #[test]
    fn single_thread_passes_through() {
        SpinBarrier::new(1).wait();
    }

    #[test]
    fn no_thread_escapes_early() {
        const THREADS: usize = 4;
        let barrier = SpinBarrier::new(THREADS);
        let arrived = AtomicUsize::new(0);
        thread::scope(|s| {
            for _ in 0..THREADS {
                s.spawn(|_| {
                    arrived.fetch_add(1, Relaxed);
                    barrier.wait();
                    // everyone is in by the time anyone is out
                    assert_eq!(arrived.load(Relaxed), THREADS);
                });
            }
        })
        .unwrap();
    }
}
