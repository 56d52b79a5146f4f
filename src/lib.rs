//! A hybrid NOrec transactional memory runtime.
//!
//! `hynorec` lets multiple threads run arbitrary read/modify/write sequences
//! over shared words as if each sequence were atomic, while most of them
//! actually run speculatively in parallel. Two execution paths cooperate:
//! the CPU's best-effort hardware transactions, and a NOrec software
//! fallback that validates by value against a single global seqlock. The
//! two commit concurrently without seeing each other's partial state.
//!
//! # Examples
//!
//! Getting a handle to the thread's transactional state:
//! ```
//! use hynorec::thread_key;
//!
//! let thread_key = thread_key::get();
//! ```
//!
//! Creating transactional words and transferring between them:
//! ```
//! use hynorec::{thread_key, tword::TWord};
//!
//! let thread_key = thread_key::get();
//! let checking = TWord::new(100);
//! let savings = TWord::new(0);
//!
//! thread_key.run(|tx| {
//!     let amount = 40;
//!     let from = checking.get(tx)?;
//!     let to = savings.get(tx)?;
//!     checking.set(tx, from - amount)?;
//!     savings.set(tx, to + amount)?;
//!     Ok(())
//! });
//!
//! assert_eq!(checking.into_inner(), 60);
//! assert_eq!(savings.into_inner(), 40);
//! ```
//!
//! # How it works
//!
//! * A global seqlock's parity marks software writeback windows; hardware
//!   transactions load it in their prologue, aborting if a window is open
//!   and conflicting with any window opened later.
//! * Every hardware commit increments a per-thread, cache-line-isolated
//!   counter as its final transactional store. Software commits snapshot
//!   the counter table at begin and re-check it under the held window, so
//!   hardware commits during their lifetime force a value revalidation.
//! * Software transactions buffer writes and validate reads by value, the
//!   NOrec recipe: no per-location ownership records, one global version.
//!
//! The `htm` cargo feature enables the hardware path on CPUs that have one;
//! without it the dispatcher short-circuits to pure NOrec. Either way the
//! public surface and its guarantees are identical.

#![warn(missing_debug_implementations)]
#![warn(unused_lifetimes)]
#![deny(rust_2018_idioms)]
#![deny(unused_must_use)]

#[macro_use]
mod internal;

pub mod barrier;
pub mod stats;
pub mod thread_key;
pub mod tword;
pub mod tx;

pub use barrier::SpinBarrier;
pub use thread_key::ThreadKey;
pub use tword::TWord;

#[doc(inline)]
pub use hynorec_htm as htm;
