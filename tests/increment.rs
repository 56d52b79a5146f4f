//! Lost-update check: N threads of M read-modify-write increments on one
//! shared word must land exactly N * M.

use crossbeam_utils::thread;
use hynorec::{barrier::SpinBarrier, thread_key, tword::TWord};

#[test]
fn contended_increments_are_not_lost() {
    const THREADS: usize = 8;
    const INCREMENTS: usize = 10_000;

    let counter = TWord::new(0);
    let start = SpinBarrier::new(THREADS);

    thread::scope(|s| {
        for _ in 0..THREADS {
            s.spawn(|_| {
                let key = thread_key::get();
                start.wait();
                for _ in 0..INCREMENTS {
                    key.run(|tx| {
                        let value = counter.get(tx)?;
                        counter.set(tx, value + 1)?;
                        Ok(())
                    });
                }
            });
        }
    })
    .unwrap();

    assert_eq!(counter.into_inner(), THREADS * INCREMENTS);
}

#[test]
fn read_only_transactions_see_committed_state() {
    const THREADS: usize = 4;
    const ROUNDS: usize = 5_000;

    let word = TWord::new(0);
    let start = SpinBarrier::new(THREADS + 1);

    thread::scope(|s| {
        for _ in 0..THREADS {
            s.spawn(|_| {
                let key = thread_key::get();
                start.wait();
                for _ in 0..ROUNDS {
                    key.run(|tx| {
                        let value = word.get(tx)?;
                        word.set(tx, value + 1)?;
                        Ok(())
                    });
                }
            });
        }
        s.spawn(|_| {
            let key = thread_key::get();
            start.wait();
            let mut last = 0;
            for _ in 0..ROUNDS {
                let seen = key.run(|tx| word.get(tx));
                // committed state never runs backwards
                assert!(seen >= last, "read-only view went backwards");
                last = seen;
            }
            assert!(last <= THREADS * ROUNDS);
        });
    })
    .unwrap();

    assert_eq!(word.into_inner(), THREADS * ROUNDS);
}
