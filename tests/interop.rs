//! Mode parity: the hybrid dispatcher and the forced-software dispatcher
//! must produce identical final states for the same deterministic workload.

use hynorec::{
    thread_key,
    tword::TWord,
    tx::{Error, Tx},
};
use rand::{rngs::StdRng, Rng, SeedableRng};

const NUM_ACCTS: usize = 64;
const INIT_BALANCE: usize = 500;
const TRANSFER_AMT: usize = 25;
const TXNS: usize = 5_000;

fn transfer_txn<'tword>(
    accounts: &'tword [TWord],
    from: usize,
    to: usize,
    tx: &mut Tx<'tword>,
) -> Result<(), Error> {
    let src = accounts[from].get(tx)?;
    if src >= TRANSFER_AMT {
        let dst = accounts[to].get(tx)?;
        accounts[from].set(tx, src - TRANSFER_AMT)?;
        accounts[to].set(tx, dst + TRANSFER_AMT)?;
    }
    Ok(())
}

fn final_state(software_only: bool) -> Vec<usize> {
    let accounts: Vec<TWord> = (0..NUM_ACCTS).map(|_| TWord::new(INIT_BALANCE)).collect();
    let key = thread_key::get();
    let mut rng = StdRng::seed_from_u64(42);
    for _ in 0..TXNS {
        let from = rng.gen_range(0..NUM_ACCTS);
        let to = (from + 1 + rng.gen_range(0..NUM_ACCTS - 1)) % NUM_ACCTS;
        if software_only {
            key.run_software(|tx| transfer_txn(&accounts, from, to, tx));
        } else {
            key.run(|tx| transfer_txn(&accounts, from, to, tx));
        }
    }
    accounts
        .into_iter()
        .map(TWord::into_inner)
        .collect()
}

#[test]
fn hybrid_and_software_modes_agree() {
    let hybrid = final_state(false);
    let software = final_state(true);
    assert_eq!(hybrid, software);
    let total: usize = software.iter().sum();
    assert_eq!(total, NUM_ACCTS * INIT_BALANCE);
}
