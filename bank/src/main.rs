//! Bank-transfer benchmark for the hybrid NOrec runtime.
//!
//! N worker threads hammer a shared array of accounts with small transfer
//! transactions. Each thread reports how many of its transactions committed
//! on the hardware path versus the software fallback, and the aggregate
//! balance is audited before and after: transfers conserve money, so any
//! drift is a serialization bug.

use clap::Parser;
use crossbeam_utils::thread;
use hynorec::{barrier::SpinBarrier, stats::TxStats, thread_key, tword::TWord};
use rand::{rngs::StdRng, Rng, SeedableRng};
use std::time::Instant;
use tracing::info;
use tracing_subscriber::EnvFilter;

const NUM_ACCTS: usize = 1_000;
const NUM_TXN: usize = 100_000;
const INIT_BALANCE: usize = 1_000;
const TRANSFER_AMT: usize = 50;
const TRANSFERS_PER_TXN: usize = 10;

#[derive(Parser, Debug)]
#[command(about = "Hybrid NOrec bank-transfer benchmark")]
struct Args {
    /// Number of worker threads
    #[arg(value_parser = clap::value_parser!(u32).range(1..=64))]
    threads: u32,
}

/// Two distinct account indices.
fn pick_accounts(rng: &mut StdRng) -> (usize, usize) {
    let from = rng.gen_range(0..NUM_ACCTS);
    loop {
        let to = rng.gen_range(0..NUM_ACCTS);
        if to != from {
            return (from, to);
        }
    }
}

fn worker(id: usize, threads: usize, accounts: &[TWord], start: &SpinBarrier) -> TxStats {
    let key = thread_key::get();
    let mut rng = StdRng::seed_from_u64(id as u64 + 1);
    start.wait();

    let workload = NUM_TXN / threads;
    for _ in 0..workload {
        // draw the whole transaction up front; retries must replay the
        // same transfers, not new ones
        let mut transfers = [(0usize, 0usize); TRANSFERS_PER_TXN];
        for pair in transfers.iter_mut() {
            *pair = pick_accounts(&mut rng);
        }
        key.run(|tx| {
            for &(from, to) in transfers.iter() {
                let src = accounts[from].get(tx)?;
                if src < TRANSFER_AMT {
                    break;
                }
                let dst = accounts[to].get(tx)?;
                accounts[from].set(tx, src - TRANSFER_AMT)?;
                accounts[to].set(tx, dst + TRANSFER_AMT)?;
            }
            Ok(())
        });
    }
    key.stats()
}

fn total_balance(accounts: &mut [TWord]) -> usize {
    accounts.iter_mut().map(|account| *account.get_mut()).sum()
}

fn main() {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .init();

    let args = Args::parse();
    let threads = args.threads as usize;
    info!(
        threads,
        accounts = NUM_ACCTS,
        transactions = NUM_TXN,
        htm = hynorec::htm::htm_supported(),
        "bank benchmark starting"
    );

    let mut accounts: Vec<TWord> = (0..NUM_ACCTS).map(|_| TWord::new(INIT_BALANCE)).collect();
    let balance_before = total_balance(&mut accounts);

    let start = SpinBarrier::new(threads);
    let clock = Instant::now();

    let per_thread = thread::scope(|s| {
        let handles: Vec<_> = (0..threads)
            .map(|id| {
                let accounts = &accounts;
                let start = &start;
                s.spawn(move |_| worker(id, threads, accounts, start))
            })
            .collect();
        handles
            .into_iter()
            .map(|handle| handle.join().expect("worker thread panicked"))
            .collect::<Vec<_>>()
    })
    .expect("worker scope panicked");

    let elapsed = clock.elapsed();

    for (id, stats) in per_thread.iter().enumerate() {
        println!(
            "thread {:>2}  hardware {:>8}  software {:>8}  total {:>8}",
            id,
            stats.hw_commits,
            stats.sw_commits,
            stats.commits()
        );
    }
    let committed: u64 = per_thread.iter().map(TxStats::commits).sum();

    let balance_after = total_balance(&mut accounts);
    println!("total time = {} ns", elapsed.as_nanos());
    println!("transactions committed: {}", committed);
    println!("total balance before: {}", balance_before);
    println!("total balance after:  {}", balance_after);
    assert_eq!(
        balance_before, balance_after,
        "transfers leaked money; serialization is broken"
    );
}
