use anyhow::anyhow;
use log::{error, info};

use std::env;
use std::sync::atomic::AtomicBool;
use std::sync::Arc;
use std::thread;
use std::time::Duration;

mod blockchain;

use blockchain::{Blockchain, Miner, Transaction, Wallet};

/// Chain length at which mining stops, unless TARGET_BLOCKS overrides it.
const DEFAULT_TARGET_BLOCKS: usize = 15;

/// Worker thread count, unless MINER_POOL_SIZE overrides it.
const DEFAULT_MINER_POOL_SIZE: usize = 10;

fn env_or(name: &str, default: usize) -> usize {
    env::var(name)
        .ok()
        .and_then(|value| value.parse().ok())
        .unwrap_or(default)
}

fn main() -> anyhow::Result<()> {
    env_logger::init_from_env(env_logger::Env::new().default_filter_or("info"));

    let target_blocks = env_or("TARGET_BLOCKS", DEFAULT_TARGET_BLOCKS);
    let pool_size = env_or("MINER_POOL_SIZE", DEFAULT_MINER_POOL_SIZE);

    info!(
        "Mining until the chain holds {} blocks, with {} workers",
        target_blocks, pool_size
    );

    let chain = Arc::new(Blockchain::new(target_blocks));
    let cancel = Arc::new(AtomicBool::new(false));

    // A handful of miner identities shared round-robin across the pool.
    let wallets: Vec<Arc<Wallet>> = ["miner1", "miner2", "miner7", "miner9"]
        .iter()
        .map(|name| Arc::new(Wallet::new(name)))
        .collect();

    let mut workers = Vec::with_capacity(pool_size);
    for i in 0..pool_size {
        let miner = Miner::new(
            Arc::clone(&chain),
            Arc::clone(&wallets[i % wallets.len()]),
            Arc::clone(&cancel),
        );
        workers.push(thread::spawn(move || miner.run()));
    }

    let feed = {
        let chain = Arc::clone(&chain);
        thread::spawn(move || simulate_transactions(&chain))
    };

    for worker in workers {
        if worker.join().is_err() {
            error!("A miner worker panicked");
        }
    }
    feed.join()
        .map_err(|_| anyhow!("transaction feed thread panicked"))?;

    info!("Final chain length: {}", chain.blocks().len());
    for wallet in &wallets {
        info!(
            "{} balance: {} VC",
            wallet.name(),
            chain.balance_of(wallet.name())
        );
    }
    Ok(())
}

/// Replays a scripted burst of transfers against the ledger while the
/// miners race, exercising the signature and balance checks.
fn simulate_transactions(chain: &Blockchain) {
    let miner100 = Wallet::new("miner100");
    let miner200 = Wallet::new("miner200");
    let nick = Wallet::new("Nick");
    let bob = Wallet::new("Bob");
    let alice = Wallet::new("Alice");
    let car_shop = Wallet::new("CarShop");

    thread::sleep(Duration::from_millis(50));
    chain.add_transaction(Transaction::transfer(&miner100, "miner1", 30));
    chain.add_transaction(Transaction::transfer(&miner100, "miner2", 30));
    chain.add_transaction(Transaction::transfer(&miner100, "Nick", 30));

    thread::sleep(Duration::from_millis(500));
    chain.add_transaction(Transaction::transfer(&miner100, "Bob", 10));
    chain.add_transaction(Transaction::transfer(&miner200, "Alice", 10));

    thread::sleep(Duration::from_millis(20));
    chain.add_transaction(Transaction::transfer(&nick, "ShoesShop", 1));
    chain.add_transaction(Transaction::transfer(&nick, "FastFood", 2));

    thread::sleep(Duration::from_millis(30));
    chain.add_transaction(Transaction::transfer(&nick, "CarShop", 15));
    chain.add_transaction(Transaction::transfer(&miner200, "CarShop", 90));

    thread::sleep(Duration::from_millis(2000));
    chain.add_transaction(Transaction::transfer(&car_shop, "Worker1", 10));
    chain.add_transaction(Transaction::transfer(&car_shop, "Worker2", 10));
    chain.add_transaction(Transaction::transfer(&car_shop, "Worker3", 10));

    thread::sleep(Duration::from_millis(5000));
    chain.add_transaction(Transaction::transfer(&car_shop, "Director1", 30));
    chain.add_transaction(Transaction::transfer(&car_shop, "CarPartsShop", 45));
    chain.add_transaction(Transaction::transfer(&bob, "GamingShop", 5));
    chain.add_transaction(Transaction::transfer(&alice, "BeautyShop", 5));
}
