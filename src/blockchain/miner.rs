use log::error;
use rand::Rng;
use thiserror::Error;

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Instant;

use super::block::Block;
use super::chain::Blockchain;
use super::crypto::{sha256_hex, Wallet};

/// Faults fatal to a single worker; the ledger and the other workers are
/// unaffected.
#[derive(Debug, Error)]
pub enum MinerError {
    #[error("Invalid difficulty level: {0}")]
    InvalidDifficulty(i32),

    #[error("Failed to serialize transactions: {0}")]
    Serialize(#[from] serde_json::Error),
}

/// A proof-of-work worker. Each loop iteration pulls fresh chain state,
/// searches for a nonce meeting the difficulty, and submits the candidate
/// back to the ledger. Losing the race to another worker just means
/// re-reading the tip and searching again.
pub struct Miner {
    blockchain: Arc<Blockchain>,
    wallet: Arc<Wallet>,
    cancel: Arc<AtomicBool>,
}

impl Miner {
    pub fn new(blockchain: Arc<Blockchain>, wallet: Arc<Wallet>, cancel: Arc<AtomicBool>) -> Self {
        Miner {
            blockchain,
            wallet,
            cancel,
        }
    }

    /// Runs the worker until the ledger reaches its block target or the
    /// cancellation flag is raised. A configuration fault stops only this
    /// worker, with a diagnostic.
    pub fn run(&self) {
        if let Err(err) = self.mine() {
            error!("Mining failed: {}", err);
        }
    }

    fn mine(&self) -> Result<(), MinerError> {
        let mut rng = rand::thread_rng();

        while !self.blockchain.has_reached_target() && !self.cancelled() {
            let id = self.blockchain.next_block_id();
            let previous_hash = self.blockchain.last_hash();
            let transactions = self
                .blockchain
                .collect_transactions_for_new_block(self.wallet.name());
            let serialized = serde_json::to_string(&transactions)?;

            let started = Instant::now();
            let (nonce, hash) = loop {
                if self.cancelled() {
                    return Ok(());
                }

                // The ledger floors difficulty at zero; a negative reading
                // means corrupted state and stops this worker only.
                let difficulty = self.blockchain.difficulty();
                if difficulty < 0 {
                    return Err(MinerError::InvalidDifficulty(difficulty));
                }

                let nonce: u32 = rng.gen();
                let data = format!("{}{}{}{}", id, previous_hash, nonce, serialized);
                let hash = sha256_hex(&data);

                if hash.starts_with(&"0".repeat(difficulty as usize)) {
                    break (nonce, hash);
                }
                if self.blockchain.has_reached_target() {
                    return Ok(());
                }
            };

            let generation_secs = started.elapsed().as_secs();

            // Another worker may have finished the chain during the search.
            if self.blockchain.has_reached_target() {
                return Ok(());
            }

            let block = Block::new(
                id,
                previous_hash,
                hash,
                nonce,
                generation_secs,
                transactions,
                self.wallet.name().to_string(),
            );
            self.blockchain.add_block(block);
        }

        Ok(())
    }

    fn cancelled(&self) -> bool {
        self.cancel.load(Ordering::SeqCst)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::blockchain::transaction::Transaction;
    use std::thread;

    fn worker(
        blockchain: &Arc<Blockchain>,
        cancel: &Arc<AtomicBool>,
        name: &str,
    ) -> thread::JoinHandle<()> {
        let miner = Miner::new(
            Arc::clone(blockchain),
            Arc::new(Wallet::new(name)),
            Arc::clone(cancel),
        );
        thread::spawn(move || miner.run())
    }

    #[test]
    fn test_invalid_difficulty_error_display() {
        let err = MinerError::InvalidDifficulty(-1);
        assert_eq!(err.to_string(), "Invalid difficulty level: -1");
    }

    #[test]
    fn test_cancelled_miner_appends_nothing() {
        let blockchain = Arc::new(Blockchain::new(3));
        let cancel = Arc::new(AtomicBool::new(true));

        let handle = worker(&blockchain, &cancel, "Miner2");
        handle.join().unwrap();

        assert!(blockchain.blocks().is_empty());
    }

    #[test]
    fn test_miner_skips_mining_when_target_reached() {
        let blockchain = Arc::new(Blockchain::new(1));
        blockchain.add_block(Block::new(
            1,
            "0".to_string(),
            "0000validhash".to_string(),
            1,
            2,
            vec![Transaction::award("Alice")],
            "Alice".to_string(),
        ));
        assert!(blockchain.has_reached_target());

        let cancel = Arc::new(AtomicBool::new(false));
        let handle = worker(&blockchain, &cancel, "Miner1");
        handle.join().unwrap();

        assert_eq!(blockchain.blocks().len(), 1);
    }

    #[test]
    fn test_racing_workers_build_exactly_the_target() {
        let target = 3;
        let blockchain = Arc::new(Blockchain::new(target));
        let cancel = Arc::new(AtomicBool::new(false));

        let handles: Vec<_> = (0..4)
            .map(|i| worker(&blockchain, &cancel, &format!("miner{}", i)))
            .collect();
        for handle in handles {
            handle.join().unwrap();
        }

        assert!(blockchain.has_reached_target());

        let blocks = blockchain.blocks();
        assert_eq!(blocks.len(), target);

        let mut previous_hash = "0".to_string();
        for (i, block) in blocks.iter().enumerate() {
            assert_eq!(block.id, i as u64 + 1);
            assert_eq!(block.previous_hash, previous_hash);
            assert!(block.transactions[0].is_award());
            assert_eq!(block.transactions[0].recipient(), block.miner);
            previous_hash = block.hash.clone();
        }
    }

    #[test]
    fn test_mined_blocks_carry_pending_transfers() {
        let blockchain = Arc::new(Blockchain::new(1));
        let alice = Wallet::new("Alice");
        let tx = Transaction::transfer(&alice, "Bob", 25);
        blockchain.add_transaction(tx.clone());

        let cancel = Arc::new(AtomicBool::new(false));
        let handle = worker(&blockchain, &cancel, "Miner1");
        handle.join().unwrap();

        let blocks = blockchain.blocks();
        assert_eq!(blocks.len(), 1);
        assert!(blocks[0].transactions.contains(&tx));
        assert!(blockchain.pending_transactions().is_empty());
        assert_eq!(blockchain.balance_of("Bob"), 125);
    }
}
