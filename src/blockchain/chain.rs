use log::{info, warn};

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Mutex;

use super::block::Block;
use super::transaction::Transaction;
use super::{DEFAULT_BALANCE, EMPTY_CHAIN_HASH, LEDGER_IDENTITY};

/// Everything the ledger may mutate, behind a single lock so that one
/// logical state transition is visible at a time. Balance recomputation,
/// candidate validation and appends all observe the same snapshot.
#[derive(Debug, Default)]
struct ChainState {
    chain: Vec<Block>,
    pending: Vec<Transaction>,
    difficulty: i32,
}

/// The shared ledger: append-only chain, pending-transaction pool and
/// self-adjusting difficulty. The sole arbiter of candidate validity.
///
/// Invalid input never raises; rejections are logged no-ops.
#[derive(Debug)]
pub struct Blockchain {
    state: Mutex<ChainState>,
    target_blocks: usize,
    /// Monotone completion flag, polled lock-free by the search loops.
    target_reached: AtomicBool,
}

impl Blockchain {
    /// Creates an empty ledger that stops accepting blocks once the chain
    /// holds `target_blocks` of them.
    pub fn new(target_blocks: usize) -> Self {
        Blockchain {
            state: Mutex::new(ChainState::default()),
            target_blocks,
            target_reached: AtomicBool::new(false),
        }
    }

    /// Id the next appended block must carry (chain length + 1).
    pub fn next_block_id(&self) -> u64 {
        let state = self.state.lock().unwrap();
        state.chain.len() as u64 + 1
    }

    /// Required count of leading zero characters in a block hash.
    pub fn difficulty(&self) -> i32 {
        self.state.lock().unwrap().difficulty
    }

    /// Whether the target block count has been reached. Once true it never
    /// resets, and no further block is ever appended.
    pub fn has_reached_target(&self) -> bool {
        self.target_reached.load(Ordering::SeqCst)
    }

    /// Hash of the tip block, or "0" while the chain is empty.
    pub fn last_hash(&self) -> String {
        let state = self.state.lock().unwrap();
        state
            .chain
            .last()
            .map(|block| block.hash.clone())
            .unwrap_or_else(|| EMPTY_CHAIN_HASH.to_string())
    }

    /// Validates `block` against the current chain state and appends it on
    /// success, removing its transactions from the pending pool and
    /// retargeting the difficulty from its generation time. A candidate
    /// that fails validation is discarded with a diagnostic; a candidate
    /// arriving after the target was reached is silently ignored.
    ///
    /// Only one candidate can win a given chain position: later candidates
    /// for the same position fail the previous-hash check.
    pub fn add_block(&self, block: Block) {
        let mut state = self.state.lock().unwrap();

        if self.has_reached_target() {
            return;
        }

        if !Self::is_valid_block(&state, &block) {
            return;
        }

        state.pending.retain(|tx| !block.transactions.contains(tx));
        info!("{}", block);

        let generation_secs = block.generation_secs;
        state.chain.push(block);
        Self::retarget(&mut state, generation_secs);

        if state.chain.len() >= self.target_blocks {
            self.target_reached.store(true, Ordering::SeqCst);
            info!(
                "Target of {} blocks reached, miners will stop",
                self.target_blocks
            );
        }
    }

    fn is_valid_block(state: &ChainState, block: &Block) -> bool {
        let prefix = "0".repeat(state.difficulty.max(0) as usize);
        if !block.hash.starts_with(&prefix) {
            warn!(
                "Rejected block {}: hash does not meet difficulty {}",
                block.id, state.difficulty
            );
            return false;
        }

        match state.chain.last() {
            None => {
                if block.previous_hash != EMPTY_CHAIN_HASH {
                    warn!("Rejected block {}: previous hash is not \"0\"", block.id);
                    return false;
                }
            }
            Some(tip) => {
                if tip.hash != block.previous_hash {
                    warn!("Rejected block {}: stale previous hash", block.id);
                    return false;
                }
            }
        }

        for tx in &block.transactions {
            if !tx.is_award() && tx.is_signature_valid() {
                warn!("Invalid signature for transaction: {}", tx);
                return false;
            }
        }

        true
    }

    /// Deterministic retarget rule: under a second means the search was too
    /// easy (difficulty +1), over five seconds too hard (difficulty -1,
    /// never below 0), anything in between leaves it unchanged.
    pub fn adjust_difficulty(&self, generation_secs: u64) {
        let mut state = self.state.lock().unwrap();
        Self::retarget(&mut state, generation_secs);
    }

    fn retarget(state: &mut ChainState, generation_secs: u64) {
        if generation_secs < 1 {
            state.difficulty += 1;
            info!("N was increased to {}", state.difficulty);
        } else if generation_secs > 5 {
            state.difficulty = (state.difficulty - 1).max(0);
            info!("N was decreased to {}", state.difficulty);
        } else {
            info!("N stays the same ({})", state.difficulty);
        }
    }

    /// Enqueues a transaction into the pending pool. Transfers with a
    /// failing signature check or an insufficient sender balance are
    /// rejected as logged no-ops; awards bypass both checks.
    pub fn add_transaction(&self, transaction: Transaction) {
        let mut state = self.state.lock().unwrap();

        if !transaction.is_award() {
            if transaction.is_signature_valid() {
                warn!("Rejected invalid signature for transaction: {}", transaction);
                return;
            }
            let sender_balance = Self::balance(&state, transaction.sender());
            // Compare in the unsigned domain: amounts above i64::MAX must
            // not slip past the check as negative values.
            if sender_balance < 0 || (sender_balance as u64) < transaction.amount() {
                warn!("Rejected transaction (insufficient funds): {}", transaction);
                return;
            }
        }

        state.pending.push(transaction);
    }

    /// Point-in-time snapshot of the pending pool with a fresh award to
    /// `miner` at slot 0, ready to be folded into a candidate block.
    pub fn collect_transactions_for_new_block(&self, miner: &str) -> Vec<Transaction> {
        let state = self.state.lock().unwrap();
        let mut transactions = state.pending.clone();
        transactions.insert(0, Transaction::award(miner));
        transactions
    }

    /// Balance of `identity`, recomputed from the full block history on
    /// every read; there is no cached balance index. The reserved ledger
    /// identity reports an unbounded balance.
    pub fn balance_of(&self, identity: &str) -> i64 {
        let state = self.state.lock().unwrap();
        Self::balance(&state, identity)
    }

    fn balance(state: &ChainState, identity: &str) -> i64 {
        if identity == LEDGER_IDENTITY {
            return i64::MAX;
        }

        let mut balance = DEFAULT_BALANCE;
        for block in &state.chain {
            for tx in &block.transactions {
                if tx.sender() == identity {
                    balance = balance.saturating_sub_unsigned(tx.amount());
                }
                if tx.recipient() == identity {
                    balance = balance.saturating_add_unsigned(tx.amount());
                }
            }
        }
        balance
    }

    /// Snapshot of the appended chain, in insertion order.
    pub fn blocks(&self) -> Vec<Block> {
        self.state.lock().unwrap().chain.clone()
    }

    /// Snapshot of the pending pool.
    pub fn pending_transactions(&self) -> Vec<Transaction> {
        self.state.lock().unwrap().pending.clone()
    }
}
