// Blockchain module
//
// Core of the proof-of-work ledger simulator:
// - Transaction and Block structures
// - Blockchain state machine (chain, pending pool, difficulty, target flag)
// - Miner worker loop
// - Cryptography utilities (wallets, signatures, hashing)

pub mod block;
pub mod chain;
pub mod crypto;
pub mod miner;
pub mod transaction;

// Re-export main components for easier access
pub use block::Block;
pub use chain::Blockchain;
pub use crypto::Wallet;
pub use miner::Miner;
pub use transaction::Transaction;

/// Reserved sender identity of miner awards; its balance is unbounded.
pub const LEDGER_IDENTITY: &str = "BLOCKCHAIN";

/// Reward paid to the miner of every accepted block, in VC.
pub const MINING_REWARD: u64 = 100;

/// Balance every ordinary identity starts from, in VC.
pub const DEFAULT_BALANCE: i64 = 100;

/// Previous-hash sentinel carried by the first block.
pub const EMPTY_CHAIN_HASH: &str = "0";
