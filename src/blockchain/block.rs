use chrono::Utc;
use serde::{Deserialize, Serialize};

use std::fmt;

use super::transaction::Transaction;
use super::MINING_REWARD;

/// An immutable block: an ordered batch of transactions plus the
/// proof-of-work metadata produced by the winning miner.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Block {
    /// Position in the chain, 1-based
    pub id: u64,

    /// Creation time, unix milliseconds
    pub timestamp: i64,

    /// Hash of the previous block, or "0" for the first block
    pub previous_hash: String,

    /// This block's own hash (lower-hex SHA-256)
    pub hash: String,

    /// The winning magic number
    pub nonce: u32,

    /// How long the proof-of-work search ran, whole seconds
    pub generation_secs: u64,

    /// Slot 0 is the miner's award by convention
    pub transactions: Vec<Transaction>,

    /// Identity of the miner that found the block
    pub miner: String,
}

impl Block {
    pub fn new(
        id: u64,
        previous_hash: String,
        hash: String,
        nonce: u32,
        generation_secs: u64,
        transactions: Vec<Transaction>,
        miner: String,
    ) -> Self {
        Block {
            id,
            timestamp: Utc::now().timestamp_millis(),
            previous_hash,
            hash,
            nonce,
            generation_secs,
            transactions,
            miner,
        }
    }
}

impl fmt::Display for Block {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "Block:")?;
        writeln!(f, "Created by: {}", self.miner)?;
        writeln!(f, "{} gets {} VC", self.miner, MINING_REWARD)?;
        writeln!(f, "Id: {}", self.id)?;
        writeln!(f, "Timestamp: {}", self.timestamp)?;
        writeln!(f, "Magic number: {}", self.nonce)?;
        writeln!(f, "Hash of the previous block:\n{}", self.previous_hash)?;
        writeln!(f, "Hash of the block:\n{}", self.hash)?;

        writeln!(f, "Block data:")?;
        if self.transactions.len() <= 1 {
            writeln!(f, "No transactions")?;
        } else {
            for tx in &self.transactions[1..] {
                writeln!(f, "{} sent {} VC to {}", tx.sender(), tx.amount(), tx.recipient())?;
            }
        }

        write!(f, "Block was generating for {} seconds", self.generation_secs)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::blockchain::crypto::Wallet;

    #[test]
    fn test_new_block() {
        let transactions = vec![Transaction::award("Alice")];
        let block = Block::new(
            1,
            "0".to_string(),
            "0000abcdef".to_string(),
            42,
            2,
            transactions,
            "Alice".to_string(),
        );

        assert_eq!(block.id, 1);
        assert_eq!(block.previous_hash, "0");
        assert_eq!(block.hash, "0000abcdef");
        assert_eq!(block.nonce, 42);
        assert_eq!(block.generation_secs, 2);
        assert_eq!(block.transactions.len(), 1);
        assert!(block.transactions[0].is_award());
        assert!(block.timestamp > 0);
    }

    #[test]
    fn test_display_without_transfers() {
        let block = Block::new(
            1,
            "0".to_string(),
            "0000abcdef".to_string(),
            42,
            10,
            vec![Transaction::award("Alice")],
            "Alice".to_string(),
        );

        let rendered = block.to_string();
        assert!(rendered.contains("Alice gets 100 VC"));
        assert!(rendered.contains("No transactions"));
        assert!(rendered.contains("Block was generating for 10 seconds"));
    }

    #[test]
    fn test_display_with_transfers() {
        let alice = Wallet::new("Alice");
        let charlie = Wallet::new("Charlie");

        let transactions = vec![
            Transaction::award("Bob"),
            Transaction::transfer(&alice, "Charlie", 50),
            Transaction::transfer(&charlie, "Dave", 30),
        ];

        let block = Block::new(
            2,
            "abcdef1234567890".to_string(),
            "123456abcdef7890".to_string(),
            123,
            15,
            transactions,
            "Bob".to_string(),
        );

        let rendered = block.to_string();
        assert!(rendered.contains("Bob gets 100 VC"));
        assert!(rendered.contains("Alice sent 50 VC to Charlie"));
        assert!(rendered.contains("Charlie sent 30 VC to Dave"));
    }
}
