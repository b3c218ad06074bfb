use serde::{Deserialize, Serialize};

use std::fmt;
use std::sync::atomic::{AtomicU64, Ordering};

use super::crypto::{
    decode_public_key, encode_public_key, verify_signature, DigitalSignature, Wallet,
};
use super::{LEDGER_IDENTITY, MINING_REWARD};

/// Global transaction id source, shared by every wallet in the process.
static NEXT_TX_ID: AtomicU64 = AtomicU64::new(1);

fn next_transaction_id() -> u64 {
    NEXT_TX_ID.fetch_add(1, Ordering::SeqCst)
}

/// A value transfer recorded on the chain.
///
/// `Award` is the reward the ledger pays the miner of an accepted block; it
/// originates from the reserved ledger identity and carries no signature.
/// `Transfer` is an ordinary signed transfer between named identities.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum Transaction {
    Award {
        recipient: String,
        amount: u64,
    },
    Transfer {
        sender: String,
        recipient: String,
        amount: u64,
        id: u64,
        signature: DigitalSignature,
        /// Signer's verifying key, base58
        public_key: String,
    },
}

/// The exact byte sequence wallets sign: sender, recipient, amount and
/// transaction id concatenated as decimal strings.
fn signing_message(sender: &str, recipient: &str, amount: u64, id: u64) -> String {
    format!("{}{}{}{}", sender, recipient, amount, id)
}

impl Transaction {
    /// Builds a signed transfer from `wallet` to `recipient`, drawing the
    /// next global transaction id.
    pub fn transfer(wallet: &Wallet, recipient: &str, amount: u64) -> Self {
        let id = next_transaction_id();
        let message = signing_message(wallet.name(), recipient, amount, id);
        let signature = wallet.sign(message.as_bytes());

        Transaction::Transfer {
            sender: wallet.name().to_string(),
            recipient: recipient.to_string(),
            amount,
            id,
            signature,
            public_key: encode_public_key(wallet.public_key()),
        }
    }

    /// Builds the miner reward paid out of the reserved ledger identity.
    pub fn award(recipient: &str) -> Self {
        Transaction::Award {
            recipient: recipient.to_string(),
            amount: MINING_REWARD,
        }
    }

    pub fn sender(&self) -> &str {
        match self {
            Transaction::Award { .. } => LEDGER_IDENTITY,
            Transaction::Transfer { sender, .. } => sender,
        }
    }

    pub fn recipient(&self) -> &str {
        match self {
            Transaction::Award { recipient, .. } => recipient,
            Transaction::Transfer { recipient, .. } => recipient,
        }
    }

    pub fn amount(&self) -> u64 {
        match self {
            Transaction::Award { amount, .. } => *amount,
            Transaction::Transfer { amount, .. } => *amount,
        }
    }

    pub fn id(&self) -> u64 {
        match self {
            Transaction::Award { .. } => 0,
            Transaction::Transfer { id, .. } => *id,
        }
    }

    pub fn is_award(&self) -> bool {
        matches!(self, Transaction::Award { .. })
    }

    /// Signature check with the contract every validation site relies on:
    /// returns `false` when the attached signature cryptographically
    /// verifies, `true` when verification fails or cannot be attempted,
    /// and always `false` for award transactions. A non-award transaction
    /// is rejected when this returns `true`.
    pub fn is_signature_valid(&self) -> bool {
        match self {
            Transaction::Award { .. } => false,
            Transaction::Transfer {
                sender,
                recipient,
                amount,
                id,
                signature,
                public_key,
            } => {
                let message = signing_message(sender, recipient, *amount, *id);
                match decode_public_key(public_key)
                    .and_then(|key| verify_signature(message.as_bytes(), signature, &key))
                {
                    Ok(verified) => !verified,
                    Err(_) => true,
                }
            }
        }
    }
}

impl fmt::Display for Transaction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Transaction::Award { recipient, amount } => {
                write!(f, "[Tx#0] {} -> {} : {}", LEDGER_IDENTITY, recipient, amount)
            }
            Transaction::Transfer {
                sender,
                recipient,
                amount,
                id,
                signature,
                ..
            } => {
                write!(
                    f,
                    "[Tx#{}] {} -> {} : {} (sig={})",
                    id, sender, recipient, amount, signature
                )
            }
        }
    }
}
