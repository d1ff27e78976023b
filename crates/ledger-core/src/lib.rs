//! Proof-of-work ledger engine.
//!
//! Builds, validates and extends a chain of value-transfer blocks, resolves
//! forks by length and mines new blocks out of a pool of pending
//! transactions.

use serde::{Deserialize, Serialize};

pub mod chain;
pub mod config;
pub mod constants;
pub mod crypto;
pub mod error;
pub mod hash;
pub mod ledger;
pub mod mine;
pub mod pool;
pub mod reward;
pub mod store;
pub mod validator;

#[cfg(test)]
mod testing;

pub use chain::{genesis_block, ChainStore};
pub use config::ChainConfig;
pub use crypto::{Secp256k1Verifier, SignatureVerifier};
pub use error::{ChainError, TransactionFault, ValidationError};
pub use ledger::{Balance, Ledger};
pub use mine::Miner;
pub use pool::{Mempool, MempoolError, UnconfirmedPool};
pub use reward::{HalvingSchedule, RewardSchedule};
pub use store::BlockStore;
pub use validator::ChainValidator;

use constants::{COINBASE_SENDER, COINBASE_SIGNATURE};

/// A transfer of `amount` from one address to another.
///
/// `hash` is derived from the other five fields and is re-checked wherever a
/// transaction crosses the trust boundary.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Transaction {
    pub from: String,
    pub to: String,
    pub amount: u64,
    pub timestamp: u64,
    pub signature: String,
    pub hash: String,
}

impl Transaction {
    /// Build a transaction with its hash filled in.
    pub fn new(
        from: impl Into<String>,
        to: impl Into<String>,
        amount: u64,
        timestamp: u64,
        signature: impl Into<String>,
    ) -> Self {
        let mut tx = Self {
            from: from.into(),
            to: to.into(),
            amount,
            timestamp,
            signature: signature.into(),
            hash: String::new(),
        };
        tx.hash = tx.compute_hash();
        tx
    }

    /// Block-reward transaction paying `amount` to `to`.
    pub fn reward(to: impl Into<String>, amount: u64, timestamp: u64) -> Self {
        Self::new(COINBASE_SENDER, to, amount, timestamp, COINBASE_SIGNATURE)
    }

    pub fn is_reward(&self) -> bool {
        self.from == COINBASE_SENDER
    }

    pub fn compute_hash(&self) -> String {
        hash::transaction_hash(
            &self.from,
            &self.to,
            self.amount,
            self.timestamp,
            &self.signature,
        )
    }

    pub fn has_valid_hash(&self) -> bool {
        self.compute_hash() == self.hash
    }

    /// The message a sender signs: `"{from}:{to}:{amount}:{timestamp}"`.
    pub fn signing_message(&self) -> String {
        signing_message(&self.from, &self.to, self.amount, self.timestamp)
    }
}

pub fn signing_message(from: &str, to: &str, amount: u64, timestamp: u64) -> String {
    format!("{from}:{to}:{amount}:{timestamp}")
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Block {
    pub index: u64,
    pub transactions: Vec<Transaction>,
    pub previous_hash: String,
    pub current_hash: String,
    pub timestamp: u64,
    pub nonce: u64,
}

impl Block {
    /// Assemble a block whose `current_hash` matches its contents. Whether
    /// the hash satisfies the difficulty is left to validation.
    pub fn new(
        index: u64,
        transactions: Vec<Transaction>,
        previous_hash: impl Into<String>,
        timestamp: u64,
        nonce: u64,
    ) -> Self {
        let previous_hash = previous_hash.into();
        let current_hash = hash::block_hash(index, &previous_hash, timestamp, &transactions, nonce);
        Self {
            index,
            transactions,
            previous_hash,
            current_hash,
            timestamp,
            nonce,
        }
    }

    pub fn compute_hash(&self) -> String {
        hash::block_hash(
            self.index,
            &self.previous_hash,
            self.timestamp,
            &self.transactions,
            self.nonce,
        )
    }
}
