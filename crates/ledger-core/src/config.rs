use crate::constants::{GENESIS_ADDRESS, GENESIS_AMOUNT, POW_TARGET_DIFFICULTY};
use serde::{Deserialize, Serialize};

/// Consensus parameters every node on a chain must agree on.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChainConfig {
    /// Number of leading `'0'` hex characters a block hash needs.
    pub difficulty: usize,
    /// Recipient of the genesis seed transaction.
    pub genesis_address: String,
    pub genesis_amount: u64,
}

impl Default for ChainConfig {
    fn default() -> Self {
        Self {
            difficulty: POW_TARGET_DIFFICULTY,
            genesis_address: GENESIS_ADDRESS.to_string(),
            genesis_amount: GENESIS_AMOUNT,
        }
    }
}

impl ChainConfig {
    pub fn with_difficulty(mut self, difficulty: usize) -> Self {
        self.difficulty = difficulty;
        self
    }

    pub fn with_genesis_address(mut self, address: impl Into<String>) -> Self {
        self.genesis_address = address.into();
        self
    }
}
