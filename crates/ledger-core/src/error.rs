use crate::constants::HASH_HEX_SIZE;
use thiserror::Error;

/// Why a block was refused. The four kinds are the acceptance stages, in the
/// order they are checked.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ValidationError {
    #[error("index-0 block differs from the canonical genesis block")]
    GenesisMismatch,

    #[error("block hash {stored} does not match its contents or the difficulty")]
    InvalidHash { stored: String },

    #[error("block {index} does not extend the tip (expected index {expected_index})")]
    ChainContinuity { index: u64, expected_index: u64 },

    #[error("invalid transactions: {0}")]
    InvalidTransactions(#[from] TransactionFault),
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum TransactionFault {
    #[error("transaction hash mismatch for {0}")]
    HashMismatch(String),

    #[error("transaction {hash} already included in block {block}")]
    Duplicate { hash: String, block: u64 },

    #[error("transaction {0} appears twice in the block")]
    DuplicateInBlock(String),

    #[error("signature verification failed for {0}")]
    InvalidSignature(String),

    #[error("{address} spends {spent} but holds {available}")]
    InsufficientBalance {
        address: String,
        spent: u128,
        available: i128,
    },

    #[error("block has no reward transaction")]
    MissingReward,

    #[error("block has more than one reward transaction")]
    MultipleRewards,

    #[error("reward of {got} does not match the schedule ({expected})")]
    WrongRewardAmount { expected: u64, got: u64 },

    #[error("reward transaction claims sender {0}")]
    MisattributedReward(String),

    #[error("reward transaction {0} carries a signature")]
    SignedReward(String),
}

#[derive(Debug, Error)]
pub enum ChainError {
    #[error("chain is empty")]
    EmptyChain,

    #[error("block {index} rejected: {source}")]
    Rejected {
        index: u64,
        #[source]
        source: ValidationError,
    },

    #[error("difficulty {0} exceeds the {max} hex characters of a block hash", max = HASH_HEX_SIZE)]
    DifficultyTooHigh(usize),

    /// The block was valid but could not be written to the attached store;
    /// the in-memory chain was left unchanged.
    #[error(transparent)]
    Persistence(#[from] anyhow::Error),
}
