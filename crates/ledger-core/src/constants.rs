pub const HASH_SIZE: usize = 32;
pub const HASH_HEX_SIZE: usize = HASH_SIZE * 2;

/// Sender of block-reward transactions. Not a spendable account.
pub const COINBASE_SENDER: &str = "0";
/// Signature carried by reward transactions in place of a real one.
pub const COINBASE_SIGNATURE: &str = "0";

pub const GENESIS_PREVIOUS_HASH: &str = "0";
pub const GENESIS_TX_HASH: &str = "0";
pub const GENESIS_AMOUNT: u64 = 50;
pub const GENESIS_ADDRESS: &str = "0442c0fe0050d53426395a046e3c4e6216189666544005567b0b3ed3dcf0151a1ac5b926bdfe93f15ecea3230951ed4151dadab28f2906d0052febea1b7453ce6f";

pub const POW_TARGET_DIFFICULTY: usize = 4;
pub const INITIAL_BLOCK_REWARD: u64 = 50;
pub const HALVING_INTERVAL: u64 = 1000;
pub const MEMPOOL_CAPACITY: usize = 10_000;
