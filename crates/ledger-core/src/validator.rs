//! Block acceptance rules.
//!
//! A block is checked in four stages, stopping at the first failure:
//! genesis equality (index 0 only), hash and difficulty, continuity with the
//! current tip, then transactions and the block reward. Passing validation
//! does not append anything.

use crate::{
    chain::genesis_block,
    config::ChainConfig,
    constants::COINBASE_SIGNATURE,
    crypto::SignatureVerifier,
    error::{TransactionFault, ValidationError},
    hash::meets_difficulty,
    ledger::{Balance, Ledger},
    reward::RewardSchedule,
    Block, Transaction,
};
use std::collections::{BTreeMap, HashSet};

/// Validates candidate blocks against the chain held in `blocks`, whose last
/// element is the tip the candidate must extend.
pub struct ChainValidator<'a> {
    ledger: Ledger<'a>,
    config: &'a ChainConfig,
    verifier: &'a dyn SignatureVerifier,
    rewards: &'a dyn RewardSchedule,
}

impl<'a> ChainValidator<'a> {
    pub fn new(
        blocks: &'a [Block],
        config: &'a ChainConfig,
        verifier: &'a dyn SignatureVerifier,
        rewards: &'a dyn RewardSchedule,
    ) -> Self {
        Self {
            ledger: Ledger::new(blocks),
            config,
            verifier,
            rewards,
        }
    }

    pub fn validate_block(&self, block: &Block) -> Result<(), ValidationError> {
        if block.index == 0 {
            return if *block == genesis_block(self.config) {
                Ok(())
            } else {
                Err(ValidationError::GenesisMismatch)
            };
        }
        if !self.check_hash_and_pattern(block) {
            return Err(ValidationError::InvalidHash {
                stored: block.current_hash.clone(),
            });
        }
        if !self.check_index_and_previous_hash(block) {
            return Err(ValidationError::ChainContinuity {
                index: block.index,
                expected_index: self.ledger.tip().map_or(0, |tip| tip.index + 1),
            });
        }
        self.check_transactions_and_reward(block)?;
        Ok(())
    }

    pub fn check_hash_and_pattern(&self, block: &Block) -> bool {
        block.compute_hash() == block.current_hash
            && meets_difficulty(&block.current_hash, self.config.difficulty)
    }

    pub fn check_index_and_previous_hash(&self, block: &Block) -> bool {
        match self.ledger.tip() {
            Some(tip) => {
                block.index == tip.index + 1 && block.previous_hash == tip.current_hash
            }
            None => false,
        }
    }

    /// Checks a transfer the way both validation and mining do: hash,
    /// replay against earlier blocks, then signature.
    pub fn check_transfer(&self, tx: &Transaction, block_index: u64) -> Result<(), TransactionFault> {
        if !tx.has_valid_hash() {
            return Err(TransactionFault::HashMismatch(tx.hash.clone()));
        }
        if let Some(block) = self.ledger.find_duplicate_transaction(&tx.hash, block_index) {
            return Err(TransactionFault::Duplicate {
                hash: tx.hash.clone(),
                block,
            });
        }
        if !self
            .verifier
            .verify(&tx.signature, &tx.signing_message(), &tx.from)
        {
            return Err(TransactionFault::InvalidSignature(tx.hash.clone()));
        }
        Ok(())
    }

    pub fn check_transactions_and_reward(&self, block: &Block) -> Result<(), TransactionFault> {
        let mut spent: BTreeMap<&str, u128> = BTreeMap::new();
        let mut seen: HashSet<&str> = HashSet::new();
        let mut has_reward = false;

        for tx in &block.transactions {
            if tx.is_reward() {
                if has_reward {
                    return Err(TransactionFault::MultipleRewards);
                }
                has_reward = true;
                let expected = self.rewards.reward(block.index);
                if tx.amount != expected {
                    return Err(TransactionFault::WrongRewardAmount {
                        expected,
                        got: tx.amount,
                    });
                }
                if tx.signature != COINBASE_SIGNATURE {
                    return Err(TransactionFault::SignedReward(tx.hash.clone()));
                }
                if !tx.has_valid_hash() {
                    return Err(TransactionFault::HashMismatch(tx.hash.clone()));
                }
            } else if tx.signature == COINBASE_SIGNATURE {
                return Err(TransactionFault::MisattributedReward(tx.from.clone()));
            } else {
                self.check_transfer(tx, block.index)?;
                *spent.entry(tx.from.as_str()).or_default() += u128::from(tx.amount);
            }
            if !seen.insert(tx.hash.as_str()) {
                return Err(TransactionFault::DuplicateInBlock(tx.hash.clone()));
            }
        }

        if !has_reward {
            return Err(TransactionFault::MissingReward);
        }

        let prior = block.index.saturating_sub(1);
        for (address, spent) in spent {
            let available = self.ledger.balance_of(address, prior);
            if available < spent as Balance {
                return Err(TransactionFault::InsufficientBalance {
                    address: address.to_string(),
                    spent,
                    available,
                });
            }
        }
        Ok(())
    }
}
