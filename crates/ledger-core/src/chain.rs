//! The node's copy of the chain.
//!
//! `ChainStore` is the only owner of the block sequence. Structural changes
//! (`add_block`, `alter_chain`) validate and mutate under one write lock so
//! that validation never sees a tip that moves underneath it; queries share
//! a read lock and observe either the old or the new chain, never a partial
//! splice. When a [`BlockStore`] is attached, every structural change is
//! written through it inside the same write lock, so the persisted chain is
//! always a copy of the in-memory one.

use crate::{
    config::ChainConfig,
    constants::{
        COINBASE_SENDER, COINBASE_SIGNATURE, GENESIS_PREVIOUS_HASH, GENESIS_TX_HASH, HASH_HEX_SIZE,
    },
    crypto::SignatureVerifier,
    error::{ChainError, ValidationError},
    ledger::{Balance, Ledger},
    reward::RewardSchedule,
    store::BlockStore,
    validator::ChainValidator,
    Block, Transaction,
};
use anyhow::Context;
use parking_lot::RwLock;
use std::sync::Arc;
use tracing::{debug, info, warn};

/// The fixed, unmined block at index 0 seeding `config.genesis_address`.
pub fn genesis_block(config: &ChainConfig) -> Block {
    let seed = Transaction {
        from: COINBASE_SENDER.to_string(),
        to: config.genesis_address.clone(),
        amount: config.genesis_amount,
        timestamp: 0,
        signature: COINBASE_SIGNATURE.to_string(),
        hash: GENESIS_TX_HASH.to_string(),
    };
    Block::new(0, vec![seed], GENESIS_PREVIOUS_HASH, 0, 0)
}

pub struct ChainStore {
    blocks: RwLock<Vec<Block>>,
    config: ChainConfig,
    verifier: Arc<dyn SignatureVerifier>,
    rewards: Arc<dyn RewardSchedule>,
    store: Option<Arc<dyn BlockStore>>,
}

impl ChainStore {
    /// Build a chain from `blocks`, or from the genesis block alone when
    /// `blocks` is empty. Every block goes through the normal acceptance
    /// checks; the first rejected one aborts construction.
    pub fn new(
        config: ChainConfig,
        verifier: Arc<dyn SignatureVerifier>,
        rewards: Arc<dyn RewardSchedule>,
        blocks: Vec<Block>,
    ) -> Result<Self, ChainError> {
        if config.difficulty > HASH_HEX_SIZE {
            return Err(ChainError::DifficultyTooHigh(config.difficulty));
        }
        let chain = Self {
            blocks: RwLock::new(Vec::with_capacity(blocks.len().max(1))),
            config,
            verifier,
            rewards,
            store: None,
        };
        let seed = if blocks.is_empty() {
            vec![chain.genesis_block()]
        } else {
            blocks
        };
        for block in seed {
            chain.try_add_block(block)?;
        }
        Ok(chain)
    }

    /// Write every later `add_block` and `alter_chain` through `store`.
    /// Blocks already in the chain are assumed to be persisted.
    pub fn with_store(mut self, store: Arc<dyn BlockStore>) -> Self {
        self.store = Some(store);
        self
    }

    pub fn config(&self) -> &ChainConfig {
        &self.config
    }

    pub fn verifier(&self) -> &dyn SignatureVerifier {
        self.verifier.as_ref()
    }

    pub fn rewards(&self) -> &dyn RewardSchedule {
        self.rewards.as_ref()
    }

    pub fn genesis_block(&self) -> Block {
        genesis_block(&self.config)
    }

    fn validator<'a>(&'a self, blocks: &'a [Block]) -> ChainValidator<'a> {
        ChainValidator::new(
            blocks,
            &self.config,
            self.verifier.as_ref(),
            self.rewards.as_ref(),
        )
    }

    /// Validation for appending to `blocks`. Genesis validates by equality
    /// alone, so it is also held to position 0 here.
    fn accept(&self, blocks: &[Block], block: &Block) -> Result<(), ValidationError> {
        if block.index == 0 && !blocks.is_empty() {
            return Err(ValidationError::ChainContinuity {
                index: 0,
                expected_index: blocks.len() as u64,
            });
        }
        self.validator(blocks).validate_block(block)
    }

    pub fn latest_block(&self) -> Result<Block, ChainError> {
        self.blocks.read().last().cloned().ok_or(ChainError::EmptyChain)
    }

    pub fn size(&self) -> usize {
        self.blocks.read().len()
    }

    /// Check `block` against the current tip without appending it.
    pub fn validate_block(&self, block: &Block) -> Result<(), ValidationError> {
        let blocks = self.blocks.read();
        self.validator(&blocks).validate_block(block)
    }

    /// Validate, persist and append, reporting why a block was refused.
    /// A store failure leaves the chain untouched.
    pub fn try_add_block(&self, block: Block) -> Result<(), ChainError> {
        let mut blocks = self.blocks.write();
        self.accept(&blocks, &block)
            .map_err(|source| ChainError::Rejected {
                index: block.index,
                source,
            })?;
        if let Some(store) = &self.store {
            store
                .put_block(&block)
                .with_context(|| format!("persisting block {}", block.index))?;
        }
        info!(
            "Appended block {} with {} transactions and hash {}",
            block.index,
            block.transactions.len(),
            block.current_hash
        );
        blocks.push(block);
        Ok(())
    }

    /// Validate and append. Rejections leave the chain untouched and are
    /// reported as `false`.
    pub fn add_block(&self, block: Block) -> bool {
        match self.try_add_block(block) {
            Ok(()) => true,
            Err(ChainError::Persistence(err)) => {
                warn!("Failed to persist block: {:#}", err);
                false
            }
            Err(err) => {
                warn!("{}", err);
                false
            }
        }
    }

    /// Longest-chain rule. `tail` replaces every block from `tail[0].index`
    /// onward iff the resulting chain would be strictly longer than the
    /// current one. The fork is validated block by block on top of the kept
    /// prefix before anything is replaced.
    pub fn alter_chain(&self, tail: Vec<Block>) -> bool {
        let Some(first) = tail.first() else {
            return false;
        };
        let fork_start = first.index;

        let mut blocks = self.blocks.write();
        let current = blocks.len() as u64;
        if fork_start > current {
            warn!(
                "Ignoring fork starting at {} beyond chain length {}",
                fork_start, current
            );
            return false;
        }
        let prospective = fork_start + tail.len() as u64;
        if prospective <= current {
            debug!(
                "Keeping chain of length {} over fork of length {}",
                current, prospective
            );
            return false;
        }

        let mut candidate = blocks[..fork_start as usize].to_vec();
        candidate.reserve(tail.len());
        for block in tail {
            if let Err(err) = self.accept(&candidate, &block) {
                warn!("Rejected fork at block {}: {}", block.index, err);
                return false;
            }
            candidate.push(block);
        }

        if let Some(store) = &self.store {
            if let Err(err) = store.replace_tail(&candidate[fork_start as usize..]) {
                warn!("Failed to persist fork from index {}: {:#}", fork_start, err);
                return false;
            }
        }

        info!(
            "Replaced chain from index {}: length {} -> {}",
            fork_start,
            current,
            candidate.len()
        );
        *blocks = candidate;
        true
    }

    /// Run read-only queries against a consistent view of the chain.
    pub fn with_ledger<R>(&self, f: impl FnOnce(Ledger<'_>) -> R) -> R {
        let blocks = self.blocks.read();
        f(Ledger::new(&blocks))
    }

    pub fn blocks(&self) -> Vec<Block> {
        self.blocks.read().clone()
    }

    pub fn balance_of(&self, address: &str, at_index: u64) -> Balance {
        self.with_ledger(|ledger| ledger.balance_of(address, at_index))
    }

    pub fn latest_balance(&self, address: &str) -> Balance {
        self.with_ledger(|ledger| ledger.latest_balance(address))
    }

    pub fn find_duplicate_transaction(&self, tx_hash: &str, before_index: u64) -> Option<u64> {
        self.with_ledger(|ledger| ledger.find_duplicate_transaction(tx_hash, before_index))
    }

    pub fn transaction_history(&self, address: &str) -> Vec<Transaction> {
        self.with_ledger(|ledger| ledger.transaction_history(address))
    }

    pub fn block_by_index(&self, index: u64) -> Option<Block> {
        self.with_ledger(|ledger| ledger.block_by_index(index).cloned())
    }

    pub fn block_by_hash(&self, hash: &str) -> Option<Block> {
        self.with_ledger(|ledger| ledger.block_by_hash(hash).cloned())
    }

    pub fn blocks_range(&self, from: u64, to: u64) -> Vec<Block> {
        self.with_ledger(|ledger| ledger.blocks_range(from, to).to_vec())
    }
}
