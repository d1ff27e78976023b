//! Fixtures shared by the unit tests.

use crate::{
    crypto::SignatureVerifier, hash::meets_difficulty, pool::UnconfirmedPool, signing_message,
    store::BlockStore, Block, ChainConfig, Transaction,
};
use anyhow::{bail, Result};
use parking_lot::Mutex;
use std::collections::{BTreeMap, VecDeque};
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};

/// Accepts a signature iff it equals `"sig:" + message`.
pub struct EchoVerifier;

impl SignatureVerifier for EchoVerifier {
    fn verify(&self, signature: &str, message: &str, _signer: &str) -> bool {
        signature == format!("sig:{message}")
    }
}

pub fn config() -> ChainConfig {
    ChainConfig::default()
        .with_difficulty(1)
        .with_genesis_address("alice")
}

pub fn signed(from: &str, to: &str, amount: u64, timestamp: u64) -> Transaction {
    let message = signing_message(from, to, amount, timestamp);
    Transaction::new(from, to, amount, timestamp, format!("sig:{message}"))
}

/// Sequential nonce search, independent of the miner.
pub fn mine(index: u64, previous: &str, txs: Vec<Transaction>, difficulty: usize) -> Block {
    let mut nonce = 0;
    loop {
        let block = Block::new(index, txs.clone(), previous, 1_000 + index, nonce);
        if meets_difficulty(&block.current_hash, difficulty) {
            return block;
        }
        nonce += 1;
    }
}

/// Hands out a fixed script of transactions and counts the pops.
pub struct ScriptedPool {
    queue: Mutex<VecDeque<Transaction>>,
    pops: AtomicUsize,
}

impl ScriptedPool {
    pub fn new(txs: Vec<Transaction>) -> Self {
        Self {
            queue: Mutex::new(txs.into()),
            pops: AtomicUsize::new(0),
        }
    }

    pub fn pops(&self) -> usize {
        self.pops.load(Ordering::SeqCst)
    }
}

impl UnconfirmedPool for ScriptedPool {
    fn pop_next_unconfirmed_transaction(&self) -> Option<Transaction> {
        self.pops.fetch_add(1, Ordering::SeqCst);
        self.queue.lock().pop_front()
    }
}

/// Block store kept in a map; writes can be made to fail on demand.
#[derive(Default)]
pub struct MemoryStore {
    blocks: Mutex<BTreeMap<u64, Block>>,
    failing: AtomicBool,
}

impl MemoryStore {
    pub fn fail_writes(&self, failing: bool) {
        self.failing.store(failing, Ordering::SeqCst);
    }

    fn check_writable(&self) -> Result<()> {
        if self.failing.load(Ordering::SeqCst) {
            bail!("store is read-only");
        }
        Ok(())
    }
}

impl BlockStore for MemoryStore {
    fn put_block(&self, block: &Block) -> Result<()> {
        self.check_writable()?;
        self.blocks.lock().insert(block.index, block.clone());
        Ok(())
    }

    fn get_block(&self, index: u64) -> Result<Option<Block>> {
        Ok(self.blocks.lock().get(&index).cloned())
    }

    fn tip_height(&self) -> Result<Option<u64>> {
        Ok(self.blocks.lock().keys().next_back().copied())
    }

    fn truncate_from(&self, index: u64) -> Result<()> {
        self.check_writable()?;
        self.blocks.lock().split_off(&index);
        Ok(())
    }

    fn close(&self) -> Result<()> {
        Ok(())
    }
}
