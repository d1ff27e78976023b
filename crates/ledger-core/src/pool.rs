//! Pending transactions waiting to be mined.

use crate::{constants::MEMPOOL_CAPACITY, Transaction};
use parking_lot::Mutex;
use std::collections::{HashSet, VecDeque};
use thiserror::Error;

/// Source of pending transactions for the miner. A pop hands a transaction
/// to exactly one caller.
pub trait UnconfirmedPool: Send + Sync {
    fn pop_next_unconfirmed_transaction(&self) -> Option<Transaction>;

    /// Take back transactions that were popped for a block that was never
    /// produced, so they are popped again first and in the same order.
    /// Pools that cannot do this drop them.
    fn return_unconfirmed_transactions(&self, txs: Vec<Transaction>) {
        drop(txs);
    }
}

#[derive(Debug, Error, PartialEq, Eq)]
pub enum MempoolError {
    #[error("transaction {0} already pending")]
    Duplicate(String),

    #[error("mempool is full (capacity: {0})")]
    Full(usize),
}

#[derive(Default)]
struct Inner {
    queue: VecDeque<Transaction>,
    hashes: HashSet<String>,
}

/// FIFO pool keyed by transaction hash.
pub struct Mempool {
    capacity: usize,
    inner: Mutex<Inner>,
}

impl Mempool {
    pub fn new() -> Self {
        Self::with_capacity(MEMPOOL_CAPACITY)
    }

    pub fn with_capacity(capacity: usize) -> Self {
        Self {
            capacity,
            inner: Mutex::new(Inner::default()),
        }
    }

    pub fn push(&self, tx: Transaction) -> Result<(), MempoolError> {
        let mut inner = self.inner.lock();
        if inner.hashes.contains(&tx.hash) {
            return Err(MempoolError::Duplicate(tx.hash));
        }
        if inner.queue.len() >= self.capacity {
            return Err(MempoolError::Full(self.capacity));
        }
        inner.hashes.insert(tx.hash.clone());
        inner.queue.push_back(tx);
        Ok(())
    }

    pub fn contains(&self, tx_hash: &str) -> bool {
        self.inner.lock().hashes.contains(tx_hash)
    }

    pub fn len(&self) -> usize {
        self.inner.lock().queue.len()
    }

    pub fn is_empty(&self) -> bool {
        self.inner.lock().queue.is_empty()
    }

    /// Pending transactions in pop order, without removing them.
    pub fn pending(&self) -> Vec<Transaction> {
        self.inner.lock().queue.iter().cloned().collect()
    }
}

impl Default for Mempool {
    fn default() -> Self {
        Self::new()
    }
}

impl UnconfirmedPool for Mempool {
    fn pop_next_unconfirmed_transaction(&self) -> Option<Transaction> {
        let mut inner = self.inner.lock();
        let tx = inner.queue.pop_front()?;
        inner.hashes.remove(&tx.hash);
        Some(tx)
    }

    /// Returned transactions were admitted once already, so capacity is not
    /// re-checked. Hashes pushed again in the meantime are not duplicated.
    fn return_unconfirmed_transactions(&self, txs: Vec<Transaction>) {
        let mut inner = self.inner.lock();
        for tx in txs.into_iter().rev() {
            if inner.hashes.insert(tx.hash.clone()) {
                inner.queue.push_front(tx);
            }
        }
    }
}
