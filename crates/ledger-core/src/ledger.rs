//! Derived account state.
//!
//! Nothing is cached: balances and lookups are recomputed from the blocks on
//! every query, so the answer is always consistent with the chain it is
//! asked about.

use crate::{constants::COINBASE_SENDER, Block, Transaction};

/// Signed so that an inconsistent chain shows up as a negative balance
/// instead of wrapping.
pub type Balance = i128;

#[derive(Clone, Copy)]
pub struct Ledger<'a> {
    blocks: &'a [Block],
}

impl<'a> Ledger<'a> {
    pub fn new(blocks: &'a [Block]) -> Self {
        Self { blocks }
    }

    pub fn blocks(&self) -> &'a [Block] {
        self.blocks
    }

    pub fn tip(&self) -> Option<&'a Block> {
        self.blocks.last()
    }

    /// Balance of `address` counting every block with index `<= at_index`.
    pub fn balance_of(&self, address: &str, at_index: u64) -> Balance {
        if address == COINBASE_SENDER {
            return 0;
        }
        self.blocks
            .iter()
            .take_while(|b| b.index <= at_index)
            .flat_map(|b| b.transactions.iter())
            .fold(0, |balance, tx| {
                let mut balance = balance;
                if tx.to == address {
                    balance += tx.amount as Balance;
                }
                if tx.from == address {
                    balance -= tx.amount as Balance;
                }
                balance
            })
    }

    pub fn latest_balance(&self, address: &str) -> Balance {
        match self.tip() {
            Some(tip) => self.balance_of(address, tip.index),
            None => 0,
        }
    }

    /// Index of a block before `before_index` that already holds a
    /// transaction with this hash.
    pub fn find_duplicate_transaction(&self, tx_hash: &str, before_index: u64) -> Option<u64> {
        self.blocks
            .iter()
            .take_while(|b| b.index < before_index)
            .find(|b| b.transactions.iter().any(|tx| tx.hash == tx_hash))
            .map(|b| b.index)
    }

    /// Every transaction sent or received by `address`, in chain order.
    pub fn transaction_history(&self, address: &str) -> Vec<Transaction> {
        self.blocks
            .iter()
            .flat_map(|b| b.transactions.iter())
            .filter(|tx| tx.from == address || tx.to == address)
            .cloned()
            .collect()
    }

    pub fn block_by_index(&self, index: u64) -> Option<&'a Block> {
        self.blocks.get(usize::try_from(index).ok()?)
    }

    pub fn block_by_hash(&self, hash: &str) -> Option<&'a Block> {
        self.blocks.iter().find(|b| b.current_hash == hash)
    }

    /// Blocks with `from <= index < to`, clamped to the chain.
    pub fn blocks_range(&self, from: u64, to: u64) -> &'a [Block] {
        let len = self.blocks.len();
        let start = usize::try_from(from).unwrap_or(len).min(len);
        let end = usize::try_from(to).unwrap_or(len).min(len).max(start);
        &self.blocks[start..end]
    }
}
