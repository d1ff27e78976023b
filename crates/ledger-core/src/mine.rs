use crate::{
    chain::ChainStore,
    constants::HASH_HEX_SIZE,
    hash::{block_hash_bytes, meets_difficulty},
    ledger::Balance,
    pool::UnconfirmedPool,
    Block, Transaction,
};
use rayon::prelude::*;
use sha2::{Digest, Sha256};
use std::collections::{HashMap, HashSet};
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::{SystemTime, UNIX_EPOCH};
use tracing::{debug, info};

/// Nonces tried in parallel before the cancel flag is looked at again.
const NONCE_BATCH: u64 = 1 << 16;

fn unix_now() -> u64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| d.as_secs())
        .unwrap_or_default()
}

/// Lowest nonce whose block hash meets `difficulty`, or `None` once `cancel`
/// is set or when no hash can meet `difficulty`. Batches are searched in
/// parallel with `find_first`, so the answer is the same as a sequential
/// scan from zero.
pub fn proof_of_work(
    index: u64,
    previous_hash: &str,
    timestamp: u64,
    transactions: &[Transaction],
    difficulty: usize,
    cancel: &AtomicBool,
) -> Option<u64> {
    if difficulty > HASH_HEX_SIZE {
        return None;
    }
    // The nonce is the last field hashed, so everything before it is absorbed once.
    let template = block_hash_bytes(index, previous_hash, timestamp, transactions, 0);
    let mut prefix = Sha256::new();
    prefix.update(&template[..template.len() - 8]);

    let mut start = 0u64;
    loop {
        if cancel.load(Ordering::Relaxed) {
            debug!("Proof-of-work for block {} cancelled at nonce {}", index, start);
            return None;
        }
        let end = start.saturating_add(NONCE_BATCH);
        let found = (start..end).into_par_iter().find_first(|nonce| {
            let mut hasher = prefix.clone();
            hasher.update(nonce.to_le_bytes());
            meets_difficulty(&hex::encode(hasher.finalize()), difficulty)
        });
        if found.is_some() {
            return found;
        }
        if end == u64::MAX {
            return None;
        }
        start = end;
    }
}

/// Assembles candidate blocks from pending transactions and proof-of-works
/// them. Mined blocks are handed back to the caller, never appended here.
pub struct Miner<'a> {
    chain: &'a ChainStore,
}

impl<'a> Miner<'a> {
    pub fn new(chain: &'a ChainStore) -> Self {
        Self { chain }
    }

    pub fn mine_block(&self, pool: &dyn UnconfirmedPool, reward_address: &str) -> Option<Block> {
        self.mine_block_cancellable(pool, reward_address, &AtomicBool::new(false))
    }

    /// Drain `pool` into a candidate on top of the current tip and search for
    /// a nonce. Returns `None` when nothing valid was pending or when
    /// `cancel` is raised during the search; in the latter case the accepted
    /// transactions are handed back to `pool`.
    pub fn mine_block_cancellable(
        &self,
        pool: &dyn UnconfirmedPool,
        reward_address: &str,
        cancel: &AtomicBool,
    ) -> Option<Block> {
        let tip = self.chain.latest_block().ok()?;
        let index = tip.index + 1;

        let mut transactions = self.collect_transactions(pool, &tip);
        if transactions.is_empty() {
            debug!("No valid pending transactions; not mining block {}", index);
            return None;
        }

        let timestamp = unix_now();
        transactions.push(Transaction::reward(
            reward_address,
            self.chain.rewards().reward(index),
            timestamp,
        ));

        let Some(nonce) = proof_of_work(
            index,
            &tip.current_hash,
            timestamp,
            &transactions,
            self.chain.config().difficulty,
            cancel,
        ) else {
            transactions.pop();
            debug!(
                "Returning {} transactions after abandoning block {}",
                transactions.len(),
                index
            );
            pool.return_unconfirmed_transactions(transactions);
            return None;
        };
        let block = Block::new(index, transactions, tip.current_hash, timestamp, nonce);
        info!(
            "Mined block {} with nonce {} and hash {}",
            index, nonce, block.current_hash
        );
        Some(block)
    }

    /// Pop every pending transaction, keeping the ones the block validator
    /// would accept on top of `tip`.
    fn collect_transactions(&self, pool: &dyn UnconfirmedPool, tip: &Block) -> Vec<Transaction> {
        let index = tip.index + 1;
        let mut accepted: Vec<Transaction> = Vec::new();
        let mut seen: HashSet<String> = HashSet::new();
        let mut spent: HashMap<String, u128> = HashMap::new();

        while let Some(tx) = pool.pop_next_unconfirmed_transaction() {
            if tx.is_reward() {
                debug!("Discarding reward transaction {} offered by the pool", tx.hash);
                continue;
            }
            if !tx.has_valid_hash() {
                debug!("Discarding transaction with mismatched hash {}", tx.hash);
                continue;
            }
            if seen.contains(&tx.hash) {
                debug!("Discarding in-block duplicate {}", tx.hash);
                continue;
            }
            if let Some(block) = self.chain.find_duplicate_transaction(&tx.hash, index) {
                debug!("Discarding {} already mined in block {}", tx.hash, block);
                continue;
            }
            if !self
                .chain
                .verifier()
                .verify(&tx.signature, &tx.signing_message(), &tx.from)
            {
                debug!("Discarding {} with invalid signature", tx.hash);
                continue;
            }
            let pending = spent.get(&tx.from).copied().unwrap_or(0) + u128::from(tx.amount);
            let available = self.chain.balance_of(&tx.from, tip.index);
            if available < pending as Balance {
                debug!(
                    "Discarding {}: {} would spend {} of {}",
                    tx.hash, tx.from, pending, available
                );
                continue;
            }
            spent.insert(tx.from.clone(), pending);
            seen.insert(tx.hash.clone());
            accepted.push(tx);
        }
        accepted
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::hash::block_hash;
    use crate::reward::HalvingSchedule;
    use crate::testing::{config, mine, signed, EchoVerifier, ScriptedPool};
    use crate::{ChainConfig, ChainError, Mempool, ValidationError};
    use std::sync::Arc;

    fn chain_with(config: ChainConfig) -> ChainStore {
        ChainStore::new(
            config,
            Arc::new(EchoVerifier),
            Arc::new(HalvingSchedule::default()),
            vec![],
        )
        .unwrap()
    }

    fn chain() -> ChainStore {
        chain_with(config().with_difficulty(2))
    }

    #[test]
    fn empty_pool_mines_nothing() {
        let chain = chain();
        let pool = ScriptedPool::new(vec![]);
        assert!(Miner::new(&chain).mine_block(&pool, "reward_address").is_none());
        assert_eq!(pool.pops(), 1);
    }

    #[test]
    fn mismatched_hash_is_discarded() {
        let chain = chain();
        let mut tx = signed("alice", "bob", 25, 1_498_923_800);
        tx.hash = "incorrect_transaction_hash".into();
        let pool = ScriptedPool::new(vec![tx]);
        assert!(Miner::new(&chain).mine_block(&pool, "reward_address").is_none());
        assert_eq!(pool.pops(), 2);
    }

    #[test]
    fn already_mined_transaction_is_discarded() {
        let chain = chain();
        let tx = signed("alice", "bob", 25, 1_498_923_800);
        let first = Miner::new(&chain)
            .mine_block(&ScriptedPool::new(vec![tx.clone()]), "m")
            .unwrap();
        assert!(chain.add_block(first));

        let pool = ScriptedPool::new(vec![tx]);
        assert!(Miner::new(&chain).mine_block(&pool, "m").is_none());
        assert_eq!(pool.pops(), 2);
    }

    #[test]
    fn duplicate_pending_transactions_are_mined_once() {
        let chain = chain();
        let tx = signed("alice", "bob", 25, 1_498_923_800);
        let pool = ScriptedPool::new(vec![tx.clone(), tx.clone()]);

        let block = Miner::new(&chain).mine_block(&pool, "reward_address").unwrap();
        assert_eq!(pool.pops(), 3);
        assert_eq!(block.index, 1);
        assert_eq!(block.transactions.len(), 2);
        assert_eq!(block.transactions[0], tx);

        let reward = &block.transactions[1];
        assert!(reward.is_reward());
        assert_eq!(reward.to, "reward_address");
        assert_eq!(reward.amount, 50);
        assert_eq!(reward.timestamp, block.timestamp);

        assert!(chain.add_block(block));
        assert_eq!(chain.latest_balance("bob"), 25);
        assert_eq!(chain.latest_balance("reward_address"), 50);
    }

    #[test]
    fn invalid_signature_and_reward_offers_are_discarded() {
        let chain = chain();
        let forged = Transaction::new("alice", "bob", 10, 1, "forged");
        let minted = Transaction::reward("thief", 50, 1);
        let pool = ScriptedPool::new(vec![forged, minted]);
        assert!(Miner::new(&chain).mine_block(&pool, "m").is_none());
        assert_eq!(pool.pops(), 3);
    }

    #[test]
    fn overdrawing_transactions_are_discarded() {
        let chain = chain();
        let pool = ScriptedPool::new(vec![
            signed("alice", "bob", 30, 1),
            signed("alice", "carol", 30, 2),
            signed("alice", "dave", 20, 3),
            signed("nobody", "bob", 1, 4),
        ]);
        let block = Miner::new(&chain).mine_block(&pool, "m").unwrap();
        let recipients: Vec<&str> = block.transactions.iter().map(|t| t.to.as_str()).collect();
        assert_eq!(recipients, vec!["bob", "dave", "m"]);
        assert!(chain.add_block(block));
    }

    #[test]
    fn finds_the_lowest_qualifying_nonce() {
        let chain = chain();
        let block = Miner::new(&chain)
            .mine_block(&ScriptedPool::new(vec![signed("alice", "bob", 1, 1)]), "m")
            .unwrap();
        assert!(block.current_hash.starts_with("00"));
        assert_eq!(block.current_hash, block.compute_hash());
        for nonce in 0..block.nonce {
            let hash = block_hash(
                block.index,
                &block.previous_hash,
                block.timestamp,
                &block.transactions,
                nonce,
            );
            assert!(!meets_difficulty(&hash, 2));
        }
    }

    #[test]
    fn proof_of_work_matches_sequential_search() {
        let txs = vec![Transaction::reward("m", 50, 1)];
        let nonce = proof_of_work(7, "prev", 1_007, &txs, 2, &AtomicBool::new(false)).unwrap();
        let sequential = mine(7, "prev", txs, 2);
        assert_eq!(sequential.timestamp, 1_007);
        assert_eq!(nonce, sequential.nonce);
    }

    #[test]
    fn cancelled_search_returns_transactions_to_the_pool() {
        let chain = chain_with(config().with_difficulty(64));
        let cancel = AtomicBool::new(true);
        let pool = Mempool::new();
        let first = signed("alice", "bob", 1, 1);
        let second = signed("alice", "carol", 2, 2);
        pool.push(first.clone()).unwrap();
        pool.push(second.clone()).unwrap();
        pool.push(signed("alice", "dave", 500, 3)).unwrap();

        assert!(Miner::new(&chain)
            .mine_block_cancellable(&pool, "m", &cancel)
            .is_none());
        // The overdraw was discarded; the accepted transfers are back, in order.
        assert_eq!(pool.pending(), vec![first, second]);
    }

    #[test]
    fn unreachable_difficulty_finds_no_nonce() {
        let txs = vec![Transaction::reward("m", 50, 1)];
        let cancel = AtomicBool::new(false);
        assert!(proof_of_work(1, "prev", 1, &txs, HASH_HEX_SIZE + 1, &cancel).is_none());
    }

    #[test]
    fn stale_block_fails_continuity_on_submit() {
        let chain = chain();
        let miner = Miner::new(&chain);
        let a = miner
            .mine_block(&ScriptedPool::new(vec![signed("alice", "bob", 1, 1)]), "m")
            .unwrap();
        let b = miner
            .mine_block(&ScriptedPool::new(vec![signed("alice", "bob", 2, 2)]), "m")
            .unwrap();
        assert!(chain.add_block(a));
        assert!(matches!(
            chain.try_add_block(b),
            Err(ChainError::Rejected {
                source: ValidationError::ChainContinuity { .. },
                ..
            })
        ));
    }
}
