#![allow(dead_code)]

use std::fs;

use ledger_core::{hash::meets_difficulty, Block, Transaction};
use ledger_storage::SledStore;
use tempfile::{tempdir, TempDir};

pub fn create_temp_store() -> (TempDir, SledStore) {
    // Create a temporary directory for the sled database
    let temp_dir = tempdir().expect("Failed to create temp dir");
    let db_path = temp_dir.path().to_path_buf();
    (
        temp_dir,
        SledStore::open(db_path.to_str().unwrap()).expect("Failed to open SledStore"),
    )
}

pub fn teardown_store(temp_dir: TempDir, store: SledStore) {
    let db_path = temp_dir.path().to_path_buf();
    store.clear().expect("Failed to clear the store");
    drop(store);
    temp_dir.close().expect("Failed to delete temp dir");
    let _ = fs::remove_dir_all(&db_path);
    assert!(!db_path.exists(), "Database directory should be removed");
}

/// A block that links to `previous_hash` but is not mined.
pub fn linked_block(index: u64, previous_hash: &str, txs: Vec<Transaction>) -> Block {
    Block::new(index, txs, previous_hash, 1_600_000_000 + index, index * 7)
}

/// Unmined chain of `len` blocks, one transfer each.
pub fn linked_chain(len: u64) -> Vec<Block> {
    let mut blocks: Vec<Block> = Vec::new();
    for i in 0..len {
        let prev = blocks
            .last()
            .map(|b| b.current_hash.clone())
            .unwrap_or_else(|| "0".to_string());
        let tx = Transaction::new(format!("from-{i}"), format!("to-{i}"), i, i, "sig");
        blocks.push(linked_block(i, &prev, vec![tx]));
    }
    blocks
}

pub fn mine(index: u64, previous_hash: &str, txs: Vec<Transaction>, difficulty: usize) -> Block {
    let mut nonce = 0;
    loop {
        let block = Block::new(index, txs.clone(), previous_hash, 1_600_000_000 + index, nonce);
        if meets_difficulty(&block.current_hash, difficulty) {
            return block;
        }
        nonce += 1;
    }
}
