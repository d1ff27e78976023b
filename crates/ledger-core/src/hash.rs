//! Canonical hashing of transactions and blocks.
//!
//! Every field is written into a byte buffer in a fixed order before being
//! digested with SHA-256. Strings are length-prefixed so that adjacent fields
//! can never run into each other (`"ab" + "c"` and `"a" + "bc"` encode
//! differently). Digests are exchanged as lower-case hex.

use crate::Transaction;
use sha2::{Digest, Sha256};

fn put_str(bytes: &mut Vec<u8>, s: &str) {
    bytes.extend_from_slice(&(s.len() as u64).to_le_bytes());
    bytes.extend_from_slice(s.as_bytes());
}

fn digest_hex(bytes: &[u8]) -> String {
    hex::encode(Sha256::digest(bytes))
}

/// Bytes covered by a transaction hash. The `hash` field itself is excluded.
pub fn transaction_hash_bytes(
    from: &str,
    to: &str,
    amount: u64,
    timestamp: u64,
    signature: &str,
) -> Vec<u8> {
    let mut bytes = Vec::with_capacity(8 * 5 + from.len() + to.len() + signature.len());
    put_str(&mut bytes, from);
    put_str(&mut bytes, to);
    bytes.extend_from_slice(&amount.to_le_bytes());
    bytes.extend_from_slice(&timestamp.to_le_bytes());
    put_str(&mut bytes, signature);
    bytes
}

pub fn transaction_hash(
    from: &str,
    to: &str,
    amount: u64,
    timestamp: u64,
    signature: &str,
) -> String {
    digest_hex(&transaction_hash_bytes(
        from, to, amount, timestamp, signature,
    ))
}

/// Bytes covered by a block hash. Transactions contribute their count and
/// then each stored `hash` in block order.
pub fn block_hash_bytes(
    index: u64,
    previous_hash: &str,
    timestamp: u64,
    transactions: &[Transaction],
    nonce: u64,
) -> Vec<u8> {
    let mut bytes = Vec::with_capacity(8 * 4 + previous_hash.len() + transactions.len() * 72);
    bytes.extend_from_slice(&index.to_le_bytes());
    put_str(&mut bytes, previous_hash);
    bytes.extend_from_slice(&timestamp.to_le_bytes());
    bytes.extend_from_slice(&(transactions.len() as u64).to_le_bytes());
    for tx in transactions {
        put_str(&mut bytes, &tx.hash);
    }
    bytes.extend_from_slice(&nonce.to_le_bytes());
    bytes
}

pub fn block_hash(
    index: u64,
    previous_hash: &str,
    timestamp: u64,
    transactions: &[Transaction],
    nonce: u64,
) -> String {
    digest_hex(&block_hash_bytes(
        index,
        previous_hash,
        timestamp,
        transactions,
        nonce,
    ))
}

/// True when `hash` starts with `difficulty` `'0'` characters.
pub fn meets_difficulty(hash: &str, difficulty: usize) -> bool {
    hash.len() >= difficulty && hash.bytes().take(difficulty).all(|b| b == b'0')
}
