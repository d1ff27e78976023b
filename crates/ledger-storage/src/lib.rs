//! sled-backed persistence for the ledger chain.
//!
//! Blocks are stored bincode-encoded in a `blocks` tree keyed by big-endian
//! index, so key order is chain order and the last key is the tip.

pub mod sled_store;

pub use sled_store::SledStore;
