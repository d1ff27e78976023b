mod api;
mod constants;

use anyhow::Context;
use api::{router, AppState};
use clap::Parser;
use ledger_core::constants::{
    GENESIS_ADDRESS, HALVING_INTERVAL, HASH_HEX_SIZE, INITIAL_BLOCK_REWARD, MEMPOOL_CAPACITY,
    POW_TARGET_DIFFICULTY,
};
use ledger_core::{
    BlockStore, ChainConfig, ChainStore, HalvingSchedule, Mempool, Secp256k1Verifier,
};
use ledger_storage::sled_store::SledStore;
use std::{net::SocketAddr, sync::Arc};
use tracing::{info, Level};

#[derive(Parser, Debug)]
struct Args {
    /// Address to listen on, e.g. 127.0.0.1:8080
    #[arg(long, default_value = "127.0.0.1:8080")]
    listen: String,

    /// Data directory for sled
    #[arg(long, default_value = "./data")]
    data_dir: String,

    /// Leading zero hex digits a block hash needs (at most 64)
    #[arg(long, default_value_t = POW_TARGET_DIFFICULTY, value_parser = parse_difficulty)]
    difficulty: usize,

    /// Recipient of the genesis seed transaction
    #[arg(long, default_value = GENESIS_ADDRESS)]
    genesis_address: String,

    #[arg(long, default_value_t = INITIAL_BLOCK_REWARD)]
    initial_reward: u64,

    /// Blocks between reward halvings
    #[arg(long, default_value_t = HALVING_INTERVAL)]
    halving_interval: u64,

    #[arg(long, default_value_t = MEMPOOL_CAPACITY)]
    mempool_capacity: usize,
}

fn parse_difficulty(s: &str) -> Result<usize, String> {
    let difficulty: usize = s.parse().map_err(|e| format!("{e}"))?;
    if difficulty > HASH_HEX_SIZE {
        return Err(format!("a block hash has only {HASH_HEX_SIZE} hex characters"));
    }
    Ok(difficulty)
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_max_level(Level::DEBUG)
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .init();

    let args = Args::parse();
    let config = ChainConfig::default()
        .with_difficulty(args.difficulty)
        .with_genesis_address(args.genesis_address);
    let rewards = HalvingSchedule {
        initial: args.initial_reward,
        halving_interval: args.halving_interval,
    };

    let store = Arc::new(SledStore::open(&args.data_dir)?);
    let persisted = store.load_chain().context("loading persisted chain")?;
    let chain = ChainStore::new(
        config,
        Arc::new(Secp256k1Verifier::new()),
        Arc::new(rewards),
        persisted,
    )
    .context("persisted chain failed validation")?;
    if store.tip_height()?.is_none() {
        store.put_block(&chain.genesis_block())?;
    }
    info!("chain loaded with {} blocks", chain.size());

    let state = AppState {
        chain: Arc::new(chain.with_store(store.clone())),
        pool: Arc::new(Mempool::with_capacity(args.mempool_capacity)),
    };

    let addr: SocketAddr = args.listen.parse()?;
    info!("ledger-node listening on http://{addr}");
    axum::serve(tokio::net::TcpListener::bind(addr).await?, router(state))
        .with_graceful_shutdown(async {
            let _ = tokio::signal::ctrl_c().await;
        })
        .await?;

    store.close()?;
    info!("ledger-node stopped");
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn difficulty_is_bounded_by_hash_length() {
        assert_eq!(parse_difficulty("4"), Ok(4));
        assert_eq!(parse_difficulty("64"), Ok(64));
        assert!(parse_difficulty("65").is_err());
        assert!(parse_difficulty("-1").is_err());
    }

    #[test]
    fn args_reject_unreachable_difficulty() {
        assert!(Args::try_parse_from(["ledger-node", "--difficulty", "65"]).is_err());
        let args = Args::try_parse_from(["ledger-node", "--difficulty", "2"]).unwrap();
        assert_eq!(args.difficulty, 2);
    }
}
