use crate::constants::{BLOCKS_PER_BATCH, MAX_BLOCKS_PER_REQUEST};
use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    response::{IntoResponse, Response},
    routing::{get, post},
    Json, Router,
};
use ledger_core::{
    Balance, Block, ChainError, ChainStore, Mempool, MempoolError, Miner, Transaction,
    UnconfirmedPool,
};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tower_http::trace::TraceLayer;
use tracing::{info, warn};

/// `chain` carries the block store, so appends and fork replacements reach
/// disk inside the chain's own write lock.
#[derive(Clone)]
pub struct AppState {
    pub chain: Arc<ChainStore>,
    pub pool: Arc<Mempool>,
}

#[derive(Debug)]
pub enum ApiError {
    BadRequest(String),
    NotFound(String),
    Conflict(String),
    Unavailable(String),
    Internal(anyhow::Error),
}

impl From<anyhow::Error> for ApiError {
    fn from(err: anyhow::Error) -> Self {
        ApiError::Internal(err)
    }
}

impl From<MempoolError> for ApiError {
    fn from(err: MempoolError) -> Self {
        match err {
            MempoolError::Duplicate(_) => ApiError::Conflict(err.to_string()),
            MempoolError::Full(_) => ApiError::Unavailable(err.to_string()),
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let (status, message) = match self {
            ApiError::BadRequest(m) => (StatusCode::BAD_REQUEST, m),
            ApiError::NotFound(m) => (StatusCode::NOT_FOUND, m),
            ApiError::Conflict(m) => (StatusCode::CONFLICT, m),
            ApiError::Unavailable(m) => (StatusCode::SERVICE_UNAVAILABLE, m),
            ApiError::Internal(err) => {
                warn!("request failed: {err:#}");
                (StatusCode::INTERNAL_SERVER_ERROR, err.to_string())
            }
        };
        (status, Json(serde_json::json!({ "error": message }))).into_response()
    }
}

type ApiResult<T> = Result<Json<T>, ApiError>;

#[derive(Serialize)]
struct Health {
    status: &'static str,
}

#[derive(Serialize)]
struct Head {
    height: u64,
    hash: String,
    pending: usize,
}

#[derive(Deserialize)]
pub struct RangeQuery {
    from: Option<u64>,
    to: Option<u64>,
}

#[derive(Debug, Deserialize)]
pub struct TxIn {
    pub from: String,
    pub to: String,
    pub amount: u64,
    pub timestamp: u64,
    pub signature: String,
    /// Optional; when present it must match the recomputed hash.
    pub hash: Option<String>,
}

#[derive(Deserialize)]
struct MineIn {
    reward_address: String,
}

#[derive(Serialize)]
struct MineOut {
    block: Option<Block>,
}

#[derive(Serialize)]
struct ForkOut {
    replaced: bool,
    height: u64,
}

#[derive(Serialize)]
struct BalanceOut {
    address: String,
    balance: Balance,
}

pub fn router(state: AppState) -> Router {
    Router::new()
        .route("/health", get(health))
        .route("/chain/head", get(head))
        .route("/chain/fork", post(fork))
        .route("/blocks", get(blocks))
        .route("/blocks/{index}", get(block))
        .route("/tx", post(submit_tx))
        .route("/mine", post(mine))
        .route("/address/{address}/balance", get(balance))
        .route("/address/{address}/transactions", get(history))
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

async fn health() -> Json<Health> {
    Json(Health { status: "ok" })
}

async fn head(State(state): State<AppState>) -> ApiResult<Head> {
    let tip = state
        .chain
        .latest_block()
        .map_err(|e| ApiError::Internal(e.into()))?;
    Ok(Json(Head {
        height: tip.index,
        hash: tip.current_hash,
        pending: state.pool.len(),
    }))
}

async fn block(State(state): State<AppState>, Path(index): Path<u64>) -> ApiResult<Block> {
    state
        .chain
        .block_by_index(index)
        .map(Json)
        .ok_or_else(|| ApiError::NotFound(format!("no block at index {index}")))
}

/// `[from, to)` clamped to at most `MAX_BLOCKS_PER_REQUEST` blocks.
pub fn request_range(from: Option<u64>, to: Option<u64>) -> (u64, u64) {
    let from = from.unwrap_or(0);
    let to = to
        .unwrap_or_else(|| from.saturating_add(BLOCKS_PER_BATCH))
        .min(from.saturating_add(MAX_BLOCKS_PER_REQUEST));
    (from, to.max(from))
}

async fn blocks(State(state): State<AppState>, Query(q): Query<RangeQuery>) -> ApiResult<Vec<Block>> {
    let (from, to) = request_range(q.from, q.to);
    Ok(Json(state.chain.blocks_range(from, to)))
}

/// Turn a submitted transfer into a pending transaction: the hash is always
/// recomputed, the signature checked, and anything already mined refused.
pub fn admit_transaction(chain: &ChainStore, pool: &Mempool, tx: TxIn) -> Result<Transaction, ApiError> {
    let candidate = Transaction::new(tx.from, tx.to, tx.amount, tx.timestamp, tx.signature);
    if let Some(claimed) = tx.hash {
        if claimed != candidate.hash {
            return Err(ApiError::BadRequest(format!(
                "hash {claimed} does not match transaction contents ({})",
                candidate.hash
            )));
        }
    }
    if candidate.is_reward() {
        return Err(ApiError::BadRequest(
            "reward transactions are created by miners".to_string(),
        ));
    }
    if !chain
        .verifier()
        .verify(&candidate.signature, &candidate.signing_message(), &candidate.from)
    {
        return Err(ApiError::BadRequest("invalid signature".to_string()));
    }
    if let Some(index) = chain.find_duplicate_transaction(&candidate.hash, u64::MAX) {
        return Err(ApiError::Conflict(format!(
            "transaction {} already mined in block {index}",
            candidate.hash
        )));
    }
    pool.push(candidate.clone())?;
    Ok(candidate)
}

async fn submit_tx(State(state): State<AppState>, Json(tx): Json<TxIn>) -> ApiResult<Transaction> {
    let tx = admit_transaction(&state.chain, &state.pool, tx)?;
    info!("accepted transaction {} ({} pending)", tx.hash, state.pool.len());
    Ok(Json(tx))
}

async fn mine(State(state): State<AppState>, Json(req): Json<MineIn>) -> ApiResult<MineOut> {
    let chain = Arc::clone(&state.chain);
    let pool = Arc::clone(&state.pool);
    let mined = tokio::task::spawn_blocking(move || {
        Miner::new(&chain).mine_block(pool.as_ref(), &req.reward_address)
    })
    .await
    .map_err(|e| ApiError::Internal(e.into()))?;

    let Some(block) = mined else {
        return Ok(Json(MineOut { block: None }));
    };
    match state.chain.try_add_block(block.clone()) {
        Ok(()) => Ok(Json(MineOut { block: Some(block) })),
        Err(err) => {
            requeue(&state.pool, &block);
            match err {
                ChainError::Rejected { index, source } => {
                    warn!("mined block {index} was not accepted: {source}");
                    Err(ApiError::Conflict(format!("mined block {index} is stale")))
                }
                other => Err(ApiError::Internal(other.into())),
            }
        }
    }
}

/// Put the transfers of a block that was not appended back in the pool.
fn requeue(pool: &Mempool, block: &Block) {
    let transfers: Vec<Transaction> = block
        .transactions
        .iter()
        .filter(|tx| !tx.is_reward())
        .cloned()
        .collect();
    pool.return_unconfirmed_transactions(transfers);
}

async fn fork(State(state): State<AppState>, Json(tail): Json<Vec<Block>>) -> ApiResult<ForkOut> {
    let replaced = state.chain.alter_chain(tail);
    let height = state
        .chain
        .latest_block()
        .map_err(|e| ApiError::Internal(e.into()))?
        .index;
    Ok(Json(ForkOut { replaced, height }))
}

async fn balance(State(state): State<AppState>, Path(address): Path<String>) -> ApiResult<BalanceOut> {
    let balance = state.chain.latest_balance(&address);
    Ok(Json(BalanceOut { address, balance }))
}

async fn history(
    State(state): State<AppState>,
    Path(address): Path<String>,
) -> ApiResult<Vec<Transaction>> {
    Ok(Json(state.chain.transaction_history(&address)))
}
