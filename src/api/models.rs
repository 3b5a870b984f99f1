use std::collections::HashMap;
use std::sync::Arc;

use actix_web::HttpResponse;
use serde::{Deserialize, Serialize};

use crate::blockchain::BlockData;
use crate::error::{ChainError, NodeError};
use crate::node::Node;
use crate::transaction::Transaction;

/// Shared application state: the node this server fronts.
pub struct AppState {
    pub node: Arc<Node>,
}

#[derive(Serialize)]
pub struct ErrorResponse {
    pub error: String,
}

/// Map a node failure to an HTTP status with a JSON body.
pub fn error_response(err: &NodeError) -> HttpResponse {
    let body = ErrorResponse {
        error: err.to_string(),
    };
    match err {
        NodeError::Chain(ChainError::StaleTip) | NodeError::Chain(ChainError::NotLonger { .. }) => {
            HttpResponse::Conflict().json(body)
        }
        NodeError::Chain(_) => HttpResponse::UnprocessableEntity().json(body),
        NodeError::Transaction(_)
        | NodeError::Wallet(_)
        | NodeError::Codec(_)
        | NodeError::TransfersInPayload { .. } => HttpResponse::BadRequest().json(body),
    }
}

#[derive(Serialize)]
pub struct HealthResponse {
    pub status: &'static str,
    pub node: String,
    pub height: usize,
}

/* ---------- Chain API Models ---------- */

#[derive(Serialize, Deserialize)]
pub struct LengthResponse {
    pub length: usize,
}

#[derive(Serialize, Deserialize)]
pub struct ValidateResponse {
    pub valid: bool,
    pub valid_transactions: bool,
    pub length: usize,
}

#[derive(Deserialize)]
pub struct MineRequest {
    pub data: BlockData,
}

#[derive(Serialize, Deserialize)]
pub struct MineResponse {
    pub mined_index: usize,
    pub hash: String,
    pub nonce: u64,
    pub difficulty: u32,
}

/* ---------- TX API Models ---------- */

#[derive(Deserialize)]
pub struct TransactRequest {
    pub recipient: String,
    pub amount: u64,
}

#[derive(Serialize)]
pub struct PoolMapResponse<'a> {
    pub size: usize,
    pub transactions: &'a HashMap<String, Transaction>,
}

/* ---------- Wallet API Models ---------- */

#[derive(Serialize, Deserialize)]
pub struct WalletInfoResponse {
    pub address: String,
    pub balance: u64,
}

#[derive(Serialize, Deserialize)]
pub struct BalanceResponse {
    pub address: String,
    pub balance: u64,
}

/* ---------- Peer API Models ---------- */

#[derive(Serialize, Deserialize)]
pub struct PeerTransactionResponse {
    pub stored: bool,
}

#[derive(Serialize, Deserialize)]
pub struct PeerChainResponse {
    pub replaced: bool,
    pub length: usize,
}

#[derive(Serialize)]
pub struct StatsResponse {
    pub name: String,
    pub height: usize,
    pub difficulty: u32,
    pub mine_rate_ms: i64,
    pub stats_window: usize,
    pub last_interval_ms: Option<i64>,
    pub avg_interval_ms: Option<f64>,
    pub pool_size: usize,
}
