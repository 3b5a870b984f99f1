use actix_web::{HttpResponse, Responder, post, web};
use log::debug;

use super::models::{AppState, PeerChainResponse, PeerTransactionResponse, error_response};

/// Transport ingress: a peer's serialized chain.
#[post("/peer/chain/")]
pub async fn post_chain(state: web::Data<AppState>, body: web::Bytes) -> impl Responder {
    debug!("POST /peer/chain/ - {} bytes", body.len());
    match state.node.on_chain_received(&body) {
        Ok(()) => HttpResponse::Ok().json(PeerChainResponse {
            replaced: true,
            length: state.node.state().blockchain.len(),
        }),
        Err(e) => error_response(&e),
    }
}

/// Transport ingress: a peer's serialized transaction.
#[post("/peer/transaction/")]
pub async fn post_transaction(state: web::Data<AppState>, body: web::Bytes) -> impl Responder {
    debug!("POST /peer/transaction/ - {} bytes", body.len());
    match state.node.on_transaction_received(&body) {
        Ok(stored) => HttpResponse::Ok().json(PeerTransactionResponse { stored }),
        Err(e) => error_response(&e),
    }
}
