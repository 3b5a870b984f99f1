use actix_web::{HttpResponse, Responder, get, post, web};
use log::{debug, warn};

use super::models::{AppState, PoolMapResponse, TransactRequest, error_response};

/// Pay from this node's wallet; repeated calls extend the pending spend.
#[post("/transact/")]
pub async fn post_transact(
    state: web::Data<AppState>,
    body: web::Json<TransactRequest>,
) -> impl Responder {
    let recipient = body.recipient.trim();
    if recipient.is_empty() {
        return HttpResponse::BadRequest().body("recipient required");
    }
    if body.amount == 0 {
        return HttpResponse::BadRequest().body("amount must be > 0");
    }

    match state.node.transact(recipient, body.amount) {
        Ok(tx) => {
            debug!("POST /transact/ - id={} accepted into pool", tx.id);
            HttpResponse::Ok().json(tx)
        }
        Err(e) => {
            warn!("POST /transact/ - rejected: {e}");
            error_response(&e)
        }
    }
}

#[get("/transaction-pool-map/")]
pub async fn get_pool_map(state: web::Data<AppState>) -> impl Responder {
    let node_state = state.node.state();
    HttpResponse::Ok().json(PoolMapResponse {
        size: node_state.pool.len(),
        transactions: node_state.pool.transaction_map(),
    })
}
