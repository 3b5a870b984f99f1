use actix_web::{HttpResponse, Responder, get, post, web};
use log::{error, info};

use super::models::{
    AppState, LengthResponse, MineRequest, MineResponse, ValidateResponse, error_response,
};
use crate::blockchain::Blockchain;
use crate::error::NodeError;
use crate::node::Sealed;

/// The full chain, in wire format.
#[get("/blocks/")]
pub async fn get_blocks(state: web::Data<AppState>) -> impl Responder {
    HttpResponse::Ok().json(state.node.chain_snapshot())
}

#[get("/blocks/length/")]
pub async fn get_length(state: web::Data<AppState>) -> impl Responder {
    let length = state.node.state().blockchain.len();
    HttpResponse::Ok().json(LengthResponse { length })
}

/// Re-run structural and transaction checks over the local chain.
#[get("/validate/")]
pub async fn validate_chain(state: web::Data<AppState>) -> impl Responder {
    let chain = state.node.chain_snapshot();
    HttpResponse::Ok().json(ValidateResponse {
        valid: Blockchain::is_valid_chain(&chain),
        valid_transactions: Blockchain::valid_transaction_data(&chain),
        length: chain.len(),
    })
}

/// Mine an arbitrary payload into a new block.
#[post("/mine/")]
pub async fn mine_block(state: web::Data<AppState>, req: web::Json<MineRequest>) -> impl Responder {
    let node = state.node.clone();
    let data = req.into_inner().data;
    mined(web::block(move || node.mine_data(data)).await)
}

/// One mining round over the transaction pool.
#[get("/mine-transactions/")]
pub async fn mine_transactions(state: web::Data<AppState>) -> impl Responder {
    let node = state.node.clone();
    mined(web::block(move || node.mine_transactions()).await)
}

fn mined(
    outcome: Result<Result<Sealed, NodeError>, actix_web::error::BlockingError>,
) -> HttpResponse {
    match outcome {
        Ok(Ok(Sealed { index, block })) => {
            info!("MINER - sealed block #{index} (hash={})", block.hash);
            HttpResponse::Ok().json(MineResponse {
                mined_index: index,
                hash: block.hash,
                nonce: block.nonce,
                difficulty: block.difficulty,
            })
        }
        Ok(Err(e)) => error_response(&e),
        Err(e) => {
            error!("MINER - worker failed: {e}");
            HttpResponse::InternalServerError().finish()
        }
    }
}
